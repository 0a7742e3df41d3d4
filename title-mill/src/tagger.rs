use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use tracing::info;
use vibrato::{Dictionary, Tokenizer};

use crate::{Result, Word};

/// Morphological tagging engine
///
/// Implementations must be deterministic: tagging the same text twice yields the same
/// words in the same order, since pattern deduplication relies on stable slots.
pub trait Tagger: Send + Sync {
    /// Split `text` into tagged words, in order, with structural noise removed
    fn tag(&self, text: &str) -> Vec<Word>;
}

/// `Tagger` backed by a vibrato system dictionary (IPADIC-style features)
pub struct DictionaryTagger {
    tokenizer: Tokenizer,
}

impl DictionaryTagger {
    /// Load the system dictionary at `path`, decompressing it if it ends in `.zst`
    pub fn load(path: &Path) -> Result<Self> {
        info!(path = %path.display(), "loading dictionary");
        let reader = BufReader::with_capacity(4 * 1024 * 1024, File::open(path)?);
        let dict = match path.extension().map_or(false, |ext| ext == "zst") {
            true => Dictionary::read(zstd::Decoder::new(reader)?)?,
            false => Dictionary::read(reader)?,
        };
        Ok(Self::new(dict))
    }

    /// Load a (decompressed) system dictionary from `reader`
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(Self::new(Dictionary::read(reader)?))
    }

    pub fn new(dict: Dictionary) -> Self {
        Self {
            tokenizer: Tokenizer::new(dict),
        }
    }
}

impl Tagger for DictionaryTagger {
    fn tag(&self, text: &str) -> Vec<Word> {
        if text.is_empty() {
            return Vec::new();
        }

        let mut worker = self.tokenizer.new_worker();
        worker.reset_sentence(text);
        worker.tokenize();
        worker
            .token_iter()
            .filter_map(|token| word_from_feature(token.surface(), token.feature()))
            .collect()
    }
}

/// Build a `Word` from a surface and its comma-separated feature string
///
/// The first feature is the kind, the second (if any) the subkind. Returns `None` for
/// tokens that carry no lexical content.
fn word_from_feature(surface: &str, feature: &str) -> Option<Word> {
    if surface.is_empty() || feature.starts_with(BOUNDARY_FEATURE) {
        return None;
    }

    let mut features = feature.split(',');
    let kind = features.next().unwrap_or_default();
    let subkind = features.next().unwrap_or_default();
    Some(Word::new(surface, kind, subkind))
}

/// Feature the tagger reports for sentence boundary pseudo-tokens
const BOUNDARY_FEATURE: &str = "BOS/EOS";
