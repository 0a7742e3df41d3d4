use std::fmt::{self, Write};
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use smartstring::alias::String;

mod aggregate;
mod error;
mod generate;
mod ingest;
mod store;
mod tagger;
mod title;

#[cfg(any(test, feature = "test-cases"))]
pub mod test_cases;

pub use aggregate::{Aggregator, Harvest};
pub use error::{Error, Result};
pub use generate::Generator;
pub use ingest::{distinct_patterns, ensure_ingested, IngestReport};
#[cfg(feature = "with-serde")]
pub use store::Snapshot;
pub use store::Store;
pub use tagger::{DictionaryTagger, Tagger};
pub use title::{extract_title, HttpSource, SourceConfig, TitleSource};

/// Grammatical category of a word: the tagger's primary and secondary feature
///
/// `subkind` is empty when the tagger has no secondary feature for a token, so that
/// every slot renders to the same `(kind|subkind)` shape.
#[cfg_attr(feature = "with-serde", derive(Deserialize, Serialize))]
#[derive(Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Slot {
    pub kind: String,
    pub subkind: String,
}

impl Slot {
    pub fn new(kind: &str, subkind: &str) -> Self {
        Self {
            kind: kind.into(),
            subkind: subkind.into(),
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}|{})", self.kind, self.subkind)
    }
}

/// A surface form as it appeared in a title, together with its category
#[cfg_attr(feature = "with-serde", derive(Deserialize, Serialize))]
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Word {
    pub surface: String,
    pub slot: Slot,
}

impl Word {
    pub fn new(surface: &str, kind: &str, subkind: &str) -> Self {
        Self {
            surface: surface.into(),
            slot: Slot::new(kind, subkind),
        }
    }
}

/// Ordered sequence of slots describing the grammatical skeleton of one title
///
/// Patterns are stored under their canonical key, `(kind|subkind),` repeated for every
/// slot, so structurally identical titles collapse to a single row.
#[cfg_attr(feature = "with-serde", derive(Deserialize, Serialize))]
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct Pattern(Vec<Slot>);

impl Pattern {
    pub fn new(slots: Vec<Slot>) -> Self {
        Self(slots)
    }

    pub fn slots(&self) -> &[Slot] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Render the canonical storage key
    pub fn key(&self) -> std::string::String {
        let mut key = std::string::String::with_capacity(self.0.len() * 16);
        for slot in &self.0 {
            // Writing into a `String` can't fail
            let _ = write!(key, "{},", slot);
        }
        key
    }
}

impl FromStr for Pattern {
    type Err = Error;

    /// Parse a canonical key back into its slots
    fn from_str(key: &str) -> Result<Self> {
        let mut slots = Vec::new();
        for part in key.split(',') {
            if part.is_empty() {
                continue;
            }

            let inner = part
                .strip_prefix('(')
                .and_then(|s| s.strip_suffix(')'))
                .ok_or_else(|| Error::MalformedPattern(key.into()))?;
            let (kind, subkind) = inner
                .split_once('|')
                .ok_or_else(|| Error::MalformedPattern(key.into()))?;
            slots.push(Slot::new(kind, subkind));
        }

        Ok(Self(slots))
    }
}

impl From<Vec<Slot>> for Pattern {
    fn from(slots: Vec<Slot>) -> Self {
        Self(slots)
    }
}

type HashMap<K, V> = std::collections::HashMap<K, V, ahash::RandomState>;
type HashSet<T> = std::collections::HashSet<T, ahash::RandomState>;
