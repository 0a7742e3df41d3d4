use std::sync::Mutex;

use rand::Rng;

use crate::{Error, Generator, HashMap, Result, Store, Tagger, TitleSource, Word};

/// Tagger for tests: splits on whitespace and looks every word up in a fixed lexicon
///
/// Words missing from the lexicon are tagged `(unknown|)`.
pub struct FixtureTagger {
    lexicon: HashMap<String, (String, String)>,
}

impl FixtureTagger {
    pub fn new<'a, I>(lexicon: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str, &'a str)>,
    {
        Self {
            lexicon: lexicon
                .into_iter()
                .map(|(surface, kind, subkind)| (surface.into(), (kind.into(), subkind.into())))
                .collect(),
        }
    }
}

impl Default for FixtureTagger {
    fn default() -> Self {
        Self::new(LEXICON.iter().copied())
    }
}

impl Tagger for FixtureTagger {
    fn tag(&self, text: &str) -> Vec<Word> {
        text.split_whitespace()
            .map(|surface| match self.lexicon.get(surface) {
                Some((kind, subkind)) => Word::new(surface, kind, subkind),
                None => Word::new(surface, "unknown", ""),
            })
            .collect()
    }
}

/// Title source for tests serving a fixed set of posts
///
/// Posts not in the set fail with `Unavailable`. Every request is recorded.
pub struct FixtureSource {
    titles: HashMap<u64, String>,
    requested: Mutex<Vec<u64>>,
}

impl FixtureSource {
    pub fn new<'a, I>(posts: I) -> Self
    where
        I: IntoIterator<Item = (u64, &'a str)>,
    {
        Self {
            titles: posts
                .into_iter()
                .map(|(id, title)| (id, title.into()))
                .collect(),
            requested: Mutex::new(Vec::new()),
        }
    }

    /// Number of titles requested so far
    pub fn fetches(&self) -> usize {
        self.lock().len()
    }

    /// Identifiers requested so far, in ascending order
    pub fn requested(&self) -> Vec<u64> {
        let mut ids = self.lock().clone();
        ids.sort_unstable();
        ids
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<u64>> {
        self.requested
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl TitleSource for FixtureSource {
    fn title(&self, id: u64) -> Result<String> {
        self.lock().push(id);
        self.titles.get(&id).cloned().ok_or(Error::Unavailable(id))
    }
}

/// Generate `n` titles and check each against the store it came from
///
/// Every word must come from the store and the slots of the words, in order, must form a
/// stored pattern.
pub fn assert_well_formed<R: Rng>(store: &Store, rng: &mut R, n: usize) {
    let words = store.words().unwrap();
    let patterns = store
        .patterns()
        .unwrap()
        .into_iter()
        .map(|pattern| pattern.key())
        .collect::<Vec<_>>();

    let generator = Generator::new(store);
    for _ in 0..n {
        let title = generator.generate_words(rng).unwrap();
        for word in &title {
            assert!(words.contains(word), "unknown word {:?}", word);
        }

        let key = crate::Pattern::new(title.iter().map(|w| w.slot.clone()).collect()).key();
        assert!(patterns.contains(&key), "unknown pattern {:?}", key);
    }
}

/// Lexicon used by `FixtureTagger::default()`
pub const LEXICON: &[(&str, &str, &str)] = &[
    ("sun", "noun", "common"),
    ("moon", "noun", "common"),
    ("star", "noun", "common"),
    ("rust", "noun", "proper"),
    ("rises", "verb", "plain"),
    ("sets", "verb", "plain"),
    ("shines", "verb", "plain"),
    ("the", "article", ""),
    ("bright", "adj", ""),
    ("quietly", "adverb", ""),
];

/// Small blog corpus, keyed by post identifier
pub const POSTS: &[(u64, &str)] = &[
    (1, "sun rises"),
    (2, "moon sets"),
    (3, "the bright star shines"),
    (4, "rust shines quietly"),
    (5, "the moon rises"),
    (6, ""),
    (7, "the sun sets quietly"),
    (8, "bright star"),
];
