use rand::Rng;
use tracing::debug;

use crate::{Error, Result, Store, Word};

/// Generates titles by filling a random stored pattern with random stored words
pub struct Generator<'a> {
    store: &'a Store,
    max_attempts: usize,
}

impl<'a> Generator<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self {
            store,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Customize how many patterns are tried before giving up
    pub fn set_max_attempts(&mut self, max_attempts: usize) {
        self.max_attempts = max_attempts.max(1);
    }

    /// Generate one title
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<String> {
        let words = self.generate_words(rng)?;
        Ok(words.iter().map(|word| word.surface.as_str()).collect())
    }

    /// Generate the words for one title, one per slot of the sampled pattern
    ///
    /// If the sampled pattern has a slot no stored word can fill, selection starts over
    /// with a fresh pattern. Fails with `EmptyCorpus` if no pattern is stored at all, or
    /// `Exhausted` if no attempt produced a complete title.
    pub fn generate_words<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Vec<Word>> {
        let mut found_pattern = false;
        'attempts: for attempt in 0..self.max_attempts {
            let pattern = match self.store.sample_pattern(rng)? {
                Some(pattern) => pattern,
                None => continue,
            };
            found_pattern = true;

            let mut words = Vec::with_capacity(pattern.len());
            for slot in pattern.slots() {
                match self.store.sample_word(slot, rng)? {
                    Some(word) => words.push(word),
                    None => {
                        debug!(attempt, %slot, "no word for slot, starting over");
                        continue 'attempts;
                    }
                }
            }

            return Ok(words);
        }

        match found_pattern {
            true => Err(Error::Exhausted(self.max_attempts)),
            false => Err(Error::EmptyCorpus),
        }
    }
}

const DEFAULT_MAX_ATTEMPTS: usize = 32;
