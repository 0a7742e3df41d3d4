use std::ops::RangeInclusive;

use rayon::iter::{IntoParallelIterator, ParallelIterator};
use rayon::{ThreadPool, ThreadPoolBuilder};
use smartstring::alias::String;
use tracing::warn;

use crate::{HashMap, Result, Slot, Tagger, TitleSource, Word};

/// Fetches and tags a range of posts on a bounded worker pool
pub struct Aggregator<S, T> {
    source: S,
    tagger: T,
    pool: ThreadPool,
}

impl<S: TitleSource, T: Tagger> Aggregator<S, T> {
    /// Create an `Aggregator` running at most `concurrency` fetches at a time
    pub fn new(source: S, tagger: T, concurrency: usize) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(concurrency.max(1))
            .thread_name(|i| format!("title-mill-{}", i))
            .build()?;
        Ok(Self {
            source,
            tagger,
            pool,
        })
    }

    /// Fetch, tag and merge every post in `ids`
    ///
    /// Returns only once every post has either been collected or recorded as failed.
    pub fn run(&self, ids: RangeInclusive<u64>) -> Harvest {
        let mut harvest = self.pool.install(|| {
            ids.into_par_iter()
                .map(|id| (id, self.collect(id)))
                .fold(Harvest::default, |mut harvest, (id, result)| {
                    harvest.insert(id, result);
                    harvest
                })
                .reduce(Harvest::default, Harvest::merge)
        });

        harvest.failed.sort_unstable();
        harvest
    }

    fn collect(&self, id: u64) -> Result<Vec<Word>> {
        let title = self.source.title(id)?;
        Ok(self.tagger.tag(&title))
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

/// Merged output of one aggregation run
#[derive(Debug, Default)]
pub struct Harvest {
    /// Word index keyed by surface form; the last write for a surface wins
    pub words: HashMap<String, Word>,
    /// Ordered slots observed in each successfully collected post
    pub patterns: HashMap<u64, Vec<Slot>>,
    /// Posts that could not be collected, in ascending order
    pub failed: Vec<u64>,
}

impl Harvest {
    fn insert(&mut self, id: u64, result: Result<Vec<Word>>) {
        let words = match result {
            Ok(words) => words,
            Err(error) => {
                warn!(id, %error, "failed to collect post");
                self.failed.push(id);
                return;
            }
        };

        let slots = words.iter().map(|word| word.slot.clone()).collect();
        for word in words {
            self.words.insert(word.surface.clone(), word);
        }
        self.patterns.insert(id, slots);
    }

    fn merge(mut self, other: Self) -> Self {
        self.words.extend(other.words);
        self.patterns.extend(other.patterns);
        self.failed.extend(other.failed);
        self
    }

    /// Number of posts that were collected successfully
    pub fn collected(&self) -> usize {
        self.patterns.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_cases::{FixtureSource, FixtureTagger};
    use crate::Error;

    #[test]
    fn merges_posts() {
        let source = FixtureSource::new([(1, "sun rises"), (2, "moon sets"), (3, "")]);
        let aggregator = Aggregator::new(source, FixtureTagger::default(), 4).unwrap();
        let harvest = aggregator.run(1..=3);

        assert_eq!(harvest.collected(), 3);
        assert!(harvest.failed.is_empty());
        assert_eq!(harvest.words.len(), 4);
        assert_eq!(harvest.patterns[&1], harvest.patterns[&2]);
        assert!(harvest.patterns[&3].is_empty());
        assert_eq!(aggregator.source().fetches(), 3);
    }

    #[test]
    fn keeps_slot_order() {
        let source = FixtureSource::new([(7, "rises sun")]);
        let aggregator = Aggregator::new(source, FixtureTagger::default(), 1).unwrap();
        let harvest = aggregator.run(7..=7);
        assert_eq!(
            harvest.patterns[&7],
            vec![Slot::new("verb", "plain"), Slot::new("noun", "common")]
        );
    }

    #[test]
    fn failures_are_recorded() {
        let source = FixtureSource::new([(1, "sun rises"), (3, "moon sets")]);
        let aggregator = Aggregator::new(source, FixtureTagger::default(), 2).unwrap();
        let harvest = aggregator.run(1..=4);

        assert_eq!(harvest.failed, vec![2, 4]);
        assert_eq!(harvest.collected(), 2);
        assert!(!harvest.patterns.contains_key(&2));
    }

    #[test]
    fn zero_concurrency_still_runs() {
        let source = FixtureSource::new([(1, "sun")]);
        let aggregator = Aggregator::new(source, FixtureTagger::default(), 0).unwrap();
        assert_eq!(aggregator.run(1..=1).collected(), 1);
    }

    #[test]
    fn insert_failure() {
        let mut harvest = Harvest::default();
        harvest.insert(9, Err(Error::Unavailable(9)));
        assert_eq!(harvest.failed, vec![9]);
        assert!(harvest.words.is_empty());
    }
}
