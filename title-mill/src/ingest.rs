use tracing::{info, warn};

use crate::{Aggregator, HashMap, HashSet, Pattern, Result, Slot, Store, Tagger, TitleSource, Word};

/// Outcome of an [`ensure_ingested()`] call
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IngestReport {
    /// The store was already ingested up to (at least) the target
    Skipped { watermark: u64 },
    /// Posts `start..=end` were processed and the watermark moved to `end`
    Completed {
        start: u64,
        end: u64,
        /// Posts whose title was fetched and tagged
        collected: usize,
        /// Posts that could not be fetched; these are not retried by later runs
        failed: Vec<u64>,
        words: usize,
        patterns: usize,
    },
}

impl IngestReport {
    pub fn is_complete(&self) -> bool {
        match self {
            IngestReport::Skipped { .. } => true,
            IngestReport::Completed { failed, .. } => failed.is_empty(),
        }
    }
}

/// Make sure the first `target` posts are ingested into `store`
///
/// Reads the watermark, processes every post past it up to `target` and stores the
/// resulting words and distinct patterns. The new watermark is written last, so a run that
/// fails to persist leaves the watermark untouched and the next run redoes the same range.
pub fn ensure_ingested<S, T>(
    store: &mut Store,
    aggregator: &Aggregator<S, T>,
    target: u64,
) -> Result<IngestReport>
where
    S: TitleSource,
    T: Tagger,
{
    let watermark = store.watermark()?;
    if watermark >= target {
        info!(watermark, target, "already ingested");
        return Ok(IngestReport::Skipped { watermark });
    }

    let (start, end) = (watermark + 1, target);
    info!(start, end, "ingesting posts");
    let harvest = aggregator.run(start..=end);
    if !harvest.failed.is_empty() {
        warn!(
            failed = harvest.failed.len(),
            ids = ?harvest.failed,
            "ingestion incomplete, failed posts will not be retried"
        );
    }

    let collected = harvest.collected();
    let mut words = harvest.words.into_values().collect::<Vec<Word>>();
    words.sort_unstable_by(|a, b| a.surface.cmp(&b.surface));
    let patterns = distinct_patterns(&harvest.patterns);

    store.insert_words(&words)?;
    store.insert_patterns(&patterns)?;
    store.push_watermark(end)?;

    info!(
        collected,
        words = words.len(),
        patterns = patterns.len(),
        watermark = end,
        "ingestion finished"
    );
    Ok(IngestReport::Completed {
        start,
        end,
        collected,
        failed: harvest.failed,
        words: words.len(),
        patterns: patterns.len(),
    })
}

/// Collapse per-post slot lists into distinct, non-empty patterns
///
/// Two lists are the same pattern only if they hold the same slots in the same order.
/// Patterns are returned in order of the lowest post identifier they occur in.
pub fn distinct_patterns(posts: &HashMap<u64, Vec<Slot>>) -> Vec<Pattern> {
    let mut ids = posts.keys().copied().collect::<Vec<_>>();
    ids.sort_unstable();

    let mut seen = HashSet::default();
    let mut patterns = Vec::with_capacity(ids.len());
    for id in ids {
        let slots = &posts[&id];
        if slots.is_empty() {
            continue;
        }

        let pattern = Pattern::new(slots.clone());
        if seen.insert(pattern.key()) {
            patterns.push(pattern);
        }
    }

    patterns
}
