use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::SeedableRng;

use title_mill::test_cases::{assert_well_formed, FixtureSource, FixtureTagger, POSTS};
use title_mill::{
    ensure_ingested, Aggregator, Error, Generator, Harvest, IngestReport, Slot, Store, Tagger,
};

static HARVEST: Lazy<Harvest> = Lazy::new(|| aggregator(POSTS, 4).run(1..=8));

fn aggregator(posts: &[(u64, &str)], concurrency: usize) -> Aggregator<FixtureSource, FixtureTagger> {
    let source = FixtureSource::new(posts.iter().copied());
    Aggregator::new(source, FixtureTagger::default(), concurrency).unwrap()
}

fn ingested(posts: &[(u64, &str)], target: u64) -> Store {
    let mut store = Store::open_in_memory().unwrap();
    ensure_ingested(&mut store, &aggregator(posts, 4), target).unwrap();
    store
}

macro_rules! assert_generates_one_of {
    ($store:expr, $choices:expr) => {
        let generator = Generator::new(&$store);
        let mut rng = StdRng::seed_from_u64(12345);
        for _ in 0..100 {
            let title = generator.generate(&mut rng).unwrap();
            assert!($choices.contains(&title.as_str()), "unexpected title {:?}", title);
        }
    };
}

#[test]
fn two_posts_one_pattern() {
    let store = ingested(&[(1, "sun rises"), (2, "moon sets")], 2);

    let patterns = store.patterns().unwrap();
    assert_eq!(patterns.len(), 1);
    assert_eq!(patterns[0].key(), "(noun|common),(verb|plain),");
    assert_eq!(store.word_count().unwrap(), 4);

    assert_generates_one_of!(store, ["sunrises", "sunsets", "moonrises", "moonsets"]);
}

#[test]
fn failed_post_is_skipped_for_good() {
    let posts = [(1, "sun rises"), (3, "moon sets")];
    let mut store = Store::open_in_memory().unwrap();

    let report = ensure_ingested(&mut store, &aggregator(&posts, 4), 3).unwrap();
    assert_eq!(
        report,
        IngestReport::Completed {
            start: 1,
            end: 3,
            collected: 2,
            failed: vec![2],
            words: 4,
            patterns: 1,
        }
    );
    assert!(!report.is_complete());
    assert_eq!(store.watermark().unwrap(), 3);

    let mut surfaces = store
        .words()
        .unwrap()
        .into_iter()
        .map(|word| word.surface.to_string())
        .collect::<Vec<_>>();
    surfaces.sort();
    assert_eq!(surfaces, ["moon", "rises", "sets", "sun"]);

    // The watermark has passed post 2, so it is never asked for again
    let retry = aggregator(&[(2, "star shines")], 4);
    ensure_ingested(&mut store, &retry, 3).unwrap();
    assert_eq!(retry.source().fetches(), 0);
}

#[test]
fn second_run_is_a_no_op() {
    let mut store = ingested(POSTS, 8);
    let (words, patterns) = (store.words().unwrap(), store.patterns().unwrap());

    let again = aggregator(POSTS, 4);
    let report = ensure_ingested(&mut store, &again, 8).unwrap();
    assert_eq!(report, IngestReport::Skipped { watermark: 8 });
    assert_eq!(again.source().fetches(), 0);
    assert_eq!(store.words().unwrap(), words);
    assert_eq!(store.patterns().unwrap(), patterns);

    ensure_ingested(&mut store, &again, 6).unwrap();
    assert_eq!(again.source().fetches(), 0);
}

#[test]
fn growing_target_fetches_only_new_posts() {
    let mut store = ingested(POSTS, 5);
    let more = aggregator(POSTS, 4);
    ensure_ingested(&mut store, &more, 8).unwrap();

    assert_eq!(more.source().requested(), vec![6, 7, 8]);
    assert_eq!(store.watermark().unwrap(), 8);
}

#[test]
fn slot_coverage() {
    for slots in HARVEST.patterns.values() {
        for slot in slots {
            assert!(
                HARVEST.words.values().any(|word| &word.slot == slot),
                "no word for {}",
                slot
            );
        }
    }

    let store = ingested(POSTS, 8);
    let mut rng = StdRng::seed_from_u64(1);
    for pattern in store.patterns().unwrap() {
        for slot in pattern.slots() {
            assert!(store.sample_word(slot, &mut rng).unwrap().is_some());
        }
    }
}

#[test]
fn merge_order_does_not_matter() {
    let serial = aggregator(POSTS, 1).run(1..=8);
    assert_eq!(serial.words, HARVEST.words);
    assert_eq!(serial.patterns, HARVEST.patterns);
    assert_eq!(serial.failed, HARVEST.failed);
}

#[test]
fn tagging_is_deterministic() {
    let tagger = FixtureTagger::default();
    for (_, title) in POSTS {
        let first = tagger.tag(title);
        let second = tagger.tag(title);
        assert_eq!(first, second);
    }
    assert!(tagger.tag("").is_empty());
}

#[test]
fn empty_titles_make_no_pattern() {
    let store = ingested(&[(1, ""), (2, "   ")], 2);
    assert_eq!(store.pattern_count().unwrap(), 0);
    assert_eq!(store.watermark().unwrap(), 2);

    let mut rng = StdRng::seed_from_u64(1);
    match Generator::new(&store).generate(&mut rng) {
        Err(Error::EmptyCorpus) => {}
        other => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn generated_titles_are_well_formed() {
    let store = ingested(POSTS, 8);
    assert_eq!(store.pattern_count().unwrap(), 6);

    let mut rng = StdRng::seed_from_u64(12345);
    assert_well_formed(&store, &mut rng, 200);

    let generator = Generator::new(&store);
    let words = generator.generate_words(&mut rng).unwrap();
    let title = words.iter().map(|w| w.surface.as_str()).collect::<String>();
    assert!(!title.is_empty());
    assert!(words.iter().all(|w| w.slot != Slot::default()));
}

#[test]
fn seeded_generation_is_reproducible() {
    let store = ingested(POSTS, 8);
    let generator = Generator::new(&store);
    let titles = |seed| {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..10)
            .map(|_| generator.generate(&mut rng).unwrap())
            .collect::<Vec<_>>()
    };
    assert_eq!(titles(99), titles(99));
}
