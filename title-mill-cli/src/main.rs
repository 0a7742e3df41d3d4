use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use title_mill::{
    ensure_ingested, Aggregator, DictionaryTagger, Generator, HttpSource, IngestReport,
    SourceConfig, Store,
};

/// Learn grammar patterns from blog post titles and generate new titles from them
#[derive(Parser, Debug)]
#[command(name = "title-mill", version)]
struct Opts {
    /// SQLite database holding words, patterns and the ingestion watermark
    #[arg(long, env = "TITLE_MILL_DB", default_value = "title-mill.db", global = true)]
    db: PathBuf,
    /// Number of posts that should be ingested
    #[arg(long, env = "POSTS_COUNT", default_value_t = 2100, global = true)]
    posts_count: u64,
    #[arg(long, env = "TITLE_MILL_SCHEME", default_value = "https", global = true)]
    scheme: String,
    #[arg(long, env = "TITLE_MILL_HOST", default_value = "trap.jp", global = true)]
    host: String,
    /// Site name suffix stripped from every page title
    #[arg(
        long,
        env = "TITLE_MILL_TITLE_SUFFIX",
        default_value = "| 東京工業大学デジタル創作同好会traP",
        global = true
    )]
    title_suffix: String,
    /// vibrato system dictionary (`.zst` files are decompressed on load)
    #[arg(long, env = "TITLE_MILL_DICTIONARY", global = true)]
    dictionary: Option<PathBuf>,
    /// Maximum number of posts fetched at the same time
    #[arg(long, env = "TITLE_MILL_CONCURRENCY", default_value_t = 16, global = true)]
    concurrency: usize,
    /// Per-request timeout in seconds
    #[arg(long, env = "TITLE_MILL_TIMEOUT_SECS", default_value_t = 10, global = true)]
    timeout_secs: u64,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ingest posts up to `--posts-count`
    Ingest,
    /// Print generated titles, ingesting first unless `--offline` is given
    Generate {
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,
        /// Seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,
        /// Only use what is already in the database
        #[arg(long)]
        offline: bool,
    },
    /// Print corpus statistics
    Stats,
    /// Write the corpus to a file
    Dump { path: PathBuf },
    /// Merge a corpus file written by `dump` into the database
    Load { path: PathBuf },
}

fn main() -> Result<()> {
    init_tracing();
    let opts = Opts::parse();
    let mut store = Store::open(&opts.db)
        .with_context(|| format!("failed to open database {}", opts.db.display()))?;

    match &opts.command {
        Command::Ingest => {
            ingest(&opts, &mut store).context("failed to initialize data")?;
        }
        Command::Generate {
            count,
            seed,
            offline,
        } => {
            if !offline {
                ingest(&opts, &mut store).context("failed to initialize data")?;
            }

            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(*seed),
                None => StdRng::from_entropy(),
            };
            let generator = Generator::new(&store);
            for _ in 0..*count {
                println!("{}", generator.generate(&mut rng)?);
            }
        }
        Command::Stats => {
            println!("watermark: {}", store.watermark()?);
            println!("words:     {}", store.word_count()?);
            println!("patterns:  {}", store.pattern_count()?);
        }
        Command::Dump { path } => {
            let snapshot = store.snapshot()?;
            let f = BufWriter::with_capacity(4 * 1024 * 1024, File::create(path)?);
            bincode::serialize_into(f, &snapshot)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(
                words = snapshot.words.len(),
                patterns = snapshot.patterns.len(),
                path = %path.display(),
                "dumped corpus"
            );
        }
        Command::Load { path } => {
            let f = BufReader::with_capacity(4 * 1024 * 1024, File::open(path)?);
            let snapshot = bincode::deserialize_from::<_, title_mill::Snapshot>(f)
                .with_context(|| format!("failed to read {}", path.display()))?;
            store.restore(&snapshot)?;
            info!(
                words = snapshot.words.len(),
                patterns = snapshot.patterns.len(),
                watermark = store.watermark()?,
                "loaded corpus"
            );
        }
    }

    Ok(())
}

/// Ingest up to `--posts-count` posts unless the database is already there
fn ingest(opts: &Opts, store: &mut Store) -> Result<IngestReport> {
    // Checked here as well as in `ensure_ingested` so an up-to-date database never pays
    // for loading the dictionary
    let watermark = store.watermark()?;
    if watermark >= opts.posts_count {
        info!(watermark, "already initialized");
        return Ok(IngestReport::Skipped { watermark });
    }

    let dictionary = opts
        .dictionary
        .as_deref()
        .context("a dictionary is needed to ingest posts (--dictionary or TITLE_MILL_DICTIONARY)")?;
    let tagger = DictionaryTagger::load(dictionary)?;
    let source = HttpSource::new(SourceConfig {
        scheme: opts.scheme.clone(),
        host: opts.host.clone(),
        title_suffix: opts.title_suffix.clone(),
        timeout: Duration::from_secs(opts.timeout_secs),
    })?;

    let aggregator = Aggregator::new(source, tagger, opts.concurrency)?;
    Ok(ensure_ingested(store, &aggregator, opts.posts_count)?)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
