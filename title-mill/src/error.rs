use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// Transport failure while fetching a post (connect, timeout, body read)
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    /// The source has nothing for this post
    ///
    /// Not produced by `HttpSource`, which treats any page it can fetch as a post. Other
    /// `TitleSource` implementations (offline mirrors, fixtures) return it for identifiers
    /// they do not hold, and the aggregator records it like any other per-post failure.
    #[error("post {0} is unavailable")]
    Unavailable(u64),
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
    #[error("failed to load dictionary: {0}")]
    Dictionary(#[from] vibrato::errors::VibratoError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed pattern key {0:?}")]
    MalformedPattern(String),
    #[error("failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
    #[error("corpus contains no grammar patterns")]
    EmptyCorpus,
    #[error("no complete title after {0} attempts")]
    Exhausted(usize),
}
