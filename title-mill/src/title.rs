use std::time::Duration;

use once_cell::sync::Lazy;
use reqwest::blocking::Client;
use scraper::{Html, Selector};
use tracing::debug;

use crate::Result;

/// Source of post titles, addressed by post identifier
pub trait TitleSource: Send + Sync {
    /// Fetch the title of post `id`
    ///
    /// A post that exists but has no title yields an empty string; only failures to reach
    /// the post at all are errors. Sources that know a post does not exist should return
    /// [`Error::Unavailable`](crate::Error::Unavailable).
    fn title(&self, id: u64) -> Result<String>;
}

/// Where posts live and how their titles are decorated
#[derive(Clone, Debug)]
pub struct SourceConfig {
    pub scheme: String,
    pub host: String,
    /// Site name suffix appended to every page title
    pub title_suffix: String,
    pub timeout: Duration,
}

impl SourceConfig {
    pub fn post_url(&self, id: u64) -> String {
        format!("{}://{}/post/{}", self.scheme, self.host, id)
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            scheme: DEFAULT_SCHEME.into(),
            host: DEFAULT_HOST.into(),
            title_suffix: DEFAULT_TITLE_SUFFIX.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Fetches post pages over HTTP, one blocking request per title
pub struct HttpSource {
    client: Client,
    config: SourceConfig,
}

impl HttpSource {
    pub fn new(config: SourceConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }
}

impl TitleSource for HttpSource {
    fn title(&self, id: u64) -> Result<String> {
        let url = self.config.post_url(id);
        let response = self.client.get(&url).send()?;
        // Deleted posts still serve a page; whatever it contains decides the title
        let status = response.status();
        let body = response.text()?;
        let title = extract_title(&body, &self.config.title_suffix);
        debug!(id, %status, %title, "fetched post");
        Ok(title)
    }
}

/// Extract the text of the first `<title>` element in `html`
///
/// Surrounding whitespace is trimmed and a trailing `suffix` is removed (as a whole
/// string). Returns an empty string if the document has no title.
pub fn extract_title(html: &str, suffix: &str) -> String {
    let doc = Html::parse_document(html);
    let title = match doc.select(&TITLE).next() {
        Some(elem) => elem.text().collect::<String>(),
        None => return String::new(),
    };

    let title = title.trim();
    let title = match suffix.is_empty() {
        true => title,
        false => title.strip_suffix(suffix).unwrap_or(title),
    };
    title.trim().to_owned()
}

static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").expect("valid selector"));

const DEFAULT_SCHEME: &str = "https";
const DEFAULT_HOST: &str = "trap.jp";
const DEFAULT_TITLE_SUFFIX: &str = "| 東京工業大学デジタル創作同好会traP";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
