//! Proxy Listing - Proxy IP list browser
//!
//! Loads a delimited proxy feed and lets the user filter, sort, paginate,
//! export and favorite its entries from the command line or a terminal UI.

pub mod error;
pub mod proxy;
pub mod state;
pub mod tui;

pub use error::{FetchError, ListingError, LookupError};
pub use proxy::*;

/// Application result type
pub type Result<T> = std::result::Result<T, ListingError>;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Feed fetching settings
    pub fetcher: FetcherConfig,
    /// Delimiter convention of the feed
    pub line_format: LineFormat,
    /// Client state file path
    pub state_path: String,
    /// Rows per page
    pub page_size: usize,
    /// Destination of CSV exports started from the TUI
    pub export_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fetcher: FetcherConfig::default(),
            line_format: LineFormat::Auto,
            state_path: state::DEFAULT_STATE_FILE.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            export_path: "proxies.csv".to_string(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fetcher(mut self, fetcher: FetcherConfig) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn with_line_format(mut self, line_format: LineFormat) -> Self {
        self.line_format = line_format;
        self
    }

    pub fn with_state_path(mut self, state_path: String) -> Self {
        self.state_path = state_path;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_export_path(mut self, export_path: String) -> Self {
        self.export_path = export_path;
        self
    }

    /// Empty store wired with the configured parser and page size
    pub fn record_store(&self) -> RecordStore {
        RecordStore::new(LineParser::new(self.line_format)).with_page_size(self.page_size)
    }

    pub fn state_store(&self) -> state::StateStore {
        state::StateStore::new(&self.state_path)
    }
}

/// Fetch the feed and load it into a fresh store
pub async fn fetch_and_load(config: &Config) -> Result<(RecordStore, LoadReport, FetchOutcome)> {
    let mut store = config.record_store();
    let (report, outcome) = refetch(&mut store, &config.fetcher).await?;
    Ok((store, report, outcome))
}

/// Fetch the feed again into an existing store
///
/// Criteria and sort are kept. On any error the store is left as it was.
pub async fn refetch(
    store: &mut RecordStore,
    fetcher: &FetcherConfig,
) -> Result<(LoadReport, FetchOutcome)> {
    let outcome = FeedFetcher::with_config(fetcher.clone())?.fetch().await?;
    let report = store.load_text(&outcome.body)?;
    Ok((report, outcome))
}
