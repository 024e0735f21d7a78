//! Proxy listing pipeline
//!
//! This module provides functionality for:
//! - Parsing feed lines in comma or hash convention
//! - Holding the loaded set and the filtered, sorted active view
//! - Extracting filter facets, paginating and exporting records
//! - Fetching the feed with retries and looking up IP locations

pub mod country;
pub mod export;
pub mod facets;
pub mod fetcher;
pub mod geo;
pub mod models;
pub mod paginate;
pub mod parser;
pub mod query;
pub mod selection;
pub mod store;

pub use export::{save_csv, to_csv, to_plain_list};
pub use facets::{extract_facets, quick_filters, Facets, QuickFilter};
pub use fetcher::{FeedFetcher, FeedSource, FetchOutcome, FetcherConfig, RetryPolicy};
pub use geo::{GeoLocation, IpLookup};
pub use models::{
    favorite_key, FilterCriteria, Page, PageItem, ProxyRecord, SharedRecord, SortKey, Stats,
    UNKNOWN,
};
pub use paginate::{paginate, DEFAULT_PAGE_SIZE, PAGE_SIZES};
pub use parser::{LineFormat, LineParser, ParseFailure};
pub use query::query;
pub use selection::Selection;
pub use store::{load_lines, LoadReport, RecordStore};
