//! Error types for loading, fetching and persisting proxy listings

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failure of a single fetch attempt against one feed source
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP status {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("network error reaching {url}: {message}")]
    Network { url: String, message: String },

    #[error("timed out after {timeout:?} fetching {url}")]
    Timeout { url: String, timeout: Duration },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no feed source configured")]
    NoSource,
}

impl FetchError {
    /// HTTP status code, when the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum ListingError {
    /// No line of the feed produced a record
    #[error("feed contains no valid proxy records ({failures} lines rejected)")]
    EmptyDataset { failures: usize },

    /// Primary and fallback sources both failed every attempt
    #[error("all feed sources failed after {attempts} attempts: {last}")]
    SourcesExhausted {
        attempts: usize,
        #[source]
        last: FetchError,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("state serialization error: {0}")]
    State(#[from] serde_json::Error),

    #[error("CSV export error: {0}")]
    Csv(#[from] csv::Error),
}

impl ListingError {
    /// True when the data was reachable but unusable, as opposed to unreachable
    pub fn is_bad_data(&self) -> bool {
        matches!(self, ListingError::EmptyDataset { .. })
    }
}

/// Failure of an IP geolocation lookup
#[derive(Error, Debug)]
pub enum LookupError {
    #[error("lookup request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("lookup service rejected query: {0}")]
    Api(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_status() {
        let err = FetchError::Status {
            url: "https://example.com/alive.txt".to_string(),
            status: 404,
        };
        assert_eq!(err.status(), Some(404));
        assert!(err.to_string().contains("404"));

        let err = FetchError::Network {
            url: "https://example.com".to_string(),
            message: "connection refused".to_string(),
        };
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_listing_error_kinds() {
        let empty = ListingError::EmptyDataset { failures: 3 };
        assert!(empty.is_bad_data());
        assert!(empty.to_string().contains("3 lines rejected"));

        let exhausted = ListingError::SourcesExhausted {
            attempts: 6,
            last: FetchError::Status {
                url: "u".to_string(),
                status: 500,
            },
        };
        assert!(!exhausted.is_bad_data());
        assert!(exhausted.to_string().contains("500"));
    }
}
