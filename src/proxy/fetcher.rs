//! Feed fetcher for downloading the proxy list
//!
//! This module provides functionality for:
//! - Reading the feed from an HTTP(S) URL or a local file
//! - Retrying each source with exponential backoff
//! - Falling back to a secondary source when the primary is exhausted

use crate::error::{FetchError, ListingError};
use crate::Result;
use reqwest::Client;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Default timeout for a single fetch attempt in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Default user agent for HTTP requests
const DEFAULT_USER_AGENT: &str = concat!("proxy-listing/", env!("CARGO_PKG_VERSION"));

/// Default primary feed location
pub const DEFAULT_PRIMARY_SOURCE: &str = "Data/alive.txt";

/// Default fallback feed location
pub const DEFAULT_FALLBACK_SOURCE: &str =
    "https://raw.githubusercontent.com/GuoBing1989100/Proxy-IP/main/Data/alive.txt";

/// Where a feed is read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedSource {
    Url(String),
    File(PathBuf),
}

impl FeedSource {
    /// `http://` and `https://` locations are URLs, anything else is a path
    pub fn parse(location: &str) -> Self {
        let lower = location.to_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            FeedSource::Url(location.to_string())
        } else {
            FeedSource::File(PathBuf::from(location))
        }
    }
}

impl fmt::Display for FeedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedSource::Url(url) => write!(f, "{}", url),
            FeedSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Attempt count and backoff schedule for one source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per source, at least one
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub base_delay: Duration,
    /// Growth factor between consecutive delays
    pub multiplier: u32,
    /// Upper bound for any single delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            multiplier: 2,
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no waiting
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Delays to wait before each attempt, starting with zero
    pub fn schedule(&self) -> RetrySchedule {
        RetrySchedule {
            policy: *self,
            attempt: 0,
            next_delay: self.base_delay.min(self.max_delay),
        }
    }
}

/// Iterator over the wait before each attempt; ends when attempts run out
#[derive(Debug, Clone)]
pub struct RetrySchedule {
    policy: RetryPolicy,
    attempt: u32,
    next_delay: Duration,
}

impl Iterator for RetrySchedule {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.attempt >= self.policy.max_attempts.max(1) {
            return None;
        }

        self.attempt += 1;
        if self.attempt == 1 {
            return Some(Duration::ZERO);
        }

        let delay = self.next_delay;
        self.next_delay = delay
            .saturating_mul(self.policy.multiplier)
            .min(self.policy.max_delay);
        Some(delay)
    }
}

/// Configuration for the feed fetcher
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Source tried first
    pub primary: String,
    /// Source tried once the primary is exhausted
    pub fallback: Option<String>,
    /// Timeout for each attempt
    pub timeout: Duration,
    /// User agent for HTTP requests
    pub user_agent: String,
    /// Retry policy applied to each source
    pub retry: RetryPolicy,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            primary: DEFAULT_PRIMARY_SOURCE.to_string(),
            fallback: Some(DEFAULT_FALLBACK_SOURCE.to_string()),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

impl FetcherConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_primary(mut self, primary: String) -> Self {
        self.primary = primary;
        self
    }

    pub fn with_fallback(mut self, fallback: Option<String>) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Sources in the order they are tried
    pub fn sources(&self) -> Vec<FeedSource> {
        std::iter::once(self.primary.as_str())
            .chain(self.fallback.as_deref())
            .filter(|s| !s.trim().is_empty())
            .map(FeedSource::parse)
            .collect()
    }
}

/// Body of a successful fetch and where it came from
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub source: FeedSource,
    pub body: String,
    /// Attempts made across all sources, the successful one included
    pub attempts: usize,
}

/// Sequential fetcher over the configured sources
pub struct FeedFetcher {
    config: FetcherConfig,
    client: Client,
}

impl FeedFetcher {
    /// Create a new fetcher with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(FetcherConfig::default())
    }

    /// Create a new fetcher with custom configuration
    pub fn with_config(config: FetcherConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    /// Fetch the feed, trying the primary then the fallback source
    pub async fn fetch(&self) -> Result<FetchOutcome> {
        let mut attempts = 0;
        let mut last_error = None;

        for source in self.config.sources() {
            for delay in self.config.retry.schedule() {
                if !delay.is_zero() {
                    log::debug!("Waiting {:?} before retrying {}", delay, source);
                    tokio::time::sleep(delay).await;
                }

                attempts += 1;
                match self.fetch_source(&source).await {
                    Ok(body) => {
                        log::info!("Fetched {} bytes from {}", body.len(), source);
                        return Ok(FetchOutcome {
                            source,
                            body,
                            attempts,
                        });
                    }
                    Err(e) => {
                        log::warn!("Fetch attempt {} failed: {}", attempts, e);
                        last_error = Some(e);
                    }
                }
            }
            log::warn!("Giving up on {}", source);
        }

        Err(ListingError::SourcesExhausted {
            attempts,
            last: last_error.unwrap_or(FetchError::NoSource),
        })
    }

    /// Single attempt against one source
    pub async fn fetch_source(&self, source: &FeedSource) -> std::result::Result<String, FetchError> {
        match source {
            FeedSource::Url(url) => self.fetch_url(url).await,
            FeedSource::File(path) => {
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|e| FetchError::Io {
                        path: path.clone(),
                        source: e,
                    })
            }
        }
    }

    async fn fetch_url(&self, url: &str) -> std::result::Result<String, FetchError> {
        match tokio::time::timeout(self.config.timeout, self.get_text(url)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout {
                url: url.to_string(),
                timeout: self.config.timeout,
            }),
        }
    }

    async fn get_text(&self, url: &str) -> std::result::Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.transport_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| self.transport_error(url, e))
    }

    fn transport_error(&self, url: &str, error: reqwest::Error) -> FetchError {
        if error.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
                timeout: self.config.timeout,
            }
        } else {
            FetchError::Network {
                url: url.to_string(),
                message: error.to_string(),
            }
        }
    }
}
