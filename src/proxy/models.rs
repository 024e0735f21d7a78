//! Proxy listing data models

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Placeholder shown for a missing company or country
pub const UNKNOWN: &str = "未知";

/// Proxy record shared between the full set, the active set and pages
pub type SharedRecord = Arc<ProxyRecord>;

/// A single parsed proxy entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyRecord {
    pub ip: String,
    pub port: String,
    pub country_code: String,
    pub country_name: String,
    pub company: String,
}

impl ProxyRecord {
    /// Create a record, filling the company placeholder when it is empty
    pub fn new(
        ip: String,
        port: String,
        country_code: String,
        country_name: String,
        company: String,
    ) -> Self {
        let company = if company.is_empty() {
            UNKNOWN.to_string()
        } else {
            company
        };

        Self {
            ip,
            port,
            country_code,
            country_name,
            company,
        }
    }

    /// Key identifying this proxy in the favorites set
    pub fn favorite_key(&self) -> String {
        favorite_key(&self.ip, &self.port)
    }

    /// Numeric port value, `None` when the port is not a number
    pub fn port_number(&self) -> Option<u64> {
        self.port.parse().ok()
    }

    /// Country name, or the unknown placeholder when the feed had no country
    pub fn country_label(&self) -> &str {
        if self.country_name.is_empty() {
            UNKNOWN
        } else {
            &self.country_name
        }
    }
}

impl fmt::Display for ProxyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}

/// Build the `ip:port` favorites key
pub fn favorite_key(ip: &str, port: &str) -> String {
    format!("{}:{}", ip, port)
}

/// Filter constraints; `None` or an empty string means unconstrained
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
}

impl FilterCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(mut self, text: impl Into<String>) -> Self {
        self.search_text = Some(text.into());
        self
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    pub fn with_port(mut self, port: impl Into<String>) -> Self {
        self.port = Some(port.into());
        self
    }

    pub fn with_company(mut self, company: impl Into<String>) -> Self {
        self.company = Some(company.into());
        self
    }

    /// Search text trimmed and lowercased, if any
    pub fn search_term(&self) -> Option<String> {
        non_empty(&self.search_text).map(str::to_lowercase)
    }

    pub fn country_value(&self) -> Option<&str> {
        non_empty(&self.country)
    }

    pub fn port_value(&self) -> Option<&str> {
        non_empty(&self.port)
    }

    pub fn company_value(&self) -> Option<&str> {
        non_empty(&self.company)
    }

    /// True when no field constrains the result
    pub fn is_empty(&self) -> bool {
        self.search_term().is_none()
            && self.country_value().is_none()
            && self.port_value().is_none()
            && self.company_value().is_none()
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Sort order applied to the active set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SortKey {
    /// Feed order
    #[default]
    Default,
    IpAsc,
    IpDesc,
    PortAsc,
    PortDesc,
    CountryAsc,
    CountryDesc,
}

impl SortKey {
    pub const ALL: [SortKey; 7] = [
        SortKey::Default,
        SortKey::IpAsc,
        SortKey::IpDesc,
        SortKey::PortAsc,
        SortKey::PortDesc,
        SortKey::CountryAsc,
        SortKey::CountryDesc,
    ];

    /// The following key in cycling order, wrapping to `Default`
    pub fn next(self) -> Self {
        let pos = Self::ALL.iter().position(|k| *k == self).unwrap_or(0);
        Self::ALL[(pos + 1) % Self::ALL.len()]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Default => "default",
            SortKey::IpAsc => "ip-asc",
            SortKey::IpDesc => "ip-desc",
            SortKey::PortAsc => "port-asc",
            SortKey::PortDesc => "port-desc",
            SortKey::CountryAsc => "country-asc",
            SortKey::CountryDesc => "country-desc",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "Invalid sort key: {}. Use: default, ip-asc, ip-desc, port-asc, port-desc, country-asc, country-desc",
                    s
                )
            })
    }
}

/// A record in a page, tagged with its position in the active set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageItem {
    pub index: usize,
    pub record: SharedRecord,
}

/// Fixed-size window into the active set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub items: Vec<PageItem>,
    pub page_number: usize,
    pub page_size: usize,
    pub total_items: usize,
    pub total_pages: usize,
}

impl Page {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_prev(&self) -> bool {
        self.page_number > 1
    }

    pub fn has_next(&self) -> bool {
        self.page_number < self.total_pages
    }

    /// 1-based inclusive display range, `None` for an empty page
    pub fn range(&self) -> Option<(usize, usize)> {
        let first = self.items.first()?;
        let last = self.items.last()?;
        Some((first.index + 1, last.index + 1))
    }
}

/// Counters shown alongside the table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub total: usize,
    pub filtered: usize,
    pub countries: usize,
    pub ports: usize,
}
