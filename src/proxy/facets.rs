//! Distinct filter values derived from the loaded records

use crate::proxy::models::{FilterCriteria, SharedRecord, Stats};
use crate::proxy::query::locale_cmp;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

/// Popular ports offered as one-step filters
pub const QUICK_PORTS: [&str; 5] = ["80", "443", "8080", "3128", "1080"];

/// Popular countries offered as one-step filters
pub const QUICK_COUNTRIES: [&str; 5] = ["美国", "日本", "新加坡", "香港", "德国"];

/// Shortcut that pins the port or the country criterion to a popular value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickFilter {
    Port(&'static str),
    Country(&'static str),
}

impl QuickFilter {
    pub fn value(&self) -> &'static str {
        match self {
            QuickFilter::Port(v) | QuickFilter::Country(v) => v,
        }
    }

    /// True when `criteria` already pins this value
    pub fn is_active(&self, criteria: &FilterCriteria) -> bool {
        match self {
            QuickFilter::Port(v) => criteria.port_value() == Some(*v),
            QuickFilter::Country(v) => criteria.country_value() == Some(*v),
        }
    }

    /// Set this filter's field, or clear it when already active
    pub fn toggle(&self, criteria: &FilterCriteria) -> FilterCriteria {
        let value = (!self.is_active(criteria)).then(|| self.value().to_string());
        let mut next = criteria.clone();
        match self {
            QuickFilter::Port(_) => next.port = value,
            QuickFilter::Country(_) => next.country = value,
        }
        next
    }
}

impl fmt::Display for QuickFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuickFilter::Port(v) => write!(f, ":{}", v),
            QuickFilter::Country(v) => write!(f, "{}", v),
        }
    }
}

/// Popular filters whose value occurs in the facets, ports first
pub fn quick_filters(facets: &Facets) -> Vec<QuickFilter> {
    let ports = QUICK_PORTS
        .into_iter()
        .filter(|p| facets.ports.iter().any(|v| v == p))
        .map(QuickFilter::Port);
    let countries = QUICK_COUNTRIES
        .into_iter()
        .filter(|c| facets.countries.iter().any(|v| v == c))
        .map(QuickFilter::Country);

    ports.chain(countries).collect()
}

/// Distinct values per filterable field, each sorted for display
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Facets {
    pub countries: Vec<String>,
    pub ports: Vec<String>,
    pub companies: Vec<String>,
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let set: HashSet<&str> = values.collect();
    set.into_iter().map(str::to_string).collect()
}

fn numeric_cmp(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Build the country, port and company value lists
pub fn extract_facets(records: &[SharedRecord]) -> Facets {
    let mut countries = distinct(records.iter().map(|r| r.country_label()));
    let mut ports = distinct(records.iter().map(|r| r.port.as_str()));
    let mut companies = distinct(records.iter().map(|r| r.company.as_str()));

    countries.sort_by(|a, b| locale_cmp(a, b));
    ports.sort_by(|a, b| numeric_cmp(a, b));
    companies.sort_by(|a, b| locale_cmp(a, b));

    Facets {
        countries,
        ports,
        companies,
    }
}

/// Totals for the full set and the active set
pub fn compute_stats(all: &[SharedRecord], active: &[SharedRecord]) -> Stats {
    let countries: HashSet<&str> = all.iter().map(|r| r.country_code.as_str()).collect();
    let ports: HashSet<&str> = all.iter().map(|r| r.port.as_str()).collect();

    Stats {
        total: all.len(),
        filtered: active.len(),
        countries: countries.len(),
        ports: ports.len(),
    }
}
