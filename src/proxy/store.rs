//! Record store holding the loaded set, the active view and the page cursor

use crate::error::ListingError;
use crate::proxy::facets::{compute_stats, extract_facets, Facets};
use crate::proxy::models::{FilterCriteria, Page, SharedRecord, SortKey, Stats};
use crate::proxy::paginate::{clamp_page, paginate, total_pages, DEFAULT_PAGE_SIZE};
use crate::proxy::parser::LineParser;
use crate::proxy::query::query;
use crate::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Outcome of parsing a feed
#[derive(Debug, Clone)]
pub struct LoadReport {
    pub records: Vec<SharedRecord>,
    /// Lines that were rejected, blank ones included
    pub failures: usize,
}

/// Parse every line, keeping successes in input order
///
/// Fails with `EmptyDataset` only when no line yields a record.
pub fn load_lines<'a, I>(parser: &LineParser, lines: I) -> Result<LoadReport>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut records = Vec::new();
    let mut failures = 0;

    for line in lines {
        match parser.parse_line(line) {
            Ok(record) => records.push(Arc::new(record)),
            Err(_) => failures += 1,
        }
    }

    if records.is_empty() {
        return Err(ListingError::EmptyDataset { failures });
    }

    if failures > 0 {
        log::info!("Parsed {} records, skipped {} lines", records.len(), failures);
    } else {
        log::info!("Parsed {} records", records.len());
    }

    Ok(LoadReport { records, failures })
}

/// Owned pipeline state: full set, active set and pagination cursor
#[derive(Debug, Clone)]
pub struct RecordStore {
    parser: LineParser,
    all: Vec<SharedRecord>,
    active: Vec<SharedRecord>,
    facets: Facets,
    criteria: FilterCriteria,
    sort: SortKey,
    page: usize,
    page_size: usize,
    loaded_at: Option<DateTime<Utc>>,
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new(LineParser::default())
    }
}

impl RecordStore {
    pub fn new(parser: LineParser) -> Self {
        Self {
            parser,
            all: Vec::new(),
            active: Vec::new(),
            facets: Facets::default(),
            criteria: FilterCriteria::default(),
            sort: SortKey::Default,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            loaded_at: None,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Replace the record set; on error the previous state is kept
    pub fn load<'a, I>(&mut self, lines: I) -> Result<LoadReport>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let report = load_lines(&self.parser, lines)?;

        self.all = report.records.clone();
        self.facets = extract_facets(&self.all);
        self.loaded_at = Some(Utc::now());
        self.requery();

        Ok(report)
    }

    /// Load a whole feed body
    pub fn load_text(&mut self, text: &str) -> Result<LoadReport> {
        self.load(text.lines())
    }

    fn requery(&mut self) {
        self.active = query(&self.all, &self.criteria, self.sort);
        self.page = 1;
    }

    pub fn set_criteria(&mut self, criteria: FilterCriteria) {
        self.criteria = criteria;
        self.requery();
    }

    pub fn set_sort(&mut self, sort: SortKey) {
        self.sort = sort;
        self.requery();
    }

    /// Apply criteria and sort together with a single recomputation
    pub fn apply(&mut self, criteria: FilterCriteria, sort: SortKey) {
        self.criteria = criteria;
        self.sort = sort;
        self.requery();
    }

    /// Drop every criterion and return to feed order
    pub fn reset(&mut self) {
        self.apply(FilterCriteria::default(), SortKey::Default);
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size.max(1);
        self.page = 1;
    }

    pub fn total_pages(&self) -> usize {
        total_pages(self.active.len(), self.page_size)
    }

    /// Move to a page, clamped into the valid range
    pub fn go_to_page(&mut self, page: usize) {
        self.page = clamp_page(page, self.total_pages());
    }

    pub fn next_page(&mut self) {
        self.go_to_page(self.page + 1);
    }

    pub fn prev_page(&mut self) {
        self.go_to_page(self.page.saturating_sub(1));
    }

    pub fn first_page(&mut self) {
        self.go_to_page(1);
    }

    pub fn last_page(&mut self) {
        self.go_to_page(self.total_pages());
    }

    pub fn current_page(&self) -> Page {
        paginate(&self.active, self.page, self.page_size)
    }

    pub fn all(&self) -> &[SharedRecord] {
        &self.all
    }

    pub fn active(&self) -> &[SharedRecord] {
        &self.active
    }

    pub fn facets(&self) -> &Facets {
        &self.facets
    }

    pub fn stats(&self) -> Stats {
        compute_stats(&self.all, &self.active)
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn sort(&self) -> SortKey {
        self.sort
    }

    pub fn page_number(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.loaded_at
    }

    pub fn is_loaded(&self) -> bool {
        !self.all.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = "\
1.2.3.4,80,US,Acme
5.6.7.8,443,JP,Beta
";

    fn loaded(text: &str) -> RecordStore {
        let mut store = RecordStore::default();
        store.load_text(text).unwrap();
        store
    }

    fn numbered_feed(n: usize) -> String {
        (0..n)
            .map(|i| format!("10.0.{}.{},{},US,Acme", i / 250, i % 250, 1000 + i))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_scenario_two_records() {
        let store = loaded(FEED);
        assert_eq!(store.all().len(), 2);
        assert_eq!(store.all()[0].country_name, "美国");
        assert_eq!(store.facets().ports, vec!["80", "443"]);
        assert_eq!(store.active(), store.all());
        assert!(store.loaded_at().is_some());
    }

    #[test]
    fn test_failures_are_counted_not_raised() {
        let lines = [
            "1.2.3.4,80,US,Acme",
            "garbage",
            "",
            ",80,US,Acme",
            "5.6.7.8:443#JP#Beta",
            "# comment",
        ];
        let report = load_lines(&LineParser::default(), lines).unwrap();
        assert_eq!(report.records.len(), 2);
        assert_eq!(report.failures, 4);
        assert_eq!(report.records[0].ip, "1.2.3.4");
        assert_eq!(report.records[1].ip, "5.6.7.8");
    }

    #[test]
    fn test_all_malformed_is_empty_dataset() {
        let err = load_lines(&LineParser::default(), ["nope", "still nope"]).unwrap_err();
        assert!(matches!(err, ListingError::EmptyDataset { failures: 2 }));

        let err = load_lines(&LineParser::default(), std::iter::empty()).unwrap_err();
        assert!(matches!(err, ListingError::EmptyDataset { failures: 0 }));
    }

    #[test]
    fn test_failed_load_keeps_previous_state() {
        let mut store = loaded(FEED);
        assert!(store.load_text("junk\nmore junk").is_err());
        assert_eq!(store.all().len(), 2);
    }

    #[test]
    fn test_reload_replaces_records_and_keeps_criteria() {
        let mut store = loaded(FEED);
        store.set_criteria(FilterCriteria::new().with_port("80"));
        store.load_text("9.9.9.9,80,DE,Gamma\n8.8.8.8,53,US,Dns").unwrap();

        assert_eq!(store.all().len(), 2);
        assert_eq!(store.active().len(), 1);
        assert_eq!(store.active()[0].ip, "9.9.9.9");
        assert_eq!(store.facets().ports, vec!["53", "80"]);
    }

    #[test]
    fn test_criteria_and_sort_reset_page() {
        let mut store = loaded(&numbered_feed(120));
        store.go_to_page(3);
        assert_eq!(store.page_number(), 3);

        store.set_sort(SortKey::PortDesc);
        assert_eq!(store.page_number(), 1);
        assert_eq!(store.active()[0].port, "1119");

        store.go_to_page(2);
        store.set_criteria(FilterCriteria::new().with_search("10.0.0."));
        assert_eq!(store.page_number(), 1);
        assert_eq!(store.active().len(), 120);
    }

    #[test]
    fn test_page_size_change_resets_page() {
        let mut store = loaded(&numbered_feed(120));
        store.last_page();
        assert_eq!(store.page_number(), 3);

        store.set_page_size(20);
        assert_eq!(store.page_number(), 1);
        assert_eq!(store.total_pages(), 6);
        assert_eq!(store.current_page().items.len(), 20);
    }

    #[test]
    fn test_page_navigation_clamps() {
        let mut store = loaded(&numbered_feed(120));
        store.prev_page();
        assert_eq!(store.page_number(), 1);

        store.next_page();
        store.next_page();
        store.next_page();
        assert_eq!(store.page_number(), 3);

        let page = store.current_page();
        assert_eq!(page.items.len(), 20);
        assert_eq!(page.items[0].index, 100);

        store.first_page();
        assert_eq!(store.page_number(), 1);
    }

    #[test]
    fn test_empty_active_set_page() {
        let mut store = loaded(FEED);
        store.set_criteria(FilterCriteria::new().with_company("Nobody"));
        store.last_page();

        let page = store.current_page();
        assert_eq!(page.total_pages, 0);
        assert!(page.is_empty());
        assert_eq!(store.page_number(), 1);
    }

    #[test]
    fn test_reset() {
        let mut store = loaded(FEED);
        store.apply(FilterCriteria::new().with_country("日本"), SortKey::IpDesc);
        assert_eq!(store.active().len(), 1);

        store.reset();
        assert_eq!(store.active(), store.all());
        assert_eq!(store.sort(), SortKey::Default);
        assert!(store.criteria().is_empty());
    }

    #[test]
    fn test_stats() {
        let mut store = loaded(FEED);
        store.set_criteria(FilterCriteria::new().with_port("80"));
        let stats = store.stats();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.filtered, 1);
        assert_eq!(stats.countries, 2);
        assert_eq!(stats.ports, 2);
    }
}
