//! Filtering and sorting of proxy records

use crate::proxy::models::{FilterCriteria, ProxyRecord, SharedRecord, SortKey};
use std::cmp::Ordering;
use std::sync::Arc;

/// Case-folded comparison with a raw tie-break, giving a total order
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Numeric port comparison; non-numeric ports always come after numeric ones
fn port_cmp(a: &ProxyRecord, b: &ProxyRecord, descending: bool) -> Ordering {
    match (a.port_number(), b.port_number()) {
        (Some(x), Some(y)) if descending => y.cmp(&x),
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Check a record against every provided criterion
pub fn matches(record: &ProxyRecord, criteria: &FilterCriteria) -> bool {
    if let Some(term) = criteria.search_term() {
        let hit = record.ip.to_lowercase().contains(&term)
            || record.country_name.to_lowercase().contains(&term)
            || record.company.to_lowercase().contains(&term)
            || record.port.contains(&term);
        if !hit {
            return false;
        }
    }

    if let Some(country) = criteria.country_value() {
        if record.country_label() != country {
            return false;
        }
    }

    if let Some(port) = criteria.port_value() {
        if record.port != port {
            return false;
        }
    }

    if let Some(company) = criteria.company_value() {
        if record.company != company {
            return false;
        }
    }

    true
}

/// Subset of `all` matching the criteria, in input order
pub fn filter_records(all: &[SharedRecord], criteria: &FilterCriteria) -> Vec<SharedRecord> {
    if criteria.is_empty() {
        return all.to_vec();
    }

    all.iter()
        .filter(|record| matches(record, criteria))
        .map(Arc::clone)
        .collect()
}

/// Stable in-place sort by the given key
pub fn sort_records(records: &mut [SharedRecord], sort: SortKey) {
    match sort {
        SortKey::Default => {}
        SortKey::IpAsc => records.sort_by(|a, b| locale_cmp(&a.ip, &b.ip)),
        SortKey::IpDesc => records.sort_by(|a, b| locale_cmp(&b.ip, &a.ip)),
        SortKey::PortAsc => records.sort_by(|a, b| port_cmp(a, b, false)),
        SortKey::PortDesc => records.sort_by(|a, b| port_cmp(a, b, true)),
        SortKey::CountryAsc => {
            records.sort_by(|a, b| locale_cmp(&a.country_name, &b.country_name))
        }
        SortKey::CountryDesc => {
            records.sort_by(|a, b| locale_cmp(&b.country_name, &a.country_name))
        }
    }
}

/// Filter then sort, producing a new active set
pub fn query(all: &[SharedRecord], criteria: &FilterCriteria, sort: SortKey) -> Vec<SharedRecord> {
    let mut active = filter_records(all, criteria);
    sort_records(&mut active, sort);
    active
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::parser::LineParser;

    fn records(lines: &[&str]) -> Vec<SharedRecord> {
        let parser = LineParser::default();
        lines
            .iter()
            .map(|line| Arc::new(parser.parse_line(line).unwrap()))
            .collect()
    }

    fn ports(records: &[SharedRecord]) -> Vec<&str> {
        records.iter().map(|r| r.port.as_str()).collect()
    }

    fn sample() -> Vec<SharedRecord> {
        records(&[
            "10.0.0.3,8080,US,Acme",
            "10.0.0.1,80,JP,Beta",
            "10.0.0.2,3128,DE,Gamma",
            "10.0.0.4,443,US,Beta",
            "10.0.0.5,18,SG,Delta",
        ])
    }

    #[test]
    fn test_no_criteria_returns_all_in_order() {
        let all = sample();
        let active = query(&all, &FilterCriteria::default(), SortKey::Default);
        assert_eq!(active, all);
    }

    #[test]
    fn test_results_share_records() {
        let all = sample();
        let active = query(&all, &FilterCriteria::new().with_port("80"), SortKey::Default);
        assert!(Arc::ptr_eq(&active[0], &all[1]));
    }

    #[test]
    fn test_port_filter_is_exact() {
        let all = records(&["1.2.3.4,80,US,Acme", "5.6.7.8,443,JP,Beta"]);
        let active = query(&all, &FilterCriteria::new().with_port("80"), SortKey::Default);
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].ip, "1.2.3.4");
    }

    #[test]
    fn test_search_matches_port_substring() {
        let all = records(&["1.2.3.4,80,US,Acme", "5.6.7.9,443,JP,Beta"]);
        let active = query(&all, &FilterCriteria::new().with_search("8"), SortKey::Default);
        assert_eq!(ports(&active), vec!["80"]);

        let all = records(&["1.2.3.4,80,US,Acme", "5.6.7.9,18,JP,Beta"]);
        let active = query(&all, &FilterCriteria::new().with_search("8"), SortKey::Default);
        assert_eq!(ports(&active), vec!["80", "18"]);
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let all = sample();
        let active = query(&all, &FilterCriteria::new().with_search("bEtA"), SortKey::Default);
        assert_eq!(ports(&active), vec!["80", "443"]);

        let active = query(&all, &FilterCriteria::new().with_search("德国"), SortKey::Default);
        assert_eq!(ports(&active), vec!["3128"]);
    }

    #[test]
    fn test_field_filters_are_case_sensitive() {
        let all = sample();
        let active = query(&all, &FilterCriteria::new().with_company("beta"), SortKey::Default);
        assert!(active.is_empty());

        let active = query(&all, &FilterCriteria::new().with_country("美国"), SortKey::Default);
        assert_eq!(ports(&active), vec!["8080", "443"]);
    }

    #[test]
    fn test_unknown_country_is_filterable() {
        let all = records(&["1.1.1.1,80", "2.2.2.2,81,US,Acme"]);
        let criteria = FilterCriteria::new().with_country(crate::proxy::models::UNKNOWN);
        let active = query(&all, &criteria, SortKey::Default);
        assert_eq!(ports(&active), vec!["80"]);
    }

    #[test]
    fn test_criteria_narrow_monotonically() {
        let all = sample();
        let steps = [
            FilterCriteria::new(),
            FilterCriteria::new().with_search("10.0"),
            FilterCriteria::new().with_search("10.0").with_company("Beta"),
            FilterCriteria::new()
                .with_search("10.0")
                .with_company("Beta")
                .with_country("美国"),
            FilterCriteria::new()
                .with_search("10.0")
                .with_company("Beta")
                .with_country("美国")
                .with_port("80"),
        ];

        let mut previous = all.len();
        for criteria in &steps {
            let len = query(&all, criteria, SortKey::Default).len();
            assert!(len <= previous);
            previous = len;
        }
        assert_eq!(previous, 0);
    }

    #[test]
    fn test_port_sort_is_numeric() {
        let all = sample();
        let active = query(&all, &FilterCriteria::default(), SortKey::PortAsc);
        assert_eq!(ports(&active), vec!["18", "80", "443", "3128", "8080"]);

        let active = query(&all, &FilterCriteria::default(), SortKey::PortDesc);
        assert_eq!(ports(&active), vec!["8080", "3128", "443", "80", "18"]);
    }

    #[test]
    fn test_non_numeric_ports_sort_last() {
        let all = records(&[
            "1.1.1.1,http,US,A",
            "2.2.2.2,80,US,B",
            "3.3.3.3,socks,US,C",
            "4.4.4.4,8080,US,D",
        ]);
        let asc = query(&all, &FilterCriteria::default(), SortKey::PortAsc);
        assert_eq!(ports(&asc), vec!["80", "8080", "http", "socks"]);

        let desc = query(&all, &FilterCriteria::default(), SortKey::PortDesc);
        assert_eq!(ports(&desc), vec!["8080", "80", "http", "socks"]);
    }

    #[test]
    fn test_sort_is_stable() {
        let all = sample();
        let active = query(&all, &FilterCriteria::default(), SortKey::CountryAsc);
        let us: Vec<&str> = active
            .iter()
            .filter(|r| r.country_code == "US")
            .map(|r| r.ip.as_str())
            .collect();
        assert_eq!(us, vec!["10.0.0.3", "10.0.0.4"]);
    }

    #[test]
    fn test_ip_sort() {
        let all = sample();
        let asc = query(&all, &FilterCriteria::default(), SortKey::IpAsc);
        assert_eq!(asc[0].ip, "10.0.0.1");
        assert_eq!(asc[4].ip, "10.0.0.5");

        let desc = query(&all, &FilterCriteria::default(), SortKey::IpDesc);
        assert_eq!(desc[0].ip, "10.0.0.5");
    }

    #[test]
    fn test_sort_is_idempotent() {
        let all = sample();
        for key in SortKey::ALL {
            let once = query(&all, &FilterCriteria::default(), key);
            let mut twice = once.clone();
            sort_records(&mut twice, key);
            assert_eq!(once, twice, "sort {} not idempotent", key);
        }
    }

    #[test]
    fn test_locale_cmp() {
        assert_eq!(locale_cmp("acme", "Beta"), Ordering::Less);
        assert_eq!(locale_cmp("Acme", "acme"), Ordering::Less);
        assert_eq!(locale_cmp("same", "same"), Ordering::Equal);
    }
}
