//! Row selection keyed by position in the active set

use crate::proxy::export;
use crate::proxy::models::{Page, SharedRecord};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Selected rows, stored as global indices into the active set
///
/// Indices stay valid across page changes but not across a new query,
/// so owners clear the selection whenever the active set is recomputed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    indices: BTreeSet<usize>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip one row; returns whether it is now selected
    pub fn toggle(&mut self, index: usize) -> bool {
        if self.indices.remove(&index) {
            false
        } else {
            self.indices.insert(index);
            true
        }
    }

    pub fn contains(&self, index: usize) -> bool {
        self.indices.contains(&index)
    }

    pub fn select_all(&mut self, len: usize) {
        self.indices.extend(0..len);
    }

    pub fn select_page(&mut self, page: &Page) {
        self.indices.extend(page.items.iter().map(|item| item.index));
    }

    /// True when every row of the page is selected
    pub fn covers_page(&self, page: &Page) -> bool {
        !page.is_empty() && page.items.iter().all(|item| self.contains(item.index))
    }

    pub fn clear(&mut self) {
        self.indices.clear();
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Selected records in active-set order; stale indices are skipped
    pub fn records(&self, active: &[SharedRecord]) -> Vec<SharedRecord> {
        self.indices
            .iter()
            .filter_map(|&index| active.get(index))
            .map(Arc::clone)
            .collect()
    }

    /// `ip:port` lines for the selected records
    pub fn copy_text(&self, active: &[SharedRecord]) -> String {
        export::to_plain_list(&self.records(active))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::models::ProxyRecord;
    use crate::proxy::paginate::paginate;

    fn active(n: usize) -> Vec<SharedRecord> {
        (0..n)
            .map(|i| {
                Arc::new(ProxyRecord::new(
                    format!("10.0.0.{}", i),
                    "80".to_string(),
                    "US".to_string(),
                    "美国".to_string(),
                    String::new(),
                ))
            })
            .collect()
    }

    #[test]
    fn test_toggle() {
        let mut selection = Selection::new();
        assert!(selection.toggle(3));
        assert!(selection.contains(3));
        assert!(!selection.toggle(3));
        assert!(selection.is_empty());
    }

    #[test]
    fn test_selection_survives_page_changes() {
        let records = active(10);
        let mut selection = Selection::new();

        let page_two = paginate(&records, 2, 4);
        selection.toggle(page_two.items[1].index);

        let page_one = paginate(&records, 1, 4);
        assert!(page_one.items.iter().all(|item| !selection.contains(item.index)));

        let again = paginate(&records, 2, 4);
        assert!(selection.contains(again.items[1].index));
        assert_eq!(selection.records(&records)[0].ip, "10.0.0.5");
    }

    #[test]
    fn test_select_page_and_all() {
        let records = active(10);
        let mut selection = Selection::new();

        let page = paginate(&records, 3, 4);
        selection.select_page(&page);
        assert_eq!(selection.len(), 2);
        assert!(selection.covers_page(&page));
        assert!(!selection.covers_page(&paginate(&records, 1, 4)));

        selection.select_all(records.len());
        assert_eq!(selection.len(), 10);

        selection.clear();
        assert!(selection.is_empty());
    }

    #[test]
    fn test_copy_text_skips_stale_indices() {
        let records = active(3);
        let mut selection = Selection::new();
        selection.toggle(2);
        selection.toggle(0);
        selection.toggle(7);

        assert_eq!(selection.copy_text(&records), "10.0.0.0:80\n10.0.0.2:80");
    }
}
