//! Persisted client state: favorites, search history, saved filter and theme

use crate::proxy::models::{FilterCriteria, SharedRecord, SortKey};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Number of search terms remembered
pub const MAX_SEARCH_HISTORY: usize = 10;

/// Default state file name
pub const DEFAULT_STATE_FILE: &str = "proxy-listing-state.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }
}

/// Filter and sort snapshot the user can restore later
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedFilter {
    #[serde(default)]
    pub criteria: FilterCriteria,
    #[serde(default)]
    pub sort: SortKey,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientState {
    /// `ip:port` keys
    #[serde(default)]
    pub favorites: BTreeSet<String>,
    /// Most recent first
    #[serde(default)]
    pub search_history: Vec<String>,
    #[serde(default)]
    pub saved_filter: Option<SavedFilter>,
    #[serde(default)]
    pub theme: Theme,
}

impl ClientState {
    pub fn is_favorite(&self, key: &str) -> bool {
        self.favorites.contains(key)
    }

    /// Flip a favorite; returns whether it is now a favorite
    pub fn toggle_favorite(&mut self, key: &str) -> bool {
        if self.favorites.remove(key) {
            false
        } else {
            self.favorites.insert(key.to_string());
            true
        }
    }

    /// Add several records; returns how many were new
    pub fn add_favorites(&mut self, records: &[SharedRecord]) -> usize {
        records
            .iter()
            .filter(|r| self.favorites.insert(r.favorite_key()))
            .count()
    }

    pub fn remove_favorite(&mut self, key: &str) -> bool {
        self.favorites.remove(key)
    }

    /// Favorites present in the loaded records, in favorites order
    pub fn favorite_records(&self, all: &[SharedRecord]) -> Vec<SharedRecord> {
        let by_key: HashMap<String, &SharedRecord> =
            all.iter().map(|r| (r.favorite_key(), r)).collect();

        self.favorites
            .iter()
            .filter_map(|key| by_key.get(key).map(|r| Arc::clone(r)))
            .collect()
    }

    /// Remember a search term; blank terms and repeats are ignored
    pub fn record_search(&mut self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        if term.is_empty() || self.search_history.contains(&term) {
            return false;
        }

        self.search_history.insert(0, term);
        self.search_history.truncate(MAX_SEARCH_HISTORY);
        true
    }

    pub fn remove_search(&mut self, index: usize) -> Option<String> {
        (index < self.search_history.len()).then(|| self.search_history.remove(index))
    }

    pub fn clear_history(&mut self) {
        self.search_history.clear();
    }

    pub fn save_filter(&mut self, criteria: FilterCriteria, sort: SortKey) {
        self.saved_filter = Some(SavedFilter { criteria, sort });
    }

    pub fn toggle_theme(&mut self) -> Theme {
        self.theme = self.theme.toggled();
        self.theme
    }
}

/// JSON file backing for `ClientState`
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the state; a missing or unreadable file yields the default state
    pub fn load(&self) -> ClientState {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return ClientState::default(),
            Err(e) => {
                log::warn!("Cannot read state file {}: {}", self.path.display(), e);
                return ClientState::default();
            }
        };

        serde_json::from_str(&content).unwrap_or_else(|e| {
            log::warn!("Ignoring corrupt state file {}: {}", self.path.display(), e);
            ClientState::default()
        })
    }

    pub fn save(&self, state: &ClientState) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(state)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::models::ProxyRecord;

    fn record(ip: &str, port: &str) -> SharedRecord {
        Arc::new(ProxyRecord::new(
            ip.to_string(),
            port.to_string(),
            "US".to_string(),
            "美国".to_string(),
            "Acme".to_string(),
        ))
    }

    #[test]
    fn test_toggle_favorite() {
        let mut state = ClientState::default();
        assert!(state.toggle_favorite("1.2.3.4:80"));
        assert!(state.is_favorite("1.2.3.4:80"));
        assert!(!state.toggle_favorite("1.2.3.4:80"));
        assert!(state.favorites.is_empty());
    }

    #[test]
    fn test_add_favorites_counts_new() {
        let mut state = ClientState::default();
        state.toggle_favorite("1.2.3.4:80");
        let added = state.add_favorites(&[record("1.2.3.4", "80"), record("5.6.7.8", "443")]);
        assert_eq!(added, 1);
        assert_eq!(state.favorites.len(), 2);
    }

    #[test]
    fn test_favorite_records_resolve_against_loaded_set() {
        let mut state = ClientState::default();
        state.toggle_favorite("5.6.7.8:443");
        state.toggle_favorite("9.9.9.9:53");

        let all = vec![record("1.2.3.4", "80"), record("5.6.7.8", "443")];
        let favorites = state.favorite_records(&all);
        assert_eq!(favorites.len(), 1);
        assert!(Arc::ptr_eq(&favorites[0], &all[1]));
        assert_eq!(state.favorites.len(), 2);
    }

    #[test]
    fn test_search_history() {
        let mut state = ClientState::default();
        assert!(state.record_search(" Acme "));
        assert!(!state.record_search("acme"));
        assert!(!state.record_search("   "));

        for i in 0..12 {
            state.record_search(&format!("term{}", i));
        }
        assert_eq!(state.search_history.len(), MAX_SEARCH_HISTORY);
        assert_eq!(state.search_history[0], "term11");
        assert!(!state.search_history.contains(&"acme".to_string()));

        assert_eq!(state.remove_search(0), Some("term11".to_string()));
        assert_eq!(state.remove_search(42), None);

        state.clear_history();
        assert!(state.search_history.is_empty());
    }

    #[test]
    fn test_theme_toggle() {
        let mut state = ClientState::default();
        assert_eq!(state.theme, Theme::Dark);
        assert_eq!(state.toggle_theme(), Theme::Light);
        assert_eq!(state.toggle_theme(), Theme::Dark);
    }

    #[test]
    fn test_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("nested").join("state.json"));
        assert_eq!(store.load(), ClientState::default());

        let mut state = ClientState::default();
        state.toggle_favorite("1.2.3.4:80");
        state.record_search("acme");
        state.save_filter(FilterCriteria::new().with_port("80"), SortKey::PortDesc);
        state.toggle_theme();
        store.save(&state).unwrap();

        assert_eq!(store.load(), state);
    }

    #[test]
    fn test_corrupt_state_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{ not json").unwrap();

        assert_eq!(StateStore::new(&path).load(), ClientState::default());
    }

    #[test]
    fn test_partial_state_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, r#"{"favorites": ["1.2.3.4:80"]}"#).unwrap();

        let state = StateStore::new(&path).load();
        assert!(state.is_favorite("1.2.3.4:80"));
        assert_eq!(state.theme, Theme::Dark);
        assert!(state.saved_filter.is_none());
    }
}
