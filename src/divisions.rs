//! Division ordering without hand-maintained configuration.
//!
//! Division labels vary by association and state ("CH A", "Junior",
//! "Sr. B"). Each label is scored into an age-band range so the natural
//! order (Child < Youth < Junior < Senior) falls out, with letter
//! variants ordered within a band. Resolved orders are cached per state
//! so one meet's detection serves the whole season.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, warn};

use crate::error::Result;

/// Division label to 1-based sort position, as cached per state.
pub type DivisionOrder = BTreeMap<String, i64>;

static TRAILING_LETTER: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.\s]([A-D])$").unwrap());
static CHILD_ABBREV: Lazy<Regex> = Lazy::new(|| Regex::new(r"^CH\b").unwrap());
static JUNIOR_ABBREV: Lazy<Regex> = Lazy::new(|| Regex::new(r"^JR\.?\b").unwrap());
static SENIOR_ABBREV: Lazy<Regex> = Lazy::new(|| Regex::new(r"^SR\.?\b").unwrap());

/// Score a division label for sorting.
///
/// Bands: Child 100, Youth 200, Junior 300, Senior 400, unknown 500.
/// A trailing letter A-D adds 1-4. Without a letter, a bare
/// abbreviation ("SR") sorts before the lettered variants and a full
/// word ("Senior") sorts after them.
pub fn score_division(label: &str) -> i64 {
    let upper = label.trim().to_uppercase();

    let letter_offset = TRAILING_LETTER
        .captures(&upper)
        .map(|caps| i64::from(caps[1].as_bytes()[0] - b'A') + 1)
        .unwrap_or(0);

    let base = if upper.starts_with("CHILD") || CHILD_ABBREV.is_match(&upper) {
        100
    } else if upper.starts_with("YOUTH") {
        200
    } else if upper.starts_with("JUNIOR") || JUNIOR_ABBREV.is_match(&upper) {
        300
    } else if upper.starts_with("SENIOR") || SENIOR_ABBREV.is_match(&upper) {
        400
    } else {
        return 500;
    };

    if letter_offset == 0 {
        if upper.chars().count() > 3 {
            base + 5
        } else {
            base
        }
    } else {
        base + letter_offset
    }
}

/// Order distinct division labels by score and assign sequential
/// positions from 1. The sort is stable, so labels with equal scores
/// keep their input order.
pub fn detect_division_order(divisions: &[String]) -> DivisionOrder {
    let mut scored: Vec<&String> = divisions.iter().filter(|d| !d.is_empty()).collect();
    scored.sort_by_key(|d| score_division(d));

    let mut order = DivisionOrder::new();
    let mut position = 1;
    for division in scored {
        if !order.contains_key(division.as_str()) {
            order.insert(division.clone(), position);
            position += 1;
        }
    }
    order
}

/// Persistence seam for resolved orders, keyed by state name.
pub trait DivisionOrderStore {
    fn load(&self, state: &str) -> Result<Option<DivisionOrder>>;
    fn save(&self, state: &str, order: &DivisionOrder) -> Result<()>;
}

/// Stores all states' orders in one JSON document:
/// `{"Iowa": {"CH A": 1, ...}, "Utah": {...}}`.
pub struct JsonDivisionStore {
    path: PathBuf,
}

impl JsonDivisionStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Cache document next to the given database file, so meets sharing
    /// a database share one cache.
    pub fn beside_database(db_path: &Path) -> Self {
        let dir = db_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::new(dir.join("state_divisions.json"))
    }

    fn read_all(&self) -> Result<BTreeMap<String, DivisionOrder>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let raw = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

impl DivisionOrderStore for JsonDivisionStore {
    fn load(&self, state: &str) -> Result<Option<DivisionOrder>> {
        let mut all = self.read_all()?;
        Ok(all.remove(state))
    }

    fn save(&self, state: &str, order: &DivisionOrder) -> Result<()> {
        let mut all = self.read_all()?;
        all.insert(state.to_string(), order.clone());
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(&all)?)?;
        Ok(())
    }
}

/// Resolves the division order for a state, preferring the cached order
/// when one exists.
pub struct DivisionOrderResolver {
    store: Box<dyn DivisionOrderStore>,
    refresh: bool,
}

impl DivisionOrderResolver {
    pub fn new(store: Box<dyn DivisionOrderStore>) -> Self {
        Self {
            store,
            refresh: false,
        }
    }

    /// Force recomputation even when a cached order exists.
    pub fn with_refresh(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }

    /// Return the order for `state`, detecting and caching it from
    /// `divisions` on a cache miss. A cached order is used as-is even
    /// when the current meet has labels it does not cover.
    pub fn resolve(&self, state: &str, divisions: &[String]) -> Result<DivisionOrder> {
        if !self.refresh {
            if let Some(cached) = self.store.load(state)? {
                let missing = divisions
                    .iter()
                    .filter(|d| !d.is_empty() && !cached.contains_key(d.as_str()))
                    .count();
                if missing > 0 {
                    warn!(
                        "Divisions: cached order for {state} is missing {missing} label(s) from this meet; rerun with --refresh-divisions to recompute"
                    );
                }
                info!(
                    "Divisions: using cached order for {state} with {} labels",
                    cached.len()
                );
                return Ok(cached);
            }
        }

        let order = detect_division_order(divisions);
        self.store.save(state, &order)?;
        info!(
            "Divisions: detected order for {state} with {} labels",
            order.len()
        );
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn ordered(order: &DivisionOrder) -> Vec<&str> {
        let mut entries: Vec<(&String, &i64)> = order.iter().collect();
        entries.sort_by_key(|(_, pos)| **pos);
        entries.into_iter().map(|(name, _)| name.as_str()).collect()
    }

    #[test]
    fn test_score_bands_and_letters() {
        assert_eq!(score_division("CH B"), 102);
        assert_eq!(score_division("Child A"), 101);
        assert_eq!(score_division("Youth"), 205);
        assert_eq!(score_division("JR."), 300);
        assert_eq!(score_division("Junior"), 305);
        assert_eq!(score_division("SR"), 400);
        assert_eq!(score_division("Sr. A"), 401);
        assert_eq!(score_division("Senior"), 405);
        assert_eq!(score_division("Diamond"), 500);
        // letters on unknown labels do not change the score
        assert_eq!(score_division("Diamond A"), 500);
    }

    #[test]
    fn test_abbreviation_lettered_full_ordering_within_a_band() {
        let order = detect_division_order(&labels(&["Senior", "SR B", "SR", "SR A"]));
        assert_eq!(ordered(&order), vec!["SR", "SR A", "SR B", "Senior"]);
    }

    #[test]
    fn test_mixed_label_ordering() {
        let order = detect_division_order(&labels(&["SR", "SR A", "Senior", "CH B", "Junior"]));
        assert_eq!(
            ordered(&order),
            vec!["CH B", "Junior", "SR", "SR A", "Senior"]
        );
        assert_eq!(order.get("CH B"), Some(&1));
        assert_eq!(order.get("Senior"), Some(&5));
    }

    #[test]
    fn test_unknown_labels_sort_last_in_input_order() {
        let order = detect_division_order(&labels(&["Ruby", "Child", "Diamond"]));
        assert_eq!(ordered(&order), vec!["Child", "Ruby", "Diamond"]);
    }

    #[test]
    fn test_empty_labels_are_skipped() {
        let order = detect_division_order(&labels(&["", "Junior"]));
        assert_eq!(order.len(), 1);
        assert_eq!(order.get("Junior"), Some(&1));
    }

    #[test]
    fn test_cache_hit_short_circuits_detection() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state_divisions.json");
        std::fs::write(&path, r#"{"Iowa": {"Gold": 1, "Silver": 2}}"#).unwrap();

        let resolver = DivisionOrderResolver::new(Box::new(JsonDivisionStore::new(path)));
        let order = resolver
            .resolve("Iowa", &labels(&["Junior", "Senior"]))
            .unwrap();
        assert_eq!(order.get("Gold"), Some(&1));
        assert!(!order.contains_key("Junior"));
    }

    #[test]
    fn test_cache_miss_detects_and_preserves_other_states() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state_divisions.json");
        std::fs::write(&path, r#"{"Iowa": {"Gold": 1}}"#).unwrap();

        let resolver =
            DivisionOrderResolver::new(Box::new(JsonDivisionStore::new(path.clone())));
        let order = resolver.resolve("Utah", &labels(&["Senior", "Junior"])).unwrap();
        assert_eq!(order.get("Junior"), Some(&1));
        assert_eq!(order.get("Senior"), Some(&2));

        let raw = std::fs::read_to_string(&path).unwrap();
        let all: BTreeMap<String, DivisionOrder> = serde_json::from_str(&raw).unwrap();
        assert!(all.contains_key("Iowa"));
        assert!(all.contains_key("Utah"));
    }

    #[test]
    fn test_refresh_overrides_cached_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state_divisions.json");
        std::fs::write(&path, r#"{"Iowa": {"Gold": 1}}"#).unwrap();

        let resolver = DivisionOrderResolver::new(Box::new(JsonDivisionStore::new(path.clone())))
            .with_refresh(true);
        let order = resolver.resolve("Iowa", &labels(&["Junior"])).unwrap();
        assert_eq!(order.get("Junior"), Some(&1));
        assert!(!order.contains_key("Gold"));

        let store = JsonDivisionStore::new(path);
        let reloaded = store.load("Iowa").unwrap().unwrap();
        assert!(reloaded.contains_key("Junior"));
    }
}
