use std::cmp::Ordering;
use std::sync::Arc;

use serde::{Deserialize, Deserializer};
use tracing::{debug, info};

use crate::domain::{ExplorerError, FetchError};
use crate::fetcher::DatasetFetcher;

/// One selectable inventory as listed in the catalog document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CatalogEntry {
    #[serde(alias = "inventory_number", deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(alias = "item_count", alias = "itemCount")]
    pub item_count: u64,
    #[serde(alias = "filename", alias = "sourceRef")]
    pub source_ref: String,
}

impl CatalogEntry {
    pub fn new(id: impl Into<String>, item_count: u64, source_ref: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            item_count,
            source_ref: source_ref.into(),
        }
    }

    /// Text shown in the inventory list, e.g. `7 (1,120 items)`.
    pub fn label(&self) -> String {
        format!("{} ({} items)", self.id, format_count(self.item_count))
    }
}

// Inventory numbers show up as JSON strings or numbers depending on the generator.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Int(i64),
    Float(f64),
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s.trim().to_string(),
        RawId::Int(i) => i.to_string(),
        RawId::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
        RawId::Float(f) => f.to_string(),
    })
}

/// Formats a count with `,` thousands separators.
pub fn format_count(count: u64) -> String {
    let digits = count.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, chr) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(chr);
    }
    out
}

fn numeric_id(id: &str) -> Option<f64> {
    id.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Compares two ids the way a lookup should: trimmed text, or numeric value
/// when both sides are numbers.
pub fn ids_match(a: &str, b: &str) -> bool {
    let (a, b) = (a.trim(), b.trim());
    if a == b {
        return true;
    }
    match (numeric_id(a), numeric_id(b)) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

/// Sorts entries ascending by id. When every id is numeric the numeric value
/// decides, otherwise a case-insensitive comparison with the raw id as
/// tie-breaker. The sort is stable, so duplicates keep their source order.
pub fn sort_entries(entries: &mut [CatalogEntry]) {
    let all_numeric = entries.iter().all(|e| numeric_id(&e.id).is_some());
    if all_numeric {
        entries.sort_by(|a, b| {
            let (x, y) = (numeric_id(&a.id), numeric_id(&b.id));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        });
    } else {
        entries.sort_by(|a, b| {
            a.id.to_lowercase()
                .cmp(&b.id.to_lowercase())
                .then_with(|| a.id.cmp(&b.id))
        });
    }
}

/// Holds the catalog for the lifetime of the application. The entry list is
/// swapped as a whole, readers holding a snapshot never see a partial update.
#[derive(Debug, Default)]
pub struct CatalogStore {
    entries: Arc<Vec<CatalogEntry>>,
    loaded: bool,
}

impl CatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load<F>(&mut self, fetcher: &F, locator: &str) -> Result<&[CatalogEntry], FetchError>
    where
        F: DatasetFetcher + ?Sized,
    {
        let entries = fetcher.fetch_catalog(locator)?;
        self.replace(entries);
        Ok(self.entries())
    }

    /// Sorts and installs a freshly fetched entry list.
    pub fn replace(&mut self, mut entries: Vec<CatalogEntry>) {
        sort_entries(&mut entries);
        info!("Catalog holds {} inventories", entries.len());
        self.entries = Arc::new(entries);
        self.loaded = true;
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn snapshot(&self) -> Arc<Vec<CatalogEntry>> {
        Arc::clone(&self.entries)
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn find_by_id(&self, id: &str) -> Result<&CatalogEntry, ExplorerError> {
        let found = self.entries.iter().find(|e| ids_match(&e.id, id));
        debug!("Lookup of inventory {id}: {}", found.is_some());
        found.ok_or_else(|| ExplorerError::NotFound(id.to_string()))
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|e| ids_match(&e.id, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::RawRecord;
    use proptest::prelude::*;

    fn ids(store: &CatalogStore) -> Vec<&str> {
        store.entries().iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn numeric_ids_sort_by_value() {
        let mut store = CatalogStore::new();
        store.replace(vec![
            CatalogEntry::new("12", 5, "inv12.json"),
            CatalogEntry::new("9", 1, "inv9.json"),
            CatalogEntry::new("100", 3, "inv100.json"),
            CatalogEntry::new("7", 120, "inv7.json"),
        ]);
        assert_eq!(ids(&store), vec!["7", "9", "12", "100"]);
    }

    #[test]
    fn mixed_ids_fall_back_to_text_order() {
        let mut store = CatalogStore::new();
        store.replace(vec![
            CatalogEntry::new("b2", 1, "b2.json"),
            CatalogEntry::new("10", 1, "10.json"),
            CatalogEntry::new("A1", 1, "a1.json"),
            CatalogEntry::new("9", 1, "9.json"),
        ]);
        assert_eq!(ids(&store), vec!["10", "9", "A1", "b2"]);
    }

    #[test]
    fn lookup_matches_numeric_forms_and_first_duplicate_wins() {
        let mut store = CatalogStore::new();
        store.replace(vec![
            CatalogEntry::new("7", 120, "first.json"),
            CatalogEntry::new("7", 3, "second.json"),
        ]);
        assert_eq!(store.find_by_id(" 7.0").unwrap().source_ref, "first.json");
        assert!(matches!(
            store.find_by_id("8"),
            Err(ExplorerError::NotFound(id)) if id == "8"
        ));
    }

    #[test]
    fn label_uses_thousands_separators() {
        assert_eq!(CatalogEntry::new("7", 120, "x").label(), "7 (120 items)");
        assert_eq!(CatalogEntry::new("1053", 12345, "x").label(), "1053 (12,345 items)");
        assert_eq!(format_count(1_000_000), "1,000,000");
        assert_eq!(format_count(0), "0");
    }

    #[test]
    fn parses_generator_output() {
        let json = r#"[
            {"inventory_number": 1053, "item_count": 12, "filename": "1053.json"},
            {"inventory_number": "7A", "item_count": 3, "filename": "7A.json"},
            {"id": 12.0, "itemCount": 5, "sourceRef": "inv12.json"}
        ]"#;
        let entries: Vec<CatalogEntry> = serde_json::from_str(json).unwrap();
        assert_eq!(entries[0], CatalogEntry::new("1053", 12, "1053.json"));
        assert_eq!(entries[1].id, "7A");
        assert_eq!(entries[2], CatalogEntry::new("12", 5, "inv12.json"));
    }

    #[test]
    fn replace_swaps_whole_snapshot() {
        let mut store = CatalogStore::new();
        assert!(!store.is_loaded());
        store.replace(vec![CatalogEntry::new("1", 1, "1.json")]);
        let before = store.snapshot();
        store.replace(vec![
            CatalogEntry::new("2", 1, "2.json"),
            CatalogEntry::new("3", 1, "3.json"),
        ]);
        assert_eq!(before.len(), 1);
        assert_eq!(store.len(), 2);
        assert_eq!(store.position("3"), Some(1));
    }

    struct FixedCatalog(Result<Vec<CatalogEntry>, FetchError>);

    impl DatasetFetcher for FixedCatalog {
        fn fetch_catalog(&self, locator: &str) -> Result<Vec<CatalogEntry>, FetchError> {
            assert_eq!(locator, "inventory_index.json");
            self.0.clone()
        }

        fn fetch_dataset(&self, _source_ref: &str) -> Result<Vec<RawRecord>, FetchError> {
            Err(FetchError::HttpStatus(404))
        }
    }

    #[test]
    fn load_sorts_and_keeps_every_entry() {
        let fetcher = FixedCatalog(Ok(vec![
            CatalogEntry::new("12", 5, "inv12.json"),
            CatalogEntry::new("7", 120, "inv7.json"),
            CatalogEntry::new("1053", 4, "1053.json"),
        ]));
        let mut store = CatalogStore::new();
        let loaded = store.load(&fetcher, "inventory_index.json").unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(ids(&store), vec!["7", "12", "1053"]);
        assert!(store.is_loaded());
        assert_eq!(store.position("12.0"), Some(1));
    }

    #[test]
    fn failed_load_keeps_previous_entries() {
        let mut store = CatalogStore::new();
        store.replace(vec![CatalogEntry::new("1", 1, "1.json")]);
        let fetcher = FixedCatalog(Err(FetchError::Timeout));
        assert_eq!(
            store.load(&fetcher, "inventory_index.json").unwrap_err(),
            FetchError::Timeout
        );
        assert_eq!(ids(&store), vec!["1"]);

        let mut empty = CatalogStore::new();
        let failing = FixedCatalog(Err(FetchError::HttpStatus(500)));
        assert!(empty.load(&failing, "inventory_index.json").is_err());
        assert!(!empty.is_loaded());
        assert!(empty.is_empty());
    }

    proptest! {
        #[test]
        fn sorting_keeps_every_entry_and_is_idempotent(
            raw in proptest::collection::vec((0u32..5000, 0u64..10_000), 0..40)
        ) {
            let entries: Vec<CatalogEntry> = raw
                .iter()
                .map(|(id, count)| CatalogEntry::new(id.to_string(), *count, format!("{id}.json")))
                .collect();
            let mut once = entries.clone();
            sort_entries(&mut once);
            prop_assert_eq!(once.len(), entries.len());
            for pair in once.windows(2) {
                let a: u32 = pair[0].id.parse().unwrap();
                let b: u32 = pair[1].id.parse().unwrap();
                prop_assert!(a <= b);
            }
            let mut twice = once.clone();
            sort_entries(&mut twice);
            prop_assert_eq!(once, twice);
        }
    }
}
