/// Contracts implemented by the driver: where items come from and where
/// judgments go. The engine never touches files or image bytes itself.
use crate::coverage::CoverageTable;
use crate::error::PersistenceError;
use crate::types::{ComparisonRecord, Dimensions, ItemId};

/// Supplies the item universe and answers whether an item's asset can be
/// displayed right now.
pub trait AssetResolver {
    fn exists(&self, item: &str) -> bool;
    fn list_all(&self) -> Vec<ItemId>;
}

/// Flat tabular sink for session state.
///
/// Each call owns whatever handle it needs for its duration and releases it
/// before returning, on success and on error alike.
pub trait PersistentStore {
    /// Append one record to the dimension's records table.
    fn append_record(&mut self, dimension_name: &str, record: &ComparisonRecord) -> Result<(), PersistenceError>;

    /// Replace the whole counts table.
    fn write_counts(&mut self, dimensions: &Dimensions, counts: &CoverageTable) -> Result<(), PersistenceError>;
}

/// In-memory resolver over a fixed item list. Every listed item resolves.
#[derive(Debug, Clone, Default)]
pub struct StaticAssets {
    items: Vec<ItemId>,
    missing: Vec<ItemId>,
}

impl StaticAssets {
    pub fn new(items: impl IntoIterator<Item = impl Into<ItemId>>) -> Self {
        StaticAssets { items: items.into_iter().map(Into::into).collect(), missing: Vec::new() }
    }

    /// Keep `item` in the universe but report its asset as unavailable.
    pub fn with_missing(mut self, item: impl Into<ItemId>) -> Self {
        self.missing.push(item.into());
        self
    }
}

impl AssetResolver for StaticAssets {
    fn exists(&self, item: &str) -> bool {
        self.items.iter().any(|i| i == item) && !self.missing.iter().any(|m| m == item)
    }

    fn list_all(&self) -> Vec<ItemId> {
        self.items.clone()
    }
}

/// Store that keeps everything in memory. Useful for tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    pub records: Vec<(String, ComparisonRecord)>,
    pub counts: Vec<(ItemId, String, u32)>,
    /// Number of upcoming calls that should fail.
    pub fail_next: usize,
}

impl MemoryStore {
    fn check_failure(&mut self) -> Result<(), PersistenceError> {
        if self.fail_next > 0 {
            self.fail_next -= 1;
            return Err(PersistenceError::new("memory store configured to fail"));
        }
        Ok(())
    }
}

impl PersistentStore for MemoryStore {
    fn append_record(&mut self, dimension_name: &str, record: &ComparisonRecord) -> Result<(), PersistenceError> {
        self.check_failure()?;
        self.records.push((dimension_name.to_string(), record.clone()));
        Ok(())
    }

    fn write_counts(&mut self, dimensions: &Dimensions, counts: &CoverageTable) -> Result<(), PersistenceError> {
        self.check_failure()?;
        self.counts = counts
            .rows()
            .into_iter()
            .map(|(item, dim, c)| {
                let name = dimensions.name(dim).map(str::to_string).unwrap_or_else(|_| dim.to_string());
                (item, name, c)
            })
            .collect();
        Ok(())
    }
}
