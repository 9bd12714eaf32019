/// Comparison counts per (item, dimension).
///
/// Counts drive sampling weights and completion checks only; they are never
/// rating input. Every recorded comparison increments exactly two counters, so
/// the per-dimension total is always even.
use std::collections::HashMap;

use crate::error::EngineError;
use crate::types::ItemId;

/// Minimum number of judged comparisons each item needs on a dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Coverage {
    /// No threshold: every item is always eligible and no dimension is ever
    /// exhausted.
    Unbounded,
    AtLeast(u32),
}

impl Coverage {
    /// `0` is read as unbounded, the convention of the config file.
    pub fn from_min(min: u32) -> Self {
        if min == 0 { Coverage::Unbounded } else { Coverage::AtLeast(min) }
    }

    pub fn is_satisfied_by(&self, count: u32) -> bool {
        match *self {
            Coverage::Unbounded => false,
            Coverage::AtLeast(min) => count >= min,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoverageTable {
    counts: Vec<HashMap<ItemId, u32>>,
}

impl CoverageTable {
    pub fn new(num_dimensions: usize) -> Self {
        CoverageTable { counts: vec![HashMap::new(); num_dimensions] }
    }

    pub fn num_dimensions(&self) -> usize {
        self.counts.len()
    }

    /// Count for `item`, zero if never compared.
    pub fn count(&self, item: &str, dimension: usize) -> u32 {
        self.counts
            .get(dimension)
            .and_then(|table| table.get(item))
            .copied()
            .unwrap_or(0)
    }

    pub fn get_or_insert_default(&mut self, item: &str, dimension: usize) -> Result<&mut u32, EngineError> {
        let count = self.counts.len();
        let table = self
            .counts
            .get_mut(dimension)
            .ok_or(EngineError::DimensionOutOfRange { index: dimension, count })?;
        Ok(table.entry(item.to_string()).or_insert(0))
    }

    /// Record one judged comparison: both items get +1.
    pub fn record(&mut self, item_a: &str, item_b: &str, dimension: usize) -> Result<(), EngineError> {
        if item_a == item_b {
            return Err(EngineError::SameItem(item_a.to_string()));
        }
        if dimension >= self.counts.len() {
            return Err(EngineError::DimensionOutOfRange { index: dimension, count: self.counts.len() });
        }
        *self.get_or_insert_default(item_a, dimension)? += 1;
        *self.get_or_insert_default(item_b, dimension)? += 1;
        Ok(())
    }

    /// Overwrite a single counter, used when loading a persisted table.
    pub fn set(&mut self, item: &str, dimension: usize, value: u32) -> Result<(), EngineError> {
        *self.get_or_insert_default(item, dimension)? = value;
        Ok(())
    }

    /// Sum of all counters on `dimension`: twice the number of judgments.
    pub fn total(&self, dimension: usize) -> u64 {
        self.counts
            .get(dimension)
            .map(|table| table.values().map(|&c| u64::from(c)).sum())
            .unwrap_or(0)
    }

    /// Number of judgments recorded on `dimension`.
    pub fn judgments(&self, dimension: usize) -> u64 {
        self.total(dimension) / 2
    }

    /// Items in `universe` whose count on `dimension` reached `coverage`.
    pub fn covered(&self, dimension: usize, universe: &[ItemId], coverage: Coverage) -> usize {
        universe
            .iter()
            .filter(|item| coverage.is_satisfied_by(self.count(item, dimension)))
            .count()
    }

    /// Every item in `universe` has reached `coverage` on `dimension`.
    pub fn is_exhausted(&self, dimension: usize, universe: &[ItemId], coverage: Coverage) -> bool {
        match coverage {
            Coverage::Unbounded => false,
            Coverage::AtLeast(_) => self.covered(dimension, universe, coverage) == universe.len(),
        }
    }

    /// (item, dimension, count) rows sorted by dimension then item, the
    /// layout of the persisted counts table.
    pub fn rows(&self) -> Vec<(ItemId, usize, u32)> {
        let mut rows: Vec<(ItemId, usize, u32)> = self
            .counts
            .iter()
            .enumerate()
            .flat_map(|(dim, table)| table.iter().map(move |(item, &c)| (item.clone(), dim, c)))
            .collect();
        rows.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        rows
    }
}
