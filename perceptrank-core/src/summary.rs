/// Aggregate statistics exported at the end of a campaign (or on demand).
use crate::types::ItemId;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemSummary {
    pub item: ItemId,
    pub mean: f64,
    pub uncertainty: f64,
    /// `mean - 3 * uncertainty`.
    pub conservative: f64,
    pub comparisons: u32,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DimensionSummary {
    pub name: String,
    pub judgments: u64,
    /// Items that reached the coverage threshold.
    pub covered: usize,
    /// Sorted by mean, best first.
    pub items: Vec<ItemSummary>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Summary {
    pub completed: bool,
    pub subject: Option<String>,
    pub total_judgments: usize,
    pub dimensions: Vec<DimensionSummary>,
}

/// Coverage progress on one dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DimensionProgress {
    pub dimension: usize,
    pub covered: usize,
    pub total: usize,
    pub judgments: u64,
}
