/// Per-(item, dimension) skill beliefs and the pairwise update entry point.
use std::collections::HashMap;

use tracing::debug;

use crate::error::EngineError;
use crate::gaussian::{rate_pair, RatingParams};
use crate::types::{ComparisonRecord, ItemId, Outcome, Skill};

/// Skill table. One independent map per dimension; an item's skill on one
/// dimension never influences another.
#[derive(Debug, Clone)]
pub struct RatingStore {
    skills: Vec<HashMap<ItemId, Skill>>,
    params: RatingParams,
}

impl RatingStore {
    pub fn new(num_dimensions: usize, params: RatingParams) -> Self {
        RatingStore {
            skills: vec![HashMap::new(); num_dimensions],
            params,
        }
    }

    pub fn num_dimensions(&self) -> usize {
        self.skills.len()
    }

    pub fn params(&self) -> &RatingParams {
        &self.params
    }

    /// Current skill, or the prior if the item has never been rated.
    /// Does not insert.
    pub fn get(&self, item: &str, dimension: usize) -> Result<Skill, EngineError> {
        Ok(self.dimension(dimension)?.get(item).copied().unwrap_or_default())
    }

    /// Skill entry for `item`, inserting the prior on first access.
    pub fn get_or_insert_default(&mut self, item: &str, dimension: usize) -> Result<&mut Skill, EngineError> {
        let table = self.dimension_mut(dimension)?;
        Ok(table.entry(item.to_string()).or_default())
    }

    /// Give every item in `items` an explicit prior entry on every dimension.
    pub fn prepopulate<'a>(&mut self, items: impl IntoIterator<Item = &'a ItemId> + Clone) {
        for table in &mut self.skills {
            for item in items.clone() {
                table.entry(item.clone()).or_default();
            }
        }
    }

    /// Apply one judgment between `item_a` and `item_b` on `dimension`.
    ///
    /// `outcome` is relative to the argument order. Both new skills are
    /// computed before either is stored, so observers never see half an update.
    pub fn update(
        &mut self,
        item_a: &str,
        item_b: &str,
        outcome: Outcome,
        dimension: usize,
    ) -> Result<(Skill, Skill), EngineError> {
        if item_a == item_b {
            return Err(EngineError::SameItem(item_a.to_string()));
        }
        let old_a = self.get(item_a, dimension)?;
        let old_b = self.get(item_b, dimension)?;
        let (new_a, new_b) = rate_pair(old_a, old_b, outcome, &self.params);

        *self.get_or_insert_default(item_a, dimension)? = new_a;
        *self.get_or_insert_default(item_b, dimension)? = new_b;

        debug!(
            dimension,
            left = item_a,
            right = item_b,
            %outcome,
            left_skill = %new_a,
            right_skill = %new_b,
            "skill update"
        );
        Ok((new_a, new_b))
    }

    /// Rebuild a store by applying `records` in order.
    pub fn replay<'a>(
        num_dimensions: usize,
        params: RatingParams,
        records: impl IntoIterator<Item = &'a ComparisonRecord>,
    ) -> Result<Self, EngineError> {
        let mut store = RatingStore::new(num_dimensions, params);
        for record in records {
            store.update(&record.left, &record.right, record.outcome, record.dimension)?;
        }
        Ok(store)
    }

    /// All rated items on `dimension`, sorted by mean descending.
    pub fn leaderboard(&self, dimension: usize) -> Result<Vec<(ItemId, Skill)>, EngineError> {
        let mut rows: Vec<(ItemId, Skill)> = self
            .dimension(dimension)?
            .iter()
            .map(|(item, skill)| (item.clone(), *skill))
            .collect();
        rows.sort_by(|a, b| {
            b.1.mean
                .partial_cmp(&a.1.mean)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        Ok(rows)
    }

    fn dimension(&self, index: usize) -> Result<&HashMap<ItemId, Skill>, EngineError> {
        let count = self.skills.len();
        self.skills.get(index).ok_or(EngineError::DimensionOutOfRange { index, count })
    }

    fn dimension_mut(&mut self, index: usize) -> Result<&mut HashMap<ItemId, Skill>, EngineError> {
        let count = self.skills.len();
        self.skills.get_mut(index).ok_or(EngineError::DimensionOutOfRange { index, count })
    }
}
