/// Fixed pair schedule, replayed in order on every dimension.
///
/// An alternative to adaptive sampling for studies that pre-generate their
/// pairs. Each dimension tracks which schedule entries have been judged; a
/// restarted driver rebuilds that from the persisted records with
/// `mark_judged`. Skips live only in memory, so a skipped pair is offered
/// again after a restart.
use tracing::warn;

use crate::boundary::AssetResolver;
use crate::coverage::CoverageTable;
use crate::error::EngineError;
use crate::progression::ExhaustionCheck;
use crate::types::{ItemId, Pair};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairQueue {
    pairs: Vec<Pair>,
    /// Per dimension, schedule positions already judged.
    judged: Vec<Vec<bool>>,
    /// Per dimension, positions discarded without a judgment in this process.
    skipped: Vec<Vec<bool>>,
}

impl PairQueue {
    pub fn new(pairs: Vec<Pair>) -> Result<Self, EngineError> {
        if let Some((item, _)) = pairs.iter().find(|(a, b)| a == b) {
            return Err(EngineError::SameItem(item.clone()));
        }
        Ok(PairQueue { pairs, judged: Vec::new(), skipped: Vec::new() })
    }

    /// Build a queue keeping only pairs whose both assets resolve. Returns the
    /// queue and how many pairs were dropped.
    pub fn resolvable(pairs: Vec<Pair>, assets: &impl AssetResolver) -> Result<(Self, usize), EngineError> {
        let total = pairs.len();
        let kept: Vec<Pair> = pairs
            .into_iter()
            .filter(|(a, b)| assets.exists(a) && assets.exists(b))
            .collect();
        let dropped = total - kept.len();
        if dropped > 0 {
            warn!(dropped, "scheduled pairs reference missing assets");
        }
        Ok((PairQueue::new(kept)?, dropped))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Every item referenced by the schedule, sorted and deduplicated.
    pub fn items(&self) -> Vec<ItemId> {
        let mut items: Vec<ItemId> = self.pairs.iter().flat_map(|(a, b)| [a.clone(), b.clone()]).collect();
        items.sort();
        items.dedup();
        items
    }

    /// Position of the next pair to show on `dimension`: the first entry
    /// neither judged nor skipped. Equals `len()` once the schedule is done.
    pub fn cursor(&self, dimension: usize) -> usize {
        (0..self.pairs.len())
            .find(|&i| self.is_open(dimension, i))
            .unwrap_or(self.pairs.len())
    }

    pub fn next_pair(&self, dimension: usize) -> Option<Pair> {
        self.pairs.get(self.cursor(dimension)).cloned()
    }

    /// Number of entries judged on `dimension`.
    pub fn judged(&self, dimension: usize) -> usize {
        self.judged.get(dimension).map(|flags| flags.iter().filter(|&&f| f).count()).unwrap_or(0)
    }

    /// Entries on `dimension` still waiting to be shown.
    pub fn remaining(&self, dimension: usize) -> usize {
        (0..self.pairs.len()).filter(|&i| self.is_open(dimension, i)).count()
    }

    /// Mark the first open entry equal to `pair` as judged. Returns `false`
    /// when the pair is not (or no longer) in the schedule.
    pub fn mark_judged(&mut self, dimension: usize, pair: &Pair) -> bool {
        let Some(index) = (0..self.pairs.len()).find(|&i| self.is_open(dimension, i) && self.pairs[i] == *pair) else {
            return false;
        };
        flags_mut(&mut self.judged, dimension, self.pairs.len())[index] = true;
        true
    }

    /// Skip the current pair on `dimension` without a judgment.
    pub fn skip(&mut self, dimension: usize) {
        let cursor = self.cursor(dimension);
        if cursor < self.pairs.len() {
            flags_mut(&mut self.skipped, dimension, self.pairs.len())[cursor] = true;
        }
    }

    fn is_open(&self, dimension: usize, index: usize) -> bool {
        !flag(&self.judged, dimension, index) && !flag(&self.skipped, dimension, index)
    }
}

fn flag(flags: &[Vec<bool>], dimension: usize, index: usize) -> bool {
    flags.get(dimension).and_then(|f| f.get(index)).copied().unwrap_or(false)
}

fn flags_mut(flags: &mut Vec<Vec<bool>>, dimension: usize, len: usize) -> &mut Vec<bool> {
    if flags.len() <= dimension {
        flags.resize(dimension + 1, Vec::new());
    }
    let row = &mut flags[dimension];
    row.resize(len, false);
    row
}

impl ExhaustionCheck for PairQueue {
    fn is_exhausted(&self, dimension: usize, _counts: &CoverageTable, _universe: &[ItemId]) -> bool {
        self.cursor(dimension) >= self.pairs.len()
    }
}
