/// Phase state machine over the ordered dimensions of a campaign.
///
/// The position is always derivable from the persisted count table: the
/// current dimension is the first one not yet exhausted. A restarted driver
/// calls `recover` instead of relying on in-memory position.
use tracing::info;

use crate::coverage::CoverageTable;
use crate::error::EngineError;
use crate::types::ItemId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Phase {
    InDimension(usize),
    /// Terminal. No further pairs are issued.
    Completed,
}

/// Decides whether a dimension has nothing left to present.
///
/// Adaptive sampling answers from coverage; a fixed pair schedule answers from
/// how many of its pairs have been judged.
pub trait ExhaustionCheck {
    fn is_exhausted(&self, dimension: usize, counts: &CoverageTable, universe: &[ItemId]) -> bool;
}

impl ExhaustionCheck for crate::pairing::PairSampler {
    fn is_exhausted(&self, dimension: usize, counts: &CoverageTable, universe: &[ItemId]) -> bool {
        counts.is_exhausted(dimension, universe, self.coverage)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgression {
    num_dimensions: usize,
    phase: Phase,
}

impl SessionProgression {
    pub fn new(num_dimensions: usize) -> Result<Self, EngineError> {
        if num_dimensions == 0 {
            return Err(EngineError::NoDimensions);
        }
        Ok(SessionProgression { num_dimensions, phase: Phase::InDimension(0) })
    }

    /// Rebuild the phase purely from `counts`.
    pub fn recover(
        num_dimensions: usize,
        counts: &CoverageTable,
        universe: &[ItemId],
        check: &impl ExhaustionCheck,
    ) -> Result<Self, EngineError> {
        let mut progression = SessionProgression::new(num_dimensions)?;
        progression.advance_if_exhausted(counts, universe, check);
        Ok(progression)
    }

    pub fn current_phase(&self) -> Phase {
        self.phase
    }

    pub fn num_dimensions(&self) -> usize {
        self.num_dimensions
    }

    pub fn is_completed(&self) -> bool {
        self.phase == Phase::Completed
    }

    /// Move past every exhausted dimension, in order. Returns the new phase.
    pub fn advance_if_exhausted(
        &mut self,
        counts: &CoverageTable,
        universe: &[ItemId],
        check: &impl ExhaustionCheck,
    ) -> Phase {
        while let Phase::InDimension(index) = self.phase {
            if !check.is_exhausted(index, counts, universe) {
                break;
            }
            self.phase = if index + 1 < self.num_dimensions {
                Phase::InDimension(index + 1)
            } else {
                Phase::Completed
            };
            info!(finished = index, next = ?self.phase, "dimension complete");
        }
        self.phase
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coverage::Coverage;
    use crate::pairing::{PairSampler, Weighting};

    fn ids(names: &[&str]) -> Vec<ItemId> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn sampler(min: u32) -> PairSampler {
        PairSampler::new(Coverage::from_min(min), Weighting::InverseFrequency)
    }

    #[test]
    fn test_starts_in_first_dimension() {
        let p = SessionProgression::new(3).unwrap();
        assert_eq!(p.current_phase(), Phase::InDimension(0));
        assert!(SessionProgression::new(0).is_err());
    }

    #[test]
    fn test_advances_then_completes() {
        let universe = ids(&["a", "b"]);
        let s = sampler(1);
        let mut counts = CoverageTable::new(2);
        let mut p = SessionProgression::new(2).unwrap();

        assert_eq!(p.advance_if_exhausted(&counts, &universe, &s), Phase::InDimension(0));
        counts.record("a", "b", 0).unwrap();
        assert_eq!(p.advance_if_exhausted(&counts, &universe, &s), Phase::InDimension(1));
        counts.record("b", "a", 1).unwrap();
        assert_eq!(p.advance_if_exhausted(&counts, &universe, &s), Phase::Completed);
        assert!(p.is_completed());
        // Terminal.
        assert_eq!(p.advance_if_exhausted(&CoverageTable::new(2), &universe, &s), Phase::Completed);
    }

    #[test]
    fn test_skips_several_exhausted_dimensions() {
        let universe = ids(&["a", "b"]);
        let s = sampler(1);
        let mut counts = CoverageTable::new(3);
        counts.record("a", "b", 0).unwrap();
        counts.record("a", "b", 1).unwrap();
        let mut p = SessionProgression::new(3).unwrap();
        assert_eq!(p.advance_if_exhausted(&counts, &universe, &s), Phase::InDimension(2));
    }

    #[test]
    fn test_recover_from_counts() {
        let universe = ids(&["a", "b", "c"]);
        let s = sampler(1);
        let mut counts = CoverageTable::new(3);
        counts.record("a", "b", 0).unwrap();
        counts.record("c", "a", 0).unwrap();
        counts.record("a", "b", 1).unwrap();

        let p = SessionProgression::recover(3, &counts, &universe, &s).unwrap();
        assert_eq!(p.current_phase(), Phase::InDimension(1));

        // Later dimensions ahead of the current one do not matter.
        counts.record("a", "b", 2).unwrap();
        counts.record("c", "b", 2).unwrap();
        let p = SessionProgression::recover(3, &counts, &universe, &s).unwrap();
        assert_eq!(p.current_phase(), Phase::InDimension(1));
    }

    #[test]
    fn test_unbounded_coverage_never_completes() {
        let universe = ids(&["a", "b"]);
        let s = sampler(0);
        let mut counts = CoverageTable::new(1);
        for _ in 0..50 {
            counts.record("a", "b", 0).unwrap();
        }
        let p = SessionProgression::recover(1, &counts, &universe, &s).unwrap();
        assert_eq!(p.current_phase(), Phase::InDimension(0));
    }
}
