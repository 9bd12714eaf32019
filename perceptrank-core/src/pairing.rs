/// Coverage-driven pair selection.
///
/// Items compared less often on a dimension are proportionally more likely to
/// be drawn, and items that reached the minimum coverage drop out entirely.
/// Pairs are drawn without replacement, so a pair never repeats an item.
use rand::Rng;
use tracing::debug;

use crate::coverage::{Coverage, CoverageTable};
use crate::error::EngineError;
use crate::types::{ItemId, Pair};

/// How an eligible item's sampling weight falls with its count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum Weighting {
    /// `1 / (1 + count)`.
    #[default]
    InverseFrequency,
    /// `min_coverage - count`: weight is the number of judgments still owed.
    /// Falls back to inverse frequency when coverage is unbounded.
    RemainingQuota,
}

/// Sampling weight for an item with `count` judged comparisons.
pub fn calculate_sampling_weight(count: u32, coverage: Coverage, weighting: Weighting) -> f64 {
    match (weighting, coverage) {
        (Weighting::RemainingQuota, Coverage::AtLeast(min)) => f64::from(min.saturating_sub(count)),
        _ => 1.0 / (1.0 + f64::from(count)),
    }
}

/// Items of `universe` still eligible for sampling on `dimension`.
pub fn eligible_items<'a>(
    dimension: usize,
    counts: &CoverageTable,
    universe: &'a [ItemId],
    coverage: Coverage,
) -> Vec<&'a ItemId> {
    universe
        .iter()
        .filter(|item| !coverage.is_satisfied_by(counts.count(item, dimension)))
        .collect()
}

/// Select the next pair to present on `dimension`.
///
/// Returns `Ok(None)` once no item is eligible (the dimension is exhausted).
/// When a single item is still short of coverage it is paired with a partner
/// drawn from the covered items by inverse frequency, so the last item is
/// never stranded. A universe of fewer than two items is a configuration
/// error. Counts are not touched; the caller records the comparison only after
/// a judgment.
pub fn next_pair(
    dimension: usize,
    counts: &CoverageTable,
    universe: &[ItemId],
    coverage: Coverage,
    weighting: Weighting,
    rng: &mut impl Rng,
) -> Result<Option<Pair>, EngineError> {
    if universe.len() < 2 {
        return Err(EngineError::InsufficientItems { found: universe.len() });
    }
    if dimension >= counts.num_dimensions() {
        return Err(EngineError::DimensionOutOfRange { index: dimension, count: counts.num_dimensions() });
    }

    let eligible = eligible_items(dimension, counts, universe, coverage);
    let (first, second) = match eligible.len() {
        0 => {
            debug!(dimension, "dimension exhausted");
            return Ok(None);
        }
        1 => {
            let last = eligible[0];
            let mut partners: Vec<(&ItemId, f64)> = universe
                .iter()
                .filter(|item| *item != last)
                .map(|item| (item, calculate_sampling_weight(counts.count(item, dimension), Coverage::Unbounded, Weighting::InverseFrequency)))
                .collect();
            (last, draw(&mut partners, rng))
        }
        _ => {
            let mut pool: Vec<(&ItemId, f64)> = eligible
                .into_iter()
                .map(|item| (item, calculate_sampling_weight(counts.count(item, dimension), coverage, weighting)))
                .collect();
            let first = draw(&mut pool, rng);
            (first, draw(&mut pool, rng))
        }
    };

    let pair = if rng.random::<f64>() < 0.5 {
        (first.clone(), second.clone())
    } else {
        (second.clone(), first.clone())
    };
    debug!(dimension, left = %pair.0, right = %pair.1, "pair drawn");
    Ok(Some(pair))
}

/// Remove and return one weighted item from `pool`. `pool` must be non-empty.
fn draw<'a>(pool: &mut Vec<(&'a ItemId, f64)>, rng: &mut impl Rng) -> &'a ItemId {
    let weights: Vec<f64> = pool.iter().map(|&(_, w)| w).collect();
    let total_weight: f64 = weights.iter().sum();
    let idx = if total_weight <= 0.0 {
        rng.random_range(0..pool.len())
    } else {
        weighted_random_select(&weights, total_weight, rng)
    };
    pool.swap_remove(idx).0
}

fn weighted_random_select(weights: &[f64], total_weight: f64, rng: &mut impl Rng) -> usize {
    let mut r = rng.random::<f64>() * total_weight;
    for (j, &w) in weights.iter().enumerate() {
        r -= w;
        if r < 1e-10 && w > 0.0 {
            return j;
        }
    }
    weights.iter().rposition(|&w| w > 0.0).unwrap_or(weights.len() - 1)
}

/// Sampler configuration bundled for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PairSampler {
    pub coverage: Coverage,
    pub weighting: Weighting,
}

impl PairSampler {
    pub fn new(coverage: Coverage, weighting: Weighting) -> Self {
        PairSampler { coverage, weighting }
    }

    pub fn next_pair(
        &self,
        dimension: usize,
        counts: &CoverageTable,
        universe: &[ItemId],
        rng: &mut impl Rng,
    ) -> Result<Option<Pair>, EngineError> {
        next_pair(dimension, counts, universe, self.coverage, self.weighting, rng)
    }

    /// Record a judged pair: both counts +1.
    pub fn record(&self, counts: &mut CoverageTable, pair: &Pair, dimension: usize) -> Result<(), EngineError> {
        counts.record(&pair.0, &pair.1, dimension)
    }
}
