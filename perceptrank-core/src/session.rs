/// Driver-facing session: owns all mutable campaign state and runs one
/// judgment cycle at a time.
///
/// ```text
/// phase = session.current_phase()
/// pair  = session.next_displayable_pair(&assets)?   // show it
/// rec   = session.record_judgment(outcome)?          // rate + count + advance
/// session.persist(&mut store)?                       // retryable
/// ```
///
/// Ratings and counts advance in memory before persistence. A failed persist
/// leaves them advanced and keeps the record queued until a later `persist`
/// succeeds.
use std::collections::VecDeque;

use rand::rngs::SmallRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::boundary::{AssetResolver, PersistentStore};
use crate::constants::MAX_DRAW_ATTEMPTS;
use crate::coverage::{Coverage, CoverageTable};
use crate::error::EngineError;
use crate::gaussian::RatingParams;
use crate::pairing::{PairSampler, Weighting};
use crate::progression::{ExhaustionCheck, Phase, SessionProgression};
use crate::rating::RatingStore;
use crate::schedule::PairQueue;
use crate::summary::{DimensionProgress, DimensionSummary, ItemSummary, Summary};
use crate::types::{ComparisonRecord, Dimensions, ItemId, Outcome, Pair};

/// Where pairs come from.
#[derive(Debug, Clone)]
pub enum PairSource {
    Adaptive(PairSampler),
    Scheduled(PairQueue),
}

impl ExhaustionCheck for PairSource {
    fn is_exhausted(&self, dimension: usize, counts: &CoverageTable, universe: &[ItemId]) -> bool {
        match self {
            PairSource::Adaptive(sampler) => sampler.is_exhausted(dimension, counts, universe),
            PairSource::Scheduled(queue) => queue.is_exhausted(dimension, counts, universe),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub dimensions: Dimensions,
    pub coverage: Coverage,
    pub weighting: Weighting,
    pub rating: RatingParams,
    /// Free-text identifier of the person judging. Must be non-empty if set.
    pub subject: Option<String>,
    /// Fixed pair schedule; adaptive sampling when `None`.
    pub schedule: Option<PairQueue>,
    /// RNG seed for reproducible sampling.
    pub seed: Option<u64>,
}

impl SessionConfig {
    pub fn new(dimensions: Dimensions) -> Self {
        SessionConfig {
            dimensions,
            coverage: Coverage::Unbounded,
            weighting: Weighting::default(),
            rating: RatingParams::default(),
            subject: None,
            schedule: None,
            seed: None,
        }
    }
}

pub struct Session {
    dimensions: Dimensions,
    coverage: Coverage,
    subject: Option<String>,
    /// Items eligible for sampling: the resolvable part of the universe.
    universe: Vec<ItemId>,
    unavailable: Vec<ItemId>,
    ratings: RatingStore,
    counts: CoverageTable,
    records: Vec<ComparisonRecord>,
    progression: SessionProgression,
    source: PairSource,
    /// Pair on display, with the dimension it was drawn for.
    pending: Option<(usize, Pair)>,
    unpersisted: VecDeque<ComparisonRecord>,
    counts_dirty: bool,
    rng: SmallRng,
}

impl Session {
    /// Start a fresh campaign over `universe`.
    pub fn new(config: SessionConfig, universe: Vec<ItemId>) -> Result<Self, EngineError> {
        let num_dimensions = config.dimensions.len();
        Session::restore(config, universe, CoverageTable::new(num_dimensions), Vec::new())
    }

    /// Resume a campaign from persisted state.
    ///
    /// Skills are rebuilt by replaying `records` in order (their stored skills
    /// are refreshed from the replay). With a pair schedule the judged entries
    /// are marked from the same records; otherwise the phase is recovered
    /// from `counts`.
    pub fn restore(
        config: SessionConfig,
        universe: Vec<ItemId>,
        counts: CoverageTable,
        records: Vec<ComparisonRecord>,
    ) -> Result<Self, EngineError> {
        if let Some(subject) = &config.subject {
            if subject.trim().is_empty() {
                return Err(EngineError::InvalidSubject);
            }
        }

        let mut universe = universe;
        universe.sort();
        universe.dedup();
        if universe.len() < 2 {
            return Err(EngineError::InsufficientItems { found: universe.len() });
        }

        let num_dimensions = config.dimensions.len();
        if counts.num_dimensions() != num_dimensions {
            return Err(EngineError::CountsShapeMismatch { found: counts.num_dimensions(), expected: num_dimensions });
        }

        let mut ratings = RatingStore::new(num_dimensions, config.rating);
        ratings.prepopulate(&universe);
        let mut replayed = Vec::with_capacity(records.len());
        for (sequence, mut record) in records.into_iter().enumerate() {
            let (left_skill, right_skill) =
                ratings.update(&record.left, &record.right, record.outcome, record.dimension)?;
            record.sequence = sequence as u64;
            record.left_skill = left_skill;
            record.right_skill = right_skill;
            replayed.push(record);
        }

        let source = match config.schedule {
            Some(mut queue) => {
                for record in &replayed {
                    queue.mark_judged(record.dimension, &(record.left.clone(), record.right.clone()));
                }
                PairSource::Scheduled(queue)
            }
            None => PairSource::Adaptive(PairSampler::new(config.coverage, config.weighting)),
        };
        let progression = SessionProgression::recover(num_dimensions, &counts, &universe, &source)?;

        let rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        };

        info!(
            items = universe.len(),
            dimensions = num_dimensions,
            replayed = replayed.len(),
            phase = ?progression.current_phase(),
            "session ready"
        );

        Ok(Session {
            dimensions: config.dimensions,
            coverage: config.coverage,
            subject: config.subject,
            universe,
            unavailable: Vec::new(),
            ratings,
            counts,
            records: replayed,
            progression,
            source,
            pending: None,
            unpersisted: VecDeque::new(),
            counts_dirty: false,
            rng,
        })
    }

    pub fn current_phase(&self) -> Phase {
        self.progression.current_phase()
    }

    pub fn dimensions(&self) -> &Dimensions {
        &self.dimensions
    }

    pub fn universe(&self) -> &[ItemId] {
        &self.universe
    }

    /// Items removed from sampling because their asset failed to resolve.
    pub fn unavailable(&self) -> &[ItemId] {
        &self.unavailable
    }

    pub fn ratings(&self) -> &RatingStore {
        &self.ratings
    }

    pub fn counts(&self) -> &CoverageTable {
        &self.counts
    }

    pub fn records(&self) -> &[ComparisonRecord] {
        &self.records
    }

    pub fn source(&self) -> &PairSource {
        &self.source
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    /// The pair currently on display, if any.
    pub fn pending_pair(&self) -> Option<&Pair> {
        self.pending.as_ref().map(|(_, pair)| pair)
    }

    /// Records judged but not yet accepted by a store.
    pub fn unpersisted(&self) -> usize {
        self.unpersisted.len()
    }

    /// Pair to show next, or `None` once the campaign is complete.
    ///
    /// Calling again before a judgment returns the same pair. Drawing a pair
    /// never changes counts.
    pub fn next_pair(&mut self) -> Result<Option<Pair>, EngineError> {
        if let Some((_, pair)) = &self.pending {
            return Ok(Some(pair.clone()));
        }
        loop {
            let dimension = match self.progression.current_phase() {
                Phase::Completed => return Ok(None),
                Phase::InDimension(index) => index,
            };
            let drawn = match &self.source {
                PairSource::Adaptive(sampler) => {
                    sampler.next_pair(dimension, &self.counts, &self.universe, &mut self.rng)?
                }
                PairSource::Scheduled(queue) => queue.next_pair(dimension),
            };
            match drawn {
                Some(pair) => {
                    self.pending = Some((dimension, pair.clone()));
                    return Ok(Some(pair));
                }
                None => {
                    // Exhausted: advance. A source that returns nothing
                    // while claiming more work would loop forever, so force
                    // the step when the check disagrees.
                    let before = self.progression.current_phase();
                    let after = self.progression.advance_if_exhausted(&self.counts, &self.universe, &self.source);
                    if after == before {
                        return Ok(None);
                    }
                }
            }
        }
    }

    /// Like `next_pair`, but discards pairs whose assets do not resolve and
    /// draws again, up to `MAX_DRAW_ATTEMPTS` times. An item that fails to
    /// resolve is dropped from sampling for the rest of the session.
    pub fn next_displayable_pair(&mut self, assets: &impl AssetResolver) -> Result<Option<Pair>, EngineError> {
        let mut last_missing = None;
        for _ in 0..MAX_DRAW_ATTEMPTS {
            let Some(pair) = self.next_pair()? else {
                return Ok(None);
            };
            let missing = [&pair.0, &pair.1].into_iter().find(|item| !assets.exists(item)).cloned();
            match missing {
                None => return Ok(Some(pair)),
                Some(item) => {
                    warn!(item = %item, "asset unavailable, discarding pair");
                    self.mark_unavailable(&item);
                    last_missing = Some(item);
                }
            }
        }
        Err(EngineError::AssetUnavailable { item: last_missing.unwrap_or_default() })
    }

    /// Drop the pair on display without a judgment: no count, no rating.
    pub fn discard_pair(&mut self) {
        if let Some((dimension, pair)) = self.pending.take() {
            debug!(dimension, left = %pair.0, right = %pair.1, "pair discarded");
            if let PairSource::Scheduled(queue) = &mut self.source {
                queue.skip(dimension);
                self.progression.advance_if_exhausted(&self.counts, &self.universe, &self.source);
            }
        }
    }

    /// Discard the pair on display and stop sampling `item`. Its skill and
    /// counts are kept as they are.
    pub fn mark_unavailable(&mut self, item: &str) {
        self.discard_pair();
        if let Some(pos) = self.universe.iter().position(|i| i == item) {
            let removed = self.universe.remove(pos);
            self.unavailable.push(removed);
            self.progression.advance_if_exhausted(&self.counts, &self.universe, &self.source);
        }
    }

    /// Apply a judgment on the pair on display.
    ///
    /// Updates both skills, increments both counts, appends the record and
    /// advances the phase if the dimension is now exhausted. The record is
    /// queued for the next `persist`.
    pub fn record_judgment(&mut self, outcome: Outcome) -> Result<ComparisonRecord, EngineError> {
        let (dimension, (left, right)) = self.pending.take().ok_or(EngineError::NoPendingPair)?;

        let (left_skill, right_skill) = self.ratings.update(&left, &right, outcome, dimension)?;
        self.counts.record(&left, &right, dimension)?;
        if let PairSource::Scheduled(queue) = &mut self.source {
            queue.mark_judged(dimension, &(left.clone(), right.clone()));
        }

        let record = ComparisonRecord {
            sequence: self.records.len() as u64,
            dimension,
            left,
            right,
            outcome,
            left_skill,
            right_skill,
            subject: self.subject.clone(),
        };
        self.records.push(record.clone());
        self.unpersisted.push_back(record.clone());
        self.counts_dirty = true;

        let phase = self.progression.advance_if_exhausted(&self.counts, &self.universe, &self.source);
        debug!(sequence = record.sequence, ?phase, "judgment recorded");
        Ok(record)
    }

    /// Flush queued records, then the counts table, to `store`.
    ///
    /// Stops at the first failure; whatever was not accepted stays queued and
    /// is retried on the next call. In-memory state is never rolled back.
    pub fn persist(&mut self, store: &mut impl PersistentStore) -> Result<(), EngineError> {
        while let Some(record) = self.unpersisted.front() {
            let name = self.dimensions.name(record.dimension)?;
            if let Err(source) = store.append_record(name, record) {
                return Err(self.persistence_failure(source));
            }
            self.unpersisted.pop_front();
        }
        if self.counts_dirty {
            if let Err(source) = store.write_counts(&self.dimensions, &self.counts) {
                return Err(self.persistence_failure(source));
            }
            self.counts_dirty = false;
        }
        Ok(())
    }

    fn persistence_failure(&self, source: crate::error::PersistenceError) -> EngineError {
        let pending = self.unpersisted.len() + usize::from(self.counts_dirty);
        warn!(pending, error = %source, "persist failed, will retry");
        EngineError::Persistence { pending, source }
    }

    /// Coverage progress per dimension.
    pub fn progress(&self) -> Vec<DimensionProgress> {
        (0..self.dimensions.len())
            .map(|dimension| {
                let (covered, total) = match &self.source {
                    PairSource::Adaptive(_) => (
                        self.counts.covered(dimension, &self.universe, self.coverage),
                        self.universe.len(),
                    ),
                    PairSource::Scheduled(queue) => (queue.judged(dimension), queue.len()),
                };
                DimensionProgress { dimension, covered, total, judgments: self.counts.judgments(dimension) }
            })
            .collect()
    }

    /// Leaderboards and counts for every dimension.
    pub fn export_summary(&self) -> Summary {
        let dimensions = self
            .dimensions
            .names()
            .iter()
            .enumerate()
            .map(|(dimension, name)| {
                let items = self
                    .ratings
                    .leaderboard(dimension)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|(item, skill)| ItemSummary {
                        comparisons: self.counts.count(&item, dimension),
                        mean: skill.mean,
                        uncertainty: skill.uncertainty,
                        conservative: skill.conservative(),
                        item,
                    })
                    .collect();
                DimensionSummary {
                    name: name.clone(),
                    judgments: self.counts.judgments(dimension),
                    covered: self.counts.covered(dimension, &self.universe, self.coverage),
                    items,
                }
            })
            .collect();

        Summary {
            completed: self.progression.is_completed(),
            subject: self.subject.clone(),
            total_judgments: self.records.len(),
            dimensions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::{MemoryStore, StaticAssets};
    use crate::types::Skill;

    fn ids(names: &[&str]) -> Vec<ItemId> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn config(dims: &[&str], min: u32) -> SessionConfig {
        let mut config = SessionConfig::new(Dimensions::new(dims.iter().copied()).unwrap());
        config.coverage = Coverage::from_min(min);
        config.seed = Some(42);
        config
    }

    #[test]
    fn test_rejects_small_universe_and_empty_subject() {
        let err = Session::new(config(&["safety"], 1), ids(&["a", "a"])).err().unwrap();
        assert!(matches!(err, EngineError::InsufficientItems { found: 1 }));

        let mut cfg = config(&["safety"], 1);
        cfg.subject = Some("  ".to_string());
        assert!(matches!(Session::new(cfg, ids(&["a", "b"])), Err(EngineError::InvalidSubject)));
    }

    #[test]
    fn test_full_campaign_runs_to_completion() {
        let mut session = Session::new(config(&["beautiful", "safety"], 2), ids(&["a", "b", "c", "d"])).unwrap();
        let mut store = MemoryStore::default();
        let mut judged = 0;

        while let Some((left, right)) = session.next_pair().unwrap() {
            assert_ne!(left, right);
            let outcome = if left < right { Outcome::Left } else { Outcome::Right };
            session.record_judgment(outcome).unwrap();
            session.persist(&mut store).unwrap();
            judged += 1;
            for dim in 0..2 {
                assert_eq!(session.counts().total(dim) % 2, 0);
            }
            assert!(judged < 100, "campaign did not terminate");
        }

        assert_eq!(session.current_phase(), Phase::Completed);
        for dim in 0..2 {
            assert!(session.universe().iter().all(|i| session.counts().count(i, dim) >= 2));
        }
        assert_eq!(store.records.len(), judged);
        assert_eq!(session.unpersisted(), 0);
        assert!(store.records.iter().any(|(name, _)| name == "safety"));

        let summary = session.export_summary();
        assert!(summary.completed);
        assert_eq!(summary.total_judgments, judged);
        let board = &summary.dimensions[0].items;
        assert_eq!(board.len(), 4);
        assert!(board.windows(2).all(|w| w[0].mean >= w[1].mean));
        assert!(board.iter().all(|i| i.comparisons >= 2));
    }

    #[test]
    fn test_next_pair_is_stable_until_judged() {
        let mut session = Session::new(config(&["safety"], 1), ids(&["a", "b", "c"])).unwrap();
        let first = session.next_pair().unwrap().unwrap();
        assert_eq!(session.next_pair().unwrap().unwrap(), first);
        assert_eq!(session.counts().total(0), 0);
    }

    #[test]
    fn test_judgment_without_pair() {
        let mut session = Session::new(config(&["safety"], 1), ids(&["a", "b"])).unwrap();
        assert!(matches!(session.record_judgment(Outcome::Left), Err(EngineError::NoPendingPair)));
    }

    #[test]
    fn test_record_holds_post_update_skills() {
        let mut cfg = config(&["safety"], 0);
        cfg.subject = Some("p07".to_string());
        let mut session = Session::new(cfg, ids(&["a", "b"])).unwrap();
        let (left, right) = session.next_pair().unwrap().unwrap();
        let record = session.record_judgment(Outcome::Left).unwrap();
        assert_eq!(record.left, left);
        assert_eq!(record.subject.as_deref(), Some("p07"));
        assert_eq!(session.ratings().get(&left, 0).unwrap(), record.left_skill);
        assert_eq!(session.ratings().get(&right, 0).unwrap(), record.right_skill);
        assert!(record.left_skill.mean > Skill::default().mean);
    }

    #[test]
    fn test_missing_asset_discards_pair_without_counting() {
        let assets = StaticAssets::new(["a", "b", "c"]).with_missing("c");
        let mut session = Session::new(config(&["safety"], 0), assets.list_all()).unwrap();
        for _ in 0..20 {
            let (l, r) = session.next_displayable_pair(&assets).unwrap().unwrap();
            assert!(l != "c" && r != "c");
            session.record_judgment(Outcome::Tie).unwrap();
        }
        assert_eq!(session.counts().count("c", 0), 0);
        assert_eq!(session.ratings().get("c", 0).unwrap(), Skill::default());
    }

    #[test]
    fn test_too_few_resolvable_items_is_configuration_error() {
        let assets = StaticAssets::new(["a", "b"]).with_missing("a");
        let mut session = Session::new(config(&["safety"], 1), assets.list_all()).unwrap();
        let err = session.next_displayable_pair(&assets).unwrap_err();
        assert!(matches!(err, EngineError::InsufficientItems { found: 1 }));
        assert!(!err.is_recoverable());
        assert_eq!(session.unavailable(), ["a".to_string()]);
        assert_eq!(session.counts().total(0), 0);
    }

    #[test]
    fn test_scheduled_pair_with_missing_asset_is_skipped() {
        let assets = StaticAssets::new(["a", "b", "c"]).with_missing("c");
        let mut cfg = config(&["safety"], 0);
        cfg.schedule = Some(
            PairQueue::new(vec![("c".to_string(), "a".to_string()), ("a".to_string(), "b".to_string())]).unwrap(),
        );
        let mut session = Session::new(cfg, assets.list_all()).unwrap();
        let pair = session.next_displayable_pair(&assets).unwrap().unwrap();
        assert_eq!(pair, ("a".to_string(), "b".to_string()));
        session.record_judgment(Outcome::Left).unwrap();
        assert!(session.next_displayable_pair(&assets).unwrap().is_none());
        assert_eq!(session.current_phase(), Phase::Completed);
    }

    #[test]
    fn test_persistence_failure_is_retryable() {
        let mut session = Session::new(config(&["safety"], 0), ids(&["a", "b", "c"])).unwrap();
        let mut store = MemoryStore { fail_next: 1, ..MemoryStore::default() };

        session.next_pair().unwrap();
        let record = session.record_judgment(Outcome::Right).unwrap();
        let err = session.persist(&mut store).unwrap_err();
        assert!(matches!(err, EngineError::Persistence { pending: 2, .. }));
        // In-memory state already advanced.
        assert_eq!(session.counts().total(0), 2);
        assert_eq!(session.unpersisted(), 1);

        session.persist(&mut store).unwrap();
        assert_eq!(session.unpersisted(), 0);
        assert_eq!(store.records.len(), 1);
        assert_eq!(store.records[0].1, record);
        assert_eq!(store.counts.len(), 2);
    }

    #[test]
    fn test_restore_resumes_where_it_stopped() {
        let universe = ids(&["a", "b", "c"]);
        let mut session = Session::new(config(&["beautiful", "safety"], 1), universe.clone()).unwrap();
        while session.current_phase() == Phase::InDimension(0) {
            session.next_pair().unwrap();
            session.record_judgment(Outcome::Left).unwrap();
        }
        session.next_pair().unwrap();
        session.record_judgment(Outcome::Tie).unwrap();

        let restored = Session::restore(
            config(&["beautiful", "safety"], 1),
            universe,
            session.counts().clone(),
            session.records().to_vec(),
        )
        .unwrap();

        assert_eq!(restored.current_phase(), session.current_phase());
        assert_eq!(restored.records(), session.records());
        for dim in 0..2 {
            assert_eq!(restored.ratings().leaderboard(dim).unwrap(), session.ratings().leaderboard(dim).unwrap());
        }
    }

    #[test]
    fn test_scheduled_pairs_run_in_order() {
        let pairs = vec![
            ("a".to_string(), "b".to_string()),
            ("c".to_string(), "a".to_string()),
        ];
        let mut cfg = config(&["beautiful", "safety"], 0);
        cfg.schedule = Some(PairQueue::new(pairs.clone()).unwrap());
        let mut session = Session::new(cfg, ids(&["a", "b", "c"])).unwrap();

        let mut seen = Vec::new();
        while let Some(pair) = session.next_pair().unwrap() {
            seen.push((session.current_phase(), pair));
            session.record_judgment(Outcome::Left).unwrap();
        }
        assert_eq!(seen.len(), 4);
        assert_eq!(seen[0], (Phase::InDimension(0), pairs[0].clone()));
        assert_eq!(seen[1], (Phase::InDimension(0), pairs[1].clone()));
        assert_eq!(seen[2], (Phase::InDimension(1), pairs[0].clone()));
        assert_eq!(session.current_phase(), Phase::Completed);
        assert_eq!(session.progress()[1].covered, 2);
    }

    #[test]
    fn test_skipped_scheduled_pair_returns_after_restore() {
        let pairs = vec![
            ("a".to_string(), "b".to_string()),
            ("b".to_string(), "c".to_string()),
            ("c".to_string(), "d".to_string()),
        ];
        let scheduled = || {
            let mut cfg = config(&["safety"], 0);
            cfg.schedule = Some(PairQueue::new(pairs.clone()).unwrap());
            cfg
        };
        let universe = ids(&["a", "b", "c", "d"]);

        let mut session = Session::new(scheduled(), universe.clone()).unwrap();
        assert_eq!(session.next_pair().unwrap(), Some(pairs[0].clone()));
        session.discard_pair();
        assert_eq!(session.next_pair().unwrap(), Some(pairs[1].clone()));
        session.record_judgment(Outcome::Left).unwrap();

        let mut restored =
            Session::restore(scheduled(), universe, session.counts().clone(), session.records().to_vec()).unwrap();
        let mut shown = Vec::new();
        while let Some(pair) = restored.next_pair().unwrap() {
            shown.push(pair);
            restored.record_judgment(Outcome::Right).unwrap();
        }
        assert_eq!(shown, vec![pairs[0].clone(), pairs[2].clone()]);

        let judged: Vec<Pair> = restored.records().iter().map(|r| (r.left.clone(), r.right.clone())).collect();
        assert_eq!(judged, vec![pairs[1].clone(), pairs[0].clone(), pairs[2].clone()]);
        assert_eq!(restored.current_phase(), Phase::Completed);
        assert_eq!(restored.progress()[0].covered, 3);
    }

    #[test]
    fn test_counts_table_width_must_match_dimensions() {
        let err = Session::restore(config(&["beautiful", "safety"], 1), ids(&["a", "b"]), CoverageTable::new(3), Vec::new())
            .err()
            .unwrap();
        assert!(matches!(err, EngineError::CountsShapeMismatch { found: 3, expected: 2 }));
    }

    #[test]
    fn test_progress_reports_coverage() {
        let mut session = Session::new(config(&["safety"], 1), ids(&["a", "b", "c", "d"])).unwrap();
        assert_eq!(session.progress()[0].covered, 0);
        session.next_pair().unwrap();
        session.record_judgment(Outcome::Left).unwrap();
        let progress = session.progress()[0];
        assert_eq!(progress.covered, 2);
        assert_eq!(progress.total, 4);
        assert_eq!(progress.judgments, 1);
    }
}
