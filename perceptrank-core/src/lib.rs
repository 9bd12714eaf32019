/// perceptrank-core: rating and pair-selection engine for pairwise perceptual studies.
///
/// Humans judge two images at a time on one perceptual dimension ("which looks
/// safer?"). Each judgment updates a Gaussian skill belief per (image,
/// dimension), and a coverage-driven sampler picks the next pair so every image
/// collects enough judgments. No IO: the driver supplies the images and the
/// storage through the traits in [`boundary`].
///
/// # Quick start
///
/// ```rust
/// use perceptrank_core::{Coverage, Dimensions, MemoryStore, Outcome, Session, SessionConfig};
///
/// let dimensions = Dimensions::new(["beautiful", "safety"]).unwrap();
/// let mut config = SessionConfig::new(dimensions);
/// config.coverage = Coverage::AtLeast(2);
/// config.seed = Some(7);
///
/// let images = vec!["a.jpg".to_string(), "b.jpg".to_string(), "c.jpg".to_string()];
/// let mut session = Session::new(config, images).unwrap();
/// let mut store = MemoryStore::default();
///
/// while let Some((left, right)) = session.next_pair().unwrap() {
///     // Show both images, collect the human's answer.
///     let outcome = if left < right { Outcome::Left } else { Outcome::Right };
///     session.record_judgment(outcome).unwrap();
///     session.persist(&mut store).unwrap();
/// }
///
/// for dim in session.export_summary().dimensions {
///     for item in &dim.items {
///         println!("{} {}: {:.3}±{:.3}", dim.name, item.item, item.mean, item.uncertainty);
///     }
/// }
/// ```

pub mod boundary;
pub mod constants;
pub mod coverage;
pub mod error;
pub mod gaussian;
pub mod pairing;
pub mod progression;
pub mod rating;
pub mod schedule;
pub mod session;
pub mod summary;
pub mod types;

// Re-export primary public API at crate root.
pub use boundary::{AssetResolver, MemoryStore, PersistentStore, StaticAssets};
pub use coverage::{Coverage, CoverageTable};
pub use error::{EngineError, PersistenceError};
pub use gaussian::{rate_pair, RatingParams};
pub use pairing::{calculate_sampling_weight, eligible_items, next_pair, PairSampler, Weighting};
pub use progression::{ExhaustionCheck, Phase, SessionProgression};
pub use rating::RatingStore;
pub use schedule::PairQueue;
pub use session::{PairSource, Session, SessionConfig};
pub use summary::{DimensionProgress, DimensionSummary, ItemSummary, Summary};
pub use types::{ComparisonRecord, Dimensions, ItemId, Outcome, Pair, Skill};
