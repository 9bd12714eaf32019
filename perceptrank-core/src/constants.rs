/// Prior mean assigned to every item on every dimension before any comparison.
pub const DEFAULT_MEAN: f64 = 25.0;

/// Prior uncertainty (standard deviation). The conventional `mean / 3` keeps
/// the prior's 3-sigma band above zero.
pub const DEFAULT_UNCERTAINTY: f64 = DEFAULT_MEAN / 3.0;

/// Performance noise: the spread of a single judgment around an item's true
/// quality. Half the prior uncertainty.
pub const DEFAULT_BETA: f64 = DEFAULT_UNCERTAINTY / 2.0;

/// Dynamics ("volatility") added to both variances before every update.
/// Keeps uncertainty from collapsing to zero after long runs of judgments.
pub const DEFAULT_TAU: f64 = DEFAULT_UNCERTAINTY / 100.0;

/// Prior probability that a human answers "equal" for two evenly matched images.
pub const DEFAULT_DRAW_PROBABILITY: f64 = 0.10;

/// Uncertainty never drops below this after an update.
pub const MIN_UNCERTAINTY: f64 = 1e-3;

/// How many uncertainties to subtract from the mean for the conservative
/// leaderboard score.
pub const CONSERVATIVE_SIGMAS: f64 = 3.0;

/// Maximum number of pairs drawn and discarded because an image failed to
/// resolve before `Session::next_displayable_pair` gives up.
pub const MAX_DRAW_ATTEMPTS: usize = 32;
