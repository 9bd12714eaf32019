use std::fmt;
use std::str::FromStr;

use crate::constants::{CONSERVATIVE_SIGMAS, DEFAULT_MEAN, DEFAULT_UNCERTAINTY};
use crate::error::EngineError;

/// Opaque item identifier, typically an image file name.
pub type ItemId = String;

/// A pairing: two item IDs to be compared, in display order (left, right).
pub type Pair = (ItemId, ItemId);

/// Belief about one item's latent quality on one dimension.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Skill {
    pub mean: f64,
    /// Standard deviation of the belief. Never negative.
    pub uncertainty: f64,
}

impl Skill {
    pub fn new(mean: f64, uncertainty: f64) -> Self {
        Skill { mean, uncertainty }
    }

    /// Leaderboard score that penalises items with few judgments.
    pub fn conservative(&self) -> f64 {
        self.mean - CONSERVATIVE_SIGMAS * self.uncertainty
    }
}

impl Default for Skill {
    fn default() -> Self {
        Skill::new(DEFAULT_MEAN, DEFAULT_UNCERTAINTY)
    }
}

/// Renders as `mean±uncertainty` with three decimals, the records-table format.
impl fmt::Display for Skill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}±{:.3}", self.mean, self.uncertainty)
    }
}

/// Result of one judgment, relative to the displayed (left, right) order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Outcome {
    Left,
    Right,
    #[cfg_attr(feature = "serde", serde(rename = "equal"))]
    Tie,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Left => "left",
            Outcome::Right => "right",
            Outcome::Tie => "equal",
        }
    }

    /// The same judgment expressed with the two sides swapped.
    pub fn mirrored(&self) -> Outcome {
        match self {
            Outcome::Left => Outcome::Right,
            Outcome::Right => Outcome::Left,
            Outcome::Tie => Outcome::Tie,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Outcome {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" | "l" => Ok(Outcome::Left),
            "right" | "r" => Ok(Outcome::Right),
            "equal" | "tie" | "draw" | "e" | "t" => Ok(Outcome::Tie),
            other => Err(EngineError::UnknownOutcome(other.to_string())),
        }
    }
}

/// Immutable log entry for one judged comparison.
///
/// `left_skill` and `right_skill` are the post-update beliefs, i.e. exactly
/// the values that drove the next sampling decision.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ComparisonRecord {
    /// Position in the session's judgment stream, starting at 0.
    pub sequence: u64,
    pub dimension: usize,
    pub left: ItemId,
    pub right: ItemId,
    pub outcome: Outcome,
    pub left_skill: Skill,
    pub right_skill: Skill,
    pub subject: Option<String>,
}

/// Ordered, named set of perceptual dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Dimensions {
    names: Vec<String>,
}

impl Dimensions {
    pub fn new<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Result<Self, EngineError> {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(EngineError::NoDimensions);
        }
        for (i, name) in names.iter().enumerate() {
            if names[..i].contains(name) {
                return Err(EngineError::DuplicateDimension(name.clone()));
            }
        }
        Ok(Dimensions { names })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name(&self, index: usize) -> Result<&str, EngineError> {
        self.names
            .get(index)
            .map(String::as_str)
            .ok_or(EngineError::DimensionOutOfRange { index, count: self.names.len() })
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skill_display_format() {
        let skill = Skill::new(27.1234, 7.5);
        assert_eq!(skill.to_string(), "27.123±7.500");
    }

    #[test]
    fn test_default_skill_is_prior() {
        let skill = Skill::default();
        assert_eq!(skill.mean, DEFAULT_MEAN);
        assert_eq!(skill.uncertainty, DEFAULT_UNCERTAINTY);
        assert!(skill.conservative().abs() < 1e-9);
    }

    #[test]
    fn test_outcome_parse() {
        assert_eq!("left".parse::<Outcome>().unwrap(), Outcome::Left);
        assert_eq!("R".parse::<Outcome>().unwrap(), Outcome::Right);
        assert_eq!("equal".parse::<Outcome>().unwrap(), Outcome::Tie);
        assert_eq!("draw".parse::<Outcome>().unwrap(), Outcome::Tie);
        assert!("maybe".parse::<Outcome>().is_err());
    }

    #[test]
    fn test_outcome_mirrored() {
        assert_eq!(Outcome::Left.mirrored(), Outcome::Right);
        assert_eq!(Outcome::Tie.mirrored(), Outcome::Tie);
    }

    #[test]
    fn test_dimensions_lookup() {
        let dims = Dimensions::new(["beautiful", "safety"]).unwrap();
        assert_eq!(dims.len(), 2);
        assert_eq!(dims.name(1).unwrap(), "safety");
        assert_eq!(dims.index_of("beautiful"), Some(0));
        assert!(matches!(
            dims.name(2),
            Err(EngineError::DimensionOutOfRange { index: 2, count: 2 })
        ));
    }

    #[test]
    fn test_dimensions_reject_duplicates() {
        let err = Dimensions::new(["safety", "lively", "safety"]).unwrap_err();
        assert!(matches!(err, EngineError::DuplicateDimension(ref name) if name == "safety"));
    }

    #[test]
    fn test_dimensions_require_one() {
        let empty: [&str; 0] = [];
        assert!(matches!(Dimensions::new(empty), Err(EngineError::NoDimensions)));
    }
}
