/// Closed-form Gaussian skill update for a single pairwise comparison.
///
/// One comparison is one factor graph with two skill variables, two
/// performance variables and a truncation factor on their difference. For a
/// single comparison the message passing collapses to the closed form below:
/// the performance difference is truncated to `> margin` (decisive) or
/// `|d| <= margin` (draw), and both skill posteriors are moment-matched back to
/// Gaussians.
use std::f64::consts::{PI, SQRT_2};

use statrs::function::erf::{erfc, erfc_inv};

use crate::constants::{
    DEFAULT_BETA, DEFAULT_DRAW_PROBABILITY, DEFAULT_TAU, MIN_UNCERTAINTY,
};
use crate::types::{Outcome, Skill};

/// Tunable parameters of the update rule.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RatingParams {
    /// Per-judgment performance noise.
    pub beta: f64,
    /// Dynamics added to both variances before each update.
    pub tau: f64,
    /// Prior probability of a draw between equal skills. Must be in [0, 1).
    pub draw_probability: f64,
    /// Lower bound on uncertainty after an update.
    pub min_uncertainty: f64,
}

impl Default for RatingParams {
    fn default() -> Self {
        RatingParams {
            beta: DEFAULT_BETA,
            tau: DEFAULT_TAU,
            draw_probability: DEFAULT_DRAW_PROBABILITY,
            min_uncertainty: MIN_UNCERTAINTY,
        }
    }
}

impl RatingParams {
    /// Performance-difference margin below which a judgment counts as a draw.
    pub fn draw_margin(&self) -> f64 {
        ppf((self.draw_probability + 1.0) / 2.0) * SQRT_2 * self.beta
    }
}

pub(crate) fn pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
}

pub(crate) fn cdf(x: f64) -> f64 {
    0.5 * erfc(-x / SQRT_2)
}

pub(crate) fn ppf(p: f64) -> f64 {
    -SQRT_2 * erfc_inv(2.0 * p)
}

/// Mean correction for a decisive outcome; `diff` and `margin` are in units of `c`.
fn v_win(diff: f64, margin: f64) -> f64 {
    let x = diff - margin;
    let denom = cdf(x);
    if denom > f64::MIN_POSITIVE {
        pdf(x) / denom
    } else {
        -x
    }
}

/// Variance correction for a decisive outcome, in (0, 1).
fn w_win(diff: f64, margin: f64) -> f64 {
    let x = diff - margin;
    let v = v_win(diff, margin);
    clamp_w(v * (v + x))
}

/// Mean correction for a draw. Negative for the stronger side.
fn v_draw(diff: f64, margin: f64) -> f64 {
    let abs_diff = diff.abs();
    let a = margin - abs_diff;
    let b = -margin - abs_diff;
    let denom = cdf(a) - cdf(b);
    let v = if denom > f64::MIN_POSITIVE {
        (pdf(b) - pdf(a)) / denom
    } else {
        a
    };
    if diff < 0.0 { -v } else { v }
}

fn w_draw(diff: f64, margin: f64) -> f64 {
    let abs_diff = diff.abs();
    let a = margin - abs_diff;
    let b = -margin - abs_diff;
    let denom = cdf(a) - cdf(b);
    if denom <= f64::MIN_POSITIVE {
        return clamp_w(1.0);
    }
    let v = v_draw(abs_diff, margin);
    clamp_w(v * v + (a * pdf(a) - b * pdf(b)) / denom)
}

// w is a fraction of variance removed; 1.0 would zero the uncertainty.
fn clamp_w(w: f64) -> f64 {
    if w.is_finite() {
        w.clamp(0.0, 1.0 - 1e-9)
    } else {
        1.0 - 1e-9
    }
}

/// Apply one judgment between `left` and `right`, returning their new skills.
///
/// Winner's mean rises, loser's falls; upsets move both further than expected
/// results. A draw pulls the two means toward each other. Uncertainty never
/// increases and never drops below `params.min_uncertainty`.
pub fn rate_pair(left: Skill, right: Skill, outcome: Outcome, params: &RatingParams) -> (Skill, Skill) {
    match outcome {
        Outcome::Left => rate_decisive(left, right, params),
        Outcome::Right => {
            let (right_new, left_new) = rate_decisive(right, left, params);
            (left_new, right_new)
        }
        Outcome::Tie => rate_draw(left, right, params),
    }
}

fn rate_decisive(winner: Skill, loser: Skill, params: &RatingParams) -> (Skill, Skill) {
    let (var_w, var_l, c) = joint_spread(winner, loser, params);
    let diff = (winner.mean - loser.mean) / c;
    let margin = params.draw_margin() / c;
    let v = v_win(diff, margin);
    let w = w_win(diff, margin);

    let new_winner = apply(winner, var_w, c, v, w, params);
    let new_loser = apply(loser, var_l, c, -v, w, params);
    (new_winner, new_loser)
}

fn rate_draw(left: Skill, right: Skill, params: &RatingParams) -> (Skill, Skill) {
    let (var_l, var_r, c) = joint_spread(left, right, params);
    let diff = (left.mean - right.mean) / c;
    let margin = params.draw_margin() / c;
    let v = v_draw(diff, margin);
    let w = w_draw(diff, margin);

    (apply(left, var_l, c, v, w, params), apply(right, var_r, c, -v, w, params))
}

/// Dynamics-inflated variances of both sides and the joint spread `c`.
fn joint_spread(a: Skill, b: Skill, params: &RatingParams) -> (f64, f64, f64) {
    let tau2 = params.tau * params.tau;
    let var_a = a.uncertainty * a.uncertainty + tau2;
    let var_b = b.uncertainty * b.uncertainty + tau2;
    let c = (2.0 * params.beta * params.beta + var_a + var_b).sqrt();
    (var_a, var_b, c)
}

fn apply(prior: Skill, var: f64, c: f64, v: f64, w: f64, params: &RatingParams) -> Skill {
    let mean = prior.mean + var / c * v;
    let computed = (var * (1.0 - var / (c * c) * w)).max(0.0).sqrt();
    let floor = params.min_uncertainty.min(prior.uncertainty);
    Skill::new(mean, computed.clamp(floor, prior.uncertainty))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prior() -> Skill {
        Skill::default()
    }

    #[test]
    fn test_cdf_ppf_inverse() {
        for &p in &[0.05, 0.25, 0.5, 0.55, 0.9] {
            assert!((cdf(ppf(p)) - p).abs() < 1e-9, "p = {p}");
        }
        assert!((cdf(0.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_left_win_moves_means_apart() {
        let params = RatingParams::default();
        let (l, r) = rate_pair(prior(), prior(), Outcome::Left, &params);
        assert!(l.mean > 25.0);
        assert!(r.mean < 25.0);
        assert!((l.mean - 25.0 - (25.0 - r.mean)).abs() < 1e-9, "equal priors move symmetrically");
        assert!(l.uncertainty <= prior().uncertainty);
        assert!(r.uncertainty <= prior().uncertainty);
    }

    #[test]
    fn test_right_win_mirrors_left_win() {
        let params = RatingParams::default();
        let a = Skill::new(28.0, 6.0);
        let b = Skill::new(22.0, 7.0);
        let (a1, b1) = rate_pair(a, b, Outcome::Right, &params);
        let (b2, a2) = rate_pair(b, a, Outcome::Left, &params);
        assert_eq!(a1, a2);
        assert_eq!(b1, b2);
    }

    #[test]
    fn test_upset_moves_more_than_expected_result() {
        let params = RatingParams::default();
        let strong = Skill::new(32.0, 5.0);
        let weak = Skill::new(18.0, 5.0);
        let (expected, _) = rate_pair(strong, weak, Outcome::Left, &params);
        let (upset_loser, _) = rate_pair(strong, weak, Outcome::Right, &params);
        let expected_shift = expected.mean - strong.mean;
        let upset_shift = strong.mean - upset_loser.mean;
        assert!(upset_shift > expected_shift);
    }

    #[test]
    fn test_draw_between_equals_keeps_means() {
        let params = RatingParams::default();
        let (l, r) = rate_pair(prior(), prior(), Outcome::Tie, &params);
        assert!((l.mean - 25.0).abs() < 1e-9);
        assert!((r.mean - 25.0).abs() < 1e-9);
        assert!(l.uncertainty < prior().uncertainty);
    }

    #[test]
    fn test_draw_pulls_means_together() {
        let params = RatingParams::default();
        let strong = Skill::new(30.0, 6.0);
        let weak = Skill::new(20.0, 6.0);
        let (s, w) = rate_pair(strong, weak, Outcome::Tie, &params);
        assert!(s.mean < strong.mean);
        assert!(w.mean > weak.mean);
    }

    #[test]
    fn test_draw_shift_bounded_by_decisive_shift() {
        let params = RatingParams::default();
        let cases = [
            (prior(), prior()),
            (Skill::new(30.0, 6.0), Skill::new(20.0, 6.0)),
            (Skill::new(20.0, 8.0), Skill::new(35.0, 2.0)),
            (Skill::new(25.0, 1.0), Skill::new(24.0, 8.3)),
            (Skill::new(60.0, 3.0), Skill::new(0.0, 3.0)),
        ];
        for (left, right) in cases {
            let (dl, dr) = rate_pair(left, right, Outcome::Tie, &params);
            let (wl, wr) = rate_pair(left, right, Outcome::Left, &params);
            let (ll, lr) = rate_pair(left, right, Outcome::Right, &params);

            let draw_left = (dl.mean - left.mean).abs();
            let draw_right = (dr.mean - right.mean).abs();
            let decisive_left = (wl.mean - left.mean).abs().max((ll.mean - left.mean).abs());
            let decisive_right = (wr.mean - right.mean).abs().max((lr.mean - right.mean).abs());
            assert!(draw_left <= decisive_left + 1e-12, "{left:?} vs {right:?}");
            assert!(draw_right <= decisive_right + 1e-12, "{left:?} vs {right:?}");
        }
    }

    #[test]
    fn test_uncertainty_never_increases() {
        let params = RatingParams::default();
        let tiny = Skill::new(25.0, 0.01);
        for outcome in [Outcome::Left, Outcome::Right, Outcome::Tie] {
            let (l, r) = rate_pair(tiny, prior(), outcome, &params);
            assert!(l.uncertainty <= tiny.uncertainty);
            assert!(r.uncertainty <= prior().uncertainty);
            assert!(l.uncertainty > 0.0);
        }
    }

    #[test]
    fn test_extreme_gap_stays_finite() {
        let params = RatingParams::default();
        let top = Skill::new(500.0, 0.5);
        let bottom = Skill::new(-500.0, 0.5);
        for outcome in [Outcome::Left, Outcome::Right, Outcome::Tie] {
            let (t, b) = rate_pair(top, bottom, outcome, &params);
            assert!(t.mean.is_finite() && b.mean.is_finite());
            assert!(t.uncertainty.is_finite() && b.uncertainty.is_finite());
        }
    }

    #[test]
    fn test_repeated_wins_converge() {
        let params = RatingParams::default();
        let mut left = prior();
        let mut right = prior();
        let mut gaps = Vec::new();
        let mut sigmas = Vec::new();
        for n in 1..=2000 {
            let (l, r) = rate_pair(left, right, Outcome::Left, &params);
            left = l;
            right = r;
            if n == 10 || n == 1000 || n == 2000 {
                gaps.push(left.mean - right.mean);
                sigmas.push(left.uncertainty);
            }
        }
        let early_growth = gaps[0];
        let late_growth = gaps[2] - gaps[1];
        assert!(late_growth >= 0.0);
        assert!(late_growth < 0.25 * early_growth, "gap still growing: {gaps:?}");
        assert!(sigmas[2] <= sigmas[1]);
        assert!(sigmas[2] > 10.0 * MIN_UNCERTAINTY, "uncertainty collapsed: {sigmas:?}");
    }
}
