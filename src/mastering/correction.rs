//! Make-up gain correction
//!
//! After the first render the analyzer's verdict is turned into a make-up
//! gain. When that gain is far enough from the chain's initial value, the
//! pipeline re-renders once with it. There is never a third pass.

use serde::{Deserialize, Serialize};

use super::analysis::VolumeAnalysis;
use crate::dsp::Tier;

/// Loudness ratio aimed for when correcting (a deliberate 5% boost)
pub const TARGET_RATIO: f64 = 1.05;

/// Bounds of a corrected gain before the tier multiplier
pub const GAIN_RANGE: (f64, f64) = (0.8, 2.0);

/// Gain used when the analysis does not ask for correction
const NEUTRAL_GAIN: f64 = 1.1;

/// Make-up gain the analysis suggests for a tier
///
/// Premium scales the result by its loudness multiplier, including the
/// neutral case, so an uncorrected premium render lands at 1.98 rather than
/// its initial 2.2.
pub fn optimal_gain(analysis: &VolumeAnalysis, tier: Tier) -> f32 {
    let base = if analysis.needs_correction && analysis.average_ratio > 0.0 {
        (TARGET_RATIO / analysis.average_ratio).clamp(GAIN_RANGE.0, GAIN_RANGE.1)
    } else {
        NEUTRAL_GAIN
    };
    (base * tier.profile().loudness_multiplier as f64) as f32
}

/// Whether a second render pass is warranted
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorrectionDecision {
    pub initial_gain: f32,
    pub optimal_gain: f32,
    pub rerender: bool,
}

/// Compare a suggested gain with the gain the first pass used
pub fn decide(initial_gain: f32, optimal_gain: f32, tier: Tier) -> CorrectionDecision {
    let threshold = tier.profile().retry_threshold;
    CorrectionDecision {
        initial_gain,
        optimal_gain,
        rerender: (optimal_gain - initial_gain).abs() > threshold,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use test_case::test_case;

    fn analysis(average_ratio: f64, needs_correction: bool) -> VolumeAnalysis {
        VolumeAnalysis {
            segment_ratios: vec![average_ratio; 20],
            average_ratio,
            consistency_score: 1.0,
            needs_correction,
        }
    }

    #[test]
    fn test_double_loudness_clamps_to_floor() {
        // 1.05 / 2.0 = 0.525, below the 0.8 floor
        assert_abs_diff_eq!(optimal_gain(&analysis(2.0, true), Tier::Basic), 0.8);
    }

    #[test]
    fn test_quiet_render_clamps_to_ceiling() {
        assert_abs_diff_eq!(optimal_gain(&analysis(0.3, true), Tier::Basic), 2.0);
    }

    #[test]
    fn test_in_range_correction() {
        assert_abs_diff_eq!(optimal_gain(&analysis(0.7, true), Tier::Basic), 1.5, epsilon = 1e-6);
    }

    #[test_case(Tier::Free, 1.1 ; "free")]
    #[test_case(Tier::Basic, 1.1 ; "basic")]
    #[test_case(Tier::Premium, 1.98 ; "premium")]
    fn test_neutral_gain(tier: Tier, expected: f32) {
        assert_abs_diff_eq!(optimal_gain(&analysis(1.0, false), tier), expected, epsilon = 1e-6);
    }

    #[test]
    fn test_premium_multiplier_applies_to_correction() {
        assert_abs_diff_eq!(optimal_gain(&analysis(2.0, true), Tier::Premium), 1.44, epsilon = 1e-6);
    }

    #[test_case(1.15, false ; "small delta keeps first pass")]
    #[test_case(1.3, true ; "large delta rerenders")]
    #[test_case(1.1, false ; "equal gain")]
    #[test_case(0.8, true ; "large cut rerenders")]
    fn test_basic_retry_threshold(optimal: f32, rerender: bool) {
        let decision = decide(1.1, optimal, Tier::Basic);
        assert_eq!(decision.rerender, rerender);
        assert_eq!(decision.optimal_gain, optimal);
    }

    #[test]
    fn test_premium_uses_wider_threshold() {
        assert!(!decide(2.2, 2.05, Tier::Premium).rerender);
        assert!(decide(2.2, 1.98, Tier::Premium).rerender);
    }
}
