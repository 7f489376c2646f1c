//! Mastering chains
//!
//! Each tier maps to a fixed, ordered list of stages. Stages are grouped
//! (cleanup, equalization, dynamics, output) so the executor can report
//! progress between groups. Order matters: every stage consumes the
//! previous stage's output.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::dynamics::DynamicsParams;
use super::stage::StageSpec;

/// Name of the stage whose value the gain corrector replaces
pub const MAKEUP_GAIN_STAGE: &str = "makeup_gain";

/// Processing profile selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Basic,
    Premium,
}

/// Per-tier gain correction constants
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierProfile {
    /// Make-up gain used by the first render pass
    pub default_makeup_gain: f32,
    /// Minimum gain change that triggers a second pass
    pub retry_threshold: f32,
    /// Scale applied to the corrected gain (premium renders louder)
    pub loudness_multiplier: f32,
}

const BASIC_PROFILE: TierProfile = TierProfile {
    default_makeup_gain: 1.1,
    retry_threshold: 0.1,
    loudness_multiplier: 1.0,
};

const PREMIUM_PROFILE: TierProfile = TierProfile {
    default_makeup_gain: 2.2,
    retry_threshold: 0.2,
    loudness_multiplier: 1.8,
};

impl Tier {
    /// Parse a tier token
    ///
    /// Unknown tokens fall back to [`Tier::Basic`], never to premium.
    pub fn parse_lossy(token: &str) -> Tier {
        match token.trim().to_ascii_lowercase().as_str() {
            "free" => Tier::Free,
            "basic" => Tier::Basic,
            "premium" => Tier::Premium,
            other => {
                warn!(token = other, "unknown tier, using basic chain");
                Tier::Basic
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Basic => "basic",
            Tier::Premium => "premium",
        }
    }

    /// Gain correction constants for this tier (free shares basic's)
    pub fn profile(&self) -> TierProfile {
        match self {
            Tier::Free | Tier::Basic => BASIC_PROFILE,
            Tier::Premium => PREMIUM_PROFILE,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse stage grouping used for progress reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageGroup {
    Cleanup,
    Equalization,
    Dynamics,
    Output,
}

/// A named stage within a chain
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChainStage {
    pub name: &'static str,
    pub group: StageGroup,
    pub spec: StageSpec,
}

/// Ordered, immutable list of stages
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chain {
    tier: Tier,
    stages: Vec<ChainStage>,
}

impl Chain {
    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn stages(&self) -> &[ChainStage] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Current value of the make-up gain stage
    pub fn makeup_gain(&self) -> Option<f32> {
        self.stages.iter().find_map(|stage| match stage.spec {
            StageSpec::Gain { factor } if stage.name == MAKEUP_GAIN_STAGE => Some(factor),
            _ => None,
        })
    }

    /// Identical chain with only the make-up gain value replaced
    pub fn with_makeup_gain(&self, factor: f32) -> Chain {
        let stages = self
            .stages
            .iter()
            .map(|stage| {
                if stage.name == MAKEUP_GAIN_STAGE {
                    ChainStage {
                        spec: StageSpec::Gain { factor },
                        ..*stage
                    }
                } else {
                    *stage
                }
            })
            .collect();
        Chain {
            tier: self.tier,
            stages,
        }
    }

    /// Consecutive runs of stages sharing a group, in chain order
    pub fn groups(&self) -> Vec<(StageGroup, &[ChainStage])> {
        let mut groups = Vec::new();
        let mut start = 0;
        for index in 1..=self.stages.len() {
            let boundary = index == self.stages.len()
                || self.stages[index].group != self.stages[start].group;
            if boundary {
                groups.push((self.stages[start].group, &self.stages[start..index]));
                start = index;
            }
        }
        groups
    }
}

// ============================================================================
// Chain definitions
// ============================================================================

const fn high_pass(name: &'static str, frequency_hz: f32, q: f32) -> ChainStage {
    ChainStage {
        name,
        group: StageGroup::Cleanup,
        spec: StageSpec::HighPass { frequency_hz, q },
    }
}

const fn peaking(
    name: &'static str,
    group: StageGroup,
    frequency_hz: f32,
    q: f32,
    gain_db: f32,
) -> ChainStage {
    ChainStage {
        name,
        group,
        spec: StageSpec::Peaking {
            frequency_hz,
            q,
            gain_db,
        },
    }
}

const fn stage(name: &'static str, group: StageGroup, spec: StageSpec) -> ChainStage {
    ChainStage { name, group, spec }
}

fn basic_stages() -> Vec<ChainStage> {
    use StageGroup::*;
    vec![
        high_pass("high_pass", 40.0, 0.7),
        stage(
            "noise_gate",
            Cleanup,
            StageSpec::NoiseGate(DynamicsParams::new(-65.0, 10.0, 2.5, 0.01, 0.2)),
        ),
        peaking("warmth", Equalization, 200.0, 0.8, 0.8),
        peaking("presence", Equalization, 2_500.0, 1.2, 1.5),
        peaking("air", Equalization, 8_000.0, 0.8, 1.0),
        stage(
            "compressor",
            Dynamics,
            StageSpec::Compressor(DynamicsParams::new(-25.0, 12.0, 1.5, 0.02, 0.25)),
        ),
        stage(
            MAKEUP_GAIN_STAGE,
            Output,
            StageSpec::Gain {
                factor: BASIC_PROFILE.default_makeup_gain,
            },
        ),
        stage(
            "limiter",
            Output,
            StageSpec::Limiter(DynamicsParams::new(-6.0, 2.0, 10.0, 0.001, 0.01)),
        ),
    ]
}

fn premium_stages() -> Vec<ChainStage> {
    use StageGroup::*;
    vec![
        high_pass("high_pass", 40.0, 0.7),
        stage(
            "noise_gate",
            Cleanup,
            StageSpec::NoiseGate(DynamicsParams::new(-60.0, 8.0, 3.0, 0.008, 0.15)),
        ),
        stage(
            "hum_notch",
            Cleanup,
            StageSpec::Notch {
                frequency_hz: 60.0,
                q: 30.0,
            },
        ),
        stage(
            "hum_harmonic_notch",
            Cleanup,
            StageSpec::Notch {
                frequency_hz: 120.0,
                q: 30.0,
            },
        ),
        peaking("de_esser", Cleanup, 6_500.0, 2.0, -4.0),
        high_pass("noise_floor", 35.0, 0.5),
        high_pass("sub_bass", 30.0, 0.8),
        peaking("bass", Equalization, 80.0, 1.0, 3.0),
        peaking("warmth", Equalization, 200.0, 0.8, 2.0),
        peaking("mid_clarity", Equalization, 500.0, 1.5, -1.5),
        peaking("presence", Equalization, 2_500.0, 1.2, 4.0),
        peaking("high_mid", Equalization, 5_000.0, 1.2, 2.0),
        peaking("air", Equalization, 12_000.0, 0.8, 3.0),
        peaking("ultra_high", Equalization, 16_000.0, 0.8, 3.0),
        stage(
            "pre_compressor",
            Dynamics,
            StageSpec::Compressor(DynamicsParams::new(-30.0, 12.0, 1.8, 0.02, 0.3)),
        ),
        stage(
            "main_compressor",
            Dynamics,
            StageSpec::Compressor(DynamicsParams::new(-22.0, 10.0, 2.5, 0.015, 0.2)),
        ),
        stage("stereo_width", Output, StageSpec::StereoWiden { width: 1.2 }),
        stage(
            MAKEUP_GAIN_STAGE,
            Output,
            StageSpec::Gain {
                factor: PREMIUM_PROFILE.default_makeup_gain,
            },
        ),
        stage(
            "limiter",
            Output,
            StageSpec::Limiter(DynamicsParams::new(-0.5, 0.0, 25.0, 0.0005, 0.008)),
        ),
        stage(
            "maximizer",
            Output,
            StageSpec::Limiter(DynamicsParams::new(-0.1, 0.0, 50.0, 0.0001, 0.005)),
        ),
        stage("safety_trim", Output, StageSpec::Gain { factor: 0.92 }),
    ]
}

/// Build the stage list for a tier
///
/// Free and basic share one chain; premium is the extended chain.
pub fn build_chain(tier: Tier) -> Chain {
    let stages = match tier {
        Tier::Free | Tier::Basic => basic_stages(),
        Tier::Premium => premium_stages(),
    };
    Chain { tier, stages }
}
