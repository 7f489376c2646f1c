//! Loudness consistency analysis
//!
//! Compares segment RMS between the original and rendered audio on the
//! reference channel (channel 0) to decide whether make-up gain needs
//! correcting.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::engine::{rms, SampleBuffer};

/// Number of segments the shorter buffer is split into
pub const SEGMENT_COUNT: usize = 20;

/// Original RMS below this counts as silence (ratio forced to 1.0)
pub const SILENCE_RMS: f64 = 0.001;

/// Ratios outside this open interval are discarded as outliers
pub const RATIO_BAND: (f64, f64) = (0.1, 10.0);

const MIN_CONSISTENCY: f64 = 0.7;
const MAX_AVERAGE_DEVIATION: f64 = 0.3;

/// Outcome of comparing original and processed loudness
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeAnalysis {
    /// processed/original RMS per segment, outliers included
    pub segment_ratios: Vec<f64>,
    /// Mean of the ratios inside the outlier band
    pub average_ratio: f64,
    /// 1 / (1 + variance), in (0, 1]
    pub consistency_score: f64,
    pub needs_correction: bool,
}

impl VolumeAnalysis {
    /// Ratios that survived the outlier filter
    pub fn retained_ratios(&self) -> impl Iterator<Item = f64> + '_ {
        self.segment_ratios
            .iter()
            .copied()
            .filter(|r| *r > RATIO_BAND.0 && *r < RATIO_BAND.1)
    }
}

fn segment_bounds(length: usize) -> impl Iterator<Item = (usize, usize)> {
    let size = length / SEGMENT_COUNT;
    (0..SEGMENT_COUNT).map(move |index| {
        let start = index * size;
        let end = if index == SEGMENT_COUNT - 1 {
            length
        } else {
            start + size
        };
        (start, end)
    })
}

/// Compare segment loudness of `processed` against `original`
///
/// Never fails: silent segments get a neutral ratio, and if every ratio is
/// discarded the result is neutral (average 1.0, fully consistent).
pub fn analyze(original: &SampleBuffer, processed: &SampleBuffer) -> VolumeAnalysis {
    let reference = original.channel(0).unwrap_or(&[]);
    let rendered = processed.channel(0).unwrap_or(&[]);
    let length = reference.len().min(rendered.len());

    let segment_ratios: Vec<f64> = segment_bounds(length)
        .map(|(start, end)| {
            let original_rms = rms(&reference[start..end]);
            if original_rms < SILENCE_RMS {
                1.0
            } else {
                rms(&rendered[start..end]) / original_rms
            }
        })
        .collect();

    let mut analysis = VolumeAnalysis {
        segment_ratios,
        average_ratio: 1.0,
        consistency_score: 1.0,
        needs_correction: false,
    };

    let retained: Vec<f64> = analysis.retained_ratios().collect();
    if retained.is_empty() {
        warn!("every segment ratio was an outlier, treating loudness as unchanged");
        return analysis;
    }

    let count = retained.len() as f64;
    let average = retained.iter().sum::<f64>() / count;
    let variance = retained.iter().map(|r| (r - average).powi(2)).sum::<f64>() / count;
    let consistency = 1.0 / (1.0 + variance);

    analysis.average_ratio = average;
    analysis.consistency_score = consistency;
    analysis.needs_correction =
        consistency < MIN_CONSISTENCY || (average - 1.0).abs() > MAX_AVERAGE_DEVIATION;

    debug!(
        average_ratio = average,
        consistency_score = consistency,
        retained = retained.len(),
        needs_correction = analysis.needs_correction,
        "loudness analysis complete"
    );

    analysis
}
