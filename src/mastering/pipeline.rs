//! Mastering pipeline
//!
//! decode → render → analyze → optional corrective render → trim → encode.
//!
//! Only decoding can fail the whole job. Once a buffer exists, render
//! failures degrade to unprocessed (or first-pass) audio and the job still
//! delivers both outputs.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

use super::analysis::{analyze, VolumeAnalysis};
use super::correction::{decide, optimal_gain};
use super::executor::render_or_passthrough;
use super::preview::trim;
use super::progress::{
    ProgressSink, ProgressTracker, ANALYZED, CORRECTED, DECODED, DONE, ENCODED, FIRST_PASS_DONE,
    START, TRIMMED,
};
use crate::config::MasteringConfig;
use crate::dsp::{build_chain, Chain, Tier};
use crate::engine::io::MAX_CHANNELS;
use crate::engine::{encode_wav, AudioDecoder, RenderContext, SampleBuffer, SymphoniaDecoder};
use crate::error::{MasterError, Result};

/// Summary of what the pipeline did
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasteringReport {
    /// Matches the `job_id` field on the job's log span
    pub job_id: Uuid,
    pub tier: Tier,
    /// Render passes that ran (1 or 2)
    pub passes: u8,
    pub initial_makeup_gain: f32,
    pub applied_makeup_gain: f32,
    /// Absent when correction is disabled or the first pass fell back
    pub analysis: Option<VolumeAnalysis>,
    /// True when any render pass failed and fell back
    pub degraded: bool,
    pub full_seconds: f64,
    pub preview_seconds: f64,
}

/// Encoded outputs of one mastering job
#[derive(Debug, Clone)]
pub struct ProcessingResult {
    /// WAV bytes of the trimmed preview
    pub preview: Vec<u8>,
    /// WAV bytes of the full render
    pub full: Vec<u8>,
    /// Samples per channel in the full render
    pub full_length: usize,
    pub report: MasteringReport,
}

/// State carried between pipeline steps
///
/// Owns every buffer it touches so steps can be moved onto worker threads.
pub(crate) struct Job {
    id: Uuid,
    tier: Tier,
    ctx: RenderContext,
    chain: Chain,
    original: SampleBuffer,
    processed: SampleBuffer,
    initial_gain: f32,
    applied_gain: f32,
    passes: u8,
    degraded: bool,
    analysis: Option<VolumeAnalysis>,
}

impl Job {
    pub(crate) fn new(id: Uuid, original: SampleBuffer, tier: Tier) -> Result<Self> {
        if original.is_empty() {
            return Err(MasterError::EmptyAudio);
        }
        if original.num_channels() > MAX_CHANNELS {
            return Err(MasterError::UnsupportedFormat {
                format: format!("{}-channel audio", original.num_channels()),
            });
        }

        let chain = build_chain(tier);
        let initial_gain = chain.makeup_gain().unwrap_or(1.0);
        Ok(Self {
            id,
            tier,
            ctx: RenderContext::for_buffer(&original),
            chain,
            processed: original.clone(),
            original,
            initial_gain,
            applied_gain: initial_gain,
            passes: 0,
            degraded: false,
            analysis: None,
        })
    }

    /// First render with the tier's default chain
    pub(crate) fn first_pass(&mut self, progress: &mut ProgressTracker<'_>) {
        let rendered = render_or_passthrough(
            &self.original,
            &self.chain,
            &self.ctx,
            progress,
            (DECODED, FIRST_PASS_DONE),
        );
        self.passes = 1;
        self.degraded = rendered.fell_back;
        self.processed = rendered.buffer;
    }

    /// Analyze the first pass and return the corrected chain if a second
    /// pass is warranted
    pub(crate) fn plan_correction(
        &mut self,
        config: &MasteringConfig,
        progress: &mut ProgressTracker<'_>,
    ) -> Option<Chain> {
        if !config.gain_correction {
            debug!("gain correction disabled");
            progress.report(ANALYZED);
            return None;
        }
        if self.degraded {
            warn!("first pass fell back, skipping gain correction");
            progress.report(ANALYZED);
            return None;
        }

        let analysis = analyze(&self.original, &self.processed);
        let decision = decide(
            self.initial_gain,
            optimal_gain(&analysis, self.tier),
            self.tier,
        );
        self.analysis = Some(analysis);
        progress.report(ANALYZED);

        debug!(
            initial_gain = decision.initial_gain,
            optimal_gain = decision.optimal_gain,
            rerender = decision.rerender,
            "gain correction decision"
        );

        decision
            .rerender
            .then(|| self.chain.with_makeup_gain(decision.optimal_gain))
    }

    /// Second render with the corrected make-up gain
    ///
    /// On failure the first-pass output is kept.
    pub(crate) fn correction_pass(&mut self, chain: &Chain, progress: &mut ProgressTracker<'_>) {
        let rendered = render_or_passthrough(
            &self.original,
            chain,
            &self.ctx,
            progress,
            (ANALYZED, CORRECTED),
        );
        self.passes = 2;
        if rendered.fell_back {
            self.degraded = true;
        } else {
            self.processed = rendered.buffer;
            self.applied_gain = chain.makeup_gain().unwrap_or(self.applied_gain);
        }
    }

    /// Trim the preview and encode both outputs
    pub(crate) fn finish(
        self,
        config: &MasteringConfig,
        progress: &mut ProgressTracker<'_>,
    ) -> Result<ProcessingResult> {
        progress.report(CORRECTED);

        let preview_buffer = trim(&self.processed, config.preview_seconds);
        progress.report(TRIMMED);

        let full = encode_wav(&self.processed)?;
        let preview = encode_wav(&preview_buffer)?;
        progress.report(ENCODED);

        let report = MasteringReport {
            job_id: self.id,
            tier: self.tier,
            passes: self.passes,
            initial_makeup_gain: self.initial_gain,
            applied_makeup_gain: self.applied_gain,
            analysis: self.analysis,
            degraded: self.degraded,
            full_seconds: self.processed.duration_secs(),
            preview_seconds: preview_buffer.duration_secs(),
        };

        progress.report(DONE);
        Ok(ProcessingResult {
            preview,
            full,
            full_length: self.processed.len(),
            report,
        })
    }
}

/// Tiered mastering pipeline
///
/// Holds no audio between calls; one instance can serve any number of jobs,
/// including concurrently from several threads.
pub struct Mastering {
    config: MasteringConfig,
    pub(crate) decoder: Arc<dyn AudioDecoder>,
}

impl Default for Mastering {
    fn default() -> Self {
        Self::new(MasteringConfig::default())
    }
}

impl Mastering {
    /// Pipeline using the symphonia decoder
    pub fn new(config: MasteringConfig) -> Self {
        Self::with_decoder(config, SymphoniaDecoder::new())
    }

    /// Pipeline using a caller-provided decoder
    pub fn with_decoder(config: MasteringConfig, decoder: impl AudioDecoder + 'static) -> Self {
        Self {
            config,
            decoder: Arc::new(decoder),
        }
    }

    pub fn config(&self) -> &MasteringConfig {
        &self.config
    }

    /// Master an encoded audio file
    ///
    /// # Errors
    /// * `Decode`, `UnsupportedFormat`, `EmptyAudio` - the input could not be decoded
    /// * `Encode` - the outputs could not be written
    pub fn process(
        &self,
        bytes: &[u8],
        type_hint: Option<&str>,
        tier: Tier,
        sink: &mut dyn ProgressSink,
    ) -> Result<ProcessingResult> {
        let job_id = Uuid::new_v4();
        let span = info_span!("mastering", %job_id, %tier);
        let _guard = span.enter();
        let started = Instant::now();

        let mut progress = ProgressTracker::new(sink);
        progress.report(START);

        let original = self.decoder.decode(bytes, type_hint)?;
        progress.report(DECODED);

        let result = self.run(job_id, original, tier, &mut progress)?;
        log_completion(&result, started);
        Ok(result)
    }

    /// Master an already decoded buffer
    ///
    /// Progress starts at the decode milestone.
    pub fn process_buffer(
        &self,
        original: SampleBuffer,
        tier: Tier,
        sink: &mut dyn ProgressSink,
    ) -> Result<ProcessingResult> {
        let job_id = Uuid::new_v4();
        let span = info_span!("mastering", %job_id, %tier);
        let _guard = span.enter();
        let started = Instant::now();

        let mut progress = ProgressTracker::new(sink);
        progress.report(DECODED);

        let result = self.run(job_id, original, tier, &mut progress)?;
        log_completion(&result, started);
        Ok(result)
    }

    fn run(
        &self,
        job_id: Uuid,
        original: SampleBuffer,
        tier: Tier,
        progress: &mut ProgressTracker<'_>,
    ) -> Result<ProcessingResult> {
        let mut job = Job::new(job_id, original, tier)?;
        job.first_pass(progress);
        if let Some(corrected) = job.plan_correction(&self.config, progress) {
            job.correction_pass(&corrected, progress);
        }
        job.finish(&self.config, progress)
    }
}

pub(crate) fn log_completion(result: &ProcessingResult, started: Instant) {
    let report = &result.report;
    info!(
        passes = report.passes,
        makeup_gain = report.applied_makeup_gain,
        degraded = report.degraded,
        full_seconds = report.full_seconds,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "mastering complete"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{encoded_len, WAV_HEADER_LEN};
    use crate::mastering::executor::render;
    use crate::mastering::progress::NoProgress;

    struct FixedDecoder(SampleBuffer);

    impl AudioDecoder for FixedDecoder {
        fn decode(&self, _bytes: &[u8], _hint: Option<&str>) -> Result<SampleBuffer> {
            Ok(self.0.clone())
        }
    }

    struct FailingDecoder;

    impl AudioDecoder for FailingDecoder {
        fn decode(&self, _bytes: &[u8], _hint: Option<&str>) -> Result<SampleBuffer> {
            Err(MasterError::decode("corrupt"))
        }
    }

    #[test]
    fn test_process_reports_milestones_in_order() {
        let input = SampleBuffer::sine(440.0, 0.3, 2.0, 22_050, 1).unwrap();
        let mastering = Mastering::with_decoder(MasteringConfig::default(), FixedDecoder(input));

        let mut seen = Vec::new();
        let mut sink = |p: u8| seen.push(p);
        let result = mastering.process(b"", None, Tier::Basic, &mut sink).unwrap();

        assert_eq!(seen.first(), Some(&5));
        assert_eq!(seen.last(), Some(&100));
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        for milestone in [30, 60, 65, 75, 85, 95] {
            assert!(seen.contains(&milestone), "missing milestone {}", milestone);
        }
        assert_eq!(result.full.len(), encoded_len(&SampleBuffer::silent(1, 44_100, 22_050).unwrap()));
    }

    #[test]
    fn test_decode_failure_propagates() {
        let mastering = Mastering::with_decoder(MasteringConfig::default(), FailingDecoder);
        let err = mastering
            .process(b"junk", None, Tier::Premium, &mut NoProgress)
            .unwrap_err();
        assert_eq!(err.error_code(), "DECODE_FAILURE");
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_preview_respects_config() {
        let config = MasteringConfig {
            preview_seconds: 0.5,
            ..MasteringConfig::default()
        };
        let input = SampleBuffer::sine(440.0, 0.3, 2.0, 8_000, 2).unwrap();
        let result = Mastering::new(config)
            .process_buffer(input, Tier::Premium, &mut NoProgress)
            .unwrap();

        assert_eq!(result.full_length, 16_000);
        assert_eq!(result.preview.len(), WAV_HEADER_LEN + 4_000 * 2 * 2);
        assert_eq!(result.report.preview_seconds, 0.5);
    }

    #[test]
    fn test_loud_premium_render_is_corrected() {
        let input = SampleBuffer::sine(440.0, 0.3, 1.0, 44_100, 2).unwrap();
        let result = Mastering::default()
            .process_buffer(input, Tier::Premium, &mut NoProgress)
            .unwrap();

        assert_eq!(result.report.passes, 2);
        assert_eq!(result.report.initial_makeup_gain, 2.2);
        assert_ne!(result.report.applied_makeup_gain, 2.2);
        assert!(result.report.analysis.is_some());
    }

    #[test]
    fn test_correction_disabled_runs_single_pass() {
        let config = MasteringConfig {
            gain_correction: false,
            ..MasteringConfig::default()
        };
        let input = SampleBuffer::sine(440.0, 0.3, 1.0, 44_100, 1).unwrap();
        let result = Mastering::new(config)
            .process_buffer(input, Tier::Premium, &mut NoProgress)
            .unwrap();

        assert_eq!(result.report.passes, 1);
        assert_eq!(result.report.applied_makeup_gain, 2.2);
        assert!(result.report.analysis.is_none());
    }

    #[test]
    fn test_empty_and_surround_input_rejected() {
        let mastering = Mastering::default();
        let empty = SampleBuffer::silent(1, 0, 44_100).unwrap();
        assert!(matches!(
            mastering.process_buffer(empty, Tier::Basic, &mut NoProgress),
            Err(MasterError::EmptyAudio)
        ));

        let surround = SampleBuffer::silent(6, 100, 44_100).unwrap();
        assert!(matches!(
            mastering.process_buffer(surround, Tier::Basic, &mut NoProgress),
            Err(MasterError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_second_pass_failure_keeps_first_pass() {
        let input = SampleBuffer::sine(440.0, 0.3, 0.5, 44_100, 1).unwrap();
        let mut job = Job::new(Uuid::new_v4(), input, Tier::Basic).unwrap();
        let mut sink = NoProgress;
        let mut progress = ProgressTracker::new(&mut sink);

        job.first_pass(&mut progress);
        let first = job.processed.clone();
        let broken = job.chain.with_makeup_gain(f32::INFINITY);
        job.correction_pass(&broken, &mut progress);

        assert!(job.degraded);
        assert_eq!(job.passes, 2);
        assert_eq!(job.processed, first);
        assert_eq!(job.applied_gain, 1.1);
    }

    #[test]
    fn test_correction_pass_renders_original() {
        let input = SampleBuffer::sine(440.0, 0.4, 2.0, 44_100, 1).unwrap();
        let mut job = Job::new(Uuid::new_v4(), input.clone(), Tier::Basic).unwrap();
        let mut sink = NoProgress;
        let mut progress = ProgressTracker::new(&mut sink);

        job.first_pass(&mut progress);
        let corrected = job
            .plan_correction(&MasteringConfig::default(), &mut progress)
            .unwrap();
        job.correction_pass(&corrected, &mut progress);

        let expected = render(&input, &corrected, &RenderContext::for_buffer(&input)).unwrap();
        assert_eq!(job.original, input);
        assert_eq!(job.processed, expected);
        assert_eq!(job.passes, 2);
        assert!(!job.degraded);
        assert_eq!(Some(job.applied_gain), corrected.makeup_gain());
        assert_eq!(corrected.stages().len(), job.chain.stages().len());
    }

    #[test]
    fn test_report_carries_job_id() {
        let mastering = Mastering::default();
        let input = SampleBuffer::sine(440.0, 0.3, 0.2, 8_000, 1).unwrap();

        let first = mastering
            .process_buffer(input.clone(), Tier::Free, &mut NoProgress)
            .unwrap();
        let second = mastering
            .process_buffer(input, Tier::Free, &mut NoProgress)
            .unwrap();

        assert!(!first.report.job_id.is_nil());
        assert_ne!(first.report.job_id, second.report.job_id);
    }
}
