//! Chain executor
//!
//! Renders a buffer through a chain offline, one stage at a time. Rendering
//! is deterministic and never changes length, channel count or sample rate.

use tracing::{debug, warn};

use super::progress::{NoProgress, ProgressTracker};
use crate::dsp::Chain;
use crate::engine::{RenderContext, SampleBuffer};
use crate::error::{MasterError, Result};

/// Render `input` through every stage of `chain`
///
/// # Errors
/// * `ContextMismatch` - `input` does not match `ctx`
/// * `InvalidParameter` - a stage has unusable parameters
/// * `NonFiniteOutput` - a stage produced NaN or infinity
pub fn render(input: &SampleBuffer, chain: &Chain, ctx: &RenderContext) -> Result<SampleBuffer> {
    let mut sink = NoProgress;
    let mut progress = ProgressTracker::new(&mut sink);
    render_with_progress(input, chain, ctx, &mut progress, (0, 0))
}

/// Render and report progress after each stage group
///
/// Group completions are spread evenly over `range` (start, end).
pub fn render_with_progress(
    input: &SampleBuffer,
    chain: &Chain,
    ctx: &RenderContext,
    progress: &mut ProgressTracker<'_>,
    range: (u8, u8),
) -> Result<SampleBuffer> {
    ctx.check(input)?;

    // Every stage is checked before any audio is touched
    for stage in chain.stages() {
        stage.spec.validate(ctx)?;
    }

    let groups = chain.groups();
    let total = groups.len();
    let mut current = input.clone();

    for (done, (group, stages)) in groups.into_iter().enumerate() {
        for stage in stages {
            current = stage.spec.apply(&current, ctx)?;
            if !current.is_finite() {
                return Err(MasterError::NonFiniteOutput {
                    stage: stage.name.to_string(),
                });
            }
        }
        debug!(?group, stages = stages.len(), peak = current.peak(), "stage group rendered");
        progress.report_step(range.0, range.1, done + 1, total);
    }

    Ok(current)
}

/// Result of a render that is allowed to fall back
#[derive(Debug, Clone)]
pub struct Rendered {
    pub buffer: SampleBuffer,
    /// True when rendering failed and `buffer` is the unprocessed input
    pub fell_back: bool,
}

/// Render, returning the input unchanged if any stage fails
pub fn render_or_passthrough(
    input: &SampleBuffer,
    chain: &Chain,
    ctx: &RenderContext,
    progress: &mut ProgressTracker<'_>,
    range: (u8, u8),
) -> Rendered {
    match render_with_progress(input, chain, ctx, progress, range) {
        Ok(buffer) => Rendered {
            buffer,
            fell_back: false,
        },
        Err(err) => {
            warn!(
                error = %err,
                code = err.error_code(),
                tier = %chain.tier(),
                "render failed, passing input through unprocessed"
            );
            progress.report(range.1);
            Rendered {
                buffer: input.clone(),
                fell_back: true,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::{build_chain, Tier};
    use test_case::test_case;

    #[test_case(Tier::Basic, 1 ; "basic mono")]
    #[test_case(Tier::Basic, 2 ; "basic stereo")]
    #[test_case(Tier::Premium, 1 ; "premium mono")]
    #[test_case(Tier::Premium, 2 ; "premium stereo")]
    fn test_render_preserves_shape(tier: Tier, channels: usize) {
        let input = SampleBuffer::sine(220.0, 0.4, 0.25, 44_100, channels).unwrap();
        let ctx = RenderContext::for_buffer(&input);
        let output = render(&input, &build_chain(tier), &ctx).unwrap();

        assert_eq!(output.len(), input.len());
        assert_eq!(output.num_channels(), channels);
        assert_eq!(output.sample_rate(), 44_100);
        assert!(output.is_finite());
    }

    #[test]
    fn test_render_is_deterministic() {
        let input = SampleBuffer::sine(440.0, 0.3, 0.2, 48_000, 2).unwrap();
        let ctx = RenderContext::for_buffer(&input);
        let chain = build_chain(Tier::Premium);
        assert_eq!(
            render(&input, &chain, &ctx).unwrap(),
            render(&input, &chain, &ctx).unwrap()
        );
    }

    #[test]
    fn test_render_leaves_input_untouched() {
        let input = SampleBuffer::sine(440.0, 0.3, 0.1, 48_000, 1).unwrap();
        let snapshot = input.clone();
        let ctx = RenderContext::for_buffer(&input);
        let _ = render(&input, &build_chain(Tier::Basic), &ctx).unwrap();
        assert_eq!(input, snapshot);
    }

    #[test]
    fn test_bad_stage_fails_render_and_falls_back() {
        let input = SampleBuffer::sine(440.0, 0.3, 0.1, 48_000, 1).unwrap();
        let ctx = RenderContext::for_buffer(&input);
        let chain = build_chain(Tier::Basic).with_makeup_gain(f32::NAN);

        assert!(matches!(
            render(&input, &chain, &ctx),
            Err(MasterError::InvalidParameter { .. })
        ));

        let mut seen = Vec::new();
        let mut sink = |p: u8| seen.push(p);
        let mut progress = ProgressTracker::new(&mut sink);
        let rendered = render_or_passthrough(&input, &chain, &ctx, &mut progress, (30, 60));
        assert!(rendered.fell_back);
        assert_eq!(rendered.buffer, input);
        assert_eq!(progress.last(), 60);
    }

    #[test]
    fn test_context_mismatch_is_rejected() {
        let input = SampleBuffer::sine(440.0, 0.3, 0.1, 48_000, 2).unwrap();
        let ctx = RenderContext::new(44_100, 2);
        assert!(matches!(
            render(&input, &build_chain(Tier::Basic), &ctx),
            Err(MasterError::ContextMismatch { .. })
        ));
    }

    #[test]
    fn test_progress_reported_per_group() {
        let input = SampleBuffer::sine(440.0, 0.3, 0.1, 48_000, 1).unwrap();
        let ctx = RenderContext::for_buffer(&input);
        let mut seen = Vec::new();
        {
            let mut sink = |p: u8| seen.push(p);
            let mut progress = ProgressTracker::new(&mut sink);
            render_with_progress(&input, &build_chain(Tier::Basic), &ctx, &mut progress, (30, 60))
                .unwrap();
        }
        assert_eq!(seen, vec![37, 45, 52, 60]);
    }
}
