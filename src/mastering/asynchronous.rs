//! Async host support (feature `async-host`)
//!
//! Decoding and the two render passes run on tokio's blocking pool; analysis,
//! trimming and encoding are short and run inline on the calling task.

use std::sync::Arc;
use std::time::Instant;

use tokio::task;
use tracing::{info_span, Instrument, Span};
use uuid::Uuid;

use super::pipeline::{log_completion, Job, Mastering, ProcessingResult};
use super::progress::{ProgressSink, ProgressTracker, DECODED, START};
use crate::dsp::Tier;
use crate::error::{MasterError, Result};

/// Progress sink that can travel between the task and the blocking pool
struct SendProgress {
    sink: Box<dyn ProgressSink + Send>,
    last: u8,
}

impl SendProgress {
    fn with<R>(&mut self, f: impl FnOnce(&mut ProgressTracker<'_>) -> R) -> R {
        let mut tracker = ProgressTracker::resume(self.sink.as_mut(), self.last);
        let out = f(&mut tracker);
        self.last = tracker.last();
        out
    }
}

async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let span = Span::current();
    task::spawn_blocking(move || span.in_scope(f))
        .await
        .map_err(|e| MasterError::Task {
            reason: e.to_string(),
        })
}

impl Mastering {
    /// Master an encoded audio file without blocking the async runtime
    ///
    /// Same behaviour and errors as [`Mastering::process`].
    pub async fn master_async(
        &self,
        bytes: Vec<u8>,
        type_hint: Option<String>,
        tier: Tier,
        sink: Box<dyn ProgressSink + Send>,
    ) -> Result<ProcessingResult> {
        let job_id = Uuid::new_v4();
        let span = info_span!("mastering", %job_id, %tier);
        async move {
            let started = Instant::now();
            let mut progress = SendProgress { sink, last: 0 };
            progress.with(|p| p.report(START));

            let decoder = Arc::clone(&self.decoder);
            let original =
                blocking(move || decoder.decode(&bytes, type_hint.as_deref())).await??;
            progress.with(|p| p.report(DECODED));

            let mut job = Job::new(job_id, original, tier)?;
            let (mut job, mut progress) = blocking(move || {
                progress.with(|p| job.first_pass(p));
                (job, progress)
            })
            .await?;

            let config = self.config().clone();
            if let Some(corrected) = progress.with(|p| job.plan_correction(&config, p)) {
                (job, progress) = blocking(move || {
                    progress.with(|p| job.correction_pass(&corrected, p));
                    (job, progress)
                })
                .await?;
            }

            let result = progress.with(|p| job.finish(&config, p))?;
            log_completion(&result, started);
            Ok(result)
        }
        .instrument(span)
        .await
    }
}
