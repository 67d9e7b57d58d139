use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::CoreResult;
use crate::ffmpeg;
use crate::preset::EncodeRequest;
use crate::progress::ProgressEvent;
use crate::runner::{CancelToken, EncoderRunner, ProcessStatus};

/// A single file scheduled for transcoding
#[derive(Debug, Clone)]
pub struct Job {
    pub id: String,
    pub source_path: PathBuf,
    pub dest_path: PathBuf,
}

impl Job {
    fn new(source_path: PathBuf, dest_path: PathBuf) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            source_path,
            dest_path,
        }
    }
}

/// Outcome of one job; created exactly once when its process exits
#[derive(Debug, Clone)]
pub struct JobResult {
    /// Identity of the job this result belongs to
    pub id: String,
    pub source_path: PathBuf,
    pub success: bool,
    /// Present iff the job failed
    pub diagnostic: Option<String>,
    pub duration_ms: u64,
}

/// Aggregate result of a batch
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub results: Vec<JobResult>,
    /// Highest number of simultaneously in-flight jobs observed
    pub peak_workers: usize,
    pub cancelled: bool,
}

/// Progress feed for a batch.
///
/// Events for different files interleave arbitrarily in turbo mode, so
/// consumers must key on the source path.
#[derive(Debug, Clone)]
pub enum BatchEvent {
    JobStarted {
        source_path: PathBuf,
    },
    JobProgress {
        source_path: PathBuf,
        event: ProgressEvent,
    },
    JobSkipped {
        source_path: PathBuf,
    },
    JobFinished {
        result: JobResult,
    },
}

type EventSink = Option<mpsc::UnboundedSender<BatchEvent>>;

fn send_event(events: &EventSink, event: BatchEvent) {
    if let Some(tx) = events {
        // The listener may have gone away; events are best-effort.
        let _ = tx.send(event);
    }
}

/// Runs a collection of source files against one resolved preset, either
/// sequentially or as a bounded pool of concurrent workers.
#[derive(Debug, Clone)]
pub struct BatchScheduler {
    config: Config,
    runner: EncoderRunner,
    request: EncodeRequest,
    preset_name: String,
}

impl BatchScheduler {
    /// `request` is the skeleton produced by the preset resolver; the
    /// scheduler fills in per-file paths.
    pub fn new(config: Config, request: EncodeRequest, preset_name: impl Into<String>) -> Self {
        let runner = EncoderRunner::new(&config);
        Self {
            config,
            runner,
            request,
            preset_name: preset_name.into(),
        }
    }

    /// Destination file name: `<stem>_<preset>.<container>` in the output
    /// directory
    fn dest_path(&self, source: &Path, output_dir: &Path) -> PathBuf {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        output_dir.join(format!(
            "{}_{}.{}",
            stem, self.preset_name, self.request.container
        ))
    }

    /// Run the batch to completion (or cancellation).
    ///
    /// The output directory is created under `source_root` before any job
    /// starts; files already inside it are recorded as explicit skips.
    /// Per-job failures become `JobResult`s and never abort the batch.
    pub async fn run(
        &self,
        files: &[PathBuf],
        source_root: &Path,
        turbo: bool,
        events: EventSink,
        cancel: &CancelToken,
    ) -> CoreResult<BatchSummary> {
        let output_dir = source_root.join(&self.config.output_dir_name);
        tokio::fs::create_dir_all(&output_dir).await?;

        let mut summary = BatchSummary::default();
        let mut pending = VecDeque::new();

        for file in files {
            if file.starts_with(&output_dir) {
                debug!("Skipping already-converted file: {:?}", file);
                summary.skipped += 1;
                send_event(
                    &events,
                    BatchEvent::JobSkipped {
                        source_path: file.clone(),
                    },
                );
                continue;
            }
            pending.push_back(Job::new(file.clone(), self.dest_path(file, &output_dir)));
        }

        if turbo {
            self.run_turbo(pending, &mut summary, &events, cancel).await;
        } else {
            self.run_sequential(pending, &mut summary, &events, cancel)
                .await;
        }

        summary.cancelled = cancel.is_cancelled();
        Ok(summary)
    }

    /// One file at a time, in input order
    async fn run_sequential(
        &self,
        mut pending: VecDeque<Job>,
        summary: &mut BatchSummary,
        events: &EventSink,
        cancel: &CancelToken,
    ) {
        while let Some(job) = pending.pop_front() {
            if cancel.is_cancelled() {
                break;
            }
            summary.peak_workers = summary.peak_workers.max(1);

            let result = process_job(
                self.runner.clone(),
                self.request.clone(),
                job,
                events.clone(),
                cancel.clone(),
            )
            .await;

            if let Some(result) = result {
                record(summary, result);
            }
        }
    }

    /// Bounded pool of concurrent workers over a FIFO queue.
    ///
    /// The pending queue and in-flight set are touched only by this
    /// dispatch loop; workers hand results back through the `JoinSet`.
    async fn run_turbo(
        &self,
        mut pending: VecDeque<Job>,
        summary: &mut BatchSummary,
        events: &EventSink,
        cancel: &CancelToken,
    ) {
        let limit = self.config.concurrency.max(1);
        let mut in_flight: JoinSet<Option<JobResult>> = JoinSet::new();
        let mut draining = false;

        loop {
            // Fill every free slot before waiting.
            while !draining && in_flight.len() < limit {
                let Some(job) = pending.pop_front() else { break };
                in_flight.spawn(process_job(
                    self.runner.clone(),
                    self.request.clone(),
                    job,
                    events.clone(),
                    cancel.clone(),
                ));
            }
            summary.peak_workers = summary.peak_workers.max(in_flight.len());

            // Done only once the queue is empty and every slot has drained.
            if in_flight.is_empty() {
                break;
            }

            tokio::select! {
                joined = in_flight.join_next() => {
                    if let Some(Ok(Some(result))) = joined {
                        record(summary, result);
                    }
                }
                _ = cancel.cancelled(), if !draining => {
                    // Stop dispatching; in-flight workers observe the same
                    // token and terminate their children themselves.
                    draining = true;
                    pending.clear();
                }
            }
        }
    }
}

fn record(summary: &mut BatchSummary, result: JobResult) {
    if result.success {
        summary.succeeded += 1;
    } else {
        summary.failed += 1;
    }
    summary.results.push(result);
}

/// The per-file unit of work: probe, build the command, run the process,
/// report a result.
///
/// Returns `None` when the job was cancelled mid-flight; partial work is
/// then not counted in the summary. All other errors, including a launch
/// failure on this particular job, are converted into a failed `JobResult`.
async fn process_job(
    runner: EncoderRunner,
    request: EncodeRequest,
    job: Job,
    events: EventSink,
    cancel: CancelToken,
) -> Option<JobResult> {
    if cancel.is_cancelled() {
        return None;
    }

    // Probed per dispatch; a failure only degrades progress reporting.
    let total_duration = match runner.probe_duration(&job.source_path).await {
        Ok(duration) => Some(duration),
        Err(e) => {
            warn!(
                "Duration probe failed for {:?}, progress will be indeterminate: {}",
                job.source_path, e
            );
            None
        }
    };

    send_event(
        &events,
        BatchEvent::JobStarted {
            source_path: job.source_path.clone(),
        },
    );

    // Relay this job's progress into the batch feed, keyed by source path.
    let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
    let relay_events = events.clone();
    let relay_path = job.source_path.clone();
    let relay = tokio::spawn(async move {
        while let Some(event) = progress_rx.recv().await {
            send_event(
                &relay_events,
                BatchEvent::JobProgress {
                    source_path: relay_path.clone(),
                    event,
                },
            );
        }
    });

    let request = request.for_paths(&job.source_path, &job.dest_path);
    let args = ffmpeg::transcode_args(&request);

    let started = Instant::now();
    let outcome = runner
        .run(&args, total_duration, Some(progress_tx), &cancel)
        .await;
    let duration_ms = started.elapsed().as_millis() as u64;
    let _ = relay.await;

    let result = match outcome {
        Ok(outcome) => match outcome.status {
            ProcessStatus::Exited(0) => JobResult {
                id: job.id,
                source_path: job.source_path,
                success: true,
                diagnostic: None,
                duration_ms,
            },
            ProcessStatus::Exited(code) => {
                let diagnostic = if outcome.diagnostic.trim().is_empty() {
                    format!("encoder exited with code {code}")
                } else {
                    format!(
                        "encoder exited with code {code}:\n{}",
                        outcome.diagnostic.trim()
                    )
                };
                JobResult {
                    id: job.id,
                    source_path: job.source_path,
                    success: false,
                    diagnostic: Some(diagnostic),
                    duration_ms,
                }
            }
            ProcessStatus::Cancelled => return None,
        },
        // Errors local to one job never escape the scheduler boundary.
        Err(e) => JobResult {
            id: job.id,
            source_path: job.source_path,
            success: false,
            diagnostic: Some(e.to_string()),
            duration_ms,
        },
    };

    send_event(
        &events,
        BatchEvent::JobFinished {
            result: result.clone(),
        },
    );
    Some(result)
}
