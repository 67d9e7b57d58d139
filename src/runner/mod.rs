use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, Notify};
use tokio::time;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::ffmpeg;
use crate::progress::{ProgressEvent, ProgressParser};

/// How long a cancelled child gets to die before the forced kill
const KILL_GRACE: Duration = Duration::from_secs(5);

/// Cooperative cancellation handle shared between a batch and its workers
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

#[derive(Debug, Default)]
struct CancelInner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once `cancel` has been called
    pub async fn cancelled(&self) {
        if self.is_cancelled() {
            return;
        }
        loop {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// How a child process finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessStatus {
    Exited(i32),
    Cancelled,
}

/// Typed result of a single encoder invocation
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub status: ProcessStatus,
    /// Accumulated diagnostic-channel text; meaningful on failure
    pub diagnostic: String,
}

impl ProcessOutcome {
    pub fn success(&self) -> bool {
        self.status == ProcessStatus::Exited(0)
    }
}

/// Launches the external encoder and owns its process lifecycle.
///
/// Each `run` call spawns exactly one child, pumps its two output channels
/// concurrently, and returns only after the child has exited and both
/// readers have been drained, on every exit path including cancellation.
#[derive(Debug, Clone)]
pub struct EncoderRunner {
    ffmpeg_path: String,
    ffprobe_path: String,
}

impl EncoderRunner {
    pub fn new(config: &Config) -> Self {
        Self {
            ffmpeg_path: config.ffmpeg_path.clone(),
            ffprobe_path: config.ffprobe_path.clone(),
        }
    }

    /// Verify the encoder executable can be launched at all.
    ///
    /// Run once at startup; a failure here is fatal to the whole run and
    /// must abort before any batch work begins.
    pub async fn ensure_available(&self) -> CoreResult<()> {
        let output = Command::new(&self.ffmpeg_path)
            .arg("-version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| CoreError::ProcessLaunch {
                program: self.ffmpeg_path.clone(),
                source: e,
            })?;

        if !output.status.success() {
            return Err(CoreError::ProcessLaunch {
                program: self.ffmpeg_path.clone(),
                source: std::io::Error::other(format!(
                    "'{} -version' exited with {:?}",
                    self.ffmpeg_path,
                    output.status.code()
                )),
            });
        }

        Ok(())
    }

    /// Run one encoder invocation to completion.
    ///
    /// Lines on the primary output channel are parsed into progress events
    /// and forwarded to `progress_tx` as they arrive; diagnostic-channel
    /// lines are accumulated and returned with the outcome. The call
    /// suspends until the child exits or `cancel` fires, in which case the
    /// child is terminated (forcibly if it ignores the first kill).
    pub async fn run(
        &self,
        args: &[String],
        total_duration_secs: Option<f64>,
        progress_tx: Option<mpsc::UnboundedSender<ProgressEvent>>,
        cancel: &CancelToken,
    ) -> CoreResult<ProcessOutcome> {
        let mut cmd = Command::new(&self.ffmpeg_path);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!("Executing encoder command: {:?}", cmd);

        let mut child = cmd.spawn().map_err(|e| CoreError::ProcessLaunch {
            program: self.ffmpeg_path.clone(),
            source: e,
        })?;

        // One pump task per channel. A slow or silent channel on one job
        // must never block draining on another, and a child that fills an
        // undrained pipe deadlocks.
        let stdout_task = child.stdout.take().map(|stdout| {
            tokio::spawn(async move {
                let mut parser = ProgressParser::new(total_duration_secs);
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if let Some(event) = parser.feed(&line) {
                        if let Some(tx) = &progress_tx {
                            // Receiver may be gone; progress is best-effort.
                            let _ = tx.send(event);
                        }
                    }
                }
            })
        });

        let stderr_task = child.stderr.take().map(|stderr| {
            tokio::spawn(async move {
                let mut diagnostic = String::new();
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    diagnostic.push_str(&line);
                    diagnostic.push('\n');
                }
                diagnostic
            })
        });

        let waited = tokio::select! {
            status = child.wait() => Some(status),
            _ = cancel.cancelled() => {
                if let Err(e) = child.start_kill() {
                    warn!("Failed to signal cancelled encoder process: {}", e);
                }
                if time::timeout(KILL_GRACE, child.wait()).await.is_err() {
                    let _ = child.kill().await;
                }
                None
            }
        };

        // Drain both channels so the handle and its readers are released
        // before this call returns.
        if let Some(task) = stdout_task {
            let _ = task.await;
        }
        let diagnostic = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };

        let status = match waited {
            Some(result) => ProcessStatus::Exited(result?.code().unwrap_or(-1)),
            None => ProcessStatus::Cancelled,
        };

        Ok(ProcessOutcome { status, diagnostic })
    }

    /// Query a source's total duration in seconds via the metadata probe.
    ///
    /// Failures are reported as `ProbeFailed` and are recoverable: the
    /// caller proceeds with an unknown duration.
    pub async fn probe_duration(&self, input: &Path) -> CoreResult<f64> {
        let output = Command::new(&self.ffprobe_path)
            .args(ffmpeg::probe_args(input))
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                CoreError::ProbeFailed(format!("failed to run '{}': {}", self.ffprobe_path, e))
            })?;

        if !output.status.success() {
            return Err(CoreError::ProbeFailed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        text.parse::<f64>().map_err(|e| {
            CoreError::ProbeFailed(format!("could not parse duration '{}': {}", text, e))
        })
    }
}
