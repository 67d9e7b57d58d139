use anyhow::{anyhow, Result};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use walkdir::WalkDir;

use crate::config::Config;
use crate::preset::PresetStore;
use crate::runner::{CancelToken, EncoderRunner};
use crate::scheduler::{BatchEvent, BatchScheduler, BatchSummary};

/// Source file extensions considered transcodable
const MEDIA_EXTENSIONS: [&str; 6] = ["mp4", "mov", "avi", "mkv", "wmv", "webm"];

/// Command to transcode every media file under a directory with one preset
pub struct ConvertCommand {
    media_root: PathBuf,
    preset: String,
    presets_file: Option<PathBuf>,
    turbo: bool,
    jobs: Option<usize>,
}

impl ConvertCommand {
    pub fn new(
        media_root: PathBuf,
        preset: String,
        presets_file: Option<PathBuf>,
        turbo: bool,
        jobs: Option<usize>,
    ) -> Self {
        Self {
            media_root,
            preset,
            presets_file,
            turbo,
            jobs,
        }
    }

    pub async fn execute(&self) -> Result<()> {
        if !self.media_root.exists() {
            return Err(anyhow!(
                "Media directory does not exist: {:?}",
                self.media_root
            ));
        }

        if !self.media_root.is_dir() {
            return Err(anyhow!("Path is not a directory: {:?}", self.media_root));
        }

        let mut config = Config::from_env();
        if let Some(jobs) = self.jobs {
            config.concurrency = jobs.max(1);
        }

        let store = match &self.presets_file {
            Some(path) => PresetStore::load(path)?,
            None => PresetStore::builtin(),
        };
        let request = store.resolve(&self.preset)?;

        // Fail before any batch work if the encoder itself is unusable.
        let runner = EncoderRunner::new(&config);
        runner.ensure_available().await?;

        info!("🔎 Scanning directory: {:?}", self.media_root);
        let files = collect_media_files(&self.media_root);
        if files.is_empty() {
            info!("No media files found. Nothing to do.");
            return Ok(());
        }

        let mode = if self.turbo {
            format!("turbo ({} workers)", config.concurrency)
        } else {
            "sequential".to_string()
        };
        info!(
            "🚀 Converting {} files with preset '{}' in {} mode",
            files.len(),
            self.preset,
            mode
        );

        let cancel = CancelToken::new();
        let signal_cancel = cancel.clone();
        tokio::spawn(async move {
            if signal::ctrl_c().await.is_ok() {
                info!("🛑 Shutdown signal received. Cancelling in-flight jobs.");
                signal_cancel.cancel();
            }
        });

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let renderer = spawn_progress_renderer(events_rx);

        let scheduler = BatchScheduler::new(config, request, self.preset.clone());
        let summary = scheduler
            .run(&files, &self.media_root, self.turbo, Some(events_tx), &cancel)
            .await?;

        // The scheduler dropped its sender; the renderer drains and exits.
        let _ = renderer.await;

        report(&summary);

        if summary.failed > 0 {
            return Err(anyhow!(
                "{} of {} jobs failed",
                summary.failed,
                summary.results.len()
            ));
        }
        Ok(())
    }
}

/// Recursively collect transcodable files, sorted for a stable batch order
fn collect_media_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if let Some(extension) = path.extension() {
            let ext = extension.to_string_lossy().to_lowercase();
            if MEDIA_EXTENSIONS.contains(&ext.as_str()) {
                files.push(path.to_path_buf());
            }
        }
    }
    files.sort();
    files
}

/// Render batch events as one progress bar per in-flight file
fn spawn_progress_renderer(
    mut events_rx: mpsc::UnboundedReceiver<BatchEvent>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let multi = MultiProgress::new();
        let style = ProgressStyle::with_template("{msg:40!} [{bar:30}] {percent:>3}%")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        let mut bars: HashMap<PathBuf, ProgressBar> = HashMap::new();

        while let Some(event) = events_rx.recv().await {
            match event {
                BatchEvent::JobStarted { source_path } => {
                    let bar = multi.add(ProgressBar::new(100));
                    bar.set_style(style.clone());
                    let name = source_path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    bar.set_message(name);
                    bars.insert(source_path, bar);
                }
                BatchEvent::JobProgress { source_path, event } => {
                    if let Some(bar) = bars.get(&source_path) {
                        if let Some(percentage) = event.percentage {
                            bar.set_position(percentage.round() as u64);
                        } else {
                            bar.tick();
                        }
                    }
                }
                BatchEvent::JobSkipped { source_path } => {
                    info!("Skipping already-converted file: {:?}", source_path);
                }
                BatchEvent::JobFinished { result } => {
                    if let Some(bar) = bars.remove(&result.source_path) {
                        if result.success {
                            bar.finish_with_message(format!(
                                "✅ {}",
                                result.source_path.display()
                            ));
                        } else {
                            bar.abandon_with_message(format!(
                                "❌ {}",
                                result.source_path.display()
                            ));
                        }
                    }
                }
            }
        }
    })
}

fn report(summary: &BatchSummary) {
    if summary.cancelled {
        warn!("⚠️ Batch cancelled before completion.");
    }

    info!(
        "✅ Batch finished: {} succeeded, {} failed, {} skipped.",
        summary.succeeded, summary.failed, summary.skipped
    );

    for result in summary.results.iter().filter(|r| !r.success) {
        error!(
            "❌ {} failed: {}",
            result.source_path.display(),
            result.diagnostic.as_deref().unwrap_or("unknown error")
        );
    }
}
