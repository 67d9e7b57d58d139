use anyhow::{anyhow, Result};
use std::path::PathBuf;
use tokio::signal;
use tracing::info;

use crate::config::Config;
use crate::runner::{CancelToken, EncoderRunner};
use crate::thumbnail::{GifRequest, ThumbnailPipeline};

/// Command to extract an animated GIF thumbnail from one media file
pub struct GifCommand {
    input: PathBuf,
    output: Option<PathBuf>,
    start_secs: f64,
    duration_secs: f64,
    width: u32,
    fps: u32,
}

impl GifCommand {
    pub fn new(
        input: PathBuf,
        output: Option<PathBuf>,
        start_secs: f64,
        duration_secs: f64,
        width: u32,
        fps: u32,
    ) -> Self {
        Self {
            input,
            output,
            start_secs,
            duration_secs,
            width,
            fps,
        }
    }

    pub async fn execute(&self) -> Result<()> {
        if !self.input.is_file() {
            return Err(anyhow!("Input file does not exist: {:?}", self.input));
        }
        if self.duration_secs <= 0.0 {
            return Err(anyhow!("Clip duration must be positive"));
        }

        let output = self
            .output
            .clone()
            .unwrap_or_else(|| self.input.with_extension("gif"));

        let config = Config::from_env();
        let runner = EncoderRunner::new(&config);
        runner.ensure_available().await?;

        let cancel = CancelToken::new();
        let signal_cancel = cancel.clone();
        tokio::spawn(async move {
            if signal::ctrl_c().await.is_ok() {
                info!("🛑 Shutdown signal received.");
                signal_cancel.cancel();
            }
        });

        let request = GifRequest {
            source_path: self.input.clone(),
            dest_path: output.clone(),
            start_secs: self.start_secs,
            duration_secs: self.duration_secs,
            width: self.width,
            fps: self.fps,
        };

        info!(
            "🚀 Generating GIF from {:?} ({}s at offset {}s)",
            self.input, self.duration_secs, self.start_secs
        );

        let pipeline = ThumbnailPipeline::new(runner);
        pipeline.generate_gif(&request, &cancel).await?;

        if cancel.is_cancelled() {
            info!("⚠️ Cancelled before completion.");
        } else {
            info!("✅ Wrote {:?}", output);
        }
        Ok(())
    }
}
