use anyhow::{anyhow, Result};
use std::path::PathBuf;
use tokio::signal;
use tracing::info;

use crate::config::Config;
use crate::runner::{CancelToken, EncoderRunner};
use crate::thumbnail::{StillRequest, ThumbnailPipeline};

/// Command to extract a single still frame from one media file
pub struct StillCommand {
    input: PathBuf,
    output: Option<PathBuf>,
    timestamp_secs: f64,
}

impl StillCommand {
    pub fn new(input: PathBuf, output: Option<PathBuf>, timestamp_secs: f64) -> Self {
        Self {
            input,
            output,
            timestamp_secs,
        }
    }

    pub async fn execute(&self) -> Result<()> {
        if !self.input.is_file() {
            return Err(anyhow!("Input file does not exist: {:?}", self.input));
        }

        let output = self
            .output
            .clone()
            .unwrap_or_else(|| self.input.with_extension("jpg"));

        let config = Config::from_env();
        let runner = EncoderRunner::new(&config);
        runner.ensure_available().await?;

        let cancel = CancelToken::new();
        let signal_cancel = cancel.clone();
        tokio::spawn(async move {
            if signal::ctrl_c().await.is_ok() {
                signal_cancel.cancel();
            }
        });

        let request = StillRequest {
            source_path: self.input.clone(),
            dest_path: output.clone(),
            timestamp_secs: self.timestamp_secs,
        };

        info!(
            "🚀 Extracting frame at {}s from {:?}",
            self.timestamp_secs, self.input
        );

        let pipeline = ThumbnailPipeline::new(runner);
        pipeline.generate_still(&request, &cancel).await?;

        if cancel.is_cancelled() {
            info!("⚠️ Cancelled before completion.");
        } else {
            info!("✅ Wrote {:?}", output);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_still_nonexistent_input() {
        let cmd = StillCommand::new(PathBuf::from("/nonexistent/clip.mov"), None, 1.0);
        assert!(cmd.execute().await.is_err());
    }
}
