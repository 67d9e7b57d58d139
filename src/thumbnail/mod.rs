use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{CoreError, CoreResult};
use crate::ffmpeg;
use crate::runner::{CancelToken, EncoderRunner, ProcessStatus};

/// Parameters for an animated GIF extraction
#[derive(Debug, Clone)]
pub struct GifRequest {
    pub source_path: PathBuf,
    pub dest_path: PathBuf,
    /// Clip start offset in the source, seconds
    pub start_secs: f64,
    /// Clip length, seconds
    pub duration_secs: f64,
    /// Output width in pixels; height follows the aspect ratio
    pub width: u32,
    pub fps: u32,
}

impl GifRequest {
    pub fn new(source: &Path, dest: &Path) -> Self {
        Self {
            source_path: source.to_path_buf(),
            dest_path: dest.to_path_buf(),
            start_secs: 0.0,
            duration_secs: 3.0,
            width: 480,
            fps: 12,
        }
    }
}

/// Parameters for a single-frame still extraction
#[derive(Debug, Clone)]
pub struct StillRequest {
    pub source_path: PathBuf,
    pub dest_path: PathBuf,
    /// Frame timestamp in the source, seconds
    pub timestamp_secs: f64,
}

/// Two-pass GIF and still-frame extraction on top of the encoder runner.
///
/// GIF output uses the palette technique: pass one derives an optimized
/// 256-color palette from the sampled clip, pass two renders the clip
/// through that palette. A single-pass GIF encode dithers against a generic
/// palette and looks visibly worse, so there is no single-pass fallback.
#[derive(Debug, Clone)]
pub struct ThumbnailPipeline {
    runner: EncoderRunner,
}

impl ThumbnailPipeline {
    pub fn new(runner: EncoderRunner) -> Self {
        Self { runner }
    }

    /// Generate an animated GIF thumbnail.
    ///
    /// The intermediate palette lives in a temporary file that is removed
    /// on every exit path, including failure between the two passes.
    pub async fn generate_gif(&self, request: &GifRequest, cancel: &CancelToken) -> CoreResult<()> {
        let palette = tempfile::Builder::new()
            .prefix("palette-")
            .suffix(".png")
            .tempfile()?
            .into_temp_path();

        debug!("Palette pass for {:?} -> {:?}", request.source_path, &*palette);

        let args = ffmpeg::palette_args(request, &palette);
        let outcome = self.runner.run(&args, None, None, cancel).await?;
        // A user-initiated abort is not an encode failure.
        if outcome.status == ProcessStatus::Cancelled {
            return Ok(());
        }
        if !outcome.success() {
            return Err(CoreError::PaletteGenerationFailed(
                outcome.diagnostic.trim().to_string(),
            ));
        }

        // An empty palette means the sample window had no frames; rendering
        // against it would produce a broken GIF.
        let palette_size = std::fs::metadata(&palette).map(|m| m.len()).unwrap_or(0);
        if palette_size == 0 {
            return Err(CoreError::PaletteGenerationFailed(
                "palette pass produced an empty file".to_string(),
            ));
        }

        let args = ffmpeg::render_args(request, &palette);
        let outcome = self.runner.run(&args, None, None, cancel).await?;
        if outcome.status == ProcessStatus::Cancelled {
            return Ok(());
        }
        if !outcome.success() {
            return Err(CoreError::RenderFailed(outcome.diagnostic.trim().to_string()));
        }

        Ok(())
    }

    /// Extract a single frame as a high-quality still image
    pub async fn generate_still(
        &self,
        request: &StillRequest,
        cancel: &CancelToken,
    ) -> CoreResult<()> {
        let args = ffmpeg::still_args(request);
        let outcome = self.runner.run(&args, None, None, cancel).await?;
        if outcome.status == ProcessStatus::Cancelled {
            return Ok(());
        }
        if !outcome.success() {
            return Err(CoreError::RenderFailed(outcome.diagnostic.trim().to_string()));
        }
        Ok(())
    }
}
