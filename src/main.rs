//! # Vbatch - Batch Video Transcoding CLI
//!
//! A preset-driven batch transcoder that drives an external FFmpeg binary:
//! point it at a directory and every media file inside is converted with a
//! named preset, sequentially or with a bounded pool of parallel workers.
//!
//! ## Usage
//!
//! ```bash
//! # Convert every media file under a directory with the default preset
//! vbatch convert /path/to/media
//!
//! # Same, with up to 4 files encoding in parallel
//! vbatch convert /path/to/media --turbo --jobs 4
//!
//! # Animated GIF thumbnail of the first three seconds
//! vbatch gif /path/to/clip.mov
//!
//! # Single still frame at the 7 second mark
//! vbatch still /path/to/clip.mov --at 7.0
//!
//! # List available presets
//! vbatch presets
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vbatch::commands::{
    convert::ConvertCommand, gif::GifCommand, presets::PresetsCommand, still::StillCommand,
};

/// Vbatch - A preset-driven batch video transcoding CLI
#[derive(Parser)]
#[command(
    name = "vbatch",
    about = "A preset-driven batch video transcoding CLI tool",
    long_about = "Transcodes whole directories of media files through an external FFmpeg binary, with named quality presets, live progress, and optional bounded parallelism.",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Transcode every media file under a directory with one preset
    Convert {
        /// Path to the media directory to convert
        path: PathBuf,
        /// Preset name. Run `vbatch presets` to list what is available
        #[arg(long, short = 'p', default_value = "h265")]
        preset: String,
        /// JSON file of preset definitions (replaces the built-in set)
        #[arg(long)]
        presets_file: Option<PathBuf>,
        /// Encode multiple files in parallel
        #[arg(long, short)]
        turbo: bool,
        /// Worker count for turbo mode (defaults to the CPU count)
        #[arg(long, short)]
        jobs: Option<usize>,
    },
    /// Generate an animated GIF thumbnail from a media file
    Gif {
        /// Source media file
        input: PathBuf,
        /// Output path (defaults to the input with a .gif extension)
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Clip start offset in seconds
        #[arg(long, default_value_t = 0.0)]
        start: f64,
        /// Clip length in seconds
        #[arg(long, default_value_t = 3.0)]
        duration: f64,
        /// Output width in pixels; height follows the aspect ratio
        #[arg(long, default_value_t = 480)]
        width: u32,
        /// Output frame rate
        #[arg(long, default_value_t = 12)]
        fps: u32,
    },
    /// Extract a single still frame from a media file
    Still {
        /// Source media file
        input: PathBuf,
        /// Output path (defaults to the input with a .jpg extension)
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Frame timestamp in seconds
        #[arg(long, default_value_t = 1.0)]
        at: f64,
    },
    /// List the available presets
    Presets {
        /// JSON file of preset definitions (replaces the built-in set)
        #[arg(long)]
        presets_file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vbatch=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Convert {
            path,
            preset,
            presets_file,
            turbo,
            jobs,
        } => {
            ConvertCommand::new(path, preset, presets_file, turbo, jobs)
                .execute()
                .await
        }
        Commands::Gif {
            input,
            output,
            start,
            duration,
            width,
            fps,
        } => {
            GifCommand::new(input, output, start, duration, width, fps)
                .execute()
                .await
        }
        Commands::Still { input, output, at } => {
            StillCommand::new(input, output, at).execute().await
        }
        Commands::Presets { presets_file } => PresetsCommand::new(presets_file).execute().await,
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
