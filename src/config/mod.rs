use std::env;
use std::thread;

/// Configuration for the encoder binaries and application behavior
#[derive(Debug, Clone)]
pub struct Config {
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    pub output_dir_name: String,
    pub concurrency: usize,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let ffmpeg_path = env::var("FFMPEG_PATH").unwrap_or_else(|_| "ffmpeg".to_string());
        let ffprobe_path =
            env::var("FFPROBE_PATH").unwrap_or_else(|_| derive_ffprobe_path(&ffmpeg_path));

        Self {
            ffmpeg_path,
            ffprobe_path,
            output_dir_name: env::var("VBATCH_OUTPUT_DIR")
                .unwrap_or_else(|_| "converted".to_string()),
            concurrency: env::var("VBATCH_JOBS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_concurrency),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            output_dir_name: "converted".to_string(),
            concurrency: default_concurrency(),
        }
    }
}

/// ffprobe ships alongside ffmpeg, so a custom ffmpeg path implies a sibling
/// ffprobe unless FFPROBE_PATH says otherwise.
fn derive_ffprobe_path(ffmpeg_path: &str) -> String {
    if ffmpeg_path.contains("ffmpeg") {
        ffmpeg_path.replace("ffmpeg", "ffprobe")
    } else {
        "ffprobe".to_string()
    }
}

fn default_concurrency() -> usize {
    thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}
