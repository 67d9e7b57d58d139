use std::io;

use thiserror::Error;

/// Errors produced by the transcoding core.
///
/// Only configuration-time and launch-time errors are expected to reach the
/// top level; everything local to a single batch job is converted into a
/// `JobResult` by the scheduler instead of being propagated.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("preset not found: '{0}'")]
    PresetNotFound(String),

    #[error("preset '{name}' is invalid: {reason}")]
    PresetInvalid { name: String, reason: String },

    #[error("failed to launch encoder '{program}': {source}")]
    ProcessLaunch {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("duration probe failed: {0}")]
    ProbeFailed(String),

    #[error("palette generation failed: {0}")]
    PaletteGenerationFailed(String),

    #[error("render failed: {0}")]
    RenderFailed(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type CoreResult<T> = Result<T, CoreError>;
