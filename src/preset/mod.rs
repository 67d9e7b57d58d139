use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Quality control mode for the video encoder.
///
/// Exactly one mode is active per request; validation happens once at
/// resolve time so command building never has to ask which field exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualityMode {
    /// Constant rate factor (quality-targeted)
    Crf(u32),
    /// Constant quantizer
    Cq(u32),
    /// Constant bitrate, in Mbps
    Cbr(u32),
}

/// A named, persisted configuration template
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Preset {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub video_codec: String,
    pub audio_codec: String,
    pub container: String,
    #[serde(default)]
    pub crf: Option<u32>,
    #[serde(default)]
    pub cq: Option<u32>,
    #[serde(default)]
    pub cbr: Option<u32>,
    /// Extra encoder arguments, whitespace-separated
    #[serde(default)]
    pub extra_args: String,
}

/// A fully validated encode request, immutable once built.
///
/// Produced by `PresetStore::resolve` with empty paths; callers fill in the
/// source/destination pair with [`EncodeRequest::for_paths`].
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeRequest {
    pub source_path: PathBuf,
    pub dest_path: PathBuf,
    pub video_codec: String,
    pub audio_codec: String,
    pub quality: QualityMode,
    pub container: String,
    pub extra_args: Vec<String>,
}

impl EncodeRequest {
    /// Clone this request skeleton with the path fields populated
    pub fn for_paths(&self, source: &Path, dest: &Path) -> Self {
        Self {
            source_path: source.to_path_buf(),
            dest_path: dest.to_path_buf(),
            ..self.clone()
        }
    }
}

/// Read-only mapping of preset name to preset record
#[derive(Debug, Clone)]
pub struct PresetStore {
    presets: HashMap<String, Preset>,
}

impl PresetStore {
    /// The presets shipped with the application
    pub fn builtin() -> Self {
        let presets = vec![
            Preset {
                name: "h265".to_string(),
                description: "H.265 constant quality, audio passthrough".to_string(),
                video_codec: "libx265".to_string(),
                audio_codec: "copy".to_string(),
                container: "mp4".to_string(),
                crf: Some(23),
                cq: None,
                cbr: None,
                extra_args: String::new(),
            },
            Preset {
                name: "h265-cbr".to_string(),
                description: "H.265 constant bitrate (10 Mbps)".to_string(),
                video_codec: "libx265".to_string(),
                audio_codec: "copy".to_string(),
                container: "mp4".to_string(),
                crf: None,
                cq: None,
                cbr: Some(10),
                extra_args: String::new(),
            },
            Preset {
                name: "h264-compat".to_string(),
                description: "Widely compatible H.264/AAC".to_string(),
                video_codec: "libx264".to_string(),
                audio_codec: "aac".to_string(),
                container: "mp4".to_string(),
                crf: Some(21),
                cq: None,
                cbr: None,
                extra_args: "-preset veryfast".to_string(),
            },
        ];

        Self {
            presets: presets.into_iter().map(|p| (p.name.clone(), p)).collect(),
        }
    }

    /// Load a preset mapping from a JSON file (an array of preset records)
    pub fn load(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let presets: Vec<Preset> = serde_json::from_str(&content).map_err(|e| {
            CoreError::PresetInvalid {
                name: path.display().to_string(),
                reason: e.to_string(),
            }
        })?;

        Ok(Self {
            presets: presets.into_iter().map(|p| (p.name.clone(), p)).collect(),
        })
    }

    /// Preset names in sorted order
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.presets.keys().map(|n| n.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn get(&self, name: &str) -> Option<&Preset> {
        self.presets.get(name)
    }

    /// Validate and normalize a named preset into an encode request skeleton.
    ///
    /// The returned request has codec, container, and quality fields
    /// populated; the caller supplies the paths. No side effects.
    pub fn resolve(&self, name: &str) -> CoreResult<EncodeRequest> {
        let preset = self
            .presets
            .get(name)
            .ok_or_else(|| CoreError::PresetNotFound(name.to_string()))?;

        let invalid = |reason: &str| CoreError::PresetInvalid {
            name: name.to_string(),
            reason: reason.to_string(),
        };

        if preset.video_codec.trim().is_empty() {
            return Err(invalid("missing video codec"));
        }
        if preset.audio_codec.trim().is_empty() {
            return Err(invalid("missing audio codec"));
        }
        if preset.container.trim().is_empty() {
            return Err(invalid("missing container"));
        }

        let quality = match (preset.crf, preset.cq, preset.cbr) {
            (Some(v), None, None) => QualityMode::Crf(v),
            (None, Some(v), None) => QualityMode::Cq(v),
            (None, None, Some(v)) => QualityMode::Cbr(v),
            (None, None, None) => {
                return Err(invalid("one of crf, cq, or cbr must be set"));
            }
            _ => {
                return Err(invalid("crf, cq, and cbr are mutually exclusive"));
            }
        };

        Ok(EncodeRequest {
            source_path: PathBuf::new(),
            dest_path: PathBuf::new(),
            video_codec: preset.video_codec.clone(),
            audio_codec: preset.audio_codec.clone(),
            quality,
            container: preset.container.clone(),
            extra_args: preset
                .extra_args
                .split_whitespace()
                .map(str::to_string)
                .collect(),
        })
    }
}
