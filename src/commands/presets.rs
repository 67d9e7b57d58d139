use anyhow::Result;
use std::path::PathBuf;

use crate::preset::PresetStore;

/// Command to list the available presets
pub struct PresetsCommand {
    presets_file: Option<PathBuf>,
}

impl PresetsCommand {
    pub fn new(presets_file: Option<PathBuf>) -> Self {
        Self { presets_file }
    }

    pub async fn execute(&self) -> Result<()> {
        let store = match &self.presets_file {
            Some(path) => PresetStore::load(path)?,
            None => PresetStore::builtin(),
        };

        println!("Available presets:");
        for name in store.names() {
            // names() only returns keys present in the store
            if let Some(preset) = store.get(name) {
                let quality = if let Some(crf) = preset.crf {
                    format!("crf {crf}")
                } else if let Some(cq) = preset.cq {
                    format!("cq {cq}")
                } else if let Some(cbr) = preset.cbr {
                    format!("{cbr} Mbps")
                } else {
                    "unset".to_string()
                };
                println!(
                    "  {:<14} {} -> {} ({}, {})",
                    preset.name, preset.video_codec, preset.container, quality, preset.description
                );
            }
        }

        Ok(())
    }
}
