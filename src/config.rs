//! Configuration persistence for the sequencer.
//!
//! Saves and loads settings to/from a YAML file. The tempo factor is not
//! stored; it only lives as long as the process.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::midi::{DEFAULT_BPM, DEFAULT_PORT_HINT};
use crate::pattern_file::EXTENSION;

/// Complete sequencer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeatBoxConfig {
    /// Fragment of the MIDI output port name to prefer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_device: Option<String>,
    /// Nominal tempo the tempo factor scales
    #[serde(default = "default_bpm")]
    pub base_bpm: f32,
    /// Directory for saves made without an explicit path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern_dir: Option<String>,
    /// Pattern file last saved or loaded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_pattern: Option<String>,
}

fn default_bpm() -> f32 {
    DEFAULT_BPM
}

impl Default for BeatBoxConfig {
    fn default() -> Self {
        Self {
            output_device: None,
            base_bpm: DEFAULT_BPM,
            pattern_dir: None,
            last_pattern: None,
        }
    }
}

impl BeatBoxConfig {
    /// Get the default config file path.
    pub fn default_path() -> PathBuf {
        let project_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
        project_dir.join("beatbox.yaml")
    }

    /// Load configuration from a YAML file. A missing file gives defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;

        let config: Self = serde_yaml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config YAML: {}", e)))?;
        if !(config.base_bpm.is_finite() && config.base_bpm > 0.0) {
            return Err(Error::Config(format!(
                "base_bpm must be positive, got {}",
                config.base_bpm
            )));
        }
        Ok(config)
    }

    /// Save configuration to a YAML file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, content)?;
        Ok(())
    }

    /// Port name fragment to look for when opening the MIDI output.
    pub fn port_hint(&self) -> &str {
        self.output_device.as_deref().unwrap_or(DEFAULT_PORT_HINT)
    }

    /// Where a save without an explicit path goes: a timestamped file in
    /// `pattern_dir`, or the working directory.
    pub fn timestamped_pattern_path(&self, now: chrono::DateTime<chrono::Local>) -> PathBuf {
        let dir = self
            .pattern_dir
            .as_deref()
            .map(PathBuf::from)
            .unwrap_or_default();
        dir.join(format!("pattern-{}.{}", now.format("%Y%m%d-%H%M%S"), EXTENSION))
    }
}
