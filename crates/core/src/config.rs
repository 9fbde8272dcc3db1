use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Bus rate while the mix is empty
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Tempo of a fresh mix
    #[serde(default = "default_tempo")]
    pub tempo: f64,
    #[serde(default = "default_total_beats")]
    pub total_beats: f64,
    /// How often the host should call `tick`
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Level of an audible channel
    #[serde(default = "default_volume")]
    pub volume: f32,
}

fn default_sample_rate() -> u32 {
    44100
}

fn default_tempo() -> f64 {
    120.0
}

fn default_total_beats() -> f64 {
    32.0
}

fn default_poll_interval_ms() -> u64 {
    16
}

fn default_volume() -> f32 {
    1.0
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            tempo: default_tempo(),
            total_beats: default_total_beats(),
            poll_interval_ms: default_poll_interval_ms(),
            volume: default_volume(),
        }
    }
}

impl EngineConfig {
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("mashup").join("config.toml"))
    }

    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        Self::load_from(&path)
    }

    /// Read `path`, falling back to defaults when it is missing or malformed.
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                log::warn!("ignoring malformed config {}: {e}", path.display());
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let Some(path) = Self::config_path() else {
            anyhow::bail!("no config directory on this platform");
        };
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }
}
