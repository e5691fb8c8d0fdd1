use crate::audio::{AudioFormat, ChannelMask};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub input_path: String,

    #[serde(default = "default_format")]
    pub format: String,

    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    #[serde(default = "default_channel_mask")]
    pub channel_mask: String,

    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default)]
    pub device_address: String,

    #[serde(default = "default_wav_path")]
    pub wav_path: String,

    #[serde(default = "default_sink_buffer_bytes")]
    pub sink_buffer_bytes: usize,

    #[serde(default = "default_read_chunk_bytes")]
    pub read_chunk_bytes: usize,
}

fn default_format() -> String {
    "ac3".to_string()
}

fn default_sample_rate() -> u32 {
    48000
}

fn default_channel_mask() -> String {
    "5.1".to_string()
}

fn default_output() -> String {
    "device".to_string()
}

fn default_wav_path() -> String {
    "spdif-out.wav".to_string()
}

fn default_sink_buffer_bytes() -> usize {
    4096
}

fn default_read_chunk_bytes() -> usize {
    2048
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_path: String::new(),
            format: default_format(),
            sample_rate: default_sample_rate(),
            channel_mask: default_channel_mask(),
            output: default_output(),
            device_address: String::new(),
            wav_path: default_wav_path(),
            sink_buffer_bytes: default_sink_buffer_bytes(),
            read_chunk_bytes: default_read_chunk_bytes(),
        }
    }
}

impl Config {
    /// Load configuration from the default location (~/.config/spdif-out/config.json)
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            tracing::info!(
                "Config file not found at {:?}, creating default config",
                config_path
            );
            let config = Self::default();
            config.save_to(&config_path)?;
            return Ok(config);
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: Self = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;

        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = if let Ok(dir) = std::env::var("XDG_CONFIG_HOME") {
            PathBuf::from(dir)
        } else {
            let home = std::env::var("HOME").context("HOME environment variable not set")?;
            PathBuf::from(home).join(".config")
        };

        Ok(config_dir.join("spdif-out").join("config.json"))
    }

    pub fn audio_format(&self) -> Result<AudioFormat> {
        self.format.parse().map_err(anyhow::Error::msg)
    }

    pub fn channels(&self) -> Result<ChannelMask> {
        self.channel_mask.parse().map_err(anyhow::Error::msg)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.input_path.is_empty() {
            return Err(anyhow::anyhow!(
                "input_path must name a compressed audio file"
            ));
        }

        if self.sample_rate == 0 {
            return Err(anyhow::anyhow!("sample_rate cannot be zero"));
        }

        if self.sink_buffer_bytes == 0 || self.read_chunk_bytes == 0 {
            return Err(anyhow::anyhow!(
                "sink_buffer_bytes and read_chunk_bytes must be positive"
            ));
        }

        if !["device", "wav"].contains(&self.output.as_str()) {
            return Err(anyhow::anyhow!("output must be one of: device, wav"));
        }

        self.audio_format()?;
        self.channels()?;

        Ok(())
    }
}
