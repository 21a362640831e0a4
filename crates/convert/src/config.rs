use std::path::{Path, PathBuf};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use crate::disposition::DispositionMode;

/// Configuration for the rip conversion run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    /// Root holding ripped movies directly inside it
    pub source_dir: PathBuf,
    /// Subdirectory of `source_dir` holding one directory per series
    pub tv_subdir: PathBuf,
    /// Where converted movies are written
    pub movies_output_dir: PathBuf,
    /// Where converted episodes are written (one subdirectory per series)
    pub tv_output_dir: PathBuf,
    /// Path to the HandBrake command line binary
    pub handbrake_bin: PathBuf,
    /// Path to the ffprobe binary
    pub ffprobe_bin: PathBuf,
    /// Language code treated as the default for audio/subtitle selection
    pub primary_language: String,
    /// Value passed to HandBrake's --encoder-preset
    pub encoder_speed_preset: String,
    /// Audio codec for every encoded audio track
    pub audio_codec: String,
    /// Audio bitrate in kbps for every encoded audio track
    pub audio_bitrate_kbps: u32,
    /// Interval in seconds between convergence runs in polling mode
    pub poll_interval_secs: u64,
    /// Only encode a short window of each file (for checking settings)
    pub preview: bool,
    /// Log encoder failures and keep going instead of aborting the pass
    pub continue_on_encoder_error: bool,
    /// Log planned work without encoding or touching sources
    pub dry_run: bool,
    /// What happens to a source file after a successful encode
    pub disposition: DispositionMode,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self::default_config()
    }
}

impl ConvertConfig {
    /// Create a default configuration with sensible values
    pub fn default_config() -> Self {
        Self {
            source_dir: PathBuf::from("."),
            tv_subdir: PathBuf::from("TV"),
            movies_output_dir: PathBuf::from("Converted/Movies"),
            tv_output_dir: PathBuf::from("Converted/TV"),
            handbrake_bin: PathBuf::from("HandBrakeCLI"),
            ffprobe_bin: PathBuf::from("ffprobe"),
            primary_language: "eng".to_string(),
            encoder_speed_preset: "fast".to_string(),
            audio_codec: "av_aac".to_string(),
            audio_bitrate_kbps: 384,
            poll_interval_secs: 60,
            preview: false,
            continue_on_encoder_error: false,
            dry_run: false,
            disposition: DispositionMode::Move(PathBuf::from("Completed")),
        }
    }

    /// Load configuration from a file, or return defaults if path is None or file doesn't exist
    pub fn load_config(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::default_config();

        if let Some(config_path) = path {
            if config_path.exists() {
                let content = std::fs::read_to_string(config_path)
                    .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

                // TOML by extension, JSON otherwise
                if config_path.extension().and_then(|s| s.to_str()) == Some("toml") {
                    config = toml::from_str(&content)
                        .with_context(|| format!("Failed to parse TOML config: {}", config_path.display()))?;
                } else {
                    config = serde_json::from_str(&content)
                        .with_context(|| format!("Failed to parse JSON config: {}", config_path.display()))?;
                }
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject values that would produce a broken encoder invocation
    pub fn validate(&self) -> Result<()> {
        if self.handbrake_bin.as_os_str().is_empty() {
            bail!("handbrake_bin must not be empty");
        }
        if self.ffprobe_bin.as_os_str().is_empty() {
            bail!("ffprobe_bin must not be empty");
        }
        if self.primary_language.trim().is_empty() {
            bail!("primary_language must not be empty");
        }
        if self.audio_codec.trim().is_empty() {
            bail!("audio_codec must not be empty");
        }
        if self.audio_bitrate_kbps == 0 {
            bail!("audio_bitrate_kbps must be greater than 0");
        }
        if let DispositionMode::Move(dir) = &self.disposition {
            if dir.as_os_str().is_empty() {
                bail!("move directory must not be empty");
            }
        }
        Ok(())
    }

    /// Directory scanned for series subdirectories
    pub fn tv_source_dir(&self) -> PathBuf {
        self.source_dir.join(&self.tv_subdir)
    }
}
