use std::fmt;
use std::path::PathBuf;
use log::debug;
use crate::config::ConvertConfig;
use crate::media::MediaInfo;

/// Resolution tier, chosen from the primary video track height
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresetTier {
    P1080,
    P720,
    P576,
    P480,
}

impl PresetTier {
    /// Highest tier whose threshold the height reaches
    pub fn from_height(height: u32) -> Self {
        if height >= 1080 {
            PresetTier::P1080
        } else if height >= 720 {
            PresetTier::P720
        } else if height >= 576 {
            PresetTier::P576
        } else {
            PresetTier::P480
        }
    }

    /// Constant quality (RF) used for this tier
    pub fn quality(&self) -> f32 {
        match self {
            PresetTier::P1080 => 20.0,
            PresetTier::P720 | PresetTier::P576 | PresetTier::P480 => 18.0,
        }
    }

    /// Built-in HandBrake preset for this tier
    pub fn handbrake_preset(&self) -> &'static str {
        match self {
            PresetTier::P1080 => "H.264 MKV 1080p30",
            PresetTier::P720 => "H.264 MKV 720p30",
            PresetTier::P576 => "H.264 MKV 576p25",
            PresetTier::P480 => "H.264 MKV 480p30",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PresetTier::P1080 => "1080p",
            PresetTier::P720 => "720p",
            PresetTier::P576 => "576p",
            PresetTier::P480 => "480p",
        }
    }
}

impl fmt::Display for PresetTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Channel downmix requested for an audio encode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mixdown {
    /// Keep discrete 5.1
    Surround51,
    /// Dolby Pro Logic II stereo
    Dpl2,
}

impl Mixdown {
    pub fn handbrake_name(&self) -> &'static str {
        match self {
            Mixdown::Surround51 => "5point1",
            Mixdown::Dpl2 => "dpl2",
        }
    }
}

/// One output audio track
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioEncode {
    /// 1-based source audio track number
    pub track: usize,
    pub codec: String,
    pub bitrate_kbps: u32,
    pub mixdown: Mixdown,
}

/// Everything the encoder needs besides the file paths
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeParams {
    pub preset: PresetTier,
    pub quality: f32,
    pub audio: Vec<AudioEncode>,
    /// 1-based source subtitle track numbers
    pub subtitles: Vec<usize>,
    /// Scan for forced subtitles and burn the result into the picture
    pub burn_in: bool,
}

/// A single file's encode, consumed by one encoder invocation
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeJob {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub params: EncodeParams,
}

/// Fixed settings that shape derived parameters and the encoder command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeSettings {
    pub primary_language: String,
    pub audio_codec: String,
    pub audio_bitrate_kbps: u32,
    pub speed_preset: String,
    /// Encode only a short window starting 10 minutes in
    pub preview: bool,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self::from_config(&ConvertConfig::default())
    }
}

impl EncodeSettings {
    pub fn from_config(cfg: &ConvertConfig) -> Self {
        Self {
            primary_language: cfg.primary_language.clone(),
            audio_codec: cfg.audio_codec.clone(),
            audio_bitrate_kbps: cfg.audio_bitrate_kbps,
            speed_preset: cfg.encoder_speed_preset.clone(),
            preview: cfg.preview,
        }
    }
}

/// Surround tracks carry at least 6 channels
const SURROUND_CHANNELS: u32 = 6;

/// Derive encoder parameters from container metadata alone.
///
/// Only the first primary-language surround track is kept as the master; later
/// primary-language surround tracks are dropped. Surround tracks in other
/// languages are always kept.
pub fn derive_params(info: &MediaInfo, settings: &EncodeSettings) -> EncodeParams {
    let height = info.video.as_ref().map_or(0, |v| v.height);
    let preset = PresetTier::from_height(height);

    let mut audio = Vec::with_capacity(info.audio_tracks.len());
    let mut has_master = false;
    for (idx, track) in info.audio_tracks.iter().enumerate() {
        let mixdown = if track.channels >= SURROUND_CHANNELS {
            if track.language.as_deref() == Some(settings.primary_language.as_str()) {
                if has_master {
                    debug!("Dropping audio track {}: second {} surround track", idx + 1, settings.primary_language);
                    continue;
                }
                has_master = true;
            }
            Mixdown::Surround51
        } else {
            Mixdown::Dpl2
        };

        audio.push(AudioEncode {
            track: idx + 1,
            codec: settings.audio_codec.clone(),
            bitrate_kbps: settings.audio_bitrate_kbps,
            mixdown,
        });
    }

    let subtitles: Vec<usize> = info
        .subtitle_tracks
        .iter()
        .enumerate()
        .filter(|(_, t)| match t.language.as_deref() {
            None => true,
            Some(lang) => lang == settings.primary_language,
        })
        .map(|(idx, _)| idx + 1)
        .collect();

    let burn_in = !subtitles.is_empty();

    EncodeParams {
        preset,
        quality: preset.quality(),
        audio,
        subtitles,
        burn_in,
    }
}
