use std::collections::HashMap;
use std::path::{Path, PathBuf};
use async_trait::async_trait;
use log::debug;
use serde::Deserialize;
use tokio::process::Command;
use crate::config::ConvertConfig;
use crate::error::ProbeError;
use crate::media::{AudioTrack, MediaInfo, SubtitleTrack, VideoTrack};

/// Supplies container metadata for a file, or reports why it cannot
#[async_trait]
pub trait MetadataProbe: Send + Sync {
    async fn probe(&self, path: &Path) -> Result<MediaInfo, ProbeError>;
}

/// Complete ffprobe output structure
#[derive(Debug, Clone, Deserialize)]
pub struct FFProbeData {
    #[serde(default)]
    pub streams: Vec<FFProbeStream>,
    pub format: Option<FFProbeFormat>,
}

/// Format-level metadata from ffprobe
#[derive(Debug, Clone, Deserialize)]
pub struct FFProbeFormat {
    pub format_name: Option<String>,
    pub duration: Option<String>,
}

/// Stream-level metadata from ffprobe
#[derive(Debug, Clone, Deserialize)]
pub struct FFProbeStream {
    pub index: i32,
    pub codec_type: Option<String>,
    pub codec_name: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub channels: Option<u32>,
    pub field_order: Option<String>,
    pub tags: Option<HashMap<String, String>>,
    pub disposition: Option<HashMap<String, i32>>,
}

impl FFProbeStream {
    fn tag(&self, key: &str) -> Option<String> {
        let tags = self.tags.as_ref()?;
        // matroska tags come through upper-cased from some muxers
        tags.get(key)
            .or_else(|| tags.get(&key.to_uppercase()))
            .filter(|v| !v.is_empty())
            .cloned()
    }

    fn flag(&self, key: &str) -> bool {
        self.disposition
            .as_ref()
            .and_then(|d| d.get(key))
            .map_or(false, |v| *v != 0)
    }

    fn is_type(&self, codec_type: &str) -> bool {
        self.codec_type.as_deref() == Some(codec_type)
    }
}

impl FFProbeData {
    /// Convert raw ffprobe output into the metadata the deriver works on.
    ///
    /// Cover art shows up as a video stream with the `attached_pic` flag and is
    /// not the primary video track.
    pub fn into_media_info(self) -> MediaInfo {
        let video = self
            .streams
            .iter()
            .find(|s| s.is_type("video") && !s.flag("attached_pic"))
            .map(|s| VideoTrack {
                width: s.width.unwrap_or(0),
                height: s.height.unwrap_or(0),
                interlaced: s
                    .field_order
                    .as_deref()
                    .map_or(false, |order| order != "progressive" && order != "unknown"),
                codec: s.codec_name.clone().unwrap_or_else(|| "unknown".to_string()),
            });

        let audio_tracks = self
            .streams
            .iter()
            .filter(|s| s.is_type("audio"))
            .map(|s| AudioTrack {
                language: s.tag("language"),
                name: s.tag("title"),
                channels: s.channels.unwrap_or(2),
            })
            .collect();

        let subtitle_tracks = self
            .streams
            .iter()
            .filter(|s| s.is_type("subtitle"))
            .map(|s| SubtitleTrack {
                language: s.tag("language"),
                enabled: true,
                default: s.flag("default"),
                forced: s.flag("forced"),
            })
            .collect();

        let duration = self
            .format
            .as_ref()
            .and_then(|f| f.duration.as_deref())
            .and_then(|d| d.parse::<f64>().ok());

        MediaInfo { duration, video, audio_tracks, subtitle_tracks }
    }
}

/// Parse ffprobe JSON; a file without a video track is treated as unreadable
pub fn parse_ffprobe_json(path: &Path, json: &str) -> Result<MediaInfo, ProbeError> {
    let data: FFProbeData = serde_json::from_str(json).map_err(|e| ProbeError::Unreadable {
        path: path.to_path_buf(),
        reason: format!("invalid ffprobe output: {}", e),
    })?;

    let info = data.into_media_info();
    if info.video.is_none() {
        return Err(ProbeError::Unreadable {
            path: path.to_path_buf(),
            reason: "no video track".to_string(),
        });
    }
    Ok(info)
}

/// Metadata probe backed by a local ffprobe binary
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    pub ffprobe_bin: PathBuf,
}

impl FfprobeProbe {
    pub fn new(ffprobe_bin: impl Into<PathBuf>) -> Self {
        Self { ffprobe_bin: ffprobe_bin.into() }
    }

    pub fn from_config(cfg: &ConvertConfig) -> Self {
        Self::new(&cfg.ffprobe_bin)
    }
}

#[async_trait]
impl MetadataProbe for FfprobeProbe {
    async fn probe(&self, path: &Path) -> Result<MediaInfo, ProbeError> {
        if !path.is_file() {
            return Err(ProbeError::NotAFile(path.to_path_buf()));
        }

        debug!("ffprobe: probing {}", path.display());

        let output = Command::new(&self.ffprobe_bin)
            .arg("-v")
            .arg("error")
            .arg("-print_format")
            .arg("json")
            .arg("-show_streams")
            .arg("-show_format")
            .arg(path)
            .output()
            .await
            .map_err(|source| ProbeError::Tool { bin: self.ffprobe_bin.clone(), source })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ProbeError::Unreadable {
                path: path.to_path_buf(),
                reason: format!(
                    "ffprobe exit code {}: {}",
                    output.status.code().unwrap_or(-1),
                    stderr.trim()
                ),
            });
        }

        let json = String::from_utf8_lossy(&output.stdout);
        parse_ffprobe_json(path, &json)
    }
}
