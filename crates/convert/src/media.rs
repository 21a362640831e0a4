use std::fmt;
use std::path::PathBuf;

/// Primary video track properties
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoTrack {
    pub width: u32,
    pub height: u32,
    pub interlaced: bool,
    pub codec: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioTrack {
    pub language: Option<String>,
    pub name: Option<String>,
    pub channels: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleTrack {
    pub language: Option<String>,
    pub enabled: bool,
    pub default: bool,
    pub forced: bool,
}

/// Container metadata as reported by a [`MetadataProbe`](crate::ffprobe::MetadataProbe)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaInfo {
    /// Seconds
    pub duration: Option<f64>,
    pub video: Option<VideoTrack>,
    pub audio_tracks: Vec<AudioTrack>,
    pub subtitle_tracks: Vec<SubtitleTrack>,
}

/// A probed source file ready for parameter derivation
#[derive(Debug, Clone)]
pub struct MediaFile {
    pub path: PathBuf,
    /// Readable name the output will carry
    pub display_name: String,
    pub info: MediaInfo,
}

impl fmt::Display for MediaInfo {
    /// One-line summary: `1:23:45 - 1920x1080 h264 - eng Main, fra - eng EDF`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.duration {
            Some(secs) => {
                let total = secs.max(0.0).round() as u64;
                write!(f, "{}:{:02}:{:02}", total / 3600, (total / 60) % 60, total % 60)?;
            }
            None => write!(f, "?")?,
        }

        match &self.video {
            Some(v) => write!(
                f,
                " - {}x{}{} {}",
                v.width,
                v.height,
                if v.interlaced { "i" } else { "" },
                v.codec
            )?,
            None => write!(f, " - no video")?,
        }

        let audio: Vec<String> = self
            .audio_tracks
            .iter()
            .map(|t| {
                let lang = t.language.as_deref().unwrap_or("und");
                match &t.name {
                    Some(name) => format!("{} {}", lang, name),
                    None => lang.to_string(),
                }
            })
            .collect();

        let subs: Vec<String> = self
            .subtitle_tracks
            .iter()
            .map(|t| {
                let mut flags = String::new();
                if t.enabled {
                    flags.push('E');
                }
                if t.default {
                    flags.push('D');
                }
                if t.forced {
                    flags.push('F');
                }
                format!("{} {}", t.language.as_deref().unwrap_or("und"), flags)
            })
            .collect();

        write!(f, " - {} - {}", audio.join(", "), subs.join(", "))
    }
}
