use std::path::PathBuf;
use std::process::Output;
use std::time::Instant;
use async_trait::async_trait;
use log::{debug, info};
use tokio::process::Command;
use crate::config::ConvertConfig;
use crate::error::EncodeError;
use crate::params::{EncodeSettings, TranscodeJob};

/// Preview window start, seconds into the source
const PREVIEW_START_SECS: u32 = 10 * 60;
/// Preview window length in seconds
const PREVIEW_LENGTH_SECS: u32 = 60;

/// Captured result of a finished encoder run.
///
/// The two streams are captured through separate pipes, so their relative
/// ordering is lost.
#[derive(Debug, Clone)]
pub struct EncodeOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl EncodeOutput {
    fn from_process(output: &Output) -> Self {
        Self {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }

    /// Log each stream under its own label
    fn log(&self) {
        if !self.stdout.trim().is_empty() {
            info!("HandBrake stdout:\n{}", self.stdout.trim_end());
        }
        if !self.stderr.trim().is_empty() {
            info!("HandBrake stderr:\n{}", self.stderr.trim_end());
        }
    }
}

/// Runs one transcode to completion
#[async_trait]
pub trait Encoder: Send + Sync {
    async fn encode(&self, job: &TranscodeJob) -> Result<EncodeOutput, EncodeError>;
}

fn join<T: ToString>(items: impl IntoIterator<Item = T>) -> String {
    items.into_iter().map(|i| i.to_string()).collect::<Vec<_>>().join(",")
}

/// Build the HandBrakeCLI argument list for a job.
///
/// Arguments are passed straight to the process, never through a shell.
pub fn build_handbrake_args(job: &TranscodeJob, settings: &EncodeSettings) -> Vec<String> {
    let params = &job.params;
    let mut args = Vec::new();

    args.push("-Z".to_string());
    args.push(params.preset.handbrake_preset().to_string());
    args.push("-i".to_string());
    args.push(job.source.to_string_lossy().to_string());
    args.push("-o".to_string());
    args.push(job.destination.to_string_lossy().to_string());
    args.push("--encoder-preset".to_string());
    args.push(settings.speed_preset.clone());
    args.push("-q".to_string());
    args.push(format!("{:.1}", params.quality));

    if !params.audio.is_empty() {
        args.push("--audio".to_string());
        args.push(join(params.audio.iter().map(|a| a.track)));
        args.push("-E".to_string());
        args.push(join(params.audio.iter().map(|a| a.codec.as_str())));
        args.push("-B".to_string());
        args.push(join(params.audio.iter().map(|a| a.bitrate_kbps)));
        args.push("--mixdown".to_string());
        args.push(join(params.audio.iter().map(|a| a.mixdown.handbrake_name())));
    }

    if !params.subtitles.is_empty() {
        // "scan" finds forced subtitles among the listed tracks
        args.push("-s".to_string());
        args.push(format!("scan,{}", join(&params.subtitles)));
        args.push("-F".to_string());
        if params.burn_in {
            args.push("--subtitle-burned".to_string());
        }
    }

    if settings.preview {
        args.push("--start-at".to_string());
        args.push(format!("duration:{}", PREVIEW_START_SECS));
        args.push("--stop-at".to_string());
        args.push(format!("duration:{}", PREVIEW_LENGTH_SECS));
    }

    args
}

/// Encoder backed by the HandBrake command line binary
#[derive(Debug, Clone)]
pub struct HandBrakeCli {
    pub bin: PathBuf,
    pub settings: EncodeSettings,
}

impl HandBrakeCli {
    pub fn new(bin: impl Into<PathBuf>, settings: EncodeSettings) -> Self {
        Self { bin: bin.into(), settings }
    }

    pub fn from_config(cfg: &ConvertConfig) -> Self {
        Self::new(&cfg.handbrake_bin, EncodeSettings::from_config(cfg))
    }
}

#[async_trait]
impl Encoder for HandBrakeCli {
    async fn encode(&self, job: &TranscodeJob) -> Result<EncodeOutput, EncodeError> {
        let args = build_handbrake_args(job, &self.settings);
        info!("{} {}", self.bin.display(), args.join(" "));

        let start = Instant::now();
        let output = Command::new(&self.bin)
            .args(&args)
            .output()
            .await
            .map_err(|source| EncodeError::Launch { bin: self.bin.clone(), source })?;

        let result = EncodeOutput::from_process(&output);
        debug!(
            "HandBrake exit code: {:?}, took {:.1}s",
            result.exit_code,
            start.elapsed().as_secs_f64()
        );
        result.log();

        if !output.status.success() {
            return Err(EncodeError::Failed {
                input: job.source.clone(),
                code: result.exit_code,
                stderr: result.stderr,
            });
        }

        Ok(result)
    }
}
