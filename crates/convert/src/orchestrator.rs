use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use tokio::sync::watch;
use crate::config::ConvertConfig;
use crate::disposition::{dispose, DispositionMode};
use crate::episodes::plan_series;
use crate::ffprobe::{FfprobeProbe, MetadataProbe};
use crate::handbrake::{build_handbrake_args, Encoder, HandBrakeCli};
use crate::media::MediaFile;
use crate::naming::normalize_rip_name;
use crate::params::{derive_params, EncodeSettings, TranscodeJob};
use crate::scan;

/// Progress carried across passes of one process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunState {
    pub disposition: DispositionMode,
    /// Sources disposed of since the process started
    pub completed: u64,
}

impl RunState {
    pub fn new(disposition: DispositionMode) -> Self {
        Self { disposition, completed: 0 }
    }

    /// Dry runs never touch sources, whatever the configured mode
    pub fn from_config(cfg: &ConvertConfig) -> Self {
        if cfg.dry_run {
            Self::new(DispositionMode::Keep)
        } else {
            Self::new(cfg.disposition.clone())
        }
    }
}

/// What a single pass did
#[derive(Debug, Clone)]
pub struct PassReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Encoder runs that succeeded
    pub encoded: usize,
    /// Sources deleted or moved
    pub completed: usize,
    /// Files whose metadata could not be read
    pub skipped: usize,
    /// Encoder failures tolerated by `continue_on_encoder_error`
    pub failed: usize,
    /// Jobs only logged because of a dry run
    pub planned: usize,
}

impl PassReport {
    fn start() -> Self {
        let now = Utc::now();
        Self {
            started_at: now,
            finished_at: now,
            encoded: 0,
            completed: 0,
            skipped: 0,
            failed: 0,
            planned: 0,
        }
    }
}

/// Drives probing, encoding and disposition over the source trees.
///
/// A pass covers the movies root and every series directory under the TV root.
/// Passes repeat while they complete something; polling restarts the cycle
/// after a fixed interval until stopped.
pub struct Orchestrator<P, E> {
    cfg: ConvertConfig,
    settings: EncodeSettings,
    probe: P,
    encoder: E,
}

impl Orchestrator<FfprobeProbe, HandBrakeCli> {
    /// ffprobe + HandBrakeCLI as configured
    pub fn from_config(cfg: ConvertConfig) -> Self {
        let probe = FfprobeProbe::from_config(&cfg);
        let encoder = HandBrakeCli::from_config(&cfg);
        Self::new(cfg, probe, encoder)
    }
}

impl<P: MetadataProbe, E: Encoder> Orchestrator<P, E> {
    pub fn new(cfg: ConvertConfig, probe: P, encoder: E) -> Self {
        let settings = EncodeSettings::from_config(&cfg);
        Self { cfg, settings, probe, encoder }
    }

    pub fn config(&self) -> &ConvertConfig {
        &self.cfg
    }

    /// Process every movie and every series episode once
    pub async fn run_pass(&self, state: &mut RunState) -> Result<PassReport> {
        let mut report = PassReport::start();

        for path in scan::list_movie_files(&self.cfg.source_dir) {
            let display_name = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => normalize_rip_name(name),
                None => {
                    warn!("Skipping non UTF-8 file name: {}", path.display());
                    continue;
                }
            };
            let dest = self.cfg.movies_output_dir.join(&display_name);
            self.process_file(&path, display_name, dest, state, &mut report).await?;
        }

        for series_dir in scan::list_series_dirs(&self.cfg.tv_source_dir()) {
            self.process_series(&series_dir, state, &mut report).await?;
        }

        report.finished_at = Utc::now();
        info!(
            "Pass finished in {}s: {} encoded, {} completed, {} skipped, {} failed, {} planned",
            (report.finished_at - report.started_at).num_seconds(),
            report.encoded,
            report.completed,
            report.skipped,
            report.failed,
            report.planned
        );
        Ok(report)
    }

    async fn process_series(&self, series_dir: &Path, state: &mut RunState, report: &mut PassReport) -> Result<()> {
        let series = match series_dir.file_name().and_then(|n| n.to_str()) {
            Some(series) => series.to_string(),
            None => {
                warn!("Skipping series directory with non UTF-8 name: {}", series_dir.display());
                return Ok(());
            }
        };

        let names = scan::list_file_names(series_dir);
        let plan = plan_series(&series, names.iter().map(String::as_str));
        info!("{}: {} rip file(s) to process", series, plan.assignments.len());

        for assignment in plan.assignments {
            let output_name = assignment.output_name();
            info!("{} -> {}", assignment.source_name, output_name);

            let source = series_dir.join(&assignment.source_name);
            let dest = self.cfg.tv_output_dir.join(&series).join(&output_name);
            self.process_file(&source, output_name, dest, state, report).await?;
        }
        Ok(())
    }

    async fn process_file(
        &self,
        path: &Path,
        display_name: String,
        dest: PathBuf,
        state: &mut RunState,
        report: &mut PassReport,
    ) -> Result<()> {
        let info = match self.probe.probe(path).await {
            Ok(info) => info,
            Err(e) if e.is_skippable() => {
                warn!("Skipping {}: {}", path.display(), e);
                report.skipped += 1;
                return Ok(());
            }
            Err(e) => return Err(e).context("Metadata probe unavailable"),
        };

        let file = MediaFile { path: path.to_path_buf(), display_name, info };
        info!("{} - {}", file.display_name, file.info);

        let job = TranscodeJob {
            params: derive_params(&file.info, &self.settings),
            source: file.path,
            destination: dest,
        };

        if self.cfg.dry_run {
            info!(
                "[dry-run] {} {}",
                self.cfg.handbrake_bin.display(),
                build_handbrake_args(&job, &self.settings).join(" ")
            );
            report.planned += 1;
            return Ok(());
        }

        if let Some(parent) = job.destination.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create output directory: {}", parent.display()))?;
        }

        match self.encoder.encode(&job).await {
            Ok(_) => report.encoded += 1,
            Err(e) if self.cfg.continue_on_encoder_error => {
                error!("Encoding {} failed, continuing: {}", job.source.display(), e);
                report.failed += 1;
                return Ok(());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Encoding failed for {}", job.source.display()));
            }
        }

        let outcome = dispose(&job.source, &state.disposition)?;
        if outcome.is_completed() {
            state.completed += 1;
            report.completed += 1;
        }
        Ok(())
    }

    /// Repeat passes until one completes nothing new
    pub async fn converge(&self, state: &mut RunState) -> Result<Vec<PassReport>> {
        let mut reports = Vec::new();
        loop {
            let before = state.completed;
            let report = self.run_pass(state).await?;
            reports.push(report);
            if state.completed <= before {
                break;
            }
        }
        info!("Converged after {} pass(es), {} file(s) completed so far", reports.len(), state.completed);
        Ok(reports)
    }

    /// Converge, sleep, repeat; returns once `stop` turns true.
    ///
    /// The signal is checked between cycles and cuts the sleep short; an
    /// encode already running is finished first.
    pub async fn poll(&self, state: &mut RunState, mut stop: watch::Receiver<bool>) -> Result<()> {
        let interval = Duration::from_secs(self.cfg.poll_interval_secs);
        loop {
            if *stop.borrow() {
                break;
            }
            self.converge(state).await?;
            if *stop.borrow() {
                break;
            }

            info!("Sleeping for {} seconds before next run", interval.as_secs());
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                changed = stop.changed() => {
                    // sender gone: nobody can restart us, treat as stop
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        info!("Polling stopped");
        Ok(())
    }
}
