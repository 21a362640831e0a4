use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use convert::{
    config::ConvertConfig,
    disposition::DispositionMode,
    orchestrator::{Orchestrator, RunState},
};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use log::{info, warn, LevelFilter};
use tokio::sync::watch;

/// Rename disc rips and batch-encode them with HandBrakeCLI
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Root directory holding movie rips and the TV subdirectory
    dir: Option<PathBuf>,

    /// Delete sources after a successful encode (wins over --move-dir)
    #[arg(long)]
    delete: bool,

    /// Move sources here after a successful encode; relative paths are
    /// resolved next to each source [default: Completed]
    #[arg(long)]
    move_dir: Option<PathBuf>,

    /// Append log output to this file
    #[arg(long, default_value = "convert.log")]
    log: PathBuf,

    /// Log what would be encoded without encoding or touching sources
    #[arg(long)]
    dry_run: bool,

    /// Keep running, re-scanning after the configured interval
    #[arg(long)]
    poll: bool,

    /// Encode only a one minute window ten minutes in
    #[arg(long)]
    preview: bool,

    /// Path to configuration file (JSON or TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output directory for movies
    #[arg(long)]
    movies_out: Option<PathBuf>,

    /// Output directory for TV series
    #[arg(long)]
    tv_out: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Mirrors every log line to the log file and stderr.
///
/// Only file errors are reported; a closed stderr (detached poller) must not
/// stop the log file.
struct Tee<F, E> {
    file: F,
    stderr: E,
}

impl<F: Write, E: Write> Write for Tee<F, E> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write_all(buf)?;
        let _ = self.stderr.write_all(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let _ = self.stderr.flush();
        self.file.flush()
    }
}

fn init_logging(log_path: &Path, verbose: bool) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("Failed to open log file: {}", log_path.display()))?;

    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if verbose {
        builder.filter_level(LevelFilter::Debug);
    }
    builder
        .format_timestamp_secs()
        .target(env_logger::Target::Pipe(Box::new(Tee { file, stderr: io::stderr() })))
        .init();
    Ok(())
}

/// Command line flags take precedence over the config file
fn apply_overrides(cfg: &mut ConvertConfig, args: &Args) {
    if let Some(dir) = &args.dir {
        cfg.source_dir = dir.clone();
    }
    if let Some(dir) = &args.movies_out {
        cfg.movies_output_dir = dir.clone();
    }
    if let Some(dir) = &args.tv_out {
        cfg.tv_output_dir = dir.clone();
    }
    if args.delete {
        cfg.disposition = DispositionMode::Delete;
    } else if let Some(dir) = &args.move_dir {
        cfg.disposition = DispositionMode::Move(dir.clone());
    }
    if args.preview {
        cfg.preview = true;
    }
    if args.dry_run {
        cfg.dry_run = true;
        cfg.disposition = DispositionMode::Keep;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log, args.verbose)?;

    let mut cfg = ConvertConfig::load_config(args.config.as_deref())
        .context("Failed to load configuration")?;
    apply_overrides(&mut cfg, &args);
    cfg.validate().context("Invalid configuration")?;

    info!("ripconv starting at {}", Utc::now().to_rfc3339());
    info!("Configuration loaded:");
    info!("  Source dir: {}", cfg.source_dir.display());
    info!("  TV source dir: {}", cfg.tv_source_dir().display());
    info!("  Movies output: {}", cfg.movies_output_dir.display());
    info!("  TV output: {}", cfg.tv_output_dir.display());
    info!("  Disposition: {:?}", cfg.disposition);
    if cfg.dry_run {
        warn!("Dry run: nothing will be encoded, moved or deleted");
    }
    if cfg.preview {
        info!("Preview mode: encoding a short window of each file");
    }

    let mut state = RunState::from_config(&cfg);
    let orchestrator = Orchestrator::from_config(cfg);

    if args.poll {
        let (stop_tx, stop_rx) = watch::channel(false);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupt received, stopping after the current step");
                let _ = stop_tx.send(true);
            }
        });
        orchestrator.poll(&mut state, stop_rx).await?;
    } else {
        let reports = orchestrator.converge(&mut state).await?;
        info!("Done: {} pass(es), {} file(s) completed", reports.len(), state.completed);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> ConvertConfig {
        let args = Args::try_parse_from(argv).unwrap();
        let mut cfg = ConvertConfig::default();
        apply_overrides(&mut cfg, &args);
        cfg
    }

    /// Writer whose every call fails, like a closed stderr
    struct Closed;

    impl Write for Closed {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }
    }

    #[test]
    fn test_log_file_written_when_stderr_closed() {
        let mut tee = Tee { file: Vec::new(), stderr: Closed };
        tee.write_all(b"INFO pass finished\n").unwrap();
        tee.flush().unwrap();
        assert_eq!(tee.file, b"INFO pass finished\n");
    }

    #[test]
    fn test_defaults_keep_config_values() {
        let cfg = parse(&["ripconv"]);
        assert_eq!(cfg.source_dir, PathBuf::from("."));
        assert_eq!(cfg.disposition, DispositionMode::Move(PathBuf::from("Completed")));
        assert!(!cfg.dry_run);
    }

    #[test]
    fn test_delete_wins_over_move_dir() {
        let cfg = parse(&["ripconv", "/rips", "--move-dir", "/done", "--delete"]);
        assert_eq!(cfg.source_dir, PathBuf::from("/rips"));
        assert_eq!(cfg.disposition, DispositionMode::Delete);
    }

    #[test]
    fn test_dry_run_keeps_sources() {
        let cfg = parse(&["ripconv", "--delete", "--dry-run", "--tv-out", "/out/tv"]);
        assert!(cfg.dry_run);
        assert_eq!(cfg.disposition, DispositionMode::Keep);
        assert_eq!(cfg.tv_output_dir, PathBuf::from("/out/tv"));
    }
}
