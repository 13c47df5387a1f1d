//! CLI for dirpush: flags → RunConfig → coordinator, with per-file console output.

mod output;

use anyhow::{Context, Result};
use clap::builder::RangedU64ValueParser;
use clap::{ArgAction, Parser};
use dirpush_core::config::{self, RunConfig, UploadDefaults};
use dirpush_core::scheduler::{self, UploadEvent};
use std::path::PathBuf;
use std::time::Duration;

/// Upload every file of a directory to an HTTP endpoint, in batches, with bounded concurrency.
#[derive(Debug, Parser)]
#[command(name = "dirpush", version)]
#[command(about = "Bulk-upload the files of a directory to an HTTP endpoint", long_about = None)]
#[command(disable_help_flag = true)]
pub struct Cli {
    /// Endpoint URL each file is POSTed to (e.g. http://localhost:8080/api/v2/sbom).
    #[arg(long = "e", alias = "endpoint", value_name = "URL")]
    pub endpoint: String,

    /// Directory whose regular files are uploaded (not recursive).
    #[arg(long = "s", alias = "source", value_name = "DIR")]
    pub source: PathBuf,

    /// Maximum uploads in flight at once [default: 4].
    #[arg(long = "c", alias = "concurrency", value_name = "N",
          value_parser = RangedU64ValueParser::<usize>::new().range(1..))]
    pub concurrency: Option<usize>,

    /// Files per batch; a batch finishes before the next starts [default: 200].
    #[arg(long = "b", alias = "batch-size", value_name = "N",
          value_parser = RangedU64ValueParser::<usize>::new().range(1..))]
    pub batch_size: Option<usize>,

    /// Value of the `labels` query parameter.
    #[arg(long = "l", alias = "label", value_name = "LABEL")]
    pub label: Option<String>,

    /// Per-request timeout in seconds [default: 30].
    #[arg(long = "t", alias = "timeout", value_name = "SECS",
          value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_secs: Option<u64>,

    /// File that failed paths are appended to [default: errors.log].
    #[arg(long = "error-log", value_name = "PATH")]
    pub error_log: Option<PathBuf>,

    /// Defaults file to use instead of ~/.config/dirpush/config.toml.
    #[arg(long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print help.
    #[arg(short = 'h', long = "h", alias = "help", action = ArgAction::Help)]
    pub help: Option<bool>,
}

impl Cli {
    /// Build the run config: flags override the defaults file, which overrides built-ins.
    pub fn into_run_config(self, defaults: &UploadDefaults) -> Result<RunConfig> {
        let mut cfg = RunConfig::new(&self.endpoint, self.source)?.with_defaults(defaults);
        if let Some(n) = self.concurrency {
            cfg.concurrency = n;
        }
        if let Some(n) = self.batch_size {
            cfg.batch_size = n;
        }
        if let Some(label) = self.label {
            cfg.label = label;
        }
        if let Some(secs) = self.timeout_secs {
            cfg.timeout = Duration::from_secs(secs);
        }
        if let Some(path) = self.error_log {
            cfg.error_log = path;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    fn load_defaults(&self) -> Result<UploadDefaults> {
        match &self.config {
            Some(path) => config::load_defaults_from(path),
            None => Ok(config::load_defaults().unwrap_or_else(|e| {
                tracing::warn!("ignoring defaults file: {:#}", e);
                UploadDefaults::default()
            })),
        }
    }
}

pub async fn run_from_args() -> Result<()> {
    let cli = Cli::parse();
    let defaults = cli.load_defaults()?;
    let cfg = cli.into_run_config(&defaults)?;
    tracing::debug!("run config: {:?}", cfg);
    run(cfg).await
}

async fn run(cfg: RunConfig) -> Result<()> {
    let (events_tx, events_rx) = tokio::sync::mpsc::unbounded_channel::<UploadEvent>();
    let printer = output::spawn_printer(events_rx);

    let result = scheduler::run_upload(cfg, Some(events_tx)).await;
    // The coordinator dropped its sender; wait for the printer to flush every line.
    let _ = printer.await;
    let summary = result.context("upload run aborted")?;

    if summary.files == 0 {
        println!("No files to upload.");
    }
    for line in output::summary_lines(&summary) {
        println!("{}", line);
    }
    Ok(())
}
