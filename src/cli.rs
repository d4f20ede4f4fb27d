use std::path::PathBuf;
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::{Args, Parser};
use tracing_subscriber::EnvFilter;

use crate::config::{ConfigLoader, ConfigOverrides, ResolvedConfig};
use crate::domain::TransportPolicy;
use crate::error::GeneError;
use crate::output::OutputMode;
use crate::progress::{BarProgress, ProgressSink, SilentProgress};

pub const EXIT_INPUT: u8 = 1;
pub const EXIT_USAGE: u8 = 2;
pub const EXIT_REMOTE: u8 = 3;

/// Flags shared by both batch commands.
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// JSON config file (defaults to ./ncbi-gene-batch.json, then the user config dir)
    #[arg(long)]
    pub config: Option<String>,

    /// Minimum delay between requests, in milliseconds
    #[arg(long)]
    pub delay_ms: Option<u64>,

    /// Per-request timeout in seconds; 0 disables it
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Skip genes whose requests fail instead of aborting the batch
    #[arg(long)]
    pub keep_going: bool,

    /// No progress bar; print a JSON run summary on stdout
    #[arg(long)]
    pub non_interactive: bool,
}

impl CommonArgs {
    pub fn resolve_config(
        &self,
        dictionary_path: Option<PathBuf>,
    ) -> Result<ResolvedConfig, GeneError> {
        let mut config = ConfigLoader::resolve(self.config.as_deref())?;
        config.apply(ConfigOverrides {
            delay_ms: self.delay_ms,
            timeout_secs: self.timeout_secs,
            dictionary_path,
        });
        Ok(config)
    }

    pub fn policy(&self) -> TransportPolicy {
        if self.keep_going {
            TransportPolicy::Skip
        } else {
            TransportPolicy::FailFast
        }
    }

    pub fn output_mode(&self) -> OutputMode {
        if self.non_interactive {
            OutputMode::NonInteractive
        } else {
            OutputMode::Interactive
        }
    }
}

pub fn progress_sink(mode: OutputMode) -> Box<dyn ProgressSink> {
    match mode {
        OutputMode::Interactive => Box::new(BarProgress::new()),
        OutputMode::NonInteractive => Box::new(SilentProgress),
    }
}

/// Parses argv. Usage errors go to stdout with exit code 2; help and version
/// exit cleanly.
pub fn parse_args<P: Parser>() -> Result<P, ExitCode> {
    P::try_parse().map_err(|err| match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            let _ = err.print();
            ExitCode::SUCCESS
        }
        _ => {
            println!("{}", err.render());
            ExitCode::from(EXIT_USAGE)
        }
    })
}

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

pub fn exit_status(report: &miette::Report) -> u8 {
    match report.downcast_ref::<GeneError>() {
        Some(err) if err.is_remote() => EXIT_REMOTE,
        _ => EXIT_INPUT,
    }
}

/// Prints the report the way miette renders it and maps it to an exit code.
pub fn finish(result: miette::Result<()>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(report) => {
            eprintln!("{report:?}");
            ExitCode::from(exit_status(&report))
        }
    }
}
