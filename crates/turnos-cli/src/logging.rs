//! Per-run logging: stdout plus a `run_<timestamp>.log` file.

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Local};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

const DEFAULT_FILTER: &str = "warn,turnos=info";

/// Keeps the file writer alive; dropping it flushes the log.
pub struct RunLog {
    pub path: PathBuf,
    _guard: WorkerGuard,
}

pub fn log_file_name(started: DateTime<Local>) -> String {
    format!("run_{}.log", started.format("%Y-%m-%d_%H-%M-%S"))
}

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Log to stdout and to a fresh file under `log_dir`.
pub fn init_run(log_dir: &Path, started: DateTime<Local>) -> anyhow::Result<RunLog> {
    std::fs::create_dir_all(log_dir).with_context(|| format!("creating {}", log_dir.display()))?;
    let file_name = log_file_name(started);
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(log_dir, &file_name));

    tracing_subscriber::registry()
        .with(filter())
        .with(fmt::layer())
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .try_init()
        .context("installing log subscriber")?;

    Ok(RunLog {
        path: log_dir.join(file_name),
        _guard: guard,
    })
}

/// Stdout only, for the one-off subcommands.
pub fn init_stdout() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(filter())
        .with(fmt::layer())
        .try_init()
        .context("installing log subscriber")
}
