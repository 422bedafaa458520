use std::path::Path;
use std::sync::Mutex;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

// dropping the guard flushes the file writer
static GUARD: Mutex<Option<WorkerGuard>> = Mutex::new(None);

/// Default filter level; `RUST_LOG` takes precedence when set.
pub fn default_level(verbose: bool) -> &'static str {
    if verbose { "debug" } else { "info" }
}

/// Console logging to stderr, plus a daily rotated `autoscp.<date>.log` in
/// `log_dir` when one is given.
pub fn init_tracing(verbose: bool, log_dir: Option<&Path>) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level(verbose)));
    let console = fmt::layer().with_target(false).with_writer(std::io::stderr);

    let file_layer = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create log dir {}", dir.display()))?;
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix(env!("CARGO_PKG_NAME"))
                .filename_suffix("log")
                .max_log_files(30)
                .build(dir)
                .context("failed to create log file appender")?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            *GUARD.lock().unwrap_or_else(|p| p.into_inner()) = Some(guard);
            Some(fmt::layer().with_ansi(false).with_target(false).with_writer(writer))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;
    Ok(())
}

/// Flush buffered file output. Call once before the process exits.
pub fn flush_logs() {
    drop(GUARD.lock().unwrap_or_else(|p| p.into_inner()).take());
}
