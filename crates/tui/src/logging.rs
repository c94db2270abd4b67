use std::path::PathBuf;

use directories::BaseDirs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Keeps the background writer alive; dropping it flushes pending lines.
pub struct Guard(#[allow(dead_code)] WorkerGuard);

pub fn log_dir() -> Option<PathBuf> {
    BaseDirs::new().map(|b| b.data_dir().join("pinkai").join("logs"))
}

/// File logging only; the terminal belongs to the UI. Level comes from
/// `PINKAI_LOG` (e.g. `PINKAI_LOG=providers::hf=debug`), default `info`.
pub fn init_tracing() -> anyhow::Result<Option<Guard>> {
    let Some(dir) = log_dir() else {
        return Ok(None);
    };
    std::fs::create_dir_all(&dir)?;
    let append = tracing_appender::rolling::daily(dir, "pinkai.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(append);
    let filter = EnvFilter::try_from_env("PINKAI_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .with_ansi(false)
        .with_target(true)
        .with_writer(non_blocking)
        .try_init();
    Ok(Some(Guard(guard)))
}
