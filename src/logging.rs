use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Routes `tracing` output to a daily log file under `log_dir`.
///
/// Logs never go to the terminal, which the UI owns. The level comes from
/// `RUST_LOG` and defaults to `info`. Keep the returned guard alive until
/// exit so buffered lines get flushed. Returns `None` when the directory
/// can't be created or a subscriber is already installed.
pub fn init_logging(log_dir: &Path) -> Option<WorkerGuard> {
    if let Err(e) = std::fs::create_dir_all(log_dir) {
        eprintln!("Logging disabled: cannot create {}: {}", log_dir.display(), e);
        return None;
    }

    let appender = RollingFileAppender::new(Rotation::DAILY, log_dir, "taskcal.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::registry().with(env_filter).with(
        tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(true),
    );

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        return None;
    }

    tracing::info!("Logging initialized at {:?}", log_dir);
    Some(guard)
}
