//! Tracing setup: stdout plus daily-rotated file output.
//!
//! `RUST_LOG` controls filtering (default "info"), e.g.
//! `RUST_LOG=site_auditor=debug,reqwest=warn`.

use std::path::Path;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Initialize the tracing subscriber with a compact stdout layer and a
/// daily-rotated file layer under `log_dir`.
///
/// # Panics
/// Panics if a global subscriber is already installed.
pub fn init_logging<P: AsRef<Path>>(log_dir: P) -> Result<(), Box<dyn std::error::Error>> {
    let log_path = log_dir.as_ref();
    std::fs::create_dir_all(log_path)?;

    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;

    let file_appender = tracing_appender::rolling::daily(log_path, "audit.log");
    let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);

    let json_appender = tracing_appender::rolling::daily(log_path, "audit.json.log");
    let (json_writer, json_guard) = tracing_appender::non_blocking(json_appender);

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_target(true)
        .with_ansi(false)
        .compact()
        .with_filter(env_filter);

    let json_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
    let json_layer = fmt::layer()
        .json()
        .with_writer(json_writer)
        .with_target(true)
        .with_current_span(true)
        .with_filter(json_filter);

    let stdout_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
    let stdout_layer = fmt::layer()
        .with_target(false)
        .compact()
        .with_filter(stdout_filter);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(json_layer)
        .with(stdout_layer)
        .init();

    // The guards must outlive the program for the background writers to flush.
    Box::leak(Box::new(file_guard));
    Box::leak(Box::new(json_guard));

    tracing::debug!("logging initialized, files under {}", log_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    #[test]
    fn test_log_directory_creation() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("logs");

        // init_logging panics when called twice in one process, so only the
        // directory handling is exercised here.
        std::fs::create_dir_all(&log_path).unwrap();
        assert!(log_path.exists());
    }
}
