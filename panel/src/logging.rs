//! Structured logging to stderr or a file.

use crate::config::LoggingConfig;
use std::io;
use std::path::Path;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Crates whose chatter is capped at warn unless RUST_LOG says otherwise.
const NOISY_CRATES: [&str; 5] = ["hyper", "hyper_util", "reqwest", "tokio_tungstenite", "tungstenite"];

/// Initialize the global subscriber.
///
/// Returns the writer guard; hold it until exit so buffered lines flush.
pub fn init(config: &LoggingConfig) -> WorkerGuard {
    let filter = build_filter(&config.level);

    let (writer, guard) = match config.file.as_deref() {
        Some(path) => {
            let dir = path.parent().filter(|d| !d.as_os_str().is_empty()).unwrap_or(Path::new("."));
            let name = path.file_name().unwrap_or_default();
            if let Err(e) = std::fs::create_dir_all(dir) {
                eprintln!("Warning: could not create log directory {}: {e}", dir.display());
            }
            tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name))
        }
        None => tracing_appender::non_blocking(io::stderr()),
    };

    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(config.file.is_none());
    let layer: Box<dyn Layer<Registry> + Send + Sync> = if config.format == "json" {
        layer.json().boxed()
    } else {
        layer.boxed()
    };

    tracing_subscriber::registry()
        .with(layer.with_filter(filter))
        .init();
    guard
}

/// Build an EnvFilter from the configured log level.
fn build_filter(level: &str) -> EnvFilter {
    // RUST_LOG wins over the config.
    if std::env::var("RUST_LOG").is_ok() {
        return EnvFilter::from_default_env();
    }
    EnvFilter::try_new(filter_directives(level)).unwrap_or_else(|_| EnvFilter::new("info"))
}

fn filter_directives(level: &str) -> String {
    let level = match level.trim().to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let mut directives = level.to_string().to_lowercase();
    for noisy in NOISY_CRATES {
        directives.push_str(&format!(",{noisy}=warn"));
    }
    directives
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives_cap_noisy_crates() {
        assert_eq!(
            filter_directives("debug"),
            "debug,hyper=warn,hyper_util=warn,reqwest=warn,tokio_tungstenite=warn,tungstenite=warn"
        );
    }

    #[test]
    fn unknown_level_falls_back_to_info() {
        assert!(filter_directives("LOUD").starts_with("info,"));
        assert!(filter_directives(" Warning ").starts_with("warn,"));
    }

    #[test]
    fn default_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "info");
        assert_eq!(config.format, "text");
        assert!(config.file.is_none());
    }
}
