//! Structured Logging
//!
//! Environment-aware tracing initialization. Console output is
//! human-readable in development and JSON in production so log shippers can
//! ingest it without a parsing step.

use std::sync::OnceLock;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize the global tracing subscriber once.
///
/// `RUST_LOG` wins when set; otherwise the level falls back to an
/// environment-based default. Safe to call from multiple entry points: a
/// subscriber installed elsewhere is left in place.
pub fn init_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = detect_environment();
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_log_level(&environment)));

        let installed = if environment == "production" {
            tracing_subscriber::registry()
                .with(fmt::layer().json().with_target(true).with_filter(filter))
                .try_init()
        } else {
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true).with_filter(filter))
                .try_init()
        };

        if installed.is_err() {
            tracing::debug!("global tracing subscriber already initialized, keeping it");
        }
    });
}

/// Current environment name from `REMOTING_ENV`, falling back to `APP_ENV`
/// and then `development`.
fn detect_environment() -> String {
    std::env::var("REMOTING_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

fn default_log_level(environment: &str) -> &'static str {
    match environment {
        "production" => "info",
        _ => "debug",
    }
}
