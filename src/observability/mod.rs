//! Logging setup and health reporting

pub mod health;

pub use health::HealthReport;

use tracing_subscriber::EnvFilter;

use crate::config::Settings;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_logging(settings: &Settings) {
    let filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(settings.log_level.clone()))
    };

    match settings.log_format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_target(false)
                .with_thread_ids(true)
                .with_level(true)
                .json()
                .with_env_filter(filter())
                .init();
        }
        "compact" => {
            tracing_subscriber::fmt()
                .with_target(false)
                .with_thread_ids(true)
                .with_level(true)
                .compact()
                .with_env_filter(filter())
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_target(false)
                .with_thread_ids(true)
                .with_level(true)
                .with_env_filter(filter())
                .init();
        }
    }
}
