//! Logging initialisation.
//!
//! Call [`init_tracing`] once at process startup.
//!
//! # Environment variables
//!
//! | Variable | Effect |
//! |---|---|
//! | `RUST_LOG` | Log filter (default `"info"`). |
//! | `GRASP_LOG_FORMAT=json` | Emit newline-delimited JSON logs. |
//!
//! # Example
//!
//! ```rust,no_run
//! grasp_runtime::telemetry::init_tracing();
//! tracing::info!("ready");
//! ```

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Output format selected by `GRASP_LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl LogFormat {
    /// Read `GRASP_LOG_FORMAT`; anything other than `json` means compact.
    pub fn from_env() -> Self {
        match std::env::var("GRASP_LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            _ => LogFormat::Compact,
        }
    }
}

/// Install the global `tracing` subscriber. Logs go to stderr so that
/// stdout stays clean for command output.
///
/// Calling this more than once is harmless; later calls are ignored.
pub fn init_tracing() {
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = match LogFormat::from_env() {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Compact => registry
            .with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr))
            .try_init(),
    };
    if let Err(e) = result {
        eprintln!("[grasp] tracing already initialised: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_follows_env() {
        // SAFETY: single-threaded test; no other thread reads this env-var.
        unsafe { std::env::set_var("GRASP_LOG_FORMAT", "json") };
        assert_eq!(LogFormat::from_env(), LogFormat::Json);
        unsafe { std::env::set_var("GRASP_LOG_FORMAT", "pretty") };
        assert_eq!(LogFormat::from_env(), LogFormat::Compact);
        unsafe { std::env::remove_var("GRASP_LOG_FORMAT") };
        assert_eq!(LogFormat::from_env(), LogFormat::Compact);
    }

    #[test]
    fn double_init_does_not_panic() {
        init_tracing();
        init_tracing();
    }
}
