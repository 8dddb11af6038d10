//! Shared tracing/OpenTelemetry bootstrap.
//!
//! Every service binary (`linkflow-history`, `linkflow-matching`,
//! `linkflow-frontend`, `linkflow-worker`, `linkflow-control-plane`) calls
//! [`init`] exactly once at startup. Library code never reaches for a
//! global logger directly — `tracing::info!`/`tracing::Span` calls are the
//! only ambient global, which is the ecosystem's accepted idiom rather than
//! a bespoke service locator.

pub mod config;

pub use config::ObservabilityConfig;

use opentelemetry_sdk::trace::{SdkTracerProvider, SpanData, SpanExporter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Debug, thiserror::Error)]
pub enum ObservabilityError {
    #[error("tracing subscriber already initialized for this process")]
    AlreadyInitialized,
}

/// Guard returned by [`init`]. Dropping it (or calling [`Guard::shutdown`]
/// explicitly at the end of `main`) flushes any pending spans.
pub struct Guard {
    provider: Option<SdkTracerProvider>,
}

impl Guard {
    pub fn shutdown(mut self) {
        if let Some(provider) = self.provider.take() {
            let _ = provider.shutdown();
        }
    }
}

impl Drop for Guard {
    fn drop(&mut self) {
        if let Some(provider) = self.provider.take() {
            let _ = provider.shutdown();
        }
    }
}

/// Emits spans as `tracing` events at debug level. A real deployment swaps
/// this for an OTLP exporter (add `opentelemetry-otlp` and construct it in
/// place of `LoggingExporter::default()` below); the layer wiring and the
/// rest of this crate's surface do not change when that swap happens.
#[derive(Debug, Default)]
struct LoggingExporter;

impl SpanExporter for LoggingExporter {
    async fn export(&self, batch: Vec<SpanData>) -> opentelemetry_sdk::error::OTelSdkResult {
        for span in &batch {
            tracing::debug!(
                span.name = %span.name,
                span.trace_id = %span.span_context.trace_id(),
                span.span_id = %span.span_context.span_id(),
                "span exported"
            );
        }
        Ok(())
    }
}

/// Initializes the global `tracing` subscriber for this process: an
/// `EnvFilter`-gated fmt layer (plain or JSON per config), plus an
/// OpenTelemetry layer when `otlp_endpoint` is configured.
pub fn init(config: &ObservabilityConfig) -> Result<Guard, ObservabilityError> {
    let env_filter = EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = if config.json_logs {
        tracing_subscriber::fmt::layer().json().with_target(true).boxed()
    } else {
        tracing_subscriber::fmt::layer().with_target(true).boxed()
    };

    let registry = tracing_subscriber::registry().with(env_filter).with(fmt_layer);

    if config.otlp_endpoint.is_some() {
        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(LoggingExporter)
            .build();
        let tracer = opentelemetry::trace::TracerProvider::tracer(&provider, config.service_name.clone());
        registry
            .with(tracing_opentelemetry::layer().with_tracer(tracer))
            .try_init()
            .map_err(|_| ObservabilityError::AlreadyInitialized)?;
        Ok(Guard { provider: Some(provider) })
    } else {
        registry
            .try_init()
            .map_err(|_| ObservabilityError::AlreadyInitialized)?;
        Ok(Guard { provider: None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_without_otlp_endpoint_disables_export() {
        let config = ObservabilityConfig {
            service_name: "test".into(),
            log_filter: "info".into(),
            otlp_endpoint: None,
            json_logs: false,
        };
        assert!(config.otlp_endpoint.is_none());
    }
}
