//! Reliability patterns wrapping the persistence layer.
//!
//! Retry policy lives in `linkflow_types::RetryPolicy` since it's also a
//! wire type (it appears in `NodeOptions`). This module keeps only the
//! circuit breaker, which wraps the Postgres store's availability
//! failures and has no reason to cross the wire.

mod circuit_breaker;

pub use circuit_breaker::{CircuitBreakerConfig, CircuitState};
