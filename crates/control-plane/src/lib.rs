//! Control Plane (spec.md §4.5): cluster membership and cross-cluster
//! heartbeat, namespace configuration, dynamic config, and request
//! routing. Every other subsystem treats this as the source of truth
//! for "which cluster serves this namespace" and "what is the current
//! rate limit / feature flag / retention policy".

pub mod admin;
pub mod config;
pub mod dynamic_config;
pub mod grpc;
pub mod health;
pub mod heartbeat;
pub mod membership;
pub mod namespaces;
pub mod routing;

pub use config::Config;
pub use dynamic_config::DynamicConfig;
pub use grpc::ControlGrpcService;
pub use membership::{Membership, ServiceInstance};
pub use namespaces::NamespaceStore;
