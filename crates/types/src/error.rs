//! Error taxonomy shared by every engine-cluster component.
//!
//! Mirrors the seven categories from the error handling design: each
//! variant belongs to exactly one category via [`EngineError::category`].
//! Categories drive propagation policy (retry vs. surface vs. DLQ) at
//! the call sites in `linkflow-history`, `linkflow-matching`, and
//! `linkflow-frontend`.

use thiserror::Error;

/// The seven error categories from the error handling design.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    NotFound,
    Conflict,
    Validation,
    Capacity,
    Ownership,
    Availability,
    Integrity,
}

/// A single flat taxonomy of errors produced anywhere in the engine
/// cluster. Service boundaries (RPC façade, HTTP) map these onto a
/// stable wire code; internal callers match on the variant directly.
#[derive(Debug, Error)]
pub enum EngineError {
    // --- Not-found ---
    #[error("execution not found: {0:?}")]
    ExecutionNotFound(crate::key::ExecutionKey),
    #[error("event not found: run={run_id} event_id={event_id}")]
    EventNotFound { run_id: String, event_id: u64 },
    #[error("shard not found: {0}")]
    ShardNotFound(u32),
    #[error("cluster not found: {0}")]
    ClusterNotFound(String),
    #[error("namespace not found: {0}")]
    NamespaceNotFound(String),
    #[error("service not found: {0}")]
    ServiceNotFound(String),
    #[error("config key not found: {0}")]
    ConfigKeyNotFound(String),
    #[error("task not found: {0}")]
    TaskNotFound(String),
    #[error("task queue not found: {0}")]
    TaskQueueNotFound(String),
    #[error("archive not found: {0}")]
    ArchiveNotFound(String),

    // --- Conflict ---
    #[error("optimistic lock failed: expected version {expected}, found {actual}")]
    OptimisticLock { expected: i64, actual: i64 },
    #[error("task already exists: {0}")]
    TaskExists(String),
    #[error("namespace already exists: {0}")]
    NamespaceExists(String),
    #[error("duplicate timer: {0}")]
    DuplicateTimer(String),

    // --- Validation ---
    #[error("invalid event: {0}")]
    InvalidEvent(String),
    #[error("invalid event type: {0}")]
    InvalidEventType(String),
    #[error("event out of order: expected {expected}, got {actual}")]
    EventOutOfOrder { expected: u64, actual: u64 },
    #[error("activity not found: {0}")]
    ActivityNotFound(u64),
    #[error("timer not found: {0}")]
    TimerNotFound(String),
    #[error("workflow not running: {0}")]
    WorkflowNotRunning(String),
    #[error("validation failed: {0}")]
    Validation(String),

    // --- Capacity ---
    #[error("backpressure: queue {queue} depth {depth} exceeds limit")]
    Backpressure { queue: String, depth: u64 },
    #[error("rate limited: queue {0}")]
    RateLimited(String),

    // --- Ownership ---
    #[error("shard not owned locally: {0}")]
    ShardNotOwned(u32),

    // --- Availability ---
    #[error("service not running: {0}")]
    ServiceNotRunning(String),
    #[error("replication failed: {0}")]
    ReplicationFailed(String),
    #[error("no healthy cluster for namespace {0}")]
    NoHealthyCluster(String),

    // --- Integrity ---
    #[error("event mismatch during replay: {0}")]
    EventMismatch(String),
    #[error("version mismatch: {0}")]
    VersionMismatch(String),
    #[error("branch diverged: {0}")]
    BranchDiverged(String),

    /// Transient storage error, propagated upward with context added at
    /// each layer per the propagation policy.
    #[error("store error: {0}")]
    Store(String),

    /// Escape hatch for collaborator errors (HTTP client, stream client)
    /// that don't deserve their own taxonomy entry.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl EngineError {
    pub fn category(&self) -> ErrorCategory {
        use EngineError::*;
        match self {
            ExecutionNotFound(_) | EventNotFound { .. } | ShardNotFound(_)
            | ClusterNotFound(_) | NamespaceNotFound(_) | ServiceNotFound(_)
            | ConfigKeyNotFound(_) | TaskNotFound(_) | TaskQueueNotFound(_)
            | ArchiveNotFound(_) => ErrorCategory::NotFound,

            OptimisticLock { .. } | TaskExists(_) | NamespaceExists(_) | DuplicateTimer(_) => {
                ErrorCategory::Conflict
            }

            InvalidEvent(_) | InvalidEventType(_) | EventOutOfOrder { .. }
            | ActivityNotFound(_) | TimerNotFound(_) | WorkflowNotRunning(_) | Validation(_) => {
                ErrorCategory::Validation
            }

            Backpressure { .. } | RateLimited(_) => ErrorCategory::Capacity,

            ShardNotOwned(_) => ErrorCategory::Ownership,

            ServiceNotRunning(_) | ReplicationFailed(_) | NoHealthyCluster(_) => {
                ErrorCategory::Availability
            }

            EventMismatch(_) | VersionMismatch(_) | BranchDiverged(_) => ErrorCategory::Integrity,

            // Transient/escape-hatch errors are treated as Availability by
            // default: retryable, no local interpretation possible.
            Store(_) | Other(_) => ErrorCategory::Availability,
        }
    }

    /// Whether the caller should retry this operation (possibly after a
    /// reload, per the propagation policy).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Conflict | ErrorCategory::Capacity | ErrorCategory::Availability
        ) && !matches!(self, EngineError::TaskExists(_) | EngineError::NamespaceExists(_))
    }

    /// `TaskExists` on `AddTask` is treated as success by callers (idempotent
    /// re-enqueue); this helper makes that call-site convention explicit.
    pub fn is_idempotent_noop(&self) -> bool {
        matches!(self, EngineError::TaskExists(_))
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
