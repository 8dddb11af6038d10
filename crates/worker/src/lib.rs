//! The Worker Poller (spec.md §4.4): long-polls Matching for workflow
//! and activity tasks, dispatches them to pluggable deciders/node
//! handlers, and reports results back to History.
//!
//! ```text
//!            +-----------------+        PollTask/CompleteTask
//!            |   Worker pool   |<------------------------------+
//!            +--------+--------+                                |
//!                     | dispatch by task type                   |
//!         +-----------+-----------+                             |
//!         v                       v                             |
//! +---------------+       +----------------+                    |
//! | DeciderRegistry|       | HandlerRegistry|                    |
//! +---------------+       +----------------+                    |
//!         |                       |                              |
//!         v                       v                              |
//! RespondWorkflowTaskCompleted   RespondActivityTaskCompleted|Failed
//!         \_______________________|_____________________________/
//!                                 v
//!                            linkflow-history
//! ```

pub mod clients;
pub mod config;
pub mod decider;
pub mod handler;
pub mod worker;

pub use clients::EngineClients;
pub use config::Config;
pub use decider::{Decider, DeciderRegistry};
pub use handler::{HandlerRegistry, NodeHandler, NodeTask};
pub use worker::{Worker, WorkerError};
