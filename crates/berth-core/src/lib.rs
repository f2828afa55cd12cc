//! Core orchestration for berth environments.
//!
//! This crate ties together the schema layer and the runtime adapters into
//! the `Engine` — render a profile to its deployment target, bring the
//! environment up, verify declared health probes, and run lifecycle hooks.
//! It also holds the derived dependency graph, both target renderers, the
//! telemetry asset set, and the persisted last-run state record.

pub mod compose;
pub mod engine;
pub mod graph;
pub mod health;
pub mod hooks;
pub mod k8s;
pub mod render;
pub mod signal;
pub mod state;
pub mod telemetry;

pub use engine::{Endpoint, Engine, UpReport, UpSettings};
pub use graph::{build_graph, topo_sort, Graph, GraphError, Node, NodeKind};
pub use health::{wait_for_health, Clock, HealthError, HttpProbe, SystemClock, UreqProbe};
pub use hooks::{run_hooks, HookError};
pub use render::{Asset, RenderError, RewriteOptions};
pub use signal::{install_signal_handler, shutdown_requested};
pub use state::StateRecord;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("manifest error: {0}")]
    Manifest(#[from] berth_schema::ManifestError),
    #[error("{0}")]
    Validation(#[from] berth_schema::ValidationError),
    #[error("lockfile error: {0}")]
    Lock(#[from] berth_schema::LockError),
    #[error("{0}")]
    Graph(#[from] GraphError),
    #[error("{0}")]
    Render(#[from] RenderError),
    #[error("runtime error: {0}")]
    Runtime(#[from] berth_runtime::RuntimeError),
    #[error("{0}")]
    Health(#[from] HealthError),
    #[error("{0}")]
    Hook(#[from] HookError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
