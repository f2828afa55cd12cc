//! Container engine adapters for berth.
//!
//! This crate implements the execution layer: the `ContainerRuntime`
//! capability trait, one adapter per supported engine (docker, podman), the
//! kubectl apply/delete adapter for Kubernetes-mode profiles, availability
//! detection with bounded probes, and a mock runtime for orchestration tests.

pub mod docker;
pub mod kubectl;
pub mod mock;
pub mod podman;
mod process;
pub mod runtime;

pub use docker::DockerRuntime;
pub use mock::MockRuntime;
pub use podman::PodmanRuntime;
pub use runtime::{
    detect_all, select_runtime, ContainerRuntime, DigestResolver, LogsOptions, PortBinding,
    RuntimeInfo, ServiceStatus, UpOptions,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("runtime I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no container runtime detected (tried docker, podman)")]
    NoRuntime,
    #[error("{runtime} {operation} failed with exit code {code}")]
    CommandFailed {
        runtime: String,
        operation: String,
        code: i32,
    },
    #[error("failed to parse {runtime} status output: {source}")]
    StatusParse {
        runtime: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("kubectl not found in PATH")]
    KubectlNotFound,
    #[error("runtime '{0}' does not support image digest resolution")]
    DigestUnsupported(String),
    #[error("failed to resolve digest for image '{image}': {reason}")]
    DigestResolveFailed { image: String, reason: String },
}
