//! Manifest parsing, validation, and the image lockfile for berth.
//!
//! This crate defines the declarative layer: YAML manifest parsing
//! (`Manifest` and its nested profiles), structural and semantic validation
//! (`validate`, `validate_profile`), and the persisted image→digest lockfile
//! (`Lockfile`). Everything here is pure data; no runtime interaction.

pub mod lock;
pub mod manifest;
pub mod validate;

pub use lock::{LockError, Lockfile};
pub use manifest::{
    parse_manifest_file, parse_manifest_str, Build, Dep, Health, Hook, Hooks, Manifest,
    ManifestError, Profile, Project, Registry, Service,
};
pub use validate::{profile_by_name, validate, validate_profile, ValidationError};

/// The single manifest schema version this build understands.
pub const SUPPORTED_VERSION: u32 = 1;

/// Runtime-mode tags a profile may carry.
pub const RUNTIME_COMPOSE: &str = "compose";
pub const RUNTIME_K8S: &str = "k8s";
