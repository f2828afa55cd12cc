use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse manifest: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Root declarative document: a project plus its named deployment profiles.
///
/// All maps are `BTreeMap` so that every iteration over the model is already
/// in sorted key order; renderers rely on this for byte-identical output.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Manifest {
    pub version: u32,
    pub project: Project,
    pub registry: Registry,
    pub profiles: BTreeMap<String, Profile>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Project {
    pub name: String,
    #[serde(rename = "defaultProfile")]
    pub default_profile: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Registry {
    /// Prefix prepended to image references that carry no registry host.
    pub prefix: String,
}

/// One named deployment configuration: services, managed dependencies,
/// lifecycle hooks, and an optional runtime-mode tag (`compose` or `k8s`).
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Profile {
    pub runtime: String,
    pub services: BTreeMap<String, Service>,
    pub deps: BTreeMap<String, Dep>,
    pub hooks: Hooks,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Service {
    pub image: String,
    pub build: Option<Build>,
    /// Published ports, `[host:]container[/proto]`.
    pub ports: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub command: Vec<String>,
    pub workdir: String,
    /// Bind mounts, `host:container`. Compose only; the Kubernetes renderer
    /// rejects these.
    pub mount: Vec<String>,
    #[serde(rename = "dependsOn")]
    pub depends_on: Vec<String>,
    pub health: Option<Health>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Build {
    pub context: String,
    pub dockerfile: String,
}

/// HTTP health probe polled after bring-up.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Health {
    #[serde(rename = "httpGet")]
    pub http_get: String,
    pub interval: String,
    pub retries: u32,
}

/// One managed infrastructure dependency, expanded to a canonical image by
/// the renderers.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Dep {
    pub kind: String,
    pub version: String,
    pub env: BTreeMap<String, String>,
    pub ports: Vec<String>,
    /// Optional single volume spec, `name:/container/path`.
    pub volume: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Hooks {
    #[serde(rename = "afterUp")]
    pub after_up: Vec<Hook>,
    #[serde(rename = "beforeDown")]
    pub before_down: Vec<Hook>,
}

/// A lifecycle-bound command. Exactly one of `exec`/`run` must be set; an
/// `exec` hook names the `service` it runs inside, a `run` hook executes on
/// the host and must not name one. Enforced by profile validation.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Hook {
    pub exec: String,
    pub run: String,
    pub service: String,
}

pub fn parse_manifest_str(input: &str) -> Result<Manifest, ManifestError> {
    Ok(serde_yaml::from_str(input)?)
}

pub fn parse_manifest_file(path: impl AsRef<Path>) -> Result<Manifest, ManifestError> {
    let content = fs::read_to_string(path)?;
    parse_manifest_str(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_manifest() {
        let input = r#"
version: 1
project:
  name: my-app
  defaultProfile: local
registry:
  prefix: ghcr.io/acme
profiles:
  local:
    runtime: compose
    services:
      api:
        build:
          context: ./api
          dockerfile: Dockerfile
        ports: ["8080:8080"]
        env:
          LOG_LEVEL: debug
        dependsOn: [db]
        health:
          httpGet: "http://localhost:8080/health"
          interval: 5s
          retries: 30
    deps:
      db:
        kind: postgres
        version: "16"
        ports: ["5432:5432"]
        volume: "db-data:/var/lib/postgresql/data"
    hooks:
      afterUp:
        - exec: "migrate up"
          service: api
"#;
        let manifest = parse_manifest_str(input).expect("should parse");
        assert_eq!(manifest.version, 1);
        assert_eq!(manifest.project.name, "my-app");
        assert_eq!(manifest.registry.prefix, "ghcr.io/acme");

        let profile = &manifest.profiles["local"];
        assert_eq!(profile.runtime, "compose");
        let api = &profile.services["api"];
        assert_eq!(api.build.as_ref().expect("build").context, "./api");
        assert_eq!(api.depends_on, vec!["db".to_owned()]);
        assert_eq!(api.health.as_ref().expect("health").retries, 30);
        assert_eq!(profile.deps["db"].kind, "postgres");
        assert_eq!(profile.hooks.after_up[0].service, "api");
    }

    #[test]
    fn parses_minimal_manifest() {
        let input = r#"
version: 1
project:
  name: my-app
profiles:
  local:
    services:
      api:
        image: nginx:alpine
"#;
        let manifest = parse_manifest_str(input).expect("should parse");
        assert_eq!(manifest.project.default_profile, "");
        let profile = &manifest.profiles["local"];
        assert_eq!(profile.runtime, "");
        assert!(profile.deps.is_empty());
        assert!(profile.hooks.after_up.is_empty());
        assert_eq!(profile.services["api"].image, "nginx:alpine");
    }

    #[test]
    fn rejects_malformed_yaml() {
        assert!(parse_manifest_str("version: [not closed").is_err());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = parse_manifest_file("/nonexistent/berth.yaml").unwrap_err();
        assert!(matches!(err, ManifestError::Io(_)));
    }
}
