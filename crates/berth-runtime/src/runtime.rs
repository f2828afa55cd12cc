use crate::docker::DockerRuntime;
use crate::podman::PodmanRuntime;
use crate::RuntimeError;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default)]
pub struct UpOptions {
    pub build: bool,
    pub pull: bool,
}

#[derive(Debug, Clone, Default)]
pub struct LogsOptions {
    pub service: String,
    pub follow: bool,
    pub since: String,
    /// Callers wrap each emitted line as a JSON object when set; adapters
    /// return the raw byte stream either way.
    pub json: bool,
}

/// Live per-service state queried from the running environment. Never cached
/// across invocations.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceStatus {
    pub name: String,
    pub state: String,
    pub health: String,
    pub publishers: Vec<PortBinding>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PortBinding {
    pub url: String,
    pub target_port: u16,
    pub published_port: u16,
    pub protocol: String,
}

/// Capability contract every engine adapter satisfies.
///
/// Adapters translate these calls into external CLI invocations; the core
/// never talks to an engine directly. `digest_resolver` is the optional
/// secondary capability — only engines that can resolve image digests
/// override it.
pub trait ContainerRuntime: Send + Sync {
    fn name(&self) -> &str;

    /// Availability probe, bounded by a short internal timeout.
    fn detect(&self) -> bool;

    fn up(
        &self,
        compose_path: &Path,
        project: &str,
        opts: &UpOptions,
    ) -> Result<(), RuntimeError>;

    fn down(
        &self,
        compose_path: &Path,
        project: &str,
        remove_volumes: bool,
    ) -> Result<(), RuntimeError>;

    fn logs(
        &self,
        compose_path: &Path,
        project: &str,
        opts: &LogsOptions,
    ) -> Result<Box<dyn Read + Send>, RuntimeError>;

    /// Run a command inside a running service, returning its exit code.
    fn exec(
        &self,
        compose_path: &Path,
        project: &str,
        service: &str,
        command: &[String],
    ) -> Result<i32, RuntimeError>;

    fn status(&self, compose_path: &Path, project: &str)
        -> Result<Vec<ServiceStatus>, RuntimeError>;

    fn digest_resolver(&self) -> Option<&dyn DigestResolver> {
        None
    }
}

pub trait DigestResolver {
    fn resolve_image_digest(&self, image: &str) -> Result<String, RuntimeError>;
}

/// Probe engines in fixed preference order (docker, then podman) and return
/// the first available. Probes run sequentially; adapters are not guaranteed
/// side-effect-free under concurrent probing.
pub fn select_runtime() -> Result<Box<dyn ContainerRuntime>, RuntimeError> {
    let docker = DockerRuntime::new();
    if docker.detect() {
        debug!("selected docker runtime");
        return Ok(Box::new(docker));
    }

    let podman = PodmanRuntime::new();
    if podman.detect() {
        debug!("selected podman runtime");
        return Ok(Box::new(podman));
    }

    Err(RuntimeError::NoRuntime)
}

/// Detection report for every known engine, used by `berth doctor`.
#[derive(Debug, Clone, Serialize)]
pub struct RuntimeInfo {
    pub name: String,
    pub available: bool,
    pub version: String,
}

pub fn detect_all() -> Vec<RuntimeInfo> {
    let docker = DockerRuntime::new();
    let podman = PodmanRuntime::new();
    vec![
        RuntimeInfo {
            name: docker.name().to_owned(),
            available: docker.detect(),
            version: docker.version().unwrap_or_default(),
        },
        RuntimeInfo {
            name: podman.name().to_owned(),
            available: podman.detect(),
            version: podman.version().unwrap_or_default(),
        },
    ]
}

// `compose ps --format json` is line-delimited JSON on docker compose v2.21+
// and a single array on older releases and podman.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PsEntry {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "State")]
    state: String,
    #[serde(rename = "Health")]
    health: String,
    #[serde(rename = "Publishers")]
    publishers: Option<Vec<PsPublisher>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PsPublisher {
    #[serde(rename = "URL")]
    url: String,
    #[serde(rename = "TargetPort")]
    target_port: u16,
    #[serde(rename = "PublishedPort")]
    published_port: u16,
    #[serde(rename = "Protocol")]
    protocol: String,
}

pub(crate) fn parse_ps_output(
    runtime: &str,
    output: &str,
) -> Result<Vec<ServiceStatus>, RuntimeError> {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let entries: Vec<PsEntry> = if trimmed.starts_with('[') {
        serde_json::from_str(trimmed).map_err(|source| RuntimeError::StatusParse {
            runtime: runtime.to_owned(),
            source,
        })?
    } else {
        let mut entries = Vec::new();
        for line in trimmed.lines().filter(|l| !l.trim().is_empty()) {
            let entry =
                serde_json::from_str(line).map_err(|source| RuntimeError::StatusParse {
                    runtime: runtime.to_owned(),
                    source,
                })?;
            entries.push(entry);
        }
        entries
    };

    Ok(entries
        .into_iter()
        .map(|e| ServiceStatus {
            name: e.name,
            state: e.state,
            health: e.health,
            publishers: e
                .publishers
                .unwrap_or_default()
                .into_iter()
                .map(|p| PortBinding {
                    url: p.url,
                    target_port: p.target_port,
                    published_port: p.published_port,
                    protocol: p.protocol,
                })
                .collect(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_line_delimited_ps_output() {
        let out = concat!(
            r#"{"Name":"app-api-1","State":"running","Health":"healthy","Publishers":[{"URL":"0.0.0.0","TargetPort":80,"PublishedPort":8080,"Protocol":"tcp"}]}"#,
            "\n",
            r#"{"Name":"app-db-1","State":"running","Health":"","Publishers":null}"#,
            "\n",
        );
        let statuses = parse_ps_output("docker", out).unwrap();
        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses[0].name, "app-api-1");
        assert_eq!(statuses[0].publishers[0].published_port, 8080);
        assert!(statuses[1].publishers.is_empty());
    }

    #[test]
    fn parses_array_ps_output() {
        let out = r#"[{"Name":"app-api-1","State":"exited","Publishers":[]}]"#;
        let statuses = parse_ps_output("podman", out).unwrap();
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].state, "exited");
    }

    #[test]
    fn empty_output_is_empty_status() {
        assert!(parse_ps_output("docker", "  \n").unwrap().is_empty());
    }

    #[test]
    fn malformed_output_is_reported() {
        let err = parse_ps_output("docker", "not-json").unwrap_err();
        assert!(matches!(err, RuntimeError::StatusParse { .. }));
    }
}
