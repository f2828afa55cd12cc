use crate::process::probe_command;
use crate::RuntimeError;
use std::path::Path;
use std::process::Command;
use std::time::Duration;
use tracing::debug;

const DETECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Availability probe for kubectl. Kubernetes-mode profiles are applied
/// through the kubectl CLI rather than a `ContainerRuntime` adapter.
pub fn detect_kubectl() -> bool {
    probe_command("kubectl", &["version", "--client"], DETECT_TIMEOUT)
}

pub fn apply(manifest_path: &Path, namespace: &str) -> Result<(), RuntimeError> {
    run_kubectl("apply", manifest_path, namespace)
}

pub fn delete(manifest_path: &Path, namespace: &str) -> Result<(), RuntimeError> {
    run_kubectl("delete", manifest_path, namespace)
}

fn run_kubectl(operation: &str, manifest_path: &Path, namespace: &str) -> Result<(), RuntimeError> {
    if !detect_kubectl() {
        return Err(RuntimeError::KubectlNotFound);
    }
    let mut cmd = Command::new("kubectl");
    cmd.arg(operation).arg("-f").arg(manifest_path);
    if !namespace.is_empty() {
        cmd.args(["--namespace", namespace]);
    }
    debug!("kubectl {operation}: {cmd:?}");
    let status = cmd.status()?;
    if status.success() {
        Ok(())
    } else {
        Err(RuntimeError::CommandFailed {
            runtime: "kubectl".to_owned(),
            operation: operation.to_owned(),
            code: status.code().unwrap_or(-1),
        })
    }
}
