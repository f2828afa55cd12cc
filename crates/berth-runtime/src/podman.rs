use crate::process::{probe_command, run_with_timeout, LogStream};
use crate::runtime::{parse_ps_output, ContainerRuntime, LogsOptions, ServiceStatus, UpOptions};
use crate::RuntimeError;
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;
use tracing::debug;

const DETECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Adapter for podman via its compose provider. Fallback engine after
/// docker; does not implement digest resolution.
#[derive(Debug, Default)]
pub struct PodmanRuntime;

impl PodmanRuntime {
    pub fn new() -> Self {
        Self
    }

    pub fn version(&self) -> Option<String> {
        let mut cmd = Command::new("podman");
        cmd.arg("--version");
        let out = run_with_timeout(&mut cmd, DETECT_TIMEOUT).ok()??;
        out.status
            .success()
            .then(|| String::from_utf8_lossy(&out.stdout).trim().to_owned())
    }

    fn compose(&self, compose_path: &Path, project: &str) -> Command {
        let mut cmd = Command::new("podman");
        cmd.arg("compose")
            .arg("-f")
            .arg(compose_path)
            .args(["-p", project]);
        cmd
    }

    fn run(&self, mut cmd: Command, operation: &str) -> Result<(), RuntimeError> {
        debug!("podman {operation}: {cmd:?}");
        let status = cmd.status()?;
        if status.success() {
            Ok(())
        } else {
            Err(RuntimeError::CommandFailed {
                runtime: "podman".to_owned(),
                operation: operation.to_owned(),
                code: status.code().unwrap_or(-1),
            })
        }
    }
}

impl ContainerRuntime for PodmanRuntime {
    fn name(&self) -> &str {
        "podman"
    }

    fn detect(&self) -> bool {
        probe_command("podman", &["compose", "version"], DETECT_TIMEOUT)
    }

    fn up(
        &self,
        compose_path: &Path,
        project: &str,
        opts: &UpOptions,
    ) -> Result<(), RuntimeError> {
        let mut cmd = self.compose(compose_path, project);
        cmd.args(["up", "-d"]);
        if opts.build {
            cmd.arg("--build");
        }
        if opts.pull {
            cmd.args(["--pull", "always"]);
        }
        self.run(cmd, "up")
    }

    fn down(
        &self,
        compose_path: &Path,
        project: &str,
        remove_volumes: bool,
    ) -> Result<(), RuntimeError> {
        let mut cmd = self.compose(compose_path, project);
        cmd.arg("down");
        if remove_volumes {
            cmd.arg("--volumes");
        }
        self.run(cmd, "down")
    }

    fn logs(
        &self,
        compose_path: &Path,
        project: &str,
        opts: &LogsOptions,
    ) -> Result<Box<dyn Read + Send>, RuntimeError> {
        let mut cmd = self.compose(compose_path, project);
        cmd.arg("logs");
        if opts.follow {
            cmd.arg("--follow");
        }
        if !opts.since.is_empty() {
            cmd.args(["--since", &opts.since]);
        }
        if !opts.service.is_empty() {
            cmd.arg(&opts.service);
        }
        let mut child = cmd.stdout(Stdio::piped()).stderr(Stdio::inherit()).spawn()?;
        let stdout = child.stdout.take().ok_or_else(|| {
            RuntimeError::Io(std::io::Error::other("log stream has no stdout"))
        })?;
        Ok(Box::new(LogStream::new(child, stdout)))
    }

    fn exec(
        &self,
        compose_path: &Path,
        project: &str,
        service: &str,
        command: &[String],
    ) -> Result<i32, RuntimeError> {
        let mut cmd = self.compose(compose_path, project);
        cmd.args(["exec", "-T", service]).args(command);
        debug!("podman exec: {cmd:?}");
        let status = cmd.status()?;
        Ok(status.code().unwrap_or(-1))
    }

    fn status(
        &self,
        compose_path: &Path,
        project: &str,
    ) -> Result<Vec<ServiceStatus>, RuntimeError> {
        let mut cmd = self.compose(compose_path, project);
        cmd.args(["ps", "--format", "json"]);
        let out = cmd.stderr(Stdio::inherit()).output()?;
        if !out.status.success() {
            return Err(RuntimeError::CommandFailed {
                runtime: "podman".to_owned(),
                operation: "ps".to_owned(),
                code: out.status.code().unwrap_or(-1),
            });
        }
        parse_ps_output("podman", &String::from_utf8_lossy(&out.stdout))
    }
}
