use berth_runtime::{ContainerRuntime, RuntimeError};
use berth_schema::Hook;
use std::path::Path;
use std::process::Command;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum HookError {
    #[error("hook exec '{command}' in service '{service}' exited with code {code}")]
    ExecFailed {
        service: String,
        command: String,
        code: i32,
    },
    #[error("hook run '{command}' exited with code {code}")]
    RunFailed { command: String, code: i32 },
    #[error("failed to launch hook '{command}': {source}")]
    Launch {
        command: String,
        source: std::io::Error,
    },
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

/// Run a phase's hooks in declaration order. The first failure aborts the
/// phase; later hooks do not run.
pub fn run_hooks(
    hooks: &[Hook],
    runtime: &dyn ContainerRuntime,
    compose_path: &Path,
    project: &str,
) -> Result<(), HookError> {
    for hook in hooks {
        if !hook.exec.is_empty() {
            run_exec_hook(hook, runtime, compose_path, project)?;
        } else if !hook.run.is_empty() {
            run_host_hook(hook)?;
        }
    }
    Ok(())
}

fn run_exec_hook(
    hook: &Hook,
    runtime: &dyn ContainerRuntime,
    compose_path: &Path,
    project: &str,
) -> Result<(), HookError> {
    info!(service = %hook.service, command = %hook.exec, "running exec hook");
    let argv: Vec<String> = hook.exec.split_whitespace().map(str::to_owned).collect();
    let code = runtime.exec(compose_path, project, &hook.service, &argv)?;
    if code != 0 {
        return Err(HookError::ExecFailed {
            service: hook.service.clone(),
            command: hook.exec.clone(),
            code,
        });
    }
    Ok(())
}

fn run_host_hook(hook: &Hook) -> Result<(), HookError> {
    info!(command = %hook.run, "running host hook");
    let status = Command::new("sh")
        .arg("-c")
        .arg(&hook.run)
        .status()
        .map_err(|source| HookError::Launch {
            command: hook.run.clone(),
            source,
        })?;
    if !status.success() {
        return Err(HookError::RunFailed {
            command: hook.run.clone(),
            code: status.code().unwrap_or(-1),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use berth_runtime::MockRuntime;

    fn exec_hook(command: &str, service: &str) -> Hook {
        Hook {
            exec: command.to_owned(),
            service: service.to_owned(),
            ..Hook::default()
        }
    }

    fn run_hook(command: &str) -> Hook {
        Hook {
            run: command.to_owned(),
            ..Hook::default()
        }
    }

    #[test]
    fn exec_hooks_run_inside_the_named_service() {
        let rt = MockRuntime::new();
        let hooks = vec![exec_hook("migrate up", "api")];
        run_hooks(&hooks, &rt, Path::new("compose.yaml"), "app").unwrap();

        let calls = rt.calls();
        assert_eq!(calls, vec!["exec app api migrate up"]);
    }

    #[test]
    fn nonzero_exec_exit_fails_the_phase() {
        let mut rt = MockRuntime::new();
        rt.exec_exit_code = 3;
        let hooks = vec![exec_hook("migrate up", "api"), exec_hook("seed", "api")];
        let err = run_hooks(&hooks, &rt, Path::new("compose.yaml"), "app").unwrap_err();

        assert!(matches!(err, HookError::ExecFailed { code: 3, .. }));
        // The failing hook aborted the phase before the second one ran.
        assert_eq!(rt.calls().len(), 1);
    }

    #[test]
    fn host_hooks_run_through_the_shell() {
        let hooks = vec![run_hook("true")];
        let rt = MockRuntime::new();
        run_hooks(&hooks, &rt, Path::new("compose.yaml"), "app").unwrap();
        assert!(rt.calls().is_empty());
    }

    #[test]
    fn failing_host_hook_reports_its_exit_code() {
        let hooks = vec![run_hook("exit 7")];
        let rt = MockRuntime::new();
        let err = run_hooks(&hooks, &rt, Path::new("compose.yaml"), "app").unwrap_err();
        assert!(matches!(err, HookError::RunFailed { code: 7, .. }));
    }

    #[test]
    fn empty_hooks_are_skipped() {
        let rt = MockRuntime::new();
        run_hooks(&[Hook::default()], &rt, Path::new("compose.yaml"), "app").unwrap();
        assert!(rt.calls().is_empty());
    }
}
