use super::{load_manifest, load_profile};
use berth_core::render::sanitize_name;
use berth_core::Engine;
use berth_runtime::select_runtime;
use berth_schema::RUNTIME_K8S;
use std::path::Path;

/// Run a command inside a running service; the service's exit code becomes
/// ours.
pub fn run(
    dir: &Path,
    profile_name: Option<&str>,
    service: &str,
    command: &[String],
) -> Result<u8, String> {
    let manifest = load_manifest(dir)?;
    let (_, profile) = load_profile(&manifest, profile_name)?;
    if profile.runtime == RUNTIME_K8S {
        return Err("exec is not supported for k8s profiles (use kubectl exec)".to_owned());
    }

    let engine = Engine::new(dir);
    let runtime = select_runtime().map_err(|e| format!("runtime error: {e}"))?;
    let project = sanitize_name(&manifest.project.name);

    let code = runtime
        .exec(&engine.compose_path(), &project, service, command)
        .map_err(|e| format!("runtime error: {e}"))?;
    Ok(u8::try_from(code).unwrap_or(1))
}
