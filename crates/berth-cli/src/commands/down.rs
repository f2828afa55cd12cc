use super::{load_manifest, load_profile, spin_fail, spin_ok, spinner, EXIT_SUCCESS};
use berth_core::Engine;
use berth_runtime::select_runtime;
use berth_schema::RUNTIME_K8S;
use std::path::Path;

pub fn run(
    dir: &Path,
    profile_name: Option<&str>,
    volumes: bool,
    namespace: &str,
    json: bool,
) -> Result<u8, String> {
    let manifest = load_manifest(dir)?;
    let (name, profile) = load_profile(&manifest, profile_name)?;
    let engine = Engine::new(dir);

    let pb = if json {
        None
    } else {
        Some(spinner(&format!("stopping profile '{name}'...")))
    };

    let result = if profile.runtime == RUNTIME_K8S {
        engine.down_k8s(namespace)
    } else {
        let runtime = select_runtime().map_err(|e| format!("runtime error: {e}"))?;
        engine.down(&manifest, profile, runtime.as_ref(), volumes)
    };

    match result {
        Ok(()) => {
            if let Some(ref pb) = pb {
                spin_ok(pb, &format!("profile '{name}' is down"));
            }
            Ok(EXIT_SUCCESS)
        }
        Err(e) => {
            if let Some(ref pb) = pb {
                spin_fail(pb, &format!("failed to stop profile '{name}'"));
            }
            Err(e.to_string())
        }
    }
}
