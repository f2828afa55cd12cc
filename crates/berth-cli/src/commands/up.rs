use super::{
    json_pretty, load_manifest, load_profile, spin_fail, spin_ok, spinner, EXIT_SUCCESS,
};
use berth_core::{Engine, UpSettings};
use berth_runtime::select_runtime;
use berth_schema::RUNTIME_K8S;
use std::path::Path;

#[allow(clippy::fn_params_excessive_bools)]
pub fn run(
    dir: &Path,
    profile_name: Option<&str>,
    build: bool,
    pull: bool,
    no_telemetry: bool,
    namespace: &str,
    json: bool,
) -> Result<u8, String> {
    let manifest = load_manifest(dir)?;
    let (name, profile) = load_profile(&manifest, profile_name)?;
    let engine = Engine::new(dir);

    if profile.runtime == RUNTIME_K8S {
        return run_k8s(&engine, &manifest, &name, profile, namespace, json);
    }

    let runtime = select_runtime().map_err(|e| format!("runtime error: {e}"))?;
    let settings = UpSettings {
        build,
        pull,
        telemetry: !no_telemetry,
    };

    let pb = if json {
        None
    } else {
        Some(spinner(&format!("starting profile '{name}'...")))
    };
    let report = match engine.up(&manifest, &name, profile, runtime.as_ref(), &settings) {
        Ok(report) => {
            if let Some(ref pb) = pb {
                spin_ok(pb, &format!("profile '{name}' is up"));
            }
            report
        }
        Err(e) => {
            if let Some(ref pb) = pb {
                spin_fail(pb, &format!("failed to start profile '{name}'"));
            }
            return Err(e.to_string());
        }
    };

    if json {
        let payload = serde_json::json!({
            "profile": name,
            "runtime": runtime.name(),
            "order": report.order,
            "endpoints": report.endpoints.iter().map(|e| serde_json::json!({
                "label": e.label,
                "url": e.url,
            })).collect::<Vec<_>>(),
        });
        println!("{}", json_pretty(&payload)?);
    } else if !report.endpoints.is_empty() {
        println!();
        for endpoint in &report.endpoints {
            println!("  {:<12} {}", endpoint.label, endpoint.url);
        }
    }
    Ok(EXIT_SUCCESS)
}

fn run_k8s(
    engine: &Engine,
    manifest: &berth_schema::Manifest,
    name: &str,
    profile: &berth_schema::Profile,
    namespace: &str,
    json: bool,
) -> Result<u8, String> {
    let pb = if json {
        None
    } else {
        Some(spinner(&format!("applying profile '{name}'...")))
    };
    match engine.up_k8s(manifest, profile, namespace) {
        Ok(path) => {
            if let Some(ref pb) = pb {
                spin_ok(pb, &format!("profile '{name}' applied"));
            }
            if json {
                let payload = serde_json::json!({
                    "profile": name,
                    "runtime": "kubectl",
                    "manifest": path.display().to_string(),
                });
                println!("{}", json_pretty(&payload)?);
            }
            Ok(EXIT_SUCCESS)
        }
        Err(e) => {
            if let Some(ref pb) = pb {
                spin_fail(pb, &format!("failed to apply profile '{name}'"));
            }
            Err(e.to_string())
        }
    }
}
