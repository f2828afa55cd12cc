use super::{
    colorize_health, colorize_state, json_pretty, load_manifest, load_profile, EXIT_SUCCESS,
};
use berth_core::render::sanitize_name;
use berth_core::{Engine, StateRecord};
use berth_runtime::select_runtime;
use berth_schema::RUNTIME_K8S;
use std::path::Path;

pub fn run(dir: &Path, profile_name: Option<&str>, json: bool) -> Result<u8, String> {
    let manifest = load_manifest(dir)?;
    let (name, profile) = load_profile(&manifest, profile_name)?;
    if profile.runtime == RUNTIME_K8S {
        return Err("status is not supported for k8s profiles (use kubectl get pods)".to_owned());
    }

    let engine = Engine::new(dir);
    let runtime = select_runtime().map_err(|e| format!("runtime error: {e}"))?;
    let project = sanitize_name(&manifest.project.name);
    let statuses = runtime
        .status(&engine.compose_path(), &project)
        .map_err(|e| format!("runtime error: {e}"))?;

    if json {
        let payload = serde_json::json!({
            "profile": name,
            "state": StateRecord::load(&engine.work_dir()),
            "services": statuses,
        });
        println!("{}", json_pretty(&payload)?);
        return Ok(EXIT_SUCCESS);
    }

    if statuses.is_empty() {
        println!("no running containers for '{project}' (run 'berth up')");
        return Ok(EXIT_SUCCESS);
    }

    println!("{:<32} {:<12} {:<12} PORTS", "NAME", "STATE", "HEALTH");
    for status in &statuses {
        let ports = status
            .publishers
            .iter()
            .filter(|p| p.published_port != 0)
            .map(|p| format!("{}->{}", p.published_port, p.target_port))
            .collect::<Vec<_>>()
            .join(", ");
        println!(
            "{:<32} {:<12} {:<12} {}",
            status.name,
            colorize_state(&status.state),
            colorize_health(&status.health),
            ports
        );
    }
    Ok(EXIT_SUCCESS)
}
