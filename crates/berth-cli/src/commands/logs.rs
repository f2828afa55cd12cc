use super::{load_manifest, load_profile, EXIT_SUCCESS};
use berth_core::render::sanitize_name;
use berth_core::Engine;
use berth_runtime::{select_runtime, LogsOptions};
use berth_schema::RUNTIME_K8S;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

pub fn run(
    dir: &Path,
    profile_name: Option<&str>,
    service: Option<&str>,
    follow: bool,
    since: &str,
    json: bool,
) -> Result<u8, String> {
    let manifest = load_manifest(dir)?;
    let (_, profile) = load_profile(&manifest, profile_name)?;
    if profile.runtime == RUNTIME_K8S {
        return Err("logs is not supported for k8s profiles (use kubectl logs)".to_owned());
    }

    let engine = Engine::new(dir);
    let runtime = select_runtime().map_err(|e| format!("runtime error: {e}"))?;
    let project = sanitize_name(&manifest.project.name);
    let opts = LogsOptions {
        service: service.unwrap_or_default().to_owned(),
        follow,
        since: since.to_owned(),
        json,
    };

    let stream = runtime
        .logs(&engine.compose_path(), &project, &opts)
        .map_err(|e| format!("runtime error: {e}"))?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for line in BufReader::new(stream).lines() {
        let line = match line {
            Ok(line) => line,
            // The stream ends when the runtime process exits or the pipe
            // closes; either way there is nothing left to print.
            Err(_) => break,
        };
        let rendered = if json {
            serde_json::json!({ "line": line }).to_string()
        } else {
            line
        };
        if writeln!(out, "{rendered}").is_err() {
            break;
        }
    }
    Ok(EXIT_SUCCESS)
}
