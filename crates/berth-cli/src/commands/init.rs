use super::{json_pretty, EXIT_SUCCESS, MANIFEST_FILE};
use berth_core::engine::WORK_DIR;
use std::fs;
use std::path::Path;

const GITIGNORE_ENTRY: &str = ".berth/";

fn starter_manifest(project: &str) -> String {
    format!(
        r#"version: 1
project:
  name: {project}
  defaultProfile: local
profiles:
  local:
    services:
      app:
        image: nginx:alpine
        ports: ["8080:80"]
    deps:
      db:
        kind: postgres
        version: "16"
        ports: ["5432:5432"]
        volume: "db-data:/var/lib/postgresql/data"
"#
    )
}

pub fn run(dir: &Path, force: bool, json: bool) -> Result<u8, String> {
    let manifest_path = dir.join(MANIFEST_FILE);
    if manifest_path.exists() && !force {
        return Err(format!(
            "refusing to overwrite existing {MANIFEST_FILE} (pass --force)"
        ));
    }

    let project = dir
        .canonicalize()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .map(|n| berth_core::render::sanitize_name(&n))
        .unwrap_or_else(|| "my-app".to_owned());

    fs::write(&manifest_path, starter_manifest(&project))
        .map_err(|e| format!("failed to write {MANIFEST_FILE}: {e}"))?;
    fs::create_dir_all(dir.join(WORK_DIR))
        .map_err(|e| format!("failed to create {WORK_DIR}: {e}"))?;
    ensure_gitignore(dir)?;

    if json {
        let payload = serde_json::json!({
            "status": "written",
            "path": manifest_path.display().to_string(),
            "project": project,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("wrote {MANIFEST_FILE} for '{project}'");
        println!("next: berth up");
    }
    Ok(EXIT_SUCCESS)
}

/// Append the work directory to .gitignore unless it is already listed.
/// Projects without a .gitignore get one.
fn ensure_gitignore(dir: &Path) -> Result<(), String> {
    let path = dir.join(".gitignore");
    let existing = fs::read_to_string(&path).unwrap_or_default();
    if existing.lines().any(|line| line.trim() == GITIGNORE_ENTRY) {
        return Ok(());
    }
    let mut content = existing;
    if !content.is_empty() && !content.ends_with('\n') {
        content.push('\n');
    }
    content.push_str(GITIGNORE_ENTRY);
    content.push('\n');
    fs::write(&path, content).map_err(|e| format!("failed to update .gitignore: {e}"))
}
