pub mod completions;
pub mod doctor;
pub mod down;
pub mod exec;
pub mod init;
pub mod lock;
pub mod logs;
pub mod render;
pub mod status;
pub mod up;

use berth_schema::{parse_manifest_file, profile_by_name, validate, validate_profile};
use berth_schema::{Manifest, Profile};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

pub const MANIFEST_FILE: &str = "berth.yaml";

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_MANIFEST_ERROR: u8 = 2;
pub const EXIT_RUNTIME_ERROR: u8 = 3;

pub fn load_manifest(dir: &Path) -> Result<Manifest, String> {
    let path = dir.join(MANIFEST_FILE);
    if !path.exists() {
        return Err(format!(
            "manifest error: no {MANIFEST_FILE} in {} (run 'berth init' to create one)",
            dir.display()
        ));
    }
    let manifest = parse_manifest_file(&path).map_err(|e| format!("manifest error: {e}"))?;
    validate(&manifest).map_err(|e| format!("manifest error: {e}"))?;
    Ok(manifest)
}

/// Resolve the requested profile, falling back to `project.defaultProfile`,
/// and run its semantic validation.
pub fn load_profile<'a>(
    manifest: &'a Manifest,
    requested: Option<&str>,
) -> Result<(String, &'a Profile), String> {
    let name = match requested {
        Some(name) => name.to_owned(),
        None if !manifest.project.default_profile.is_empty() => {
            manifest.project.default_profile.clone()
        }
        None => {
            return Err(
                "manifest error: no profile specified and no defaultProfile set".to_owned(),
            )
        }
    };
    validate_profile(manifest, &name).map_err(|e| format!("manifest error: {e}"))?;
    let profile = profile_by_name(manifest, &name).map_err(|e| format!("manifest error: {e}"))?;
    Ok((name, profile))
}

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .expect("valid template")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✗ {msg}"));
}

pub fn colorize_state(state: &str) -> String {
    use console::Style;
    match state {
        "running" => Style::new().cyan().bold().apply_to(state).to_string(),
        "exited" | "dead" => Style::new().red().apply_to(state).to_string(),
        "paused" | "restarting" | "created" => {
            Style::new().yellow().apply_to(state).to_string()
        }
        other => other.to_owned(),
    }
}

pub fn colorize_health(health: &str) -> String {
    use console::Style;
    match health {
        "healthy" => Style::new().green().apply_to(health).to_string(),
        "unhealthy" => Style::new().red().apply_to(health).to_string(),
        "starting" => Style::new().yellow().apply_to(health).to_string(),
        other => other.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use berth_schema::parse_manifest_str;

    const MANIFEST: &str = r#"
version: 1
project:
  name: my-app
  defaultProfile: local
profiles:
  local:
    services:
      api:
        image: nginx:alpine
  ci:
    services:
      api:
        image: nginx:alpine
"#;

    #[test]
    fn load_profile_prefers_explicit_name() {
        let m = parse_manifest_str(MANIFEST).unwrap();
        let (name, _) = load_profile(&m, Some("ci")).unwrap();
        assert_eq!(name, "ci");
    }

    #[test]
    fn load_profile_falls_back_to_default() {
        let m = parse_manifest_str(MANIFEST).unwrap();
        let (name, _) = load_profile(&m, None).unwrap();
        assert_eq!(name, "local");
    }

    #[test]
    fn load_profile_without_default_is_an_error() {
        let mut m = parse_manifest_str(MANIFEST).unwrap();
        m.project.default_profile = String::new();
        let err = load_profile(&m, None).unwrap_err();
        assert!(err.contains("no profile specified"));
    }

    #[test]
    fn load_profile_rejects_unknown_name() {
        let m = parse_manifest_str(MANIFEST).unwrap();
        let err = load_profile(&m, Some("prod")).unwrap_err();
        assert!(err.starts_with("manifest error:"));
    }

    #[test]
    fn load_manifest_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_manifest(dir.path()).unwrap_err();
        assert!(err.contains("berth init"));
    }

    #[test]
    fn exit_codes_are_distinct() {
        assert_ne!(EXIT_SUCCESS, EXIT_FAILURE);
        assert_ne!(EXIT_FAILURE, EXIT_MANIFEST_ERROR);
        assert_ne!(EXIT_MANIFEST_ERROR, EXIT_RUNTIME_ERROR);
    }

    #[test]
    fn json_pretty_serializes_payloads() {
        let val = serde_json::json!({"profile": "local"});
        let result = json_pretty(&val).unwrap();
        assert!(result.contains("\"profile\""));
    }

    #[test]
    fn colorize_passthrough_for_unknown_values() {
        assert_eq!(colorize_state("weird"), "weird");
        assert_eq!(colorize_health(""), "");
    }

    #[test]
    fn spinner_helpers_do_not_panic() {
        let pb = spinner("working...");
        spin_ok(&pb, "done");
        let pb = spinner("working...");
        spin_fail(&pb, "failed");
    }
}
