use super::{load_manifest, EXIT_FAILURE, EXIT_SUCCESS, MANIFEST_FILE};
use berth_runtime::{detect_all, kubectl};
use std::path::Path;

pub fn run(dir: &Path, json_output: bool) -> Result<u8, String> {
    let mut checks: Vec<Check> = Vec::new();
    let mut all_pass = true;

    check_runtimes(&mut checks, &mut all_pass);
    check_kubectl(&mut checks);
    check_manifest(dir, &mut checks, &mut all_pass);

    print_results(&checks, all_pass, json_output)
}

/// At least one container engine must be present; each engine gets its own
/// informational line.
fn check_runtimes(checks: &mut Vec<Check>, all_pass: &mut bool) {
    let infos = detect_all();
    for info in &infos {
        if info.available {
            let message = if info.version.is_empty() {
                format!("{} available", info.name)
            } else {
                format!("{} available ({})", info.name, info.version)
            };
            checks.push(Check::pass(&format!("runtime_{}", info.name), &message));
        } else {
            checks.push(Check::info(
                &format!("runtime_{}", info.name),
                &format!("{} not found", info.name),
            ));
        }
    }
    if !infos.iter().any(|i| i.available) {
        *all_pass = false;
        checks.push(Check::fail(
            "runtime_any",
            "No container runtime detected (install docker or podman)",
        ));
    }
}

fn check_kubectl(checks: &mut Vec<Check>) {
    if kubectl::detect_kubectl() {
        checks.push(Check::pass("kubectl", "kubectl available"));
    } else {
        checks.push(Check::info(
            "kubectl",
            "kubectl not found (only needed for k8s profiles)",
        ));
    }
}

fn check_manifest(dir: &Path, checks: &mut Vec<Check>, all_pass: &mut bool) {
    if !dir.join(MANIFEST_FILE).exists() {
        checks.push(Check::info(
            "manifest",
            &format!("No {MANIFEST_FILE} here (run 'berth init' to create one)"),
        ));
        return;
    }
    match load_manifest(dir) {
        Ok(manifest) => checks.push(Check::pass(
            "manifest",
            &format!(
                "{MANIFEST_FILE} valid ({} profiles)",
                manifest.profiles.len()
            ),
        )),
        Err(e) => {
            *all_pass = false;
            checks.push(Check::fail("manifest", &e));
        }
    }
}

fn print_results(checks: &[Check], all_pass: bool, json_output: bool) -> Result<u8, String> {
    if json_output {
        let json = serde_json::json!({
            "healthy": all_pass,
            "checks": checks.iter().map(|c| serde_json::json!({
                "name": c.name,
                "status": c.status,
                "message": c.message,
            })).collect::<Vec<_>>(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&json).map_err(|e| e.to_string())?
        );
    } else {
        println!("Berth Doctor\n");
        for check in checks {
            let icon = match check.status.as_str() {
                "pass" => "✓",
                "fail" => "✗",
                "warn" => "⚠",
                _ => "ℹ",
            };
            println!("  {icon} {}", check.message);
        }
        println!();
        if all_pass {
            println!("All checks passed.");
        } else {
            println!("Some checks failed. See above for details.");
        }
    }
    Ok(if all_pass { EXIT_SUCCESS } else { EXIT_FAILURE })
}

struct Check {
    name: String,
    status: String,
    message: String,
}

impl Check {
    fn pass(name: &str, message: &str) -> Self {
        Self::new(name, "pass", message)
    }

    fn fail(name: &str, message: &str) -> Self {
        Self::new(name, "fail", message)
    }

    fn info(name: &str, message: &str) -> Self {
        Self::new(name, "info", message)
    }

    fn new(name: &str, status: &str, message: &str) -> Self {
        Self {
            name: name.to_owned(),
            status: status.to_owned(),
            message: message.to_owned(),
        }
    }
}
