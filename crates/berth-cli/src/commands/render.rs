use super::{load_manifest, load_profile, EXIT_SUCCESS};
use berth_core::Engine;
use std::path::Path;

/// `berth render compose`: print the compose document, or write it under the
/// work directory with `--write` (telemetry companion files included).
pub fn compose(
    dir: &Path,
    profile_name: Option<&str>,
    no_telemetry: bool,
    write: bool,
) -> Result<u8, String> {
    let manifest = load_manifest(dir)?;
    let (_, profile) = load_profile(&manifest, profile_name)?;
    let engine = Engine::new(dir);

    let enable_telemetry = !no_telemetry;
    let doc = engine
        .render_compose(&manifest, profile, enable_telemetry)
        .map_err(|e| e.to_string())?;

    if write {
        let path = engine
            .write_compose(&doc, enable_telemetry)
            .map_err(|e| e.to_string())?;
        println!("wrote {}", path.display());
    } else {
        print!("{doc}");
    }
    Ok(EXIT_SUCCESS)
}

/// `berth render k8s`: same shape for the Kubernetes target.
pub fn k8s(
    dir: &Path,
    profile_name: Option<&str>,
    namespace: &str,
    write: bool,
) -> Result<u8, String> {
    let manifest = load_manifest(dir)?;
    let (_, profile) = load_profile(&manifest, profile_name)?;
    let engine = Engine::new(dir);

    let doc = engine
        .render_k8s(&manifest, profile, namespace)
        .map_err(|e| e.to_string())?;

    if write {
        let path = engine.write_k8s(&doc).map_err(|e| e.to_string())?;
        println!("wrote {}", path.display());
    } else {
        print!("{doc}");
    }
    Ok(EXIT_SUCCESS)
}
