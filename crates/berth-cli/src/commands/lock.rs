use super::{
    json_pretty, load_manifest, load_profile, spin_fail, spin_ok, spinner, EXIT_SUCCESS,
};
use berth_core::engine::LOCK_FILE;
use berth_core::Engine;
use berth_runtime::select_runtime;
use std::path::Path;

/// `berth lock update`: resolve a digest for every deployable image and
/// rewrite the lockfile. All-or-nothing; a single failure leaves the file
/// untouched.
pub fn update(dir: &Path, profile_name: Option<&str>, json: bool) -> Result<u8, String> {
    let manifest = load_manifest(dir)?;
    let (_, profile) = load_profile(&manifest, profile_name)?;
    let engine = Engine::new(dir);
    let runtime = select_runtime().map_err(|e| format!("runtime error: {e}"))?;

    let pb = if json {
        None
    } else {
        Some(spinner("resolving image digests..."))
    };
    let lockfile = match engine.update_lock(&manifest, profile, runtime.as_ref()) {
        Ok(lf) => {
            if let Some(ref pb) = pb {
                spin_ok(pb, &format!("pinned {} images", lf.images.len()));
            }
            lf
        }
        Err(e) => {
            if let Some(ref pb) = pb {
                spin_fail(pb, "digest resolution failed");
            }
            return Err(e.to_string());
        }
    };

    if json {
        println!("{}", json_pretty(&lockfile)?);
    } else {
        for (image, digest) in &lockfile.images {
            println!("  {image} -> {digest}");
        }
        println!("wrote {LOCK_FILE}");
    }
    Ok(EXIT_SUCCESS)
}
