use crate::manifest::{Hook, Manifest, Profile};
use crate::{RUNTIME_COMPOSE, RUNTIME_K8S, SUPPORTED_VERSION};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("unsupported manifest version: {0}, expected {SUPPORTED_VERSION}")]
    UnsupportedVersion(u32),
    #[error("project.name must not be empty")]
    EmptyProjectName,
    #[error("project.defaultProfile '{0}' does not match any profile")]
    UnknownDefaultProfile(String),
    #[error("profile '{0}' not found")]
    UnknownProfile(String),
    #[error("profile '{profile}': runtime '{value}' is not one of 'compose', 'k8s'")]
    InvalidRuntime { profile: String, value: String },
    #[error("profile '{profile}': hooks.{phase}[{index}] sets both exec and run")]
    HookBothExecAndRun {
        profile: String,
        phase: &'static str,
        index: usize,
    },
    #[error("profile '{profile}': hooks.{phase}[{index}] sets neither exec nor run")]
    HookMissingAction {
        profile: String,
        phase: &'static str,
        index: usize,
    },
    #[error("profile '{profile}': hooks.{phase}[{index}] exec hook requires a service")]
    HookExecMissingService {
        profile: String,
        phase: &'static str,
        index: usize,
    },
    #[error("profile '{profile}': hooks.{phase}[{index}] run hook must not set a service")]
    HookRunWithService {
        profile: String,
        phase: &'static str,
        index: usize,
    },
}

/// Structural validation of the manifest root. Pure; never mutates.
pub fn validate(manifest: &Manifest) -> Result<(), ValidationError> {
    if manifest.version != SUPPORTED_VERSION {
        return Err(ValidationError::UnsupportedVersion(manifest.version));
    }
    if manifest.project.name.is_empty() {
        return Err(ValidationError::EmptyProjectName);
    }
    let default = &manifest.project.default_profile;
    if !default.is_empty() && !manifest.profiles.contains_key(default) {
        return Err(ValidationError::UnknownDefaultProfile(default.clone()));
    }
    Ok(())
}

/// Semantic validation of one profile: runtime tag and hook invariants.
pub fn validate_profile(manifest: &Manifest, name: &str) -> Result<(), ValidationError> {
    let profile = manifest
        .profiles
        .get(name)
        .ok_or_else(|| ValidationError::UnknownProfile(name.to_owned()))?;

    if !profile.runtime.is_empty()
        && profile.runtime != RUNTIME_COMPOSE
        && profile.runtime != RUNTIME_K8S
    {
        return Err(ValidationError::InvalidRuntime {
            profile: name.to_owned(),
            value: profile.runtime.clone(),
        });
    }

    validate_hooks(name, "afterUp", &profile.hooks.after_up)?;
    validate_hooks(name, "beforeDown", &profile.hooks.before_down)?;
    Ok(())
}

fn validate_hooks(
    profile: &str,
    phase: &'static str,
    hooks: &[Hook],
) -> Result<(), ValidationError> {
    for (index, hook) in hooks.iter().enumerate() {
        let has_exec = !hook.exec.is_empty();
        let has_run = !hook.run.is_empty();
        if has_exec && has_run {
            return Err(ValidationError::HookBothExecAndRun {
                profile: profile.to_owned(),
                phase,
                index,
            });
        }
        if !has_exec && !has_run {
            return Err(ValidationError::HookMissingAction {
                profile: profile.to_owned(),
                phase,
                index,
            });
        }
        if has_exec && hook.service.is_empty() {
            return Err(ValidationError::HookExecMissingService {
                profile: profile.to_owned(),
                phase,
                index,
            });
        }
        if has_run && !hook.service.is_empty() {
            return Err(ValidationError::HookRunWithService {
                profile: profile.to_owned(),
                phase,
                index,
            });
        }
    }
    Ok(())
}

pub fn profile_by_name<'a>(
    manifest: &'a Manifest,
    name: &str,
) -> Result<&'a Profile, ValidationError> {
    manifest
        .profiles
        .get(name)
        .ok_or_else(|| ValidationError::UnknownProfile(name.to_owned()))
}
