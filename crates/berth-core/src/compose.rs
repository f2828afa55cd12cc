use crate::render::{dep_image_ref, sanitize_name, RenderError, RewriteOptions};
use crate::telemetry;
use berth_schema::Profile;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Default network every emitted container joins; the name is fixed so that
/// renders are stable regardless of project name.
pub const DEFAULT_NETWORK: &str = "berth_default";

#[derive(Debug, Clone, Default, Serialize)]
struct ComposeDoc {
    services: BTreeMap<String, ComposeService>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    volumes: BTreeMap<String, EmptySection>,
    networks: BTreeMap<String, EmptySection>,
}

#[derive(Debug, Clone, Default, Serialize)]
struct EmptySection {}

#[derive(Debug, Clone, Default, Serialize)]
struct ComposeService {
    #[serde(skip_serializing_if = "String::is_empty")]
    image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    build: Option<ComposeBuild>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    command: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    working_dir: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    environment: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    ports: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    volumes: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    depends_on: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    healthcheck: Option<ComposeHealthcheck>,
    networks: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
struct ComposeBuild {
    context: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    dockerfile: String,
}

#[derive(Debug, Clone, Default, Serialize)]
struct ComposeHealthcheck {
    test: Vec<String>,
    interval: String,
    retries: u32,
}

/// Render a profile to a compose document.
///
/// All map iteration happens over `BTreeMap`s, so identical input yields
/// byte-identical output. Image references go through `rewrite` (lockfile
/// pin, then registry prefix); telemetry injects the built-in observability
/// services into the same document.
pub fn render(
    profile: &Profile,
    rewrite: RewriteOptions<'_>,
    enable_telemetry: bool,
) -> Result<String, RenderError> {
    let mut doc = ComposeDoc::default();
    doc.networks
        .insert(DEFAULT_NETWORK.to_owned(), EmptySection::default());

    let mut emitted = BTreeSet::new();
    let mut claim = |name: String| -> Result<String, RenderError> {
        if !emitted.insert(name.clone()) {
            return Err(RenderError::NameCollision(name));
        }
        Ok(name)
    };

    for (name, svc) in &profile.services {
        let container_name = claim(sanitize_name(name))?;

        let healthcheck = svc.health.as_ref().filter(|h| !h.http_get.is_empty()).map(|h| {
            ComposeHealthcheck {
                test: vec![
                    "CMD-SHELL".to_owned(),
                    format!("curl -fsS {} || exit 1", h.http_get),
                ],
                interval: if h.interval.is_empty() {
                    "5s".to_owned()
                } else {
                    h.interval.clone()
                },
                retries: if h.retries == 0 { 3 } else { h.retries },
            }
        });

        doc.services.insert(
            container_name,
            ComposeService {
                image: if svc.image.is_empty() {
                    String::new()
                } else {
                    rewrite.rewrite(&svc.image)
                },
                build: svc.build.as_ref().map(|b| ComposeBuild {
                    context: b.context.clone(),
                    dockerfile: b.dockerfile.clone(),
                }),
                command: svc.command.clone(),
                working_dir: svc.workdir.clone(),
                environment: svc.env.clone(),
                ports: svc.ports.clone(),
                volumes: svc.mount.clone(),
                depends_on: svc.depends_on.iter().map(|d| sanitize_name(d)).collect(),
                healthcheck,
                networks: vec![DEFAULT_NETWORK.to_owned()],
            },
        );
    }

    for (name, dep) in &profile.deps {
        let container_name = claim(sanitize_name(name))?;
        let image = dep_image_ref(&dep.kind, &dep.version).ok_or_else(|| {
            RenderError::UnsupportedDepKind {
                dep: name.clone(),
                kind: dep.kind.clone(),
            }
        })?;

        let mut volumes = Vec::new();
        if !dep.volume.is_empty() {
            let Some((volume_name, _path)) = dep.volume.split_once(':') else {
                return Err(RenderError::InvalidVolume {
                    dep: name.clone(),
                    spec: dep.volume.clone(),
                });
            };
            doc.volumes
                .insert(volume_name.to_owned(), EmptySection::default());
            volumes.push(dep.volume.clone());
        }

        doc.services.insert(
            container_name,
            ComposeService {
                image: rewrite.rewrite(&image),
                environment: dep.env.clone(),
                ports: dep.ports.clone(),
                volumes,
                networks: vec![DEFAULT_NETWORK.to_owned()],
                ..ComposeService::default()
            },
        );
    }

    if enable_telemetry {
        for svc in telemetry::SERVICES {
            let container_name = claim(sanitize_name(svc.name))?;
            doc.services.insert(
                container_name,
                ComposeService {
                    image: rewrite.rewrite(svc.image),
                    command: svc.command.iter().map(|c| (*c).to_owned()).collect(),
                    environment: svc
                        .env
                        .iter()
                        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                        .collect(),
                    ports: svc.ports.iter().map(|p| (*p).to_owned()).collect(),
                    volumes: svc.volumes.iter().map(|v| (*v).to_owned()).collect(),
                    networks: vec![DEFAULT_NETWORK.to_owned()],
                    ..ComposeService::default()
                },
            );
        }
    }

    Ok(serde_yaml::to_string(&doc)?)
}

/// Distinct image references found in a rendered compose document, sorted.
/// Build-only services without an image are skipped.
pub fn collect_images(doc: &str) -> Result<Vec<String>, RenderError> {
    let value: serde_yaml::Value = serde_yaml::from_str(doc)?;
    let services = value
        .get("services")
        .and_then(serde_yaml::Value::as_mapping)
        .ok_or_else(|| RenderError::Malformed("missing services mapping".to_owned()))?;

    let mut images = BTreeSet::new();
    for (_, service) in services {
        if let Some(image) = service.get("image").and_then(serde_yaml::Value::as_str) {
            if !image.is_empty() {
                images.insert(image.to_owned());
            }
        }
    }
    Ok(images.into_iter().collect())
}
