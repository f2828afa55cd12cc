use crate::render::{
    dep_image_ref, parse_container_port, sanitize_name, RenderError, RewriteOptions,
};
use berth_schema::{Manifest, Profile};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Serialize)]
struct ObjectMeta {
    name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    namespace: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct Deployment {
    api_version: &'static str,
    kind: &'static str,
    metadata: ObjectMeta,
    spec: DeploymentSpec,
}

#[derive(Debug, Clone, Serialize)]
struct DeploymentSpec {
    replicas: u32,
    selector: LabelSelector,
    template: PodTemplateSpec,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct LabelSelector {
    match_labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
struct PodTemplateSpec {
    metadata: ObjectMeta,
    spec: PodSpec,
}

#[derive(Debug, Clone, Serialize)]
struct PodSpec {
    containers: Vec<Container>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    volumes: Vec<Volume>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct Container {
    name: String,
    image: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    command: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    working_dir: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    env: Vec<EnvVar>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    ports: Vec<ContainerPort>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    volume_mounts: Vec<VolumeMount>,
}

#[derive(Debug, Clone, Serialize)]
struct EnvVar {
    name: String,
    value: String,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
struct ContainerPort {
    container_port: u16,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct VolumeMount {
    name: String,
    mount_path: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct Volume {
    name: String,
    empty_dir: EmptyDir,
}

#[derive(Debug, Clone, Default, Serialize)]
struct EmptyDir {}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct Service {
    api_version: &'static str,
    kind: &'static str,
    metadata: ObjectMeta,
    spec: ServiceSpec,
}

#[derive(Debug, Clone, Serialize)]
struct ServiceSpec {
    selector: BTreeMap<String, String>,
    ports: Vec<ServicePort>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct ServicePort {
    name: String,
    port: u16,
    target_port: u16,
}

/// Render a profile as a `---`-separated sequence of Deployment/Service
/// objects.
///
/// Capability gaps relative to the compose renderer, both deliberate:
/// build-only services are rejected (no in-cluster build), and bind mounts
/// are rejected outright. A dep's single volume becomes an `emptyDir` —
/// ephemeral by the scope of this renderer, so data does not survive pod
/// rescheduling.
pub fn render(
    manifest: &Manifest,
    profile: &Profile,
    namespace: &str,
    rewrite: RewriteOptions<'_>,
) -> Result<String, RenderError> {
    let project = sanitize_name(&manifest.project.name);
    let mut docs: Vec<String> = Vec::new();

    for (name, svc) in &profile.services {
        if svc.image.is_empty() {
            return Err(RenderError::MissingImage(name.clone()));
        }
        if !svc.mount.is_empty() {
            return Err(RenderError::UnsupportedMount(name.clone()));
        }

        let app = format!("{project}-{}", sanitize_name(name));
        let labels: BTreeMap<String, String> =
            [("app".to_owned(), app.clone())].into_iter().collect();

        let container = Container {
            name: sanitize_name(name),
            image: rewrite.rewrite(&svc.image),
            command: svc.command.clone(),
            working_dir: svc.workdir.clone(),
            env: env_vars(&svc.env),
            ports: container_ports(&svc.ports),
            volume_mounts: Vec::new(),
        };
        let ports = container.ports.clone();

        docs.push(serde_yaml::to_string(&deployment(
            &app, namespace, &labels, container, Vec::new(),
        ))?);
        if !ports.is_empty() {
            docs.push(serde_yaml::to_string(&service(
                &app, namespace, &labels, &ports,
            ))?);
        }
    }

    for (name, dep) in &profile.deps {
        let image = dep_image_ref(&dep.kind, &dep.version).ok_or_else(|| {
            RenderError::UnsupportedDepKind {
                dep: name.clone(),
                kind: dep.kind.clone(),
            }
        })?;

        let app = format!("{project}-{}", sanitize_name(name));
        let labels: BTreeMap<String, String> =
            [("app".to_owned(), app.clone())].into_iter().collect();

        let (volumes, mounts) = dep_volumes(name, &dep.volume)?;
        let container = Container {
            name: sanitize_name(name),
            image: rewrite.rewrite(&image),
            env: env_vars(&dep.env),
            ports: container_ports(&dep.ports),
            volume_mounts: mounts,
            ..Container::default()
        };
        let ports = container.ports.clone();

        docs.push(serde_yaml::to_string(&deployment(
            &app, namespace, &labels, container, volumes,
        ))?);
        if !ports.is_empty() {
            docs.push(serde_yaml::to_string(&service(
                &app, namespace, &labels, &ports,
            ))?);
        }
    }

    Ok(docs.join("---\n"))
}

fn deployment(
    app: &str,
    namespace: &str,
    labels: &BTreeMap<String, String>,
    container: Container,
    volumes: Vec<Volume>,
) -> Deployment {
    Deployment {
        api_version: "apps/v1",
        kind: "Deployment",
        metadata: ObjectMeta {
            name: app.to_owned(),
            namespace: namespace.to_owned(),
            labels: labels.clone(),
        },
        spec: DeploymentSpec {
            replicas: 1,
            selector: LabelSelector {
                match_labels: labels.clone(),
            },
            template: PodTemplateSpec {
                metadata: ObjectMeta {
                    labels: labels.clone(),
                    ..ObjectMeta::default()
                },
                spec: PodSpec {
                    containers: vec![container],
                    volumes,
                },
            },
        },
    }
}

fn service(
    app: &str,
    namespace: &str,
    labels: &BTreeMap<String, String>,
    ports: &[ContainerPort],
) -> Service {
    Service {
        api_version: "v1",
        kind: "Service",
        metadata: ObjectMeta {
            name: app.to_owned(),
            namespace: namespace.to_owned(),
            labels: labels.clone(),
        },
        spec: ServiceSpec {
            selector: labels.clone(),
            ports: ports
                .iter()
                .map(|p| ServicePort {
                    name: format!("p-{}", p.container_port),
                    port: p.container_port,
                    target_port: p.container_port,
                })
                .collect(),
        },
    }
}

fn env_vars(env: &BTreeMap<String, String>) -> Vec<EnvVar> {
    env.iter()
        .map(|(name, value)| EnvVar {
            name: name.clone(),
            value: value.clone(),
        })
        .collect()
}

/// Distinct container ports in declaration order; entries that do not parse
/// as `[host:]container[/proto]` are skipped.
fn container_ports(ports: &[String]) -> Vec<ContainerPort> {
    let mut seen = Vec::new();
    let mut out = Vec::new();
    for port in ports {
        let Some(container_port) = parse_container_port(port) else {
            continue;
        };
        if seen.contains(&container_port) {
            continue;
        }
        seen.push(container_port);
        out.push(ContainerPort { container_port });
    }
    out
}

fn dep_volumes(
    dep_name: &str,
    volume: &str,
) -> Result<(Vec<Volume>, Vec<VolumeMount>), RenderError> {
    if volume.is_empty() {
        return Ok((Vec::new(), Vec::new()));
    }
    let Some((_, mount_path)) = volume.split_once(':') else {
        return Err(RenderError::InvalidVolume {
            dep: dep_name.to_owned(),
            spec: volume.to_owned(),
        });
    };

    let volume_name = sanitize_name(&format!("{dep_name}-data"));
    Ok((
        vec![Volume {
            name: volume_name.clone(),
            empty_dir: EmptyDir::default(),
        }],
        vec![VolumeMount {
            name: volume_name,
            mount_path: mount_path.to_owned(),
        }],
    ))
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
    runtime: k8s
    services:
      api:
        image: nginx:alpine
        ports: ["8080:80"]
        dependsOn: [db]
    deps:
      db:
        kind: postgres
        version: "16"
        ports: ["5432:5432"]
        volume: "db-data:/var/lib/postgresql/data"
"#;

    fn fixture() -> Manifest {
        parse_manifest_str(MANIFEST).expect("parse")
    }

    #[test]
    fn renders_deployments_and_services_end_to_end() {
        let m = fixture();
        let out = render(&m, &m.profiles["local"], "", RewriteOptions::default()).unwrap();

        assert!(out.contains("kind: Deployment"));
        assert!(out.contains("kind: Service"));
        assert!(out.contains("image: nginx:alpine"));
        assert!(out.contains("image: postgres:16"));
        assert!(out.contains("name: my-app-api"));
        assert!(out.contains("name: my-app-db"));
        assert!(out.contains("containerPort: 80"));
        assert!(out.contains("containerPort: 5432"));
        assert!(out.contains("name: p-80"));
        assert!(out.contains("name: p-5432"));
        assert!(out.contains("---\n"));
    }

    #[test]
    fn services_emit_before_deps_in_sorted_order() {
        let m = fixture();
        let out = render(&m, &m.profiles["local"], "", RewriteOptions::default()).unwrap();
        let api = out.find("my-app-api").unwrap();
        let db = out.find("my-app-db").unwrap();
        assert!(api < db);
    }

    #[test]
    fn rendering_is_byte_identical_across_runs() {
        let m = fixture();
        let a = render(&m, &m.profiles["local"], "", RewriteOptions::default()).unwrap();
        let b = render(&m, &m.profiles["local"], "", RewriteOptions::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn namespace_is_emitted_when_set() {
        let m = fixture();
        let out = render(&m, &m.profiles["local"], "staging", RewriteOptions::default()).unwrap();
        assert!(out.contains("namespace: staging"));
    }

    #[test]
    fn rejects_service_without_image() {
        let mut m = fixture();
        let profile = m.profiles.get_mut("local").unwrap();
        let api = profile.services.get_mut("api").unwrap();
        api.image = String::new();
        api.build = Some(berth_schema::Build {
            context: "./api".to_owned(),
            dockerfile: String::new(),
        });
        let err = render(&m, &m.profiles["local"], "", RewriteOptions::default()).unwrap_err();
        assert!(matches!(err, RenderError::MissingImage(name) if name == "api"));
    }

    #[test]
    fn rejects_service_with_bind_mount() {
        let mut m = fixture();
        let profile = m.profiles.get_mut("local").unwrap();
        profile.services.get_mut("api").unwrap().mount = vec!["./src:/app".to_owned()];
        let err = render(&m, &m.profiles["local"], "", RewriteOptions::default()).unwrap_err();
        assert!(matches!(err, RenderError::UnsupportedMount(name) if name == "api"));
    }

    #[test]
    fn rejects_unsupported_dep_kind() {
        let mut m = fixture();
        let profile = m.profiles.get_mut("local").unwrap();
        profile.deps.get_mut("db").unwrap().kind = "mongodb".to_owned();
        let err = render(&m, &m.profiles["local"], "", RewriteOptions::default()).unwrap_err();
        assert!(
            matches!(err, RenderError::UnsupportedDepKind { dep, kind } if dep == "db" && kind == "mongodb")
        );
    }

    #[test]
    fn rejects_malformed_dep_volume() {
        let mut m = fixture();
        let profile = m.profiles.get_mut("local").unwrap();
        profile.deps.get_mut("db").unwrap().volume = "no-path".to_owned();
        let err = render(&m, &m.profiles["local"], "", RewriteOptions::default()).unwrap_err();
        assert!(matches!(err, RenderError::InvalidVolume { .. }));
    }

    #[test]
    fn dep_volume_becomes_ephemeral_empty_dir() {
        let m = fixture();
        let out = render(&m, &m.profiles["local"], "", RewriteOptions::default()).unwrap();
        assert!(out.contains("emptyDir: {}"));
        assert!(out.contains("name: db-data"));
        assert!(out.contains("mountPath: /var/lib/postgresql/data"));
    }

    #[test]
    fn duplicate_and_malformed_ports_are_filtered() {
        let mut m = fixture();
        let profile = m.profiles.get_mut("local").unwrap();
        profile.services.get_mut("api").unwrap().ports = vec![
            "8080:80".to_owned(),
            "80".to_owned(),
            "9090:9090/udp".to_owned(),
            "oops".to_owned(),
        ];
        let out = render(&m, &m.profiles["local"], "", RewriteOptions::default()).unwrap();
        assert_eq!(out.matches("containerPort: 80\n").count(), 1);
        assert!(out.contains("containerPort: 9090"));
        assert!(!out.contains("oops"));
    }

    #[test]
    fn sanitized_project_name_prefixes_object_names() {
        let mut m = fixture();
        m.project.name = "My App!".to_owned();
        let out = render(&m, &m.profiles["local"], "", RewriteOptions::default()).unwrap();
        assert!(out.contains("name: my-app-api"));
    }

    #[test]
    fn image_rewrites_apply_to_k8s_output() {
        let m = fixture();
        let opts = RewriteOptions {
            registry_prefix: "ghcr.io/acme",
            lockfile: None,
        };
        let out = render(&m, &m.profiles["local"], "", opts).unwrap();
        assert!(out.contains("image: ghcr.io/acme/nginx:alpine"));
        assert!(out.contains("image: ghcr.io/acme/postgres:16"));
    }
}
