use crate::compose;
use crate::graph::{build_graph, topo_sort};
use crate::health::{wait_for_health, SystemClock, UreqProbe};
use crate::hooks::run_hooks;
use crate::k8s;
use crate::render::{sanitize_name, RewriteOptions};
use crate::state::StateRecord;
use crate::telemetry::{telemetry_assets, TELEMETRY_PREFIX};
use crate::CoreError;
use berth_runtime::{kubectl, ContainerRuntime, RuntimeError, ServiceStatus, UpOptions};
use berth_schema::{LockError, Lockfile, Manifest, Profile};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const WORK_DIR: &str = ".berth";
pub const COMPOSE_FILE: &str = "compose.yaml";
pub const K8S_FILE: &str = "k8s.yaml";
pub const LOCK_FILE: &str = "berth.lock";

#[derive(Debug, Clone, Copy)]
pub struct UpSettings {
    pub build: bool,
    pub pull: bool,
    pub telemetry: bool,
}

impl Default for UpSettings {
    fn default() -> Self {
        Self {
            build: false,
            pull: false,
            telemetry: true,
        }
    }
}

/// A reachable URL surfaced after `up`, one per published port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub label: String,
    pub url: String,
}

#[derive(Debug, Clone, Default)]
pub struct UpReport {
    /// Dependency-respecting start order, informational only.
    pub order: Vec<String>,
    pub endpoints: Vec<Endpoint>,
    pub statuses: Vec<ServiceStatus>,
}

/// Orchestrates one project rooted at a manifest directory. All generated
/// files live under `<root>/.berth/`; the lockfile sits beside the manifest.
pub struct Engine {
    root: PathBuf,
}

impl Engine {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn work_dir(&self) -> PathBuf {
        self.root.join(WORK_DIR)
    }

    pub fn compose_path(&self) -> PathBuf {
        self.work_dir().join(COMPOSE_FILE)
    }

    pub fn k8s_path(&self) -> PathBuf {
        self.work_dir().join(K8S_FILE)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.root.join(LOCK_FILE)
    }

    fn load_lockfile(&self) -> Result<Option<Lockfile>, CoreError> {
        match Lockfile::load(self.lock_path()) {
            Ok(lf) => Ok(Some(lf)),
            Err(LockError::NotFound(_)) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Render the compose document for a profile, with graph validation and
    /// lockfile pinning applied.
    pub fn render_compose(
        &self,
        manifest: &Manifest,
        profile: &Profile,
        enable_telemetry: bool,
    ) -> Result<String, CoreError> {
        topo_sort(&build_graph(profile)?)?;
        let lockfile = self.load_lockfile()?;
        let rewrite = RewriteOptions {
            registry_prefix: &manifest.registry.prefix,
            lockfile: lockfile.as_ref(),
        };
        Ok(compose::render(profile, rewrite, enable_telemetry)?)
    }

    pub fn render_k8s(
        &self,
        manifest: &Manifest,
        profile: &Profile,
        namespace: &str,
    ) -> Result<String, CoreError> {
        topo_sort(&build_graph(profile)?)?;
        let lockfile = self.load_lockfile()?;
        let rewrite = RewriteOptions {
            registry_prefix: &manifest.registry.prefix,
            lockfile: lockfile.as_ref(),
        };
        Ok(k8s::render(manifest, profile, namespace, rewrite)?)
    }

    /// Write a rendered compose document and its telemetry companion files
    /// under the work directory.
    pub fn write_compose(&self, doc: &str, enable_telemetry: bool) -> Result<PathBuf, CoreError> {
        let path = self.compose_path();
        write_file(&path, doc)?;
        for asset in telemetry_assets(enable_telemetry) {
            write_file(&self.work_dir().join(asset.path), asset.content)?;
        }
        Ok(path)
    }

    pub fn write_k8s(&self, doc: &str) -> Result<PathBuf, CoreError> {
        let path = self.k8s_path();
        write_file(&path, doc)?;
        Ok(path)
    }

    /// Bring a compose-mode profile up: render, start, wait for declared
    /// health probes, then run `afterUp` hooks. The last-run state record is
    /// best-effort; a failure to persist it is logged, not fatal.
    pub fn up(
        &self,
        manifest: &Manifest,
        profile_name: &str,
        profile: &Profile,
        runtime: &dyn ContainerRuntime,
        settings: &UpSettings,
    ) -> Result<UpReport, CoreError> {
        let order = topo_sort(&build_graph(profile)?)?;
        let doc = self.render_compose(manifest, profile, settings.telemetry)?;
        let compose_path = self.write_compose(&doc, settings.telemetry)?;
        let project = sanitize_name(&manifest.project.name);

        info!(project = %project, profile = %profile_name, runtime = runtime.name(), "starting environment");
        runtime.up(
            &compose_path,
            &project,
            &UpOptions {
                build: settings.build,
                pull: settings.pull,
            },
        )?;

        let probes = health_probes(profile);
        if !probes.is_empty() {
            info!(count = probes.len(), "waiting for health probes");
            wait_for_health(&probes, &UreqProbe::new(), &SystemClock)?;
        }

        run_hooks(&profile.hooks.after_up, runtime, &compose_path, &project)?;

        let record = StateRecord {
            profile: profile_name.to_owned(),
            runtime: runtime.name().to_owned(),
            telemetry: settings.telemetry,
        };
        if let Err(err) = record.save(&self.work_dir()) {
            warn!("failed to persist run state: {err}");
        }

        let statuses = runtime.status(&compose_path, &project)?;
        let endpoints = endpoints_from_statuses(&project, &statuses);
        Ok(UpReport {
            order,
            endpoints,
            statuses,
        })
    }

    /// Tear a compose-mode profile down, running `beforeDown` hooks first.
    /// Hook failures abort the teardown.
    pub fn down(
        &self,
        manifest: &Manifest,
        profile: &Profile,
        runtime: &dyn ContainerRuntime,
        remove_volumes: bool,
    ) -> Result<(), CoreError> {
        let compose_path = self.compose_path();
        let project = sanitize_name(&manifest.project.name);

        run_hooks(&profile.hooks.before_down, runtime, &compose_path, &project)?;

        info!(project = %project, runtime = runtime.name(), "stopping environment");
        runtime.down(&compose_path, &project, remove_volumes)?;
        Ok(())
    }

    /// Apply a k8s-mode profile through kubectl.
    pub fn up_k8s(
        &self,
        manifest: &Manifest,
        profile: &Profile,
        namespace: &str,
    ) -> Result<PathBuf, CoreError> {
        let doc = self.render_k8s(manifest, profile, namespace)?;
        let path = self.write_k8s(&doc)?;
        info!(namespace = %namespace, "applying kubernetes objects");
        kubectl::apply(&path, namespace)?;
        Ok(path)
    }

    pub fn down_k8s(&self, namespace: &str) -> Result<(), CoreError> {
        info!(namespace = %namespace, "deleting kubernetes objects");
        kubectl::delete(&self.k8s_path(), namespace)?;
        Ok(())
    }

    /// Resolve a digest for every image the profile would deploy and persist
    /// the complete mapping. Any single resolution failure leaves the
    /// existing lockfile untouched.
    pub fn update_lock(
        &self,
        manifest: &Manifest,
        profile: &Profile,
        runtime: &dyn ContainerRuntime,
    ) -> Result<Lockfile, CoreError> {
        let resolver = runtime
            .digest_resolver()
            .ok_or_else(|| RuntimeError::DigestUnsupported(runtime.name().to_owned()))?;

        // Render unpinned so the collected references match what resolution
        // will be asked for.
        let rewrite = RewriteOptions {
            registry_prefix: &manifest.registry.prefix,
            lockfile: None,
        };
        let doc = compose::render(profile, rewrite, true)?;
        let images = compose::collect_images(&doc)?;

        let mut lockfile = Lockfile::new();
        for image in images {
            let digest = resolver.resolve_image_digest(&image)?;
            info!(image = %image, digest = %digest, "pinned");
            lockfile.images.insert(image, digest);
        }

        lockfile.save(self.lock_path())?;
        Ok(lockfile)
    }
}

fn write_file(path: &Path, content: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)
}

/// Service name → probe URL for every service declaring an HTTP health check.
fn health_probes(profile: &Profile) -> BTreeMap<String, String> {
    profile
        .services
        .iter()
        .filter_map(|(name, svc)| {
            let health = svc.health.as_ref()?;
            if health.http_get.is_empty() {
                return None;
            }
            Some((name.clone(), health.http_get.clone()))
        })
        .collect()
}

/// One endpoint per published port, labelled by the service behind it.
/// Compose containers are named `<project>-<service>-<index>`; the label is
/// the service part, with the telemetry prefix stripped for readability.
/// Repeated label+url pairs collapse to one entry; output is sorted by label.
fn endpoints_from_statuses(project: &str, statuses: &[ServiceStatus]) -> Vec<Endpoint> {
    let mut endpoints = Vec::new();
    let mut seen = BTreeSet::new();
    for status in statuses {
        let label = service_label(project, &status.name);
        for publisher in &status.publishers {
            if publisher.published_port == 0 {
                continue;
            }
            let url = format!("http://localhost:{}", publisher.published_port);
            if !seen.insert((label.clone(), url.clone())) {
                continue;
            }
            endpoints.push(Endpoint { label: label.clone(), url });
        }
    }
    endpoints.sort_by(|a, b| a.label.cmp(&b.label));
    endpoints
}

fn service_label(project: &str, container: &str) -> String {
    let mut name = container
        .strip_prefix(project)
        .and_then(|rest| rest.strip_prefix('-'))
        .unwrap_or(container);
    if let Some((head, tail)) = name.rsplit_once('-') {
        if !tail.is_empty() && tail.chars().all(|c| c.is_ascii_digit()) {
            name = head;
        }
    }
    name.strip_prefix(TELEMETRY_PREFIX).unwrap_or(name).to_owned()
}
