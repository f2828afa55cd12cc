use crate::runtime::{
    ContainerRuntime, DigestResolver, LogsOptions, ServiceStatus, UpOptions,
};
use crate::RuntimeError;
use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::Mutex;

/// In-memory runtime for orchestration tests. Records every invocation as a
/// flat string and returns configurable results.
pub struct MockRuntime {
    pub available: bool,
    pub exec_exit_code: i32,
    pub statuses: Vec<ServiceStatus>,
    pub digests: BTreeMap<String, String>,
    calls: Mutex<Vec<String>>,
}

impl Default for MockRuntime {
    fn default() -> Self {
        Self {
            available: true,
            exec_exit_code: 0,
            statuses: Vec::new(),
            digests: BTreeMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl MockRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn record(&self, call: String) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

impl ContainerRuntime for MockRuntime {
    fn name(&self) -> &str {
        "mock"
    }

    fn detect(&self) -> bool {
        self.available
    }

    fn up(
        &self,
        _compose_path: &Path,
        project: &str,
        opts: &UpOptions,
    ) -> Result<(), RuntimeError> {
        self.record(format!(
            "up {project} build={} pull={}",
            opts.build, opts.pull
        ));
        Ok(())
    }

    fn down(
        &self,
        _compose_path: &Path,
        project: &str,
        remove_volumes: bool,
    ) -> Result<(), RuntimeError> {
        self.record(format!("down {project} volumes={remove_volumes}"));
        Ok(())
    }

    fn logs(
        &self,
        _compose_path: &Path,
        project: &str,
        opts: &LogsOptions,
    ) -> Result<Box<dyn Read + Send>, RuntimeError> {
        self.record(format!("logs {project} service={}", opts.service));
        Ok(Box::new(Cursor::new(Vec::new())))
    }

    fn exec(
        &self,
        _compose_path: &Path,
        project: &str,
        service: &str,
        command: &[String],
    ) -> Result<i32, RuntimeError> {
        self.record(format!("exec {project} {service} {}", command.join(" ")));
        Ok(self.exec_exit_code)
    }

    fn status(
        &self,
        _compose_path: &Path,
        project: &str,
    ) -> Result<Vec<ServiceStatus>, RuntimeError> {
        self.record(format!("status {project}"));
        Ok(self.statuses.clone())
    }

    fn digest_resolver(&self) -> Option<&dyn DigestResolver> {
        Some(self)
    }
}

impl DigestResolver for MockRuntime {
    fn resolve_image_digest(&self, image: &str) -> Result<String, RuntimeError> {
        self.digests.get(image).cloned().ok_or_else(|| {
            RuntimeError::DigestResolveFailed {
                image: image.to_owned(),
                reason: "no digest configured".to_owned(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_calls_in_order() {
        let rt = MockRuntime::new();
        let path = Path::new("compose.yaml");
        rt.up(path, "app", &UpOptions::default()).unwrap();
        rt.exec(path, "app", "api", &["migrate".to_owned()]).unwrap();
        rt.down(path, "app", true).unwrap();
        assert_eq!(
            rt.calls(),
            vec![
                "up app build=false pull=false",
                "exec app api migrate",
                "down app volumes=true",
            ]
        );
    }

    #[test]
    fn digest_resolution_uses_configured_map() {
        let mut rt = MockRuntime::new();
        rt.digests
            .insert("nginx:alpine".to_owned(), "sha256:abc".to_owned());
        assert_eq!(rt.resolve_image_digest("nginx:alpine").unwrap(), "sha256:abc");
        assert!(matches!(
            rt.resolve_image_digest("missing"),
            Err(RuntimeError::DigestResolveFailed { .. })
        ));
    }
}
