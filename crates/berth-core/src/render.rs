use berth_schema::Lockfile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("service '{0}' requires an image for this render target")]
    MissingImage(String),
    #[error("service '{0}' uses a bind mount, which this render target does not support")]
    UnsupportedMount(String),
    #[error("dep '{dep}': kind '{kind}' is not a supported dependency kind")]
    UnsupportedDepKind { dep: String, kind: String },
    #[error("dep '{dep}': volume '{spec}' must be in name:/container/path form")]
    InvalidVolume { dep: String, spec: String },
    #[error("container name '{0}' collides with another entry after sanitization")]
    NameCollision(String),
    #[error("failed to serialize rendered document: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("rendered document is malformed: {0}")]
    Malformed(String),
}

/// Auxiliary file emitted alongside a rendered document, rooted at the same
/// directory as the document itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub path: &'static str,
    pub content: &'static str,
}

/// Image rewrite inputs shared by both renderers. Lockfile pins take
/// precedence over the registry prefix for matched images.
#[derive(Debug, Clone, Copy, Default)]
pub struct RewriteOptions<'a> {
    pub registry_prefix: &'a str,
    pub lockfile: Option<&'a Lockfile>,
}

impl RewriteOptions<'_> {
    pub fn rewrite(&self, image: &str) -> String {
        if let Some(digest) = self.lockfile.and_then(|lf| lf.digest_for(image)) {
            return format!("{image}@{digest}");
        }
        if !self.registry_prefix.is_empty() && !has_registry_host(image) {
            return format!("{}/{image}", self.registry_prefix);
        }
        image.to_owned()
    }
}

/// An image reference carries an explicit registry host when its first path
/// segment looks like a hostname (contains a dot or port, or is localhost).
fn has_registry_host(image: &str) -> bool {
    match image.split_once('/') {
        Some((first, _)) => first.contains('.') || first.contains(':') || first == "localhost",
        None => false,
    }
}

/// Canonical image for a managed dependency kind. The table is a closed set;
/// unknown kinds are a render error.
pub(crate) fn dep_image(kind: &str) -> Option<&'static str> {
    match kind {
        "postgres" => Some("postgres"),
        "redis" => Some("redis"),
        _ => None,
    }
}

pub(crate) fn dep_image_ref(kind: &str, version: &str) -> Option<String> {
    let image = dep_image(kind)?;
    if version.is_empty() {
        Some(image.to_owned())
    } else {
        Some(format!("{image}:{version}"))
    }
}

/// Lowercase `[a-z0-9-]` with everything else collapsed to hyphens and
/// leading/trailing hyphens trimmed; empty results fall back to the tool name.
pub fn sanitize_name(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' {
            out.push(c);
        } else {
            out.push('-');
        }
    }
    let trimmed = out.trim_matches('-');
    if trimmed.is_empty() {
        "berth".to_owned()
    } else {
        trimmed.to_owned()
    }
}

/// Parse the container side of a `[host:]container[/proto]` port string.
pub(crate) fn parse_container_port(port: &str) -> Option<u16> {
    let without_proto = port.split('/').next().unwrap_or(port);
    let last = without_proto.rsplit(':').next().unwrap_or(without_proto);
    last.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lockfile_pin_takes_precedence_over_prefix() {
        let mut lf = Lockfile::new();
        lf.images
            .insert("nginx:alpine".to_owned(), "sha256:abc".to_owned());
        let opts = RewriteOptions {
            registry_prefix: "ghcr.io/acme",
            lockfile: Some(&lf),
        };
        assert_eq!(opts.rewrite("nginx:alpine"), "nginx:alpine@sha256:abc");
        assert_eq!(opts.rewrite("redis:7"), "ghcr.io/acme/redis:7");
    }

    #[test]
    fn prefix_skips_images_with_registry_host() {
        let opts = RewriteOptions {
            registry_prefix: "mirror.local",
            lockfile: None,
        };
        assert_eq!(opts.rewrite("gcr.io/app/tool:1"), "gcr.io/app/tool:1");
        assert_eq!(opts.rewrite("localhost/app:1"), "localhost/app:1");
        assert_eq!(opts.rewrite("registry:5000/app"), "registry:5000/app");
        assert_eq!(opts.rewrite("library/nginx"), "mirror.local/library/nginx");
        assert_eq!(opts.rewrite("nginx"), "mirror.local/nginx");
    }

    #[test]
    fn no_rewrites_without_configuration() {
        let opts = RewriteOptions::default();
        assert_eq!(opts.rewrite("nginx:alpine"), "nginx:alpine");
    }

    #[test]
    fn dep_image_table_is_closed() {
        assert_eq!(dep_image_ref("postgres", "16").unwrap(), "postgres:16");
        assert_eq!(dep_image_ref("redis", "").unwrap(), "redis");
        assert!(dep_image_ref("mongodb", "7").is_none());
    }

    #[test]
    fn sanitizes_names_to_dns_label_alphabet() {
        assert_eq!(sanitize_name("My App"), "my-app");
        assert_eq!(sanitize_name("api_v2"), "api-v2");
        assert_eq!(sanitize_name("--edge--"), "edge");
        assert_eq!(sanitize_name("___"), "berth");
    }

    #[test]
    fn parses_port_forms() {
        assert_eq!(parse_container_port("8080:80"), Some(80));
        assert_eq!(parse_container_port("80"), Some(80));
        assert_eq!(parse_container_port("8080:80/tcp"), Some(80));
        assert_eq!(parse_container_port("bad"), None);
    }
}
