//! Built-in observability stack injected into compose renders.
//!
//! Service definitions and their companion configuration files are static
//! content; the renderer only places them. Disable with `--no-telemetry`.

use crate::render::Asset;

pub const TELEMETRY_PREFIX: &str = "berth-telemetry-";

pub(crate) struct TelemetryService {
    pub name: &'static str,
    pub image: &'static str,
    pub ports: &'static [&'static str],
    pub env: &'static [(&'static str, &'static str)],
    pub command: &'static [&'static str],
    pub volumes: &'static [&'static str],
}

pub(crate) const SERVICES: &[TelemetryService] = &[
    TelemetryService {
        name: "berth-telemetry-grafana",
        image: "grafana/grafana:11.2.0",
        ports: &["3000:3000"],
        env: &[
            ("GF_AUTH_ANONYMOUS_ENABLED", "true"),
            ("GF_AUTH_ANONYMOUS_ORG_ROLE", "Admin"),
        ],
        command: &[],
        volumes: &[
            "./telemetry/grafana-datasources.yaml:/etc/grafana/provisioning/datasources/datasources.yaml:ro",
        ],
    },
    TelemetryService {
        name: "berth-telemetry-prometheus",
        image: "prom/prometheus:v2.53.0",
        ports: &["9090:9090"],
        env: &[],
        command: &[],
        volumes: &["./telemetry/prometheus.yml:/etc/prometheus/prometheus.yml:ro"],
    },
    TelemetryService {
        name: "berth-telemetry-loki",
        image: "grafana/loki:3.1.0",
        ports: &["3100:3100"],
        env: &[],
        command: &["-config.file=/etc/loki/local-config.yaml"],
        volumes: &["./telemetry/loki-config.yaml:/etc/loki/local-config.yaml:ro"],
    },
    TelemetryService {
        name: "berth-telemetry-alloy",
        image: "grafana/alloy:v1.3.1",
        ports: &[],
        env: &[],
        command: &["run", "/etc/alloy/config.alloy"],
        volumes: &[
            "./telemetry/config.alloy:/etc/alloy/config.alloy:ro",
            "/var/run/docker.sock:/var/run/docker.sock:ro",
        ],
    },
    TelemetryService {
        name: "berth-telemetry-cadvisor",
        image: "gcr.io/cadvisor/cadvisor:v0.49.1",
        ports: &["8081:8080"],
        env: &[],
        command: &[],
        volumes: &[
            "/:/rootfs:ro",
            "/var/run:/var/run:ro",
            "/sys:/sys:ro",
            "/var/lib/docker/:/var/lib/docker:ro",
        ],
    },
];

const PROMETHEUS_CONFIG: &str = r"global:
  scrape_interval: 15s

scrape_configs:
  - job_name: cadvisor
    static_configs:
      - targets: ['berth-telemetry-cadvisor:8080']
  - job_name: prometheus
    static_configs:
      - targets: ['localhost:9090']
";

const LOKI_CONFIG: &str = r"auth_enabled: false

server:
  http_listen_port: 3100

common:
  instance_addr: 127.0.0.1
  path_prefix: /loki
  storage:
    filesystem:
      chunks_directory: /loki/chunks
      rules_directory: /loki/rules
  replication_factor: 1
  ring:
    kvstore:
      store: inmemory

schema_config:
  configs:
    - from: 2024-01-01
      store: tsdb
      object_store: filesystem
      schema: v13
      index:
        prefix: index_
        period: 24h
";

const GRAFANA_DATASOURCES: &str = r"apiVersion: 1

datasources:
  - name: Prometheus
    type: prometheus
    access: proxy
    url: http://berth-telemetry-prometheus:9090
    isDefault: true
  - name: Loki
    type: loki
    access: proxy
    url: http://berth-telemetry-loki:3100
";

const ALLOY_CONFIG: &str = r#"discovery.docker "containers" {
  host = "unix:///var/run/docker.sock"
}

loki.source.docker "containers" {
  host       = "unix:///var/run/docker.sock"
  targets    = discovery.docker.containers.targets
  forward_to = [loki.write.default.receiver]
}

loki.write "default" {
  endpoint {
    url = "http://berth-telemetry-loki:3100/loki/api/v1/push"
  }
}
"#;

/// Companion files for the telemetry services, as relative paths under the
/// rendered document's directory. Empty when telemetry is disabled.
pub fn telemetry_assets(enabled: bool) -> Vec<Asset> {
    if !enabled {
        return Vec::new();
    }
    vec![
        Asset {
            path: "telemetry/prometheus.yml",
            content: PROMETHEUS_CONFIG,
        },
        Asset {
            path: "telemetry/loki-config.yaml",
            content: LOKI_CONFIG,
        },
        Asset {
            path: "telemetry/grafana-datasources.yaml",
            content: GRAFANA_DATASOURCES,
        },
        Asset {
            path: "telemetry/config.alloy",
            content: ALLOY_CONFIG,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_telemetry_has_no_assets() {
        assert!(telemetry_assets(false).is_empty());
    }

    #[test]
    fn every_mounted_config_has_a_matching_asset() {
        let assets = telemetry_assets(true);
        for svc in SERVICES {
            for volume in svc.volumes {
                let Some(host_path) = volume.strip_prefix("./") else {
                    continue;
                };
                let host_path = host_path.split(':').next().unwrap_or(host_path);
                assert!(
                    assets.iter().any(|a| a.path == host_path),
                    "no asset for {host_path}"
                );
            }
        }
    }

    #[test]
    fn service_names_carry_the_telemetry_prefix() {
        for svc in SERVICES {
            assert!(svc.name.starts_with(TELEMETRY_PREFIX));
        }
    }
}
