//! Nginx Ingress Controller in Deployment or DaemonSet topology

use chartkit_core::{ChartRef, Values};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue, json};
use std::collections::BTreeMap;
use tracing::debug;

use crate::component::{CommonArgs, Component, ComponentKind, ComponentOutputs, Instance};

pub const CHART: &str = "nginx-ingress";
pub const VERSION: &str = "1.41.3";
pub const REPOSITORY: &str = "https://charts.helm.sh/stable";

pub const INGRESS_CLASS: &str = "nginx";

const DEFAULT_REPLICAS: u32 = 1;
const CONTROLLER_NAME: &str = "controller";
const HOSTNAME_TOPOLOGY: &str = "kubernetes.io/hostname";
/// Kubernetes object names are DNS labels
const MAX_NAME_LEN: usize = 63;

/// Parameters of the load-balanced Deployment topology
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentOptions {
    /// Defaults to 1
    #[serde(default)]
    pub replicas: Option<u32>,

    /// Fixed address requested from the load balancer
    #[serde(default)]
    pub load_balancer_ip: Option<String>,

    #[serde(default)]
    pub service_annotations: IndexMap<String, String>,
}

/// How the controller pods are run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DeploymentMode {
    /// Replica set behind a `LoadBalancer` service
    Deployment(DeploymentOptions),
    /// One pod per node bound to the host ports, no service
    DaemonSet,
}

impl Default for DeploymentMode {
    fn default() -> Self {
        DeploymentMode::Deployment(DeploymentOptions::default())
    }
}

/// Backend of an L4 passthrough port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct L4Backend {
    pub namespace: String,
    pub service_name: String,
    pub service_port: u16,
}

impl L4Backend {
    /// `namespace/service:port`, the form the chart's tcp/udp maps expect
    pub fn locator(&self) -> String {
        format!("{}/{}:{}", self.namespace, self.service_name, self.service_port)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NginxIngressArgs {
    #[serde(default)]
    pub mode: Option<DeploymentMode>,

    /// Entries of the controller ConfigMap
    #[serde(default)]
    pub config: BTreeMap<String, String>,

    #[serde(default)]
    pub tcp: BTreeMap<u16, L4Backend>,

    #[serde(default)]
    pub udp: BTreeMap<u16, L4Backend>,

    /// MaxMind license key for the GeoIP2 databases
    #[serde(default)]
    pub geoip_license_key: Option<String>,
}

/// Reference to the controller's Service
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceRef {
    pub namespace: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NginxIngressOutputs {
    pub metadata: ChartRef,
    pub ingress_class: String,
    pub service: ServiceRef,
}

#[derive(Debug, Clone)]
pub struct NginxIngress {
    instance: Instance,
    args: NginxIngressArgs,
}

impl NginxIngress {
    pub fn default_chart() -> ChartRef {
        ChartRef::new(CHART, VERSION, REPOSITORY)
    }

    pub fn new(name: impl Into<String>, common: &CommonArgs, args: NginxIngressArgs) -> Self {
        Self {
            instance: Instance::new(name, common, Self::default_chart()),
            args,
        }
    }

    /// Mode in effect; an unspecified mode is a single-replica Deployment
    pub fn mode(&self) -> DeploymentMode {
        self.args.mode.clone().unwrap_or_default()
    }

    /// Name of the controller Service the chart creates
    pub fn service_name(&self) -> String {
        let fullname = chart_fullname(&self.instance.name, &self.instance.chart.chart);
        truncate_name(&format!("{}-{}", fullname, CONTROLLER_NAME))
    }
}

/// Helm's conventional `<chart>.fullname`
fn chart_fullname(release: &str, chart: &str) -> String {
    if release.contains(chart) {
        truncate_name(release)
    } else {
        truncate_name(&format!("{}-{}", release, chart))
    }
}

fn truncate_name(name: &str) -> String {
    let truncated: String = name.chars().take(MAX_NAME_LEN).collect();
    truncated.trim_end_matches('-').to_string()
}

/// Soft preference to spread controller pods across nodes
fn anti_affinity() -> JsonValue {
    json!({
        "podAntiAffinity": {
            "preferredDuringSchedulingIgnoredDuringExecution": [{
                "weight": 100,
                "podAffinityTerm": {
                    "labelSelector": {
                        "matchExpressions": [
                            { "key": "app", "operator": "In", "values": ["nginx-ingress"] },
                            { "key": "component", "operator": "In", "values": ["controller"] },
                        ]
                    },
                    "topologyKey": HOSTNAME_TOPOLOGY,
                }
            }]
        }
    })
}

/// Controller keys for the selected topology
pub fn mode_values(mode: &DeploymentMode) -> Map<String, JsonValue> {
    let mut controller = Map::new();

    match mode {
        DeploymentMode::Deployment(options) => {
            let replicas = options.replicas.unwrap_or(DEFAULT_REPLICAS);

            let mut service = Map::new();
            service.insert("enabled".to_string(), json!(true));
            service.insert("type".to_string(), json!("LoadBalancer"));
            // Local keeps the client source address
            service.insert("externalTrafficPolicy".to_string(), json!("Local"));
            if let Some(ip) = &options.load_balancer_ip {
                service.insert("loadBalancerIP".to_string(), json!(ip));
            }
            if !options.service_annotations.is_empty() {
                service.insert("annotations".to_string(), json!(options.service_annotations));
            }

            controller.insert("kind".to_string(), json!("Deployment"));
            controller.insert("replicaCount".to_string(), json!(replicas));
            controller.insert("service".to_string(), JsonValue::Object(service));

            // An empty affinity block would still replace the chart default
            if replicas > 1 {
                controller.insert("affinity".to_string(), anti_affinity());
            }
        }
        DeploymentMode::DaemonSet => {
            controller.insert("kind".to_string(), json!("DaemonSet"));
            controller.insert("service".to_string(), json!({ "enabled": false }));
            controller.insert("daemonset".to_string(), json!({ "useHostPort": true }));
            // Without a load balancer each node reports its own address
            controller.insert("reportNodeInternalIp".to_string(), json!(true));
        }
    }

    controller
}

/// Port to `namespace/service:port` map, `None` when empty
pub fn l4_values(services: &BTreeMap<u16, L4Backend>) -> Option<JsonValue> {
    if services.is_empty() {
        return None;
    }

    let map: Map<String, JsonValue> = services
        .iter()
        .map(|(port, backend)| (port.to_string(), json!(backend.locator())))
        .collect();

    Some(JsonValue::Object(map))
}

impl Component for NginxIngress {
    fn kind(&self) -> ComponentKind {
        ComponentKind::NginxIngress
    }

    fn instance(&self) -> &Instance {
        &self.instance
    }

    fn instance_mut(&mut self) -> &mut Instance {
        &mut self.instance
    }

    fn values(&self) -> Values {
        let mode = self.mode();
        debug!(release = %self.instance.name, ?mode, "selecting controller topology");

        let mut controller = mode_values(&mode);
        controller.insert("ingressClass".to_string(), json!(INGRESS_CLASS));
        if !self.args.config.is_empty() {
            controller.insert("config".to_string(), json!(self.args.config));
        }
        if let Some(key) = &self.args.geoip_license_key {
            controller.insert("maxmindLicenseKey".to_string(), json!(key));
        }

        let mut values = Values::new();
        values.insert("controller", JsonValue::Object(controller));

        if let Some(tcp) = l4_values(&self.args.tcp) {
            values.insert("tcp", tcp);
        }
        if let Some(udp) = l4_values(&self.args.udp) {
            values.insert("udp", udp);
        }

        values
    }

    fn outputs(&self) -> ComponentOutputs {
        ComponentOutputs::NginxIngress(NginxIngressOutputs {
            metadata: self.instance.chart.clone(),
            ingress_class: INGRESS_CLASS.to_string(),
            service: ServiceRef {
                namespace: self.instance.namespace.clone(),
                name: self.service_name(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nginx(args: NginxIngressArgs) -> NginxIngress {
        NginxIngress::new("ingress", &CommonArgs::default(), args)
    }

    fn deployment(replicas: Option<u32>) -> NginxIngressArgs {
        NginxIngressArgs {
            mode: Some(DeploymentMode::Deployment(DeploymentOptions {
                replicas,
                ..Default::default()
            })),
            ..Default::default()
        }
    }

    // =========================================================================
    // Mode selection
    // =========================================================================

    #[test]
    fn test_unspecified_mode_is_single_replica_deployment() {
        let values = nginx(NginxIngressArgs::default()).values();

        assert_eq!(*values.get("controller.kind").unwrap(), "Deployment");
        assert_eq!(values.get("controller.replicaCount").unwrap(), 1);
        assert_eq!(*values.get("controller.service.type").unwrap(), "LoadBalancer");
        assert_eq!(*values.get("controller.service.externalTrafficPolicy").unwrap(), "Local");
        assert!(values.get("controller.service.loadBalancerIP").is_none());
        assert!(values.get("controller.affinity").is_none());
    }

    #[test]
    fn test_no_affinity_at_or_below_one_replica() {
        for replicas in [None, Some(0), Some(1)] {
            let values = nginx(deployment(replicas)).values();
            assert!(
                values.get("controller.affinity").is_none(),
                "replicas = {:?}",
                replicas
            );
        }
    }

    #[test]
    fn test_anti_affinity_above_one_replica() {
        for replicas in [2, 3, 10] {
            let values = nginx(deployment(Some(replicas))).values();

            assert_eq!(values.get("controller.replicaCount").unwrap(), replicas);
            let term = values
                .get("controller.affinity.podAntiAffinity.preferredDuringSchedulingIgnoredDuringExecution")
                .unwrap()[0]
                .clone();
            assert_eq!(term["podAffinityTerm"]["topologyKey"], HOSTNAME_TOPOLOGY);

            let expressions = &term["podAffinityTerm"]["labelSelector"]["matchExpressions"];
            assert_eq!(expressions[0]["key"], "app");
            assert_eq!(expressions[0]["values"], json!(["nginx-ingress"]));
            assert_eq!(expressions[1]["key"], "component");
            assert_eq!(expressions[1]["values"], json!(["controller"]));
        }
    }

    #[test]
    fn test_deployment_parameters() {
        let mut annotations = IndexMap::new();
        annotations.insert(
            "metallb.universe.tf/address-pool".to_string(),
            "public".to_string(),
        );

        let values = nginx(NginxIngressArgs {
            mode: Some(DeploymentMode::Deployment(DeploymentOptions {
                replicas: None,
                load_balancer_ip: Some("203.0.113.10".to_string()),
                service_annotations: annotations,
            })),
            ..Default::default()
        })
        .values();

        assert_eq!(values.get("controller.replicaCount").unwrap(), 1);
        assert_eq!(*values.get("controller.service.loadBalancerIP").unwrap(), "203.0.113.10");
        assert_eq!(
            values.get("controller.service.annotations").unwrap(),
            &json!({ "metallb.universe.tf/address-pool": "public" })
        );
    }

    #[test]
    fn test_daemonset_mode() {
        let values = nginx(NginxIngressArgs {
            mode: Some(DeploymentMode::DaemonSet),
            ..Default::default()
        })
        .values();

        assert_eq!(*values.get("controller.kind").unwrap(), "DaemonSet");
        assert_eq!(values.get("controller.service").unwrap(), &json!({ "enabled": false }));
        assert_eq!(values.get("controller.daemonset.useHostPort").unwrap(), true);
        assert_eq!(values.get("controller.reportNodeInternalIp").unwrap(), true);
        assert!(values.get("controller.replicaCount").is_none());
        assert!(values.get("controller.affinity").is_none());
    }

    #[test]
    fn test_mode_parsing() {
        let args: NginxIngressArgs = serde_yaml::from_str(
            "mode:\n  type: deployment\n  replicas: 3\n  loadBalancerIp: 10.0.0.5\n",
        )
        .unwrap();
        assert_eq!(
            args.mode,
            Some(DeploymentMode::Deployment(DeploymentOptions {
                replicas: Some(3),
                load_balancer_ip: Some("10.0.0.5".to_string()),
                service_annotations: IndexMap::new(),
            }))
        );

        let args: NginxIngressArgs = serde_yaml::from_str("mode:\n  type: daemonSet\n").unwrap();
        assert_eq!(args.mode, Some(DeploymentMode::DaemonSet));
    }

    #[test]
    fn test_daemonset_ignores_replica_fields() {
        let args: NginxIngressArgs = serde_yaml::from_str(
            r#"
mode:
  type: daemonSet
  replicas: 5
  loadBalancerIp: 10.0.0.5
  serviceAnnotations:
    metallb.universe.tf/address-pool: public
"#,
        )
        .unwrap();
        assert_eq!(args.mode, Some(DeploymentMode::DaemonSet));

        let values = nginx(args).values();
        assert_eq!(*values.get("controller.kind").unwrap(), "DaemonSet");
        assert_eq!(values.get("controller.service").unwrap(), &json!({ "enabled": false }));
        assert_eq!(values.get("controller.daemonset.useHostPort").unwrap(), true);
        assert!(values.get("controller.replicaCount").is_none());
        assert!(values.get("controller.affinity").is_none());
    }

    // =========================================================================
    // L4 passthrough and extras
    // =========================================================================

    #[test]
    fn test_tcp_locator() {
        let mut tcp = BTreeMap::new();
        tcp.insert(
            5432,
            L4Backend {
                namespace: "db".to_string(),
                service_name: "postgres".to_string(),
                service_port: 5432,
            },
        );

        let values = nginx(NginxIngressArgs {
            tcp,
            ..Default::default()
        })
        .values();

        assert_eq!(values.get("tcp").unwrap(), &json!({ "5432": "db/postgres:5432" }));
        assert!(values.get("udp").is_none());
    }

    #[test]
    fn test_udp_ports_parsed_from_yaml() {
        let args: NginxIngressArgs = serde_yaml::from_str(
            r#"
udp:
  53:
    namespace: kube-system
    serviceName: kube-dns
    servicePort: 53
"#,
        )
        .unwrap();

        let values = nginx(args).values();
        assert_eq!(values.get("udp").unwrap(), &json!({ "53": "kube-system/kube-dns:53" }));
    }

    #[test]
    fn test_config_and_geoip() {
        let mut config = BTreeMap::new();
        config.insert("use-forwarded-headers".to_string(), "true".to_string());

        let values = nginx(NginxIngressArgs {
            config,
            geoip_license_key: Some("maxmind-key".to_string()),
            ..Default::default()
        })
        .values();

        assert_eq!(*values.get("controller.config.use-forwarded-headers").unwrap(), "true");
        assert_eq!(*values.get("controller.maxmindLicenseKey").unwrap(), "maxmind-key");
        assert_eq!(*values.get("controller.ingressClass").unwrap(), INGRESS_CLASS);
    }

    #[test]
    fn test_empty_extras_are_omitted() {
        let values = nginx(NginxIngressArgs::default()).values();

        assert!(values.get("controller.config").is_none());
        assert!(values.get("controller.maxmindLicenseKey").is_none());
        assert!(values.get("tcp").is_none());
    }

    // =========================================================================
    // Outputs
    // =========================================================================

    #[test]
    fn test_service_name_follows_chart_fullname() {
        assert_eq!(nginx(NginxIngressArgs::default()).service_name(), "ingress-nginx-ingress-controller");

        let named = NginxIngress::new("nginx-ingress", &CommonArgs::default(), NginxIngressArgs::default());
        assert_eq!(named.service_name(), "nginx-ingress-controller");

        let long = NginxIngress::new("a".repeat(70), &CommonArgs::default(), NginxIngressArgs::default());
        assert_eq!(long.service_name().len(), MAX_NAME_LEN);
    }

    #[test]
    fn test_outputs() {
        let component = NginxIngress::new(
            "edge",
            &CommonArgs {
                namespace: Some("ingress".to_string()),
                ..Default::default()
            },
            NginxIngressArgs::default(),
        );

        let ComponentOutputs::NginxIngress(outputs) = component.outputs() else {
            panic!("expected nginx outputs");
        };
        assert_eq!(outputs.ingress_class, "nginx");
        assert_eq!(
            outputs.service,
            ServiceRef {
                namespace: "ingress".to_string(),
                name: "edge-nginx-ingress-controller".to_string(),
            }
        );
        assert_eq!(outputs.metadata.chart, CHART);
    }
}
