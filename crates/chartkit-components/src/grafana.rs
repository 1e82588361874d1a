//! Grafana with provisioned dashboards and datasources

use chartkit_core::{ChartRef, SecretGenerator, Values};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue, json};
use tracing::debug;

use crate::component::{CommonArgs, Component, ComponentKind, ComponentOutputs, Instance};

pub const CHART: &str = "grafana";
pub const VERSION: &str = "6.17.5";
pub const REPOSITORY: &str = "https://grafana.github.io/helm-charts";

pub const ADMIN_USER: &str = "admin";
pub const PASSWORD_LENGTH: usize = 32;

pub const INGRESS_CLASS_ANNOTATION: &str = "kubernetes.io/ingress.class";
pub const TLS_ACME_ANNOTATION: &str = "kubernetes.io/tls-acme";
const DEFAULT_INGRESS_CLASS: &str = "nginx";
const DEFAULT_PERSISTENCE_GB: u32 = 10;

const DASHBOARD_PROVIDER: &str = "default";
const DASHBOARD_PATH: &str = "/var/lib/grafana/dashboards/default";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngressSpec {
    /// Defaults to true
    #[serde(default)]
    pub enabled: Option<bool>,

    /// Ingress class, defaults to `nginx`
    #[serde(default)]
    pub class: Option<String>,

    /// Request a certificate via tls-acme, defaults to true
    #[serde(default)]
    pub tls: Option<bool>,

    #[serde(default)]
    pub hosts: Vec<String>,

    /// Applied after the computed annotations, so caller keys win
    #[serde(default)]
    pub annotations: IndexMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistenceSpec {
    /// Defaults to true
    #[serde(default)]
    pub enabled: Option<bool>,

    /// Volume size in GiB, defaults to 10
    #[serde(default)]
    pub size_gb: Option<u32>,

    #[serde(default)]
    pub storage_class: Option<String>,
}

/// Where a dashboard's definition comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DashboardSource {
    Json {
        json: String,
    },
    File {
        file: String,
    },
    Gallery {
        #[serde(rename = "gnetId")]
        gnet_id: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        revision: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        datasource: Option<String>,
    },
    Url {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        b64content: Option<bool>,
    },
}

impl DashboardSource {
    fn to_values(&self) -> JsonValue {
        match self {
            DashboardSource::Json { json } => json!({ "json": json }),
            DashboardSource::File { file } => json!({ "file": file }),
            DashboardSource::Gallery {
                gnet_id,
                revision,
                datasource,
            } => {
                let mut entry = Map::new();
                entry.insert("gnetId".to_string(), json!(gnet_id));
                if let Some(revision) = revision {
                    entry.insert("revision".to_string(), json!(revision));
                }
                if let Some(datasource) = datasource {
                    entry.insert("datasource".to_string(), json!(datasource));
                }
                JsonValue::Object(entry)
            }
            DashboardSource::Url { url, b64content } => {
                let mut entry = Map::new();
                entry.insert("url".to_string(), json!(url));
                if let Some(b64) = b64content {
                    entry.insert("b64content".to_string(), json!(b64));
                }
                JsonValue::Object(entry)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    /// Unique key in the provider's dashboard map
    pub name: String,

    #[serde(flatten)]
    pub source: DashboardSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSourceType {
    Prometheus,
    Loki,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSource {
    pub name: String,

    #[serde(rename = "type")]
    pub kind: DataSourceType,

    pub url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrafanaArgs {
    #[serde(default)]
    pub dashboards: Vec<Dashboard>,

    #[serde(default)]
    pub datasources: Vec<DataSource>,

    #[serde(default)]
    pub ingress: Option<IngressSpec>,

    #[serde(default)]
    pub persistence: Option<PersistenceSpec>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrafanaOutputs {
    pub metadata: ChartRef,
    pub admin_username: String,
    pub admin_password: String,
    pub ingress: Option<IngressSpec>,
    pub persistence: Option<PersistenceSpec>,
}

#[derive(Debug, Clone)]
pub struct Grafana {
    instance: Instance,
    args: GrafanaArgs,
    admin_password: String,
}

impl Grafana {
    pub fn default_chart() -> ChartRef {
        ChartRef::new(CHART, VERSION, REPOSITORY)
    }

    /// State key of the admin password for an instance
    pub fn password_key(namespace: &str, name: &str) -> String {
        format!("{}/{}/admin-password", namespace, name)
    }

    /// Build the component, taking the admin password from `secrets`
    ///
    /// The password is generated on first use of this instance identity and
    /// read back from the secret state afterwards.
    pub fn new(
        name: impl Into<String>,
        common: &CommonArgs,
        args: GrafanaArgs,
        secrets: &mut SecretGenerator,
    ) -> Self {
        let instance = Instance::new(name, common, Self::default_chart());
        let key = Self::password_key(&instance.namespace, &instance.name);
        let admin_password = secrets.get_or_generate(&key, PASSWORD_LENGTH);

        Self {
            instance,
            args,
            admin_password,
        }
    }

    pub fn admin_password(&self) -> &str {
        &self.admin_password
    }

    fn tls_secret_name(&self) -> String {
        format!("{}-tls", self.instance.name)
    }
}

/// Ingress block; `{enabled: false}` without a spec
pub fn ingress_values(spec: Option<&IngressSpec>, tls_secret_name: &str) -> JsonValue {
    let Some(spec) = spec else {
        return json!({ "enabled": false });
    };

    let tls_enabled = spec.tls.unwrap_or(true);

    let mut annotations = Map::new();
    annotations.insert(
        INGRESS_CLASS_ANNOTATION.to_string(),
        json!(spec.class.as_deref().unwrap_or(DEFAULT_INGRESS_CLASS)),
    );
    annotations.insert(TLS_ACME_ANNOTATION.to_string(), json!(tls_enabled.to_string()));
    for (key, value) in &spec.annotations {
        annotations.insert(key.clone(), json!(value));
    }

    let mut ingress = Map::new();
    ingress.insert("enabled".to_string(), json!(spec.enabled.unwrap_or(true)));
    ingress.insert("annotations".to_string(), JsonValue::Object(annotations));
    ingress.insert("hosts".to_string(), json!(spec.hosts));

    if tls_enabled && !spec.hosts.is_empty() {
        ingress.insert(
            "tls".to_string(),
            json!([{ "secretName": tls_secret_name, "hosts": spec.hosts }]),
        );
    }

    JsonValue::Object(ingress)
}

/// Persistence block; `{enabled: false}` without a spec
pub fn persistence_values(spec: Option<&PersistenceSpec>) -> JsonValue {
    let Some(spec) = spec else {
        return json!({ "enabled": false });
    };

    let mut persistence = Map::new();
    persistence.insert("enabled".to_string(), json!(spec.enabled.unwrap_or(true)));
    persistence.insert(
        "size".to_string(),
        json!(format!("{}Gi", spec.size_gb.unwrap_or(DEFAULT_PERSISTENCE_GB))),
    );
    if let Some(class) = &spec.storage_class {
        persistence.insert("storageClassName".to_string(), json!(class));
    }

    JsonValue::Object(persistence)
}

/// `grafana.ini` server block from the first ingress host, if there is one
pub fn server_values(spec: Option<&IngressSpec>) -> Option<JsonValue> {
    let spec = spec?;
    let host = spec.hosts.first()?;
    let scheme = if spec.tls.unwrap_or(true) { "https" } else { "http" };

    Some(json!({
        "server": {
            "domain": host,
            "root_url": format!("{}://{}", scheme, host),
        }
    }))
}

/// `(dashboards, dashboardProviders)` blocks, both absent without dashboards
pub fn dashboard_values(dashboards: &[Dashboard]) -> Option<(JsonValue, JsonValue)> {
    if dashboards.is_empty() {
        return None;
    }

    let mut by_name = Map::new();
    for dashboard in dashboards {
        by_name.insert(dashboard.name.clone(), dashboard.source.to_values());
    }

    let dashboards = json!({ DASHBOARD_PROVIDER: by_name });
    let providers = json!({
        "dashboardproviders.yaml": {
            "apiVersion": 1,
            "providers": [{
                "name": DASHBOARD_PROVIDER,
                "orgId": 1,
                "folder": "",
                "type": "file",
                "disableDeletion": false,
                "editable": true,
                "options": { "path": DASHBOARD_PATH },
            }],
        }
    });

    Some((dashboards, providers))
}

/// Versioned datasources document; an empty list without datasources
pub fn datasource_values(datasources: &[DataSource]) -> JsonValue {
    let entries: Vec<JsonValue> = datasources
        .iter()
        .map(|ds| {
            json!({
                "name": ds.name,
                "type": ds.kind,
                "url": ds.url,
                "access": "proxy",
                "editable": false,
                "basicAuth": false,
            })
        })
        .collect();

    json!({
        "datasources.yaml": {
            "apiVersion": 1,
            "datasources": entries,
        }
    })
}

impl Component for Grafana {
    fn kind(&self) -> ComponentKind {
        ComponentKind::Grafana
    }

    fn instance(&self) -> &Instance {
        &self.instance
    }

    fn instance_mut(&mut self) -> &mut Instance {
        &mut self.instance
    }

    fn values(&self) -> Values {
        let ingress = self.args.ingress.as_ref();
        let mut values = Values::new();

        values.insert("adminUser", json!(ADMIN_USER));
        values.insert("adminPassword", json!(self.admin_password));
        values.insert("ingress", ingress_values(ingress, &self.tls_secret_name()));
        values.insert(
            "persistence",
            persistence_values(self.args.persistence.as_ref()),
        );

        if let Some(server) = server_values(ingress) {
            values.insert("grafana.ini", server);
        }

        if let Some((dashboards, providers)) = dashboard_values(&self.args.dashboards) {
            debug!(
                release = %self.instance.name,
                dashboards = self.args.dashboards.len(),
                "provisioning dashboards"
            );
            values.insert("dashboards", dashboards);
            values.insert("dashboardProviders", providers);
        }

        values.insert("datasources", datasource_values(&self.args.datasources));

        values
    }

    fn outputs(&self) -> ComponentOutputs {
        ComponentOutputs::Grafana(GrafanaOutputs {
            metadata: self.instance.chart.clone(),
            admin_username: ADMIN_USER.to_string(),
            admin_password: self.admin_password.clone(),
            ingress: self.args.ingress.clone(),
            persistence: self.args.persistence.clone(),
        })
    }
}
