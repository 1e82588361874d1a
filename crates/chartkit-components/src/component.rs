//! The component abstraction shared by every chart wrapper

use chartkit_core::{ChartRef, Values};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::grafana::GrafanaOutputs;
use crate::installer::{InstallOptions, ReleaseRequest};
use crate::metallb::MetalLbOutputs;
use crate::nginx_ingress::NginxIngressOutputs;

/// Namespace used when neither the component nor the stack names one
pub const DEFAULT_NAMESPACE: &str = "default";

/// Connection handle for the target cluster
///
/// Both fields are passed through to Helm; unset means Helm's own defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterTarget {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubeconfig: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

/// Inputs every component accepts
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommonArgs {
    #[serde(default)]
    pub namespace: Option<String>,

    /// Exact chart version or semver constraint
    #[serde(default)]
    pub version: Option<String>,

    #[serde(default)]
    pub cluster: Option<ClusterTarget>,
}

/// Identity and chart binding of one component instance
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    /// Release name
    pub name: String,
    pub namespace: String,
    pub chart: ChartRef,
    pub cluster: ClusterTarget,
    /// Raw values deep-merged over the derived tree
    pub overrides: Option<Values>,
}

impl Instance {
    pub fn new(name: impl Into<String>, common: &CommonArgs, default_chart: ChartRef) -> Self {
        Self {
            name: name.into(),
            namespace: common
                .namespace
                .clone()
                .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
            chart: default_chart.with_version_override(common.version.as_deref()),
            cluster: common.cluster.clone().unwrap_or_default(),
            overrides: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComponentKind {
    Metallb,
    Grafana,
    NginxIngress,
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ComponentKind::Metallb => "metallb",
            ComponentKind::Grafana => "grafana",
            ComponentKind::NginxIngress => "nginx-ingress",
        };
        f.write_str(s)
    }
}

/// Values a component exposes to its callers after a build
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ComponentOutputs {
    Metallb(MetalLbOutputs),
    Grafana(GrafanaOutputs),
    NginxIngress(NginxIngressOutputs),
}

impl ComponentOutputs {
    /// Chart metadata record, identical in shape for every component
    pub fn metadata(&self) -> &ChartRef {
        match self {
            ComponentOutputs::Metallb(o) => &o.metadata,
            ComponentOutputs::Grafana(o) => &o.metadata,
            ComponentOutputs::NginxIngress(o) => &o.metadata,
        }
    }
}

/// A chart wrapper: typed inputs in, values tree out
pub trait Component: Send + Sync {
    fn kind(&self) -> ComponentKind;

    fn instance(&self) -> &Instance;

    fn instance_mut(&mut self) -> &mut Instance;

    /// Values derived from the typed inputs alone
    fn values(&self) -> Values;

    fn outputs(&self) -> ComponentOutputs;

    fn name(&self) -> &str {
        &self.instance().name
    }

    fn namespace(&self) -> &str {
        &self.instance().namespace
    }

    fn chart(&self) -> &ChartRef {
        &self.instance().chart
    }

    /// Derived values with raw overrides merged on top
    fn chart_values(&self) -> Values {
        let mut values = self.values();
        if let Some(overrides) = &self.instance().overrides {
            values.merge(overrides);
        }
        values
    }

    fn release_request(&self, options: &InstallOptions) -> ReleaseRequest {
        let instance = self.instance();
        ReleaseRequest {
            name: instance.name.clone(),
            namespace: instance.namespace.clone(),
            chart: instance.chart.clone(),
            values: self.chart_values(),
            cluster: instance.cluster.clone(),
            options: options.clone(),
        }
    }
}
