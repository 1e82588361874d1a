//! Stack files: the set of component instances to build
//!
//! ```yaml
//! defaults:
//!   namespace: platform
//!   cluster:
//!     context: prod
//! components:
//!   - kind: metallb
//!     name: metallb
//!     namespace: metallb-system
//!     addressPools:
//!       - name: default
//!         addresses: [192.168.1.240-192.168.1.250]
//!   - kind: nginx-ingress
//!     name: edge
//!     mode:
//!       type: daemonSet
//! ```

use chartkit_core::{SecretGenerator, Values};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

use crate::component::{ClusterTarget, CommonArgs, Component, ComponentKind};
use crate::error::{ComponentError, Result};
use crate::grafana::{Grafana, GrafanaArgs};
use crate::metallb::{MetalLb, MetalLbArgs};
use crate::nginx_ingress::{NginxIngress, NginxIngressArgs};

/// Settings inherited by components that do not set their own
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackDefaults {
    #[serde(default)]
    pub namespace: Option<String>,

    #[serde(default)]
    pub cluster: Option<ClusterTarget>,
}

/// Kind-specific inputs of a component entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ComponentArgs {
    Metallb(MetalLbArgs),
    Grafana(GrafanaArgs),
    NginxIngress(NginxIngressArgs),
}

/// One component instance in a stack file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSpec {
    /// Release name, unique within the stack
    pub name: String,

    #[serde(flatten)]
    pub common: CommonArgs,

    /// Raw values merged over the derived tree
    #[serde(default)]
    pub values: Option<Values>,

    #[serde(flatten)]
    pub args: ComponentArgs,
}

impl ComponentSpec {
    pub fn kind(&self) -> ComponentKind {
        match &self.args {
            ComponentArgs::Metallb(_) => ComponentKind::Metallb,
            ComponentArgs::Grafana(_) => ComponentKind::Grafana,
            ComponentArgs::NginxIngress(_) => ComponentKind::NginxIngress,
        }
    }

    /// Common args with stack defaults filled in
    fn effective_common(&self, defaults: &StackDefaults) -> CommonArgs {
        CommonArgs {
            namespace: self.common.namespace.clone().or_else(|| defaults.namespace.clone()),
            version: self.common.version.clone(),
            cluster: self.common.cluster.clone().or_else(|| defaults.cluster.clone()),
        }
    }

    /// Build the component; Grafana draws its admin password from `secrets`
    pub fn build(
        &self,
        defaults: &StackDefaults,
        secrets: &mut SecretGenerator,
    ) -> Box<dyn Component> {
        let common = self.effective_common(defaults);

        let mut component: Box<dyn Component> = match &self.args {
            ComponentArgs::Metallb(args) => Box::new(MetalLb::new(&self.name, &common, args.clone())),
            ComponentArgs::Grafana(args) => {
                Box::new(Grafana::new(&self.name, &common, args.clone(), secrets))
            }
            ComponentArgs::NginxIngress(args) => {
                Box::new(NginxIngress::new(&self.name, &common, args.clone()))
            }
        };
        component.instance_mut().overrides = self.values.clone();

        debug!(
            name = %self.name,
            kind = %self.kind(),
            namespace = %component.namespace(),
            chart = %component.chart(),
            "built component"
        );
        component
    }
}

/// A parsed stack file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackConfig {
    #[serde(default)]
    pub defaults: StackDefaults,

    #[serde(default)]
    pub components: Vec<ComponentSpec>,
}

impl StackConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse and validate a stack document
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let stack: StackConfig = serde_yaml::from_str(yaml)?;
        stack.validate()?;
        Ok(stack)
    }

    /// Component names must be unique and non-empty
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for spec in &self.components {
            if spec.name.is_empty() {
                return Err(ComponentError::InvalidConfig {
                    message: format!("a {} component has an empty name", spec.kind()),
                });
            }
            if !seen.insert(spec.name.as_str()) {
                return Err(ComponentError::InvalidConfig {
                    message: format!("component name '{}' is used more than once", spec.name),
                });
            }
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ComponentSpec> {
        self.components.iter().find(|c| c.name == name)
    }

    /// All components, or only the named one
    pub fn select(&self, name: Option<&str>) -> Result<Vec<&ComponentSpec>> {
        match name {
            None => Ok(self.components.iter().collect()),
            Some(name) => self
                .get(name)
                .map(|spec| vec![spec])
                .ok_or_else(|| ComponentError::UnknownComponent {
                    name: name.to_string(),
                }),
        }
    }

    /// Build the selected components in file order
    pub fn build(
        &self,
        name: Option<&str>,
        secrets: &mut SecretGenerator,
    ) -> Result<Vec<Box<dyn Component>>> {
        Ok(self
            .select(name)?
            .into_iter()
            .map(|spec| spec.build(&self.defaults, secrets))
            .collect())
    }
}
