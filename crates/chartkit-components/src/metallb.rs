//! MetalLB address pools

use chartkit_core::{ChartRef, Values};
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};
use tracing::debug;

use crate::component::{CommonArgs, Component, ComponentKind, ComponentOutputs, Instance};

pub const CHART: &str = "metallb";
pub const VERSION: &str = "0.12.1";
pub const REPOSITORY: &str = "https://metallb.github.io/metallb";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Layer2,
}

/// A named pool of addresses the speaker may hand out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressPool {
    pub name: String,

    #[serde(default)]
    pub protocol: Protocol,

    /// Ranges or CIDRs, e.g. `192.168.1.240-192.168.1.250`
    pub addresses: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetalLbArgs {
    #[serde(default)]
    pub address_pools: Option<Vec<AddressPool>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetalLbOutputs {
    pub metadata: ChartRef,
}

#[derive(Debug, Clone)]
pub struct MetalLb {
    instance: Instance,
    args: MetalLbArgs,
}

impl MetalLb {
    pub fn default_chart() -> ChartRef {
        ChartRef::new(CHART, VERSION, REPOSITORY)
    }

    pub fn new(name: impl Into<String>, common: &CommonArgs, args: MetalLbArgs) -> Self {
        Self {
            instance: Instance::new(name, common, Self::default_chart()),
            args,
        }
    }
}

/// Pool entries as the chart expects them, `None` when there is nothing to configure
///
/// `avoid-buggy-ips` is always on; `.0` and `.255` addresses are never handed out.
pub fn address_pool_values(pools: &[AddressPool]) -> Option<JsonValue> {
    if pools.is_empty() {
        return None;
    }

    let entries: Vec<JsonValue> = pools
        .iter()
        .map(|pool| {
            json!({
                "name": pool.name,
                "protocol": pool.protocol,
                "addresses": pool.addresses,
                "avoid-buggy-ips": true,
            })
        })
        .collect();

    Some(JsonValue::Array(entries))
}

impl Component for MetalLb {
    fn kind(&self) -> ComponentKind {
        ComponentKind::Metallb
    }

    fn instance(&self) -> &Instance {
        &self.instance
    }

    fn instance_mut(&mut self) -> &mut Instance {
        &mut self.instance
    }

    fn values(&self) -> Values {
        let mut values = Values::new();
        let pools = self.args.address_pools.as_deref().unwrap_or_default();

        if let Some(entries) = address_pool_values(pools) {
            debug!(release = %self.instance.name, pools = pools.len(), "configuring address pools");
            values.insert("configInline", json!({ "address-pools": entries }));
        }

        values
    }

    fn outputs(&self) -> ComponentOutputs {
        ComponentOutputs::Metallb(MetalLbOutputs {
            metadata: self.instance.chart.clone(),
        })
    }
}
