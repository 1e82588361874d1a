//! chartkit Components - Helm chart wrappers with typed inputs
//!
//! Each component turns typed inputs into a chart values tree and hands the
//! result to a [`ChartInstaller`]:
//! - **MetalLB**: layer 2 address pools
//! - **Grafana**: dashboards, datasources, ingress, persistence and a generated admin password
//! - **Nginx Ingress**: Deployment or DaemonSet topology plus L4 passthrough services
//!
//! A [`StackConfig`] file lists component instances; [`IndexClient`] resolves
//! chart version constraints against repository indexes.

pub mod component;
pub mod error;
pub mod grafana;
pub mod installer;
pub mod metallb;
pub mod nginx_ingress;
pub mod resolve;
pub mod stack;

pub use component::{ClusterTarget, CommonArgs, Component, ComponentKind, ComponentOutputs, Instance};
pub use error::{ComponentError, Result};
pub use grafana::{Grafana, GrafanaArgs};
pub use installer::{
    ChartInstaller, HelmInstaller, InstallOptions, InstalledRelease, MockInstaller, ReleaseRequest,
};
pub use metallb::{MetalLb, MetalLbArgs};
pub use nginx_ingress::{DeploymentMode, NginxIngress, NginxIngressArgs};
pub use resolve::IndexClient;
pub use stack::{ComponentArgs, ComponentSpec, StackConfig, StackDefaults};
