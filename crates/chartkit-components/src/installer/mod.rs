//! Chart installation backends
//!
//! Components only describe a release; an installer makes it happen:
//! - **Helm**: shells out to the `helm` binary (default)
//! - **Mock**: records requests in memory (for tests)

mod helm;
mod mock;

pub use helm::HelmInstaller;
pub use mock::MockInstaller;

use async_trait::async_trait;
use chartkit_core::{ChartRef, Values};
use std::time::Duration;
use tracing::info;

use crate::component::{ClusterTarget, Component};
use crate::error::Result;

/// Options for install operation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstallOptions {
    /// Wait for resources to be ready
    pub wait: bool,

    /// Timeout for wait
    pub timeout: Option<Duration>,

    /// Create namespace if it doesn't exist
    pub create_namespace: bool,

    /// Render and validate without applying
    pub dry_run: bool,
}

impl InstallOptions {
    pub fn new() -> Self {
        Self {
            create_namespace: true,
            ..Default::default()
        }
    }

    /// Enable waiting for resources
    pub fn with_wait(mut self, timeout: Duration) -> Self {
        self.wait = true;
        self.timeout = Some(timeout);
        self
    }

    /// Enable dry-run mode
    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }
}

/// Everything an installer needs to create or upgrade one release
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseRequest {
    pub name: String,
    pub namespace: String,
    pub chart: ChartRef,
    pub values: Values,
    pub cluster: ClusterTarget,
    pub options: InstallOptions,
}

/// Result of a successful install or upgrade
#[derive(Debug, Clone, PartialEq)]
pub struct InstalledRelease {
    pub name: String,
    pub namespace: String,
    pub chart: ChartRef,
    /// Release revision, 1 on first install
    pub revision: u32,
    pub status: String,
    /// Chart NOTES.txt, if rendered
    pub notes: Option<String>,
}

/// Install primitive the components delegate to
///
/// Implementations must be Send + Sync for use across async tasks.
#[async_trait]
pub trait ChartInstaller: Send + Sync {
    /// Install the release, or upgrade it if it already exists
    async fn install(&self, request: &ReleaseRequest) -> Result<InstalledRelease>;

    async fn uninstall(&self, name: &str, namespace: &str, cluster: &ClusterTarget) -> Result<()>;
}

/// Build a component's release request and hand it to `installer`
pub async fn install_component(
    component: &dyn Component,
    installer: &dyn ChartInstaller,
    options: &InstallOptions,
) -> Result<InstalledRelease> {
    let request = component.release_request(options);
    info!(
        release = %request.name,
        namespace = %request.namespace,
        chart = %request.chart,
        kind = %component.kind(),
        dry_run = options.dry_run,
        "installing component"
    );
    installer.install(&request).await
}

/// Remove a component's release
pub async fn uninstall_component(
    component: &dyn Component,
    installer: &dyn ChartInstaller,
) -> Result<()> {
    let instance = component.instance();
    info!(release = %instance.name, namespace = %instance.namespace, "uninstalling component");
    installer
        .uninstall(&instance.name, &instance.namespace, &instance.cluster)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::CommonArgs;
    use crate::metallb::{AddressPool, MetalLb, MetalLbArgs, Protocol};

    fn metallb() -> MetalLb {
        MetalLb::new(
            "metallb",
            &CommonArgs {
                namespace: Some("metallb-system".to_string()),
                ..Default::default()
            },
            MetalLbArgs {
                address_pools: Some(vec![AddressPool {
                    name: "default".to_string(),
                    protocol: Protocol::Layer2,
                    addresses: vec!["10.0.0.100-10.0.0.120".to_string()],
                }]),
            },
        )
    }

    #[tokio::test]
    async fn test_install_component_sends_release_request() {
        let installer = MockInstaller::new();
        let component = metallb();

        let release = install_component(&component, &installer, &InstallOptions::new())
            .await
            .unwrap();

        assert_eq!(release.name, "metallb");
        assert_eq!(release.namespace, "metallb-system");
        assert_eq!(release.revision, 1);

        let requests = installer.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].values, component.values());
        assert_eq!(requests[0].chart, MetalLb::default_chart());
        assert!(requests[0].options.create_namespace);
    }

    #[tokio::test]
    async fn test_overrides_are_merged_into_request() {
        let installer = MockInstaller::new();
        let mut component = metallb();
        component.instance_mut().overrides = Some(Values(serde_json::json!({
            "speaker": { "tolerateMaster": false }
        })));

        install_component(&component, &installer, &InstallOptions::new())
            .await
            .unwrap();

        let values = &installer.requests()[0].values;
        assert_eq!(values.get("speaker.tolerateMaster").unwrap(), false);
        assert!(values.get("configInline.address-pools").is_some());
    }

    #[tokio::test]
    async fn test_uninstall_component() {
        let installer = MockInstaller::new();
        let component = metallb();

        install_component(&component, &installer, &InstallOptions::new())
            .await
            .unwrap();
        uninstall_component(&component, &installer).await.unwrap();

        assert_eq!(
            installer.uninstalled(),
            vec![("metallb-system".to_string(), "metallb".to_string())]
        );
    }

    #[test]
    fn test_install_options_builders() {
        let options = InstallOptions::new()
            .with_wait(Duration::from_secs(120))
            .dry_run();

        assert!(options.wait);
        assert!(options.dry_run);
        assert!(options.create_namespace);
        assert_eq!(options.timeout, Some(Duration::from_secs(120)));
    }
}
