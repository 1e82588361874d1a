//! Mock installer for testing
//!
//! Records every request in memory, useful for unit tests
//! without requiring Helm or a Kubernetes cluster.

use async_trait::async_trait;
use std::sync::{Arc, PoisonError, RwLock};

use super::{ChartInstaller, InstalledRelease, ReleaseRequest};
use crate::component::ClusterTarget;
use crate::error::{ComponentError, Result};

/// In-memory installer for testing
#[derive(Clone, Default)]
pub struct MockInstaller {
    requests: Arc<RwLock<Vec<ReleaseRequest>>>,
    uninstalled: Arc<RwLock<Vec<(String, String)>>>,
    /// Release names whose install should fail
    failing: Arc<RwLock<Vec<String>>>,
}

impl MockInstaller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make installs of `release` fail with a Helm error
    pub fn fail_release(&self, release: impl Into<String>) {
        self.failing
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(release.into());
    }

    /// All install requests received, in order
    pub fn requests(&self) -> Vec<ReleaseRequest> {
        self.requests
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// `(namespace, name)` of every uninstall, in order
    pub fn uninstalled(&self) -> Vec<(String, String)> {
        self.uninstalled
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl ChartInstaller for MockInstaller {
    async fn install(&self, request: &ReleaseRequest) -> Result<InstalledRelease> {
        let failing = self
            .failing
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&request.name);
        if failing {
            return Err(ComponentError::Helm {
                release: request.name.clone(),
                message: "mock failure".to_string(),
            });
        }

        let mut requests = self.requests.write().unwrap_or_else(PoisonError::into_inner);
        let previous = requests
            .iter()
            .filter(|r| r.name == request.name && r.namespace == request.namespace)
            .count();
        requests.push(request.clone());

        Ok(InstalledRelease {
            name: request.name.clone(),
            namespace: request.namespace.clone(),
            chart: request.chart.clone(),
            revision: previous as u32 + 1,
            status: if request.options.dry_run {
                "pending-install".to_string()
            } else {
                "deployed".to_string()
            },
            notes: None,
        })
    }

    async fn uninstall(&self, name: &str, namespace: &str, _cluster: &ClusterTarget) -> Result<()> {
        self.uninstalled
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((namespace.to_string(), name.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::installer::InstallOptions;
    use chartkit_core::{ChartRef, Values};

    fn request(name: &str) -> ReleaseRequest {
        ReleaseRequest {
            name: name.to_string(),
            namespace: "default".to_string(),
            chart: ChartRef::new("grafana", "6.17.5", "https://grafana.github.io/helm-charts"),
            values: Values::new(),
            cluster: ClusterTarget::default(),
            options: InstallOptions::new(),
        }
    }

    #[tokio::test]
    async fn test_revisions_increment() {
        let installer = MockInstaller::new();

        let first = installer.install(&request("grafana")).await.unwrap();
        let second = installer.install(&request("grafana")).await.unwrap();
        let other = installer.install(&request("other")).await.unwrap();

        assert_eq!(first.revision, 1);
        assert_eq!(second.revision, 2);
        assert_eq!(other.revision, 1);
        assert_eq!(first.status, "deployed");
    }

    #[tokio::test]
    async fn test_failing_release() {
        let installer = MockInstaller::new();
        installer.fail_release("grafana");

        let err = installer.install(&request("grafana")).await.unwrap_err();
        assert!(matches!(err, ComponentError::Helm { .. }));
        assert!(installer.requests().is_empty());
    }
}
