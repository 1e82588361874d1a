//! Installer backed by the `helm` binary

use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use super::{ChartInstaller, InstalledRelease, ReleaseRequest};
use crate::component::ClusterTarget;
use crate::error::{ComponentError, Result};

/// Runs `helm upgrade --install` with the values document on stdin
#[derive(Debug, Clone)]
pub struct HelmInstaller {
    binary: PathBuf,
}

impl HelmInstaller {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Arguments for `helm upgrade --install`
    pub fn install_args(request: &ReleaseRequest) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "upgrade".into(),
            "--install".into(),
            request.name.clone(),
            request.chart.chart.clone(),
            "--repo".into(),
            request.chart.repository.clone(),
            "--version".into(),
            request.chart.version.clone(),
            "--namespace".into(),
            request.namespace.clone(),
            "--values".into(),
            "-".into(),
            "--output".into(),
            "json".into(),
        ];

        if request.options.create_namespace {
            args.push("--create-namespace".into());
        }
        if request.options.wait {
            args.push("--wait".into());
        }
        if let Some(timeout) = request.options.timeout {
            args.push("--timeout".into());
            args.push(format!("{}s", timeout.as_secs()));
        }
        if request.options.dry_run {
            args.push("--dry-run".into());
        }
        args.extend(cluster_args(&request.cluster));

        args
    }

    /// Arguments for `helm uninstall`
    pub fn uninstall_args(name: &str, namespace: &str, cluster: &ClusterTarget) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "uninstall".into(),
            name.to_string(),
            "--namespace".into(),
            namespace.to_string(),
        ];
        args.extend(cluster_args(cluster));
        args
    }

    async fn run(&self, release: &str, args: &[String], stdin: Option<&[u8]>) -> Result<Vec<u8>> {
        debug!(binary = %self.binary.display(), ?args, "running helm");

        let mut child = Command::new(&self.binary)
            .args(args)
            .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ComponentError::HelmNotFound {
                binary: self.binary.display().to_string(),
                source,
            })?;

        let pipe = child.stdin.take();
        let write = async move {
            match (stdin, pipe) {
                // dropping the pipe closes stdin so helm sees the end of the values
                (Some(input), Some(mut pipe)) => pipe.write_all(input).await,
                _ => Ok(()),
            }
        };

        // helm may exit before reading stdin; its stderr explains why
        let (written, output) = tokio::join!(write, child.wait_with_output());
        let output = output?;
        if !output.status.success() {
            return Err(ComponentError::Helm {
                release: release.to_string(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        written?;

        Ok(output.stdout)
    }
}

impl Default for HelmInstaller {
    fn default() -> Self {
        Self::new("helm")
    }
}

fn cluster_args(cluster: &ClusterTarget) -> Vec<String> {
    let mut args = Vec::new();
    if let Some(kubeconfig) = &cluster.kubeconfig {
        args.push("--kubeconfig".to_string());
        args.push(kubeconfig.display().to_string());
    }
    if let Some(context) = &cluster.context {
        args.push("--kube-context".to_string());
        args.push(context.clone());
    }
    args
}

/// Subset of `helm ... --output json`
#[derive(Debug, Deserialize)]
struct HelmRelease {
    name: String,
    namespace: String,
    version: u32,
    info: HelmReleaseInfo,
}

#[derive(Debug, Deserialize)]
struct HelmReleaseInfo {
    status: String,
    #[serde(default)]
    notes: Option<String>,
}

fn parse_release(request: &ReleaseRequest, stdout: &[u8]) -> Result<InstalledRelease> {
    let release: HelmRelease = serde_json::from_slice(stdout)?;
    Ok(InstalledRelease {
        name: release.name,
        namespace: release.namespace,
        chart: request.chart.clone(),
        revision: release.version,
        status: release.info.status,
        notes: release.info.notes.filter(|n| !n.trim().is_empty()),
    })
}

#[async_trait]
impl ChartInstaller for HelmInstaller {
    async fn install(&self, request: &ReleaseRequest) -> Result<InstalledRelease> {
        let values = request.values.to_yaml()?;
        let args = Self::install_args(request);
        let stdout = self.run(&request.name, &args, Some(values.as_bytes())).await?;
        parse_release(request, &stdout)
    }

    async fn uninstall(&self, name: &str, namespace: &str, cluster: &ClusterTarget) -> Result<()> {
        let args = Self::uninstall_args(name, namespace, cluster);
        match self.run(name, &args, None).await {
            Ok(_) => Ok(()),
            Err(ComponentError::Helm { message, .. }) if message.contains("not found") => {
                warn!(release = %name, namespace = %namespace, "release already absent");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
