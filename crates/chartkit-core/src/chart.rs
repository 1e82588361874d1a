//! Chart references and repository index resolution

use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::error::{CoreError, Result};

/// Chart name, version and source repository
///
/// This is the metadata record every component exposes. `version` is either
/// an exact chart version or, before resolution, a semver requirement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartRef {
    pub chart: String,
    pub version: String,
    pub repository: String,
}

impl ChartRef {
    pub fn new(
        chart: impl Into<String>,
        version: impl Into<String>,
        repository: impl Into<String>,
    ) -> Self {
        Self {
            chart: chart.into(),
            version: version.into(),
            repository: repository.into(),
        }
    }

    /// Apply a caller version override, keeping the pinned default otherwise
    pub fn with_version_override(mut self, version: Option<&str>) -> Self {
        if let Some(v) = version {
            self.version = v.trim_start_matches('v').to_string();
        }
        self
    }

    /// Whether `version` names one exact chart version
    pub fn is_pinned(&self) -> bool {
        Version::parse(&self.version).is_ok()
    }

    /// URL of the repository's `index.yaml`
    pub fn index_url(&self) -> String {
        format!("{}/index.yaml", self.repository.trim_end_matches('/'))
    }

    /// Resolve the version requirement against a repository index
    ///
    /// Pinned references are returned unchanged.
    pub fn resolve(&self, index: &ChartIndex) -> Result<ChartRef> {
        if self.is_pinned() {
            return Ok(self.clone());
        }
        let entry = index.find_best_match(&self.chart, &self.version)?;
        Ok(ChartRef {
            version: entry.version.clone(),
            ..self.clone()
        })
    }
}

impl std::fmt::Display for ChartRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{} ({})", self.chart, self.version, self.repository)
    }
}

/// Helm repository index (`index.yaml`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartIndex {
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Chart versions indexed by chart name
    #[serde(default)]
    pub entries: HashMap<String, Vec<ChartEntry>>,
}

fn default_api_version() -> String {
    "v1".to_string()
}

/// One chart version in the index
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartEntry {
    pub name: String,

    pub version: String,

    #[serde(default)]
    pub app_version: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub deprecated: bool,

    #[serde(default)]
    pub urls: Vec<String>,
}

impl ChartIndex {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn get(&self, chart: &str) -> Option<&Vec<ChartEntry>> {
        self.entries.get(chart)
    }

    /// Versions of `chart` matching a semver requirement
    pub fn find_matching(&self, chart: &str, constraint: &str) -> Result<Vec<&ChartEntry>> {
        let entries = self
            .entries
            .get(chart)
            .ok_or_else(|| CoreError::ChartNotFound {
                chart: chart.to_string(),
            })?;

        let req = VersionReq::parse(constraint).map_err(|source| CoreError::InvalidConstraint {
            constraint: constraint.to_string(),
            source,
        })?;

        Ok(entries
            .iter()
            .filter(|e| {
                Version::parse(&e.version)
                    .map(|v| req.matches(&v))
                    .unwrap_or(false)
            })
            .collect())
    }

    /// Highest version of `chart` matching a semver requirement
    pub fn find_best_match(&self, chart: &str, constraint: &str) -> Result<&ChartEntry> {
        let matching = self.find_matching(chart, constraint)?;

        matching
            .into_iter()
            .max_by(|a, b| compare_versions(&a.version, &b.version))
            .ok_or_else(|| CoreError::UnsatisfiableConstraint {
                chart: chart.to_string(),
                constraint: constraint.to_string(),
                available: self
                    .entries
                    .get(chart)
                    .map(|v| {
                        v.iter()
                            .map(|e| e.version.as_str())
                            .collect::<Vec<_>>()
                            .join(", ")
                    })
                    .unwrap_or_else(|| "none".to_string()),
            })
    }
}

fn compare_versions(a: &str, b: &str) -> Ordering {
    match (Version::parse(a).ok(), Version::parse(b).ok()) {
        (Some(va), Some(vb)) => va.cmp(&vb),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => a.cmp(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX: &str = r#"
apiVersion: v1
entries:
  ingress-nginx:
    - name: ingress-nginx
      version: 4.0.6
      appVersion: 1.0.4
      urls:
        - https://example.com/ingress-nginx-4.0.6.tgz
    - name: ingress-nginx
      version: 4.1.0
    - name: ingress-nginx
      version: 3.40.0
  grafana:
    - name: grafana
      version: 6.17.5
"#;

    fn nginx() -> ChartRef {
        ChartRef::new("ingress-nginx", "4.0.6", "https://kubernetes.github.io/ingress-nginx/")
    }

    #[test]
    fn test_pinned_detection() {
        assert!(nginx().is_pinned());
        assert!(!nginx().with_version_override(Some("^4.0")).is_pinned());
        assert!(!nginx().with_version_override(Some("~3.40")).is_pinned());
    }

    #[test]
    fn test_override_strips_v_prefix() {
        let chart = nginx().with_version_override(Some("v4.1.0"));
        assert_eq!(chart.version, "4.1.0");
        assert!(chart.is_pinned());
    }

    #[test]
    fn test_no_override_keeps_default() {
        assert_eq!(nginx().with_version_override(None), nginx());
    }

    #[test]
    fn test_index_url() {
        assert_eq!(
            nginx().index_url(),
            "https://kubernetes.github.io/ingress-nginx/index.yaml"
        );
    }

    #[test]
    fn test_find_best_match() {
        let index = ChartIndex::from_yaml(INDEX).unwrap();

        let entry = index.find_best_match("ingress-nginx", "^4.0").unwrap();
        assert_eq!(entry.version, "4.1.0");

        let entry = index.find_best_match("ingress-nginx", "~3").unwrap();
        assert_eq!(entry.version, "3.40.0");
    }

    #[test]
    fn test_resolve() {
        let index = ChartIndex::from_yaml(INDEX).unwrap();

        let resolved = nginx()
            .with_version_override(Some(">=4.0.0, <4.1.0"))
            .resolve(&index)
            .unwrap();
        assert_eq!(resolved.version, "4.0.6");
        assert_eq!(resolved.chart, "ingress-nginx");

        // pinned refs never consult the index
        let pinned = nginx().resolve(&ChartIndex::default()).unwrap();
        assert_eq!(pinned, nginx());
    }

    #[test]
    fn test_unsatisfiable_constraint() {
        let index = ChartIndex::from_yaml(INDEX).unwrap();

        let err = index.find_best_match("ingress-nginx", "^9").unwrap_err();
        assert!(matches!(err, CoreError::UnsatisfiableConstraint { .. }));
        assert!(err.to_string().contains("4.1.0"));
    }

    #[test]
    fn test_unknown_chart() {
        let index = ChartIndex::from_yaml(INDEX).unwrap();
        let err = index.find_best_match("metallb", "*").unwrap_err();
        assert!(matches!(err, CoreError::ChartNotFound { .. }));
    }

    #[test]
    fn test_invalid_constraint() {
        let index = ChartIndex::from_yaml(INDEX).unwrap();
        let err = index.find_matching("grafana", "not a version").unwrap_err();
        assert!(matches!(err, CoreError::InvalidConstraint { .. }));
    }
}
