//! Chart version resolution against repository indexes

use chartkit_core::{ChartIndex, ChartRef};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use tracing::{debug, info};

use crate::component::Component;
use crate::error::{ComponentError, Result};

/// Fetches `index.yaml` files and resolves version constraints
///
/// Each repository index is downloaded at most once per client.
#[derive(Debug, Default)]
pub struct IndexClient {
    http: reqwest::Client,
    cache: HashMap<String, ChartIndex>,
    offline: bool,
}

impl IndexClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// A client that refuses to fetch; unpinned charts become errors
    pub fn offline() -> Self {
        Self {
            offline: true,
            ..Self::default()
        }
    }

    /// Fetch (or reuse) the index that `chart` lives in
    pub async fn fetch_index(&mut self, chart: &ChartRef) -> Result<&ChartIndex> {
        let url = chart.index_url();
        match self.cache.entry(url) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let index = download_index(&self.http, entry.key()).await?;
                Ok(entry.insert(index))
            }
        }
    }

    /// Resolve a chart reference to an exact version
    pub async fn resolve(&mut self, chart: &ChartRef) -> Result<ChartRef> {
        if chart.is_pinned() {
            return Ok(chart.clone());
        }
        if self.offline {
            return Err(ComponentError::Unresolved {
                chart: chart.chart.clone(),
                constraint: chart.version.clone(),
            });
        }

        let index = self.fetch_index(chart).await?;
        let resolved = chart.resolve(index)?;
        info!(
            chart = %chart.chart,
            constraint = %chart.version,
            version = %resolved.version,
            "resolved chart version"
        );
        Ok(resolved)
    }

    /// Resolve a component's chart in place
    pub async fn resolve_component(&mut self, component: &mut dyn Component) -> Result<()> {
        let resolved = self.resolve(component.chart()).await?;
        component.instance_mut().chart = resolved;
        Ok(())
    }
}

async fn download_index(http: &reqwest::Client, url: &str) -> Result<ChartIndex> {
    debug!(url, "fetching repository index");

    let fetch_err = |source| ComponentError::IndexFetch {
        url: url.to_string(),
        source,
    };
    let body = http
        .get(url)
        .send()
        .await
        .and_then(|response| response.error_for_status())
        .map_err(fetch_err)?
        .text()
        .await
        .map_err(fetch_err)?;

    Ok(ChartIndex::from_yaml(&body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const INDEX: &str = r#"
apiVersion: v1
entries:
  grafana:
    - name: grafana
      version: 6.17.5
    - name: grafana
      version: 6.20.0
    - name: grafana
      version: 7.0.1
"#;

    async fn repository() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/charts/index.yaml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(INDEX))
            .expect(1)
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_resolve_constraint_from_index() {
        let server = repository().await;
        let mut client = IndexClient::new();
        let chart = ChartRef::new("grafana", "^6", format!("{}/charts", server.uri()));

        let resolved = client.resolve(&chart).await.unwrap();
        assert_eq!(resolved.version, "6.20.0");

        // second lookup is served from the cache (mock expects one request)
        let resolved = client
            .resolve(&ChartRef { version: ">=7".to_string(), ..chart })
            .await
            .unwrap();
        assert_eq!(resolved.version, "7.0.1");
    }

    #[tokio::test]
    async fn test_pinned_chart_skips_fetch() {
        let mut client = IndexClient::offline();
        let chart = ChartRef::new("grafana", "6.17.5", "http://127.0.0.1:9/charts");

        assert_eq!(client.resolve(&chart).await.unwrap(), chart);
    }

    #[tokio::test]
    async fn test_offline_rejects_constraint() {
        let mut client = IndexClient::offline();
        let chart = ChartRef::new("grafana", "^6", "http://127.0.0.1:9/charts");

        let err = client.resolve(&chart).await.unwrap_err();
        assert!(matches!(err, ComponentError::Unresolved { .. }));
    }

    #[tokio::test]
    async fn test_http_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let mut client = IndexClient::new();
        let chart = ChartRef::new("grafana", "^6", server.uri());

        let err = client.resolve(&chart).await.unwrap_err();
        assert!(matches!(err, ComponentError::IndexFetch { .. }));
    }
}
