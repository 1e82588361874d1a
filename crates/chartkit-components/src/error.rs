//! Error types for chartkit-components

use chartkit_core::CoreError;
use thiserror::Error;

/// Result type for component operations
pub type Result<T> = std::result::Result<T, ComponentError>;

/// Errors raised while loading stacks, resolving charts or talking to Helm
///
/// Building a values tree never fails; malformed inputs are passed through
/// and rejected by the chart or the cluster.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ComponentError {
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Stack file could not be parsed
    #[error("invalid stack file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Stack file parsed but is inconsistent
    #[error("invalid stack configuration: {message}")]
    InvalidConfig { message: String },

    #[error("component '{name}' not found in stack")]
    UnknownComponent { name: String },

    /// Chart version is a constraint but resolution is disabled
    #[error("chart '{chart}' version '{constraint}' is not pinned\nHint: pin an exact version or drop --offline to resolve it from the repository index")]
    Unresolved { chart: String, constraint: String },

    #[error("failed to fetch repository index {url}: {source}")]
    IndexFetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("helm binary '{binary}' could not be started: {source}")]
    HelmNotFound {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("helm failed for release '{release}': {message}")]
    Helm { release: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
