//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid version constraint '{constraint}': {source}")]
    InvalidConstraint {
        constraint: String,
        #[source]
        source: semver::Error,
    },

    #[error("Values merge error: {message}")]
    ValuesMerge { message: String },

    #[error("Chart '{chart}' not found in repository index")]
    ChartNotFound { chart: String },

    #[error("No version of '{chart}' satisfies '{constraint}' (available: {available})")]
    UnsatisfiableConstraint {
        chart: String,
        constraint: String,
        available: String,
    },
}

pub type Result<T> = std::result::Result<T, CoreError>;
