//! CLI error types with exit code handling
//!
//! Library errors are folded into a handful of categories, each with its own
//! exit code.

use chartkit_components::ComponentError;
use chartkit_core::CoreError;
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// Stack file missing, malformed or inconsistent
    #[error("Stack error: {message}")]
    #[diagnostic(code(chartkit::cli::stack))]
    Stack {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Chart version could not be resolved
    #[error("Resolution error: {message}")]
    #[diagnostic(code(chartkit::cli::resolve))]
    Resolve {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Helm failed or could not be started
    #[error("Install error: {message}")]
    #[diagnostic(code(chartkit::cli::install))]
    Install {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Invalid combination of arguments
    #[error("{message}")]
    #[diagnostic(code(chartkit::cli::usage))]
    Usage {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(chartkit::cli::io))]
    Io { message: String },

    /// Anything else, with the formatted message
    #[error("{message}")]
    #[diagnostic(code(chartkit::cli::error))]
    Other { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Stack { .. } => exit_codes::STACK_ERROR,
            CliError::Resolve { .. } => exit_codes::RESOLVE_ERROR,
            CliError::Install { .. } => exit_codes::INSTALL_ERROR,
            CliError::Usage { .. } => exit_codes::USAGE_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Other { .. } => exit_codes::ERROR,
        }
    }

    /// Create a usage error with help text
    pub fn usage(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    fn stack(message: impl Into<String>) -> Self {
        Self::Stack {
            message: message.into(),
            help: None,
        }
    }

    fn resolve(message: impl Into<String>) -> Self {
        Self::Resolve {
            message: message.into(),
            help: None,
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::Other {
            message: err.to_string(),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Io(e) => e.into(),
            CoreError::ValuesMerge { .. } => CliError::Usage {
                message: err.to_string(),
                help: Some("--set takes key=value with a dotted key path".to_string()),
            },
            CoreError::InvalidConstraint { .. }
            | CoreError::ChartNotFound { .. }
            | CoreError::UnsatisfiableConstraint { .. } => CliError::resolve(err.to_string()),
            CoreError::YamlParse(_) | CoreError::JsonParse(_) => CliError::Other {
                message: err.to_string(),
            },
        }
    }
}

impl From<ComponentError> for CliError {
    fn from(err: ComponentError) -> Self {
        match err {
            ComponentError::Core(e) => e.into(),
            ComponentError::Io(e) => e.into(),
            ComponentError::Yaml(_) | ComponentError::InvalidConfig { .. } => {
                CliError::stack(err.to_string())
            }
            ComponentError::UnknownComponent { .. } => CliError::Stack {
                message: err.to_string(),
                help: Some("run `chartkit outputs <stack>` to list component names".to_string()),
            },
            ComponentError::Unresolved { .. } | ComponentError::IndexFetch { .. } => {
                CliError::resolve(err.to_string())
            }
            ComponentError::HelmNotFound { .. } => CliError::Install {
                message: err.to_string(),
                help: Some("install helm or set CHARTKIT_HELM to its path".to_string()),
            },
            ComponentError::Helm { .. } => CliError::Install {
                message: err.to_string(),
                help: None,
            },
            _ => CliError::Other {
                message: err.to_string(),
            },
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_errors_map_to_exit_codes() {
        let cases = [
            (
                ComponentError::UnknownComponent { name: "x".into() },
                exit_codes::STACK_ERROR,
            ),
            (
                ComponentError::Unresolved {
                    chart: "grafana".into(),
                    constraint: "^6".into(),
                },
                exit_codes::RESOLVE_ERROR,
            ),
            (
                ComponentError::Helm {
                    release: "edge".into(),
                    message: "timed out".into(),
                },
                exit_codes::INSTALL_ERROR,
            ),
            (
                ComponentError::Io(std::io::Error::other("denied")),
                exit_codes::IO_ERROR,
            ),
        ];

        for (err, code) in cases {
            let message = err.to_string();
            assert_eq!(CliError::from(err).exit_code(), code, "{}", message);
        }
    }

    #[test]
    fn test_nested_core_error_is_unwrapped() {
        let err = ComponentError::Core(CoreError::ChartNotFound {
            chart: "grafana".into(),
        });
        assert_eq!(CliError::from(err).exit_code(), exit_codes::RESOLVE_ERROR);
    }
}
