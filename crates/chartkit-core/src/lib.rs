//! chartkit Core - shared types for the chart components
//!
//! This crate provides the foundational types used throughout chartkit:
//! - `Values`: Chart values tree with deep merge support
//! - `ChartRef`: Chart name, version and source repository
//! - `ChartIndex`: Helm repository index used to resolve version constraints
//! - `SecretGenerator`: Idempotent generated secrets with persisted state

pub mod chart;
pub mod error;
pub mod secrets;
pub mod values;

pub use chart::{ChartEntry, ChartIndex, ChartRef};
pub use error::{CoreError, Result};
pub use secrets::{OsRandom, SecretEntry, SecretGenerator, SecretSource, SecretState, SeededRandom};
pub use values::{Values, parse_set_values};
