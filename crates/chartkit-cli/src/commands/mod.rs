//! CLI commands

pub mod install;
pub mod outputs;
pub mod render;
pub mod rotate_password;
pub mod uninstall;

use chartkit_components::{Component, IndexClient, StackConfig};
use chartkit_core::{SecretGenerator, SecretState, parse_set_values};
use clap::Args;
use console::style;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{CliError, Result};

/// Arguments shared by every stack command
#[derive(Args, Debug, Clone)]
pub struct StackArgs {
    /// Stack file listing the component instances
    pub stack: PathBuf,

    /// Only act on the named component
    #[arg(short, long)]
    pub component: Option<String>,

    /// Secret state file (default: <data dir>/chartkit/secrets.json)
    #[arg(long, env = "CHARTKIT_STATE")]
    pub state: Option<PathBuf>,

    /// Never fetch repository indexes; unpinned chart versions are errors
    #[arg(long)]
    pub offline: bool,
}

impl StackArgs {
    pub fn state_path(&self) -> PathBuf {
        self.state.clone().unwrap_or_else(default_state_path)
    }
}

fn default_state_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("chartkit")
        .join("secrets.json")
}

/// A loaded stack plus the secret state its components draw from
pub struct Session {
    pub stack: StackConfig,
    pub secrets: SecretGenerator,
    state_path: PathBuf,
}

impl Session {
    pub fn open(args: &StackArgs) -> Result<Self> {
        let stack = StackConfig::from_file(&args.stack).map_err(|e| with_path(e.into(), &args.stack))?;
        let state_path = args.state_path();
        let state = SecretState::load(&state_path)?;
        debug!(
            stack = %args.stack.display(),
            state = %state_path.display(),
            components = stack.components.len(),
            secrets = state.len(),
            "opened stack"
        );

        Ok(Self {
            stack,
            secrets: SecretGenerator::with_state(state),
            state_path,
        })
    }

    /// Build the selected components, with `--set` values merged into the one named
    pub fn build(&mut self, component: Option<&str>, set: &[String]) -> Result<Vec<Box<dyn Component>>> {
        if !set.is_empty() && component.is_none() {
            return Err(CliError::usage(
                "--set needs a target component",
                "add --component <name> to choose which component the values apply to",
            ));
        }

        let mut components = self.stack.build(component, &mut self.secrets)?;

        if !set.is_empty() {
            let overlay = parse_set_values(set)?;
            for component in &mut components {
                let instance = component.instance_mut();
                match &mut instance.overrides {
                    Some(values) => values.merge(&overlay),
                    None => instance.overrides = Some(overlay.clone()),
                }
            }
        }

        Ok(components)
    }

    /// Pin every chart version, unless `offline` forbids fetching indexes
    pub async fn resolve(components: &mut [Box<dyn Component>], offline: bool) -> Result<()> {
        let mut client = if offline {
            IndexClient::offline()
        } else {
            IndexClient::new()
        };
        for component in components.iter_mut() {
            client.resolve_component(component.as_mut()).await?;
        }
        Ok(())
    }

    /// Persist the secret state if anything was generated or rotated
    pub fn save(&mut self) -> Result<()> {
        if !self.secrets.is_dirty() {
            return Ok(());
        }
        self.secrets.state_mut().save(&self.state_path)?;
        eprintln!(
            "{} Saved secret state to {}",
            style("→").blue().bold(),
            style(self.state_path.display()).dim()
        );
        Ok(())
    }
}

fn with_path(err: CliError, path: &Path) -> CliError {
    match err {
        CliError::Io { message } => CliError::Io {
            message: format!("{}: {}", path.display(), message),
        },
        other => other,
    }
}
