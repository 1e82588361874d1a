//! Rotate-password command - replace a Grafana admin password

use chartkit_components::{ComponentKind, Grafana};
use console::style;

use super::{Session, StackArgs};
use crate::error::{CliError, Result};

/// Run the rotate-password command
///
/// The new password takes effect on the next `install`.
pub async fn run(args: &StackArgs, component: &str) -> Result<()> {
    let mut session = Session::open(args)?;
    let built = session.build(Some(component), &[])?;
    let Some(grafana) = built.first() else {
        return Ok(());
    };

    if grafana.kind() != ComponentKind::Grafana {
        return Err(CliError::usage(
            format!("component '{}' is {}, not grafana", component, grafana.kind()),
            "only grafana components have a generated admin password",
        ));
    }

    let key = Grafana::password_key(grafana.namespace(), grafana.name());
    // building the component recorded a password if there was none
    if session.secrets.rotate(&key).is_none() {
        return Err(CliError::Other {
            message: format!("no admin password recorded under '{}'", key),
        });
    }

    session.save()?;
    println!(
        "{} Rotated admin password of {} in namespace {}",
        style("✓").green().bold(),
        style(grafana.name()).cyan(),
        style(grafana.namespace()).yellow()
    );
    println!("  Run `chartkit install` to apply it, `chartkit outputs --show-secrets` to read it");

    Ok(())
}
