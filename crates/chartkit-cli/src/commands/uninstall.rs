//! Uninstall command - remove a stack's releases

use chartkit_components::HelmInstaller;
use chartkit_components::installer::uninstall_component;
use console::style;

use super::{Session, StackArgs};
use crate::error::Result;

/// Run the uninstall command
///
/// Releases are removed in reverse stack order, so components listed later
/// (which may depend on earlier ones) go first.
pub async fn run(args: &StackArgs, helm: &str) -> Result<()> {
    let mut session = Session::open(args)?;
    let components = session.build(args.component.as_deref(), &[])?;
    let installer = HelmInstaller::new(helm);

    for component in components.iter().rev() {
        println!(
            "{} Uninstalling {} from namespace {}",
            style("→").blue().bold(),
            style(component.name()).cyan(),
            style(component.namespace()).yellow()
        );

        uninstall_component(component.as_ref(), &installer).await?;

        println!(
            "{} Uninstalled {}",
            style("✓").green().bold(),
            style(component.name()).cyan()
        );
    }

    Ok(())
}
