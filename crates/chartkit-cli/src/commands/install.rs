//! Install command - deploy every component of a stack

use chartkit_components::installer::install_component;
use chartkit_components::{HelmInstaller, InstallOptions};
use console::style;
use std::time::Duration;

use super::outputs::print_outputs;
use super::{Session, StackArgs};
use crate::error::Result;

/// Run the install command
pub async fn run(
    args: &StackArgs,
    set: &[String],
    helm: &str,
    wait: bool,
    timeout: Option<u64>,
    dry_run: bool,
) -> Result<()> {
    let mut session = Session::open(args)?;
    let mut components = session.build(args.component.as_deref(), set)?;
    Session::resolve(&mut components, args.offline).await?;

    // Generated passwords must survive a failed install
    session.save()?;

    let mut options = InstallOptions::new();
    if wait {
        options = options.with_wait(Duration::from_secs(timeout.unwrap_or(300)));
    } else if let Some(t) = timeout {
        options.timeout = Some(Duration::from_secs(t));
    }
    if dry_run {
        options = options.dry_run();
    }

    let installer = HelmInstaller::new(helm);

    for component in &components {
        println!(
            "{} Installing {} chart {} as {} in namespace {}",
            style("→").blue().bold(),
            component.kind(),
            style(component.chart()).yellow(),
            style(component.name()).cyan(),
            style(component.namespace()).yellow()
        );

        let release = install_component(component.as_ref(), &installer, &options).await?;

        if dry_run {
            println!(
                "{} Dry run - would install {} in namespace {}",
                style("✓").green().bold(),
                style(&release.name).cyan(),
                style(&release.namespace).yellow()
            );
        } else {
            println!(
                "{} Installed {} (revision {}, {})",
                style("✓").green().bold(),
                style(&release.name).cyan(),
                style(release.revision).yellow(),
                release.status
            );
        }

        if let Some(notes) = &release.notes {
            println!("\n{}", style("NOTES:").bold());
            println!("{}", notes);
        }
    }

    println!();
    print_outputs(&components, false);
    Ok(())
}
