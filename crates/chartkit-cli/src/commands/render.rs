//! Render command - print each component's values tree

use console::style;

use super::{Session, StackArgs};
use crate::error::Result;

/// Run the render command
///
/// Values go to stdout as a multi-document YAML stream, one document per
/// component, so the output can be piped straight into `helm --values`.
pub async fn run(args: &StackArgs, set: &[String]) -> Result<()> {
    let mut session = Session::open(args)?;
    let mut components = session.build(args.component.as_deref(), set)?;

    // Rendering does not need an exact version, so offline skips resolution
    if !args.offline {
        Session::resolve(&mut components, false).await?;
    }

    for component in &components {
        eprintln!(
            "{} Rendering {} ({}, chart {})",
            style("→").blue().bold(),
            style(component.name()).cyan(),
            component.kind(),
            style(component.chart()).yellow()
        );

        let yaml = component.chart_values().to_yaml()?;
        println!("---");
        println!("# Source: {}/{}", component.namespace(), component.name());
        print!("{}", yaml);
    }

    session.save()
}
