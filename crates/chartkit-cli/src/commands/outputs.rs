//! Outputs command - show what each component exposes to its callers

use chartkit_components::{Component, ComponentOutputs};
use console::style;
use serde_json::{Map, Value as JsonValue};

use super::{Session, StackArgs};
use crate::error::Result;

const MASK: &str = "********";

/// Run the outputs command
pub async fn run(args: &StackArgs, json: bool, show_secrets: bool) -> Result<()> {
    let mut session = Session::open(args)?;
    let mut components = session.build(args.component.as_deref(), &[])?;
    if !args.offline {
        Session::resolve(&mut components, false).await?;
    }

    if json {
        let document = outputs_json(&components, show_secrets)?;
        println!("{}", serde_json::to_string_pretty(&document)?);
    } else {
        print_outputs(&components, show_secrets);
    }

    session.save()
}

/// Outputs with secrets masked unless asked for
pub fn collect_outputs(component: &dyn Component, show_secrets: bool) -> ComponentOutputs {
    let mut outputs = component.outputs();
    if !show_secrets && let ComponentOutputs::Grafana(grafana) = &mut outputs {
        grafana.admin_password = MASK.to_string();
    }
    outputs
}

/// `{ "<name>": { "kind": ..., <outputs> } }`
pub fn outputs_json(components: &[Box<dyn Component>], show_secrets: bool) -> Result<JsonValue> {
    let mut document = Map::new();
    for component in components {
        let mut entry = match serde_json::to_value(collect_outputs(component.as_ref(), show_secrets))? {
            JsonValue::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("outputs".to_string(), other);
                map
            }
        };
        entry.insert("kind".to_string(), JsonValue::String(component.kind().to_string()));
        document.insert(component.name().to_string(), JsonValue::Object(entry));
    }
    Ok(JsonValue::Object(document))
}

/// Human-readable outputs, one block per component
pub fn print_outputs(components: &[Box<dyn Component>], show_secrets: bool) {
    for component in components {
        let outputs = collect_outputs(component.as_ref(), show_secrets);
        let chart = outputs.metadata();

        println!(
            "{} {} ({})",
            style("●").green(),
            style(component.name()).cyan().bold(),
            component.kind()
        );
        println!("  Namespace:  {}", component.namespace());
        println!("  Chart:      {} {}", chart.chart, style(&chart.version).yellow());
        println!("  Repository: {}", style(&chart.repository).dim());

        match &outputs {
            ComponentOutputs::Metallb(_) => {}
            ComponentOutputs::Grafana(grafana) => {
                println!("  Admin user: {}", grafana.admin_username);
                println!("  Password:   {}", grafana.admin_password);
                if let Some(ingress) = &grafana.ingress
                    && !ingress.hosts.is_empty()
                {
                    println!("  Hosts:      {}", ingress.hosts.join(", "));
                }
            }
            ComponentOutputs::NginxIngress(nginx) => {
                println!("  Class:      {}", nginx.ingress_class);
                println!(
                    "  Service:    {}/{}",
                    nginx.service.namespace, nginx.service.name
                );
            }
        }
    }
}
