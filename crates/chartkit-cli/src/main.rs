//! chartkit CLI - MetalLB, Grafana and Nginx Ingress from typed stack files

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod commands;
mod error;
mod exit_codes;

use commands::StackArgs;

#[derive(Parser)]
#[command(name = "chartkit")]
#[command(author = "chartkit Contributors")]
#[command(version)]
#[command(about = "Install MetalLB, Grafana and Nginx Ingress from typed stack files", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the values tree of each component as YAML
    Render {
        #[command(flatten)]
        stack: StackArgs,

        /// Set values on command line (key=value), requires --component
        #[arg(long = "set")]
        set: Vec<String>,
    },

    /// Install or upgrade every component with helm
    Install {
        #[command(flatten)]
        stack: StackArgs,

        /// Set values on command line (key=value), requires --component
        #[arg(long = "set")]
        set: Vec<String>,

        /// Helm binary
        #[arg(long, env = "CHARTKIT_HELM", default_value = "helm")]
        helm: String,

        /// Wait for resources to be ready
        #[arg(long)]
        wait: bool,

        /// Timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Simulate the install
        #[arg(long)]
        dry_run: bool,
    },

    /// Uninstall every component's release
    Uninstall {
        #[command(flatten)]
        stack: StackArgs,

        /// Helm binary
        #[arg(long, env = "CHARTKIT_HELM", default_value = "helm")]
        helm: String,
    },

    /// Show what each component exposes
    Outputs {
        #[command(flatten)]
        stack: StackArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Print generated passwords instead of masking them
        #[arg(long)]
        show_secrets: bool,
    },

    /// Generate a new Grafana admin password
    RotatePassword {
        #[command(flatten)]
        stack: StackArgs,

        /// Grafana component name
        #[arg(value_name = "NAME")]
        target: String,
    },
}

fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(debug))
        .with(filter)
        .init();
}

async fn run(cli: Cli) -> error::Result<()> {
    match cli.command {
        Commands::Render { stack, set } => commands::render::run(&stack, &set).await,

        Commands::Install {
            stack,
            set,
            helm,
            wait,
            timeout,
            dry_run,
        } => commands::install::run(&stack, &set, &helm, wait, timeout, dry_run).await,

        Commands::Uninstall { stack, helm } => commands::uninstall::run(&stack, &helm).await,

        Commands::Outputs {
            stack,
            json,
            show_secrets,
        } => commands::outputs::run(&stack, json, show_secrets).await,

        Commands::RotatePassword { stack, target } => {
            commands::rotate_password::run(&stack, &target).await
        }
    }
}

#[tokio::main]
async fn main() {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.debug);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}
