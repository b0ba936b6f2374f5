use std::path::PathBuf;

use clap::Parser;
use stack_config_resolver::{manifest, plan, writer, Error};

/// Resolve per-customer service descriptors for every stack in a manifest.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// YAML manifest listing the stacks to resolve.
    #[arg(long, default_value = "./stacks.yaml")]
    manifest: PathBuf,

    /// Resolve only this stack.
    #[arg(long)]
    stack: Option<String>,
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> Result<(), Error> {
    init_tracing();
    let cli = Cli::parse();

    let manifest = manifest::parse(&cli.manifest)?;
    let manifest = manifest::select(manifest, cli.stack.as_deref())?;

    for stack_entry in manifest {
        let stack_plan = match plan::build(&stack_entry) {
            Ok(stack_plan) => stack_plan,
            Err(error) => {
                tracing::error!(stack = stack_entry.stack_name(), %error, "Unable to resolve stack");
                return Err(error);
            }
        };

        writer::write(&stack_entry.output.location, &stack_plan)?;
    }

    return Ok(());
}
