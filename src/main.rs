use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

pub mod client;
pub mod config;
pub mod outputs;
pub mod provision;
pub mod writer;

/// Provision a SageMaker Unified Studio domain through the DataZone API
#[derive(Parser, Debug)]
#[command(name = "datazone-domain-provisioner")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the YAML configuration file, built-in defaults apply when it is missing
    #[arg(long, global = true, env = "DOMAIN_PROVISIONER_CONFIG", default_value = config::DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Create the domain, enable its blueprints and save a summary (default)
    Provision,

    /// Read the outputs exported by the declarative domain stack
    Outputs,
}

#[derive(thiserror::Error, Debug)]
enum Error {
    #[error(transparent)]
    Config(#[from] config::Error),

    #[error(transparent)]
    Client(#[from] client::Error),

    #[error(transparent)]
    Provision(#[from] provision::Error),

    #[error(transparent)]
    Outputs(#[from] outputs::Error),

    #[error(transparent)]
    Writer(#[from] writer::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = run(&cli).await;
    if let Err(error) = &result {
        tracing::error!(%error, "run failed");
        println!("Error: {}", error);
    }

    return ExitCode::from(exit_status(&result));
}

/// `warn` unless `directives` (the `RUST_LOG` value) parses.
fn log_filter(directives: Option<String>) -> EnvFilter {
    match directives.map(EnvFilter::try_new) {
        Some(Ok(filter)) => return filter,
        _ => return EnvFilter::new("warn"),
    }
}

/// Blueprint failures never reach here, so any error is fatal.
fn exit_status(result: &Result<(), Error>) -> u8 {
    match result {
        Ok(_) => return 0,
        Err(_) => return 1,
    }
}

async fn run(cli: &Cli) -> Result<(), Error> {
    let config = config::load(&cli.config)?;

    match cli.command.unwrap_or(Command::Provision) {
        Command::Provision => {
            let client = client::DataZoneClient::new(&config).await?;
            let report = provision::run(&client, &config).await?;
            if !report.failures.is_empty() {
                println!(
                    "{} of {} blueprints failed to configure",
                    report.failures.len(),
                    config.blueprints.items.len()
                );
            }
        }
        Command::Outputs => {
            let stack = outputs::Stack::new(&config.stack, &config).await?;
            let stack_outputs = stack.domain_outputs().await?;

            println!("Stack: {}", stack.stack_name);
            println!("  Domain ID: {}", stack_outputs.domain_id);
            println!("  Domain ARN: {}", stack_outputs.domain_arn);
            println!("  Portal URL: {}", stack_outputs.portal_url);
            println!("  Root Domain Unit ID: {}", stack_outputs.root_domain_unit_id);

            writer::write_json(&config.stack.json.location, &stack_outputs)?;
            println!(
                "Stack outputs saved to: {}",
                config.stack.json.location.display()
            );
        }
    }

    return Ok(());
}
