//! RCE CLI
//!
//! Command-line interface for running commands through the RCE service.

mod commands;
mod config;

use clap::Parser;
use colored::*;
use commands::{Commands, handle_command};
use config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Exit code for failures talking to the service
const TRANSPORT_FAILURE: i32 = 2;

#[derive(Parser)]
#[command(name = "rce")]
#[command(about = "Remote command execution CLI", long_about = None)]
struct Cli {
    /// Service URL
    #[arg(long, env = "RCE_URL", default_value = "http://localhost:8080")]
    url: String,

    /// Credential for the service
    #[arg(long, env = "RCE_AUTH", hide_env_values = true)]
    auth: String,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = Config {
        url: cli.url,
        auth: cli.auth,
    };

    let code = match handle_command(cli.command, &config).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", format!("Error: {:#}", e).red());
            TRANSPORT_FAILURE
        }
    };

    std::process::exit(code);
}
