// SPDX-FileCopyrightText: 2026 Proxyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Proxyline - SMS anonymization relay for two-sided marketplaces.
//!
//! This is the binary entry point for the Proxyline service.

use clap::{Parser, Subcommand};

mod serve;

/// Proxyline - SMS anonymization relay for two-sided marketplaces.
#[derive(Parser, Debug)]
#[command(name = "proxyline", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the relay service (pool reconciliation + presence sweeper).
    Serve,
    /// Print the resolved configuration.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load and validate configuration at startup.
    let config = match proxyline_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            proxyline_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve::run(config).await {
                eprintln!("proxyline serve: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::Config) => {
            match toml::to_string_pretty(&config) {
                Ok(rendered) => println!("{rendered}"),
                Err(e) => {
                    eprintln!("proxyline config: failed to render: {e}");
                    std::process::exit(1);
                }
            }
        }
        None => {
            println!("proxyline: use --help for available commands");
        }
    }
}
