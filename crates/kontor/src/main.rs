// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Kontor, a streaming CRM assistant backend.
//!
//! This is the binary entry point. Configuration is loaded and validated
//! before any subcommand runs, so every command starts from a known-good
//! config or a rendered diagnostic.

use clap::{Parser, Subcommand};

mod credential;
mod doctor;
mod serve;
mod shutdown;

/// Kontor, a streaming CRM assistant backend.
#[derive(Parser, Debug)]
#[command(name = "kontor", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the assistant gateway server.
    Serve,
    /// Run configuration and environment checks.
    Doctor {
        /// Run additional intensive checks.
        #[arg(long)]
        deep: bool,
        /// Disable colored output.
        #[arg(long)]
        plain: bool,
    },
    /// Manage provider credentials in the vault.
    Credential {
        #[command(subcommand)]
        action: credential::CredentialAction,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match kontor_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            kontor_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Doctor { deep, plain }) => doctor::run_doctor(&config, deep, plain).await,
        Some(Commands::Credential { action }) => credential::run(&config, action).await,
        None => {
            println!("kontor: use --help for available commands");
            Ok(())
        }
    };

    if let Err(error) = result {
        eprintln!("kontor: {error}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn binary_loads_config_defaults() {
        let config = kontor_config::load_and_validate().expect("default config should be valid");
        assert_eq!(config.server.port, 8087);
    }
}
