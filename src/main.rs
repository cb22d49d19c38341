// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use profile_camera::Config;
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "profile-camera")]
#[command(about = "Selfie capture for the profile completion wizard")]
#[command(version)]
struct Cli {
    /// Configuration file (default: ~/.config/profile-camera/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the selfie step against a simulated camera
    Simulate {
        /// How the simulated camera behaves
        #[arg(short, long, value_enum, default_value_t = cli::Scenario::Happy)]
        scenario: cli::Scenario,

        /// Output file for the picture (default: ./selfie_TIMESTAMP.jpg)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Image file the step already holds when it mounts
        #[arg(short, long)]
        existing: Option<PathBuf>,

        /// Retake once if the step shows a picture after mounting
        #[arg(short, long)]
        retake: bool,
    },

    /// Print the effective configuration as JSON
    Config,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set RUST_LOG to control log level, e.g. RUST_LOG=profile_camera=debug
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Simulate {
            scenario,
            output,
            existing,
            retake,
        } => cli::simulate(config, scenario, output, existing, retake),
        Commands::Config => cli::print_config(&config),
    }
}
