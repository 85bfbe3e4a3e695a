//! Aberrant CLI - Vocal Aberration Renderer
//!
//! Command-line interface for the aberrant voice pipeline.

use clap::Parser;
use env_logger::Env;
use log::info;

use aberrant::cli::{commands, Cli, Commands};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logger
    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    info!("Aberrant v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Some(cmd) => handle_command(cmd),
        None => {
            println!("Aberrant v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            Ok(())
        }
    }
}

fn handle_command(cmd: Commands) -> anyhow::Result<()> {
    match cmd {
        Commands::Render {
            input,
            output,
            archetype,
            emotion,
            config,
            seed,
        } => commands::render(&input, &output, archetype, emotion, config.as_deref(), seed),
        Commands::Describe {
            archetype,
            emotion,
            json,
        } => commands::describe(archetype, emotion, json),
        Commands::Profile {
            archetype,
            seconds,
            config,
        } => commands::profile(archetype, seconds, config.as_deref()),
    }
}
