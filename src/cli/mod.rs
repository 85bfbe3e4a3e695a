//! CLI Module
//!
//! Thin command-line driver around the voice pipeline.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::params::{Archetype, Emotion};

/// Aberrant - vocal aberration renderer
#[derive(Parser, Debug)]
#[command(name = "aberrant-cli")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Transform a WAV file and write a 16-bit PCM WAV
    #[command(name = "render")]
    Render {
        /// Input audio file
        input: PathBuf,

        /// Output audio file
        output: PathBuf,

        /// Archetype preset
        #[arg(short, long, default_value = "human")]
        archetype: Archetype,

        /// Emotion layered on top of the preset
        #[arg(short, long)]
        emotion: Option<Emotion>,

        /// Voice config (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the voice seed
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Print the parameters for an archetype
    #[command(name = "describe")]
    Describe {
        /// Archetype preset
        #[arg(short, long, default_value = "human")]
        archetype: Archetype,

        /// Emotion layered on top of the preset
        #[arg(short, long)]
        emotion: Option<Emotion>,

        /// Emit JSON including every kernel's settings
        #[arg(long)]
        json: bool,
    },

    /// Time the pipeline against the real-time block budget
    #[command(name = "profile")]
    Profile {
        /// Archetype preset
        #[arg(short, long, default_value = "zombie")]
        archetype: Archetype,

        /// Seconds of test signal
        #[arg(short, long, default_value_t = 1.0)]
        seconds: f32,

        /// Voice config (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_render() {
        let cli = Cli::try_parse_from([
            "aberrant-cli",
            "render",
            "in.wav",
            "out.wav",
            "--archetype",
            "werewolf",
            "--emotion",
            "anger",
            "--seed",
            "5",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Render {
                archetype,
                emotion,
                seed,
                ..
            }) => {
                assert_eq!(archetype, Archetype::Werewolf);
                assert_eq!(emotion, Some(Emotion::Anger));
                assert_eq!(seed, Some(5));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_rejects_unknown_archetype() {
        let result = Cli::try_parse_from(["aberrant-cli", "describe", "-a", "banshee"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_profile_defaults() {
        let cli = Cli::try_parse_from(["aberrant-cli", "-v", "profile"]).unwrap();
        assert!(cli.verbose);
        match cli.command {
            Some(Commands::Profile {
                archetype, seconds, ..
            }) => {
                assert_eq!(archetype, Archetype::Zombie);
                assert_eq!(seconds, 1.0);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
