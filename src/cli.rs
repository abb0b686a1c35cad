//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};

use tsbuild::exit_codes;
use tsbuild::output::OutputConfig;

use crate::commands;

/// tsbuild - Build TypeScript project reference graphs
#[derive(Parser, Debug)]
#[command(name = "tsbuild")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the projects reachable from the given roots, in dependency order
    Build(commands::build::BuildArgs),

    /// Show the project reference tree and its build levels
    Graph(commands::graph::GraphArgs),

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

impl Cli {
    /// Execute the CLI command and return the process exit code.
    pub fn execute(self) -> Result<u8> {
        init_logging(&self.log_level);
        let output = OutputConfig::from_env_and_flag(&self.color);

        match self.command {
            Commands::Build(args) => commands::build::execute(args, &output),
            Commands::Graph(args) => {
                commands::graph::execute(args, &output).map(|()| exit_codes::SUCCESS)
            }
            Commands::Completions(args) => {
                commands::completions::execute(args).map(|()| exit_codes::SUCCESS)
            }
        }
    }
}

/// `RUST_LOG` wins over `--log-level`.
fn init_logging(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    // A logger may already be installed when running under a test harness.
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .try_init();
}

/// Exit code for an error that aborted the command.
///
/// Library errors keep their own code even when wrapped with hints.
pub fn exit_code_for(error: &anyhow::Error) -> u8 {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<tsbuild::error::Error>())
        .map_or(exit_codes::GENERAL_ERROR, exit_codes::for_error)
}
