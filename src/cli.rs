//! CLI argument parsing with clap.

use std::io::Read;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Run Google Earth Engine extractions from a JSON configuration.
#[derive(Parser, Debug)]
#[command(name = "gee-extract", version, about)]
pub struct Cli {
    /// Config file path override.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Execute an extraction and print the response envelope.
    Run {
        /// Request JSON file, or `-` for stdin.
        request: String,

        /// Directory in which to keep the request and response of this run.
        #[arg(long)]
        artifacts: Option<PathBuf>,
    },
    /// Validate a request and print the resolved plan without calling the API.
    Validate {
        /// Request JSON file, or `-` for stdin.
        request: String,
    },
    /// Print the satellite and mask catalog.
    Catalog,
}

/// Read a request document from a file path or, for `-`, from stdin.
///
/// # Errors
///
/// Returns an error if the source cannot be read.
pub fn read_request(source: &str) -> Result<String, std::io::Error> {
    if source == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        Ok(text)
    } else {
        std::fs::read_to_string(source)
    }
}
