//! gee-extract - Google Earth Engine extraction CLI.

mod adapters;
mod aoi;
mod cassette;
mod catalog;
mod cli;
mod config;
mod context;
mod dates;
mod error;
mod expr;
mod extractor;
mod output;
mod ports;
mod request;
mod runner;
mod validate;

use std::path::Path;
use std::process;

use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::config::Config;
use crate::context::ServiceContext;
use crate::error::ExtractError;
use crate::output::ArtifactDir;
use crate::runner::{PreparedRun, Response, RunSummary};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "info,gee_extract=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<i32, ExtractError> {
    let config_path = config::discover_config_path(cli.config.as_deref());
    let config = Config::load(&config_path).map_err(ExtractError::Config)?;
    tracing::debug!(path = %config_path.display(), "config loaded");

    match cli.command {
        Command::Run { request, artifacts } => {
            let text = cli::read_request(&request)?;
            run_command(&text, artifacts.as_deref(), &config).await
        }
        Command::Validate { request } => {
            let text = cli::read_request(&request)?;
            match parse_request(&text).and_then(|raw| runner::prepare(&raw)) {
                Ok(prepared) => emit(&prepared, 0),
                Err(e) => emit(&Response::error(&e), exit_code(&e)),
            }
        }
        Command::Catalog => emit(&catalog::listing(), 0),
    }
}

async fn run_command(
    text: &str,
    artifacts: Option<&Path>,
    config: &Config,
) -> Result<i32, ExtractError> {
    let (raw, prepared) = match parse_request(text).and_then(|raw| {
        let prepared = runner::prepare(&raw)?;
        Ok((raw, prepared))
    }) {
        Ok(ready) => ready,
        Err(e) => return emit(&Response::error(&e), exit_code(&e)),
    };

    let artifact_dir = artifacts.map(|base| ArtifactDir::create(base, &raw)).transpose()?;

    let (response, code) = match execute(&prepared, config).await {
        Ok(summary) => (Response::success(summary), 0),
        Err(e) => {
            tracing::error!(error = %e, "extraction failed");
            (Response::error(&e), exit_code(&e))
        }
    };

    let response = match artifact_dir {
        Some(dir) => {
            dir.write_output(&response)?;
            response.with_artifacts(dir.artifacts())
        }
        None => response,
    };
    emit(&response, code)
}

/// Build the engine context, run the extraction, and finish any recording.
async fn execute(prepared: &PreparedRun, config: &Config) -> Result<RunSummary, ExtractError> {
    let project = config.project(prepared.config.settings.gee_project.as_deref());
    let (ctx, recording_session) = ServiceContext::from_env(project, config)?;

    let result = runner::execute(prepared, ctx.engine.as_ref(), config).await;
    drop(ctx);

    if let Some(session) = recording_session {
        match session.finish() {
            Ok(path) => tracing::info!(path = %path.display(), "cassette saved"),
            Err(e) => tracing::warn!(error = %e, "failed to save cassette"),
        }
    }

    result
}

fn parse_request(text: &str) -> Result<serde_json::Value, ExtractError> {
    serde_json::from_str(text)
        .map_err(|e| ExtractError::Validation(format!("Validation error: request is not valid JSON: {e}")))
}

fn exit_code(err: &ExtractError) -> i32 {
    if err.is_client_error() {
        2
    } else {
        1
    }
}

fn emit<T: Serialize>(value: &T, code: i32) -> Result<i32, ExtractError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(code)
}
