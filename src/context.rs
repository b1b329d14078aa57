//! Service context that bundles all port trait objects.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::adapters::live::earth_engine::EarthEngineClient;
use crate::adapters::recording::earth_engine::RecordingEarthEngine;
use crate::adapters::replaying::earth_engine::ReplayingEarthEngine;
use crate::cassette::config::load_cassette;
use crate::cassette::recorder::CassetteRecorder;
use crate::config::{Config, ACCESS_TOKEN_ENV, PROJECT_ENV};
use crate::error::ExtractError;
use crate::ports::EarthEngine;

/// Environment variable naming a cassette to replay.
pub const REPLAY_ENV: &str = "GEE_EXTRACT_REPLAY";
/// Environment variable enabling recording (`1` or `true`).
pub const RECORD_ENV: &str = "GEE_EXTRACT_REC";

/// Bundles all port trait objects into a single context.
pub struct ServiceContext {
    /// Earth Engine port.
    pub engine: Box<dyn EarthEngine>,
}

/// Handle to a recording session that must be finished after use.
pub struct RecordingSession {
    recorder: Arc<Mutex<CassetteRecorder>>,
}

impl RecordingSession {
    /// Finish the recording and write the cassette to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the cassette file cannot be written or the
    /// recording engine is still alive.
    pub fn finish(self) -> Result<PathBuf, String> {
        let recorder = Arc::try_unwrap(self.recorder)
            .map_err(|_| "Recording adapter still has references".to_string())?
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        recorder.finish().map_err(|e| format!("Failed to write cassette: {e}"))
    }
}

impl ServiceContext {
    /// Create a live context for the given project.
    ///
    /// # Errors
    ///
    /// Returns an error if no project or access token is configured.
    pub fn live(project: Option<String>, config: &Config) -> Result<Self, ExtractError> {
        let project = project.ok_or_else(|| ExtractError::MissingCredential {
            what: "Earth Engine project".into(),
            env_var: PROJECT_ENV.into(),
        })?;
        let token = config.access_token().ok_or_else(|| ExtractError::MissingCredential {
            what: "Earth Engine access token".into(),
            env_var: ACCESS_TOKEN_ENV.into(),
        })?;
        tracing::debug!(project = %project, "using live Earth Engine client");
        let engine = EarthEngineClient::new(project, token, config.earthengine.api_base.clone());
        Ok(Self { engine: Box::new(engine) })
    }

    /// Create a recording context that wraps a live client with a recorder.
    ///
    /// # Errors
    ///
    /// Returns an error if the live context cannot be created.
    pub fn recording(
        project: Option<String>,
        config: &Config,
    ) -> Result<(Self, RecordingSession), ExtractError> {
        let live_ctx = Self::live(project, config)?;

        let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H-%M-%S").to_string();
        let path = PathBuf::from(".gee-extract/cassettes")
            .join(&timestamp)
            .join("earth_engine.cassette.yaml");
        let recorder = Arc::new(Mutex::new(CassetteRecorder::new(
            path,
            format!("{timestamp}-earth_engine"),
            get_commit_hash(),
        )));

        let engine = RecordingEarthEngine::new(live_ctx.engine, Arc::clone(&recorder));
        Ok((Self { engine: Box::new(engine) }, RecordingSession { recorder }))
    }

    /// Create a replaying context from a cassette file.
    ///
    /// # Errors
    ///
    /// Returns an error if the cassette file cannot be loaded.
    pub fn replaying(path: &Path) -> Result<Self, ExtractError> {
        let replayer = Arc::new(Mutex::new(load_cassette(path)?));
        Ok(Self { engine: Box::new(ReplayingEarthEngine::new(replayer)) })
    }

    /// Pick the context from the environment: replay, record, or live.
    ///
    /// # Errors
    ///
    /// Returns an error if the selected context cannot be created.
    pub fn from_env(
        project: Option<String>,
        config: &Config,
    ) -> Result<(Self, Option<RecordingSession>), ExtractError> {
        if let Ok(cassette_path) = std::env::var(REPLAY_ENV) {
            tracing::info!(cassette = %cassette_path, "replaying Earth Engine calls");
            return Ok((Self::replaying(Path::new(&cassette_path))?, None));
        }
        if std::env::var(RECORD_ENV).is_ok_and(|v| v == "true" || v == "1") {
            tracing::info!("recording Earth Engine calls");
            let (ctx, session) = Self::recording(project, config)?;
            return Ok((ctx, Some(session)));
        }
        Ok((Self::live(project, config)?, None))
    }
}

/// Get the current git commit hash, or "unknown" if unavailable.
fn get_commit_hash() -> String {
    std::process::Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .map_or_else(|| "unknown".to_string(), |s| s.trim().to_string())
}
