//! Replaying adapter for the `EarthEngine` port.

use std::sync::{Arc, Mutex};

use super::replay_next;
use crate::cassette::replayer::CassetteReplayer;
use crate::expr::Expression;
use crate::ports::earth_engine::{
    DownloadRequest, DriveExportRequest, EarthEngine, EngineFuture, ExportTask,
};

const PORT: &str = "earth_engine";

/// Serves Earth Engine results from a cassette. Inputs are not compared
/// against the recording.
pub struct ReplayingEarthEngine {
    replayer: Arc<Mutex<CassetteReplayer>>,
}

impl ReplayingEarthEngine {
    /// Create an engine backed by the given replayer.
    #[must_use]
    pub fn new(replayer: Arc<Mutex<CassetteReplayer>>) -> Self {
        Self { replayer }
    }
}

impl EarthEngine for ReplayingEarthEngine {
    fn compute(&self, _expression: &Expression) -> EngineFuture<'_, serde_json::Value> {
        let result = replay_next(&self.replayer, PORT, "compute");
        Box::pin(async move { result })
    }

    fn download_url(&self, _request: &DownloadRequest) -> EngineFuture<'_, String> {
        let result = replay_next(&self.replayer, PORT, "download_url");
        Box::pin(async move { result })
    }

    fn export_to_drive(&self, _request: &DriveExportRequest) -> EngineFuture<'_, ExportTask> {
        let result = replay_next(&self.replayer, PORT, "export_to_drive");
        Box::pin(async move { result })
    }
}
