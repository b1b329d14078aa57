//! Recording adapter for the `EarthEngine` port.

use std::sync::{Arc, Mutex};

use super::record_result;
use crate::cassette::recorder::CassetteRecorder;
use crate::expr::Expression;
use crate::ports::earth_engine::{
    DownloadRequest, DriveExportRequest, EarthEngine, EngineFuture, ExportTask,
};

const PORT: &str = "earth_engine";

/// Records every call while delegating to an inner engine.
pub struct RecordingEarthEngine {
    inner: Box<dyn EarthEngine>,
    recorder: Arc<Mutex<CassetteRecorder>>,
}

impl RecordingEarthEngine {
    /// Wrap `inner`, writing interactions into `recorder`.
    pub fn new(inner: Box<dyn EarthEngine>, recorder: Arc<Mutex<CassetteRecorder>>) -> Self {
        Self { inner, recorder }
    }
}

impl EarthEngine for RecordingEarthEngine {
    fn compute(&self, expression: &Expression) -> EngineFuture<'_, serde_json::Value> {
        let expression = expression.clone();
        Box::pin(async move {
            let result = self.inner.compute(&expression).await;
            record_result(&self.recorder, PORT, "compute", &expression, &result);
            result
        })
    }

    fn download_url(&self, request: &DownloadRequest) -> EngineFuture<'_, String> {
        let request = request.clone();
        Box::pin(async move {
            let result = self.inner.download_url(&request).await;
            record_result(&self.recorder, PORT, "download_url", &request, &result);
            result
        })
    }

    fn export_to_drive(&self, request: &DriveExportRequest) -> EngineFuture<'_, ExportTask> {
        let request = request.clone();
        Box::pin(async move {
            let result = self.inner.export_to_drive(&request).await;
            record_result(&self.recorder, PORT, "export_to_drive", &request, &result);
            result
        })
    }
}
