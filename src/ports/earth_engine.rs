//! Earth Engine port: the three remote primitives the extractor needs.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::error::ExtractError;
use crate::expr::Expression;

/// Coordinate reference system used for local downloads.
pub const DOWNLOAD_CRS: &str = "EPSG:4326";

/// A request for a download URL of a single image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadRequest {
    /// Image to download, already clipped to the region and scale.
    pub expression: Expression,
    /// File name (without extension) for the download.
    pub name: String,
    /// Bands to include.
    pub bands: Vec<String>,
    /// Output scale in meters.
    pub scale: u32,
    /// Output CRS code.
    pub crs: String,
    /// One file per band instead of a single multi-band file.
    pub file_per_band: bool,
}

/// A request to export a single image into Google Drive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriveExportRequest {
    /// Image to export, already clipped to the region and scale.
    pub expression: Expression,
    /// Task description shown in the task list.
    pub description: String,
    /// Drive folder receiving the file.
    pub folder: String,
    /// File name prefix inside the folder.
    pub file_name_prefix: String,
    /// Output scale in meters.
    pub scale: u32,
}

/// A started export task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportTask {
    /// Operation resource name, e.g. `projects/p/operations/ID`.
    pub name: String,
}

impl ExportTask {
    /// The task id (last path segment of the operation name).
    #[must_use]
    pub fn id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }
}

/// Boxed future type returned by [`EarthEngine`] methods.
pub type EngineFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ExtractError>> + Send + 'a>>;

/// Evaluates expressions and starts exports against Earth Engine.
pub trait EarthEngine: Send + Sync {
    /// Evaluate an expression and return its JSON value.
    fn compute(&self, expression: &Expression) -> EngineFuture<'_, serde_json::Value>;

    /// Obtain a download URL for an image.
    fn download_url(&self, request: &DownloadRequest) -> EngineFuture<'_, String>;

    /// Start an export task into Google Drive.
    fn export_to_drive(&self, request: &DriveExportRequest) -> EngineFuture<'_, ExportTask>;
}
