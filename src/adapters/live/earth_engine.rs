//! Live adapter for the Earth Engine REST API (v1).

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::ExtractError;
use crate::expr::Expression;
use crate::ports::earth_engine::{
    DownloadRequest, DriveExportRequest, EarthEngine, EngineFuture, ExportTask,
};

/// Default REST endpoint.
pub const EE_API_BASE: &str = "https://earthengine.googleapis.com/v1";

/// Earth Engine client authenticated with an OAuth access token.
pub struct EarthEngineClient {
    client: Client,
    api_base: String,
    project: String,
    access_token: String,
}

impl EarthEngineClient {
    /// Create a client for the given cloud project.
    #[must_use]
    pub fn new(project: String, access_token: String, api_base: Option<String>) -> Self {
        let api_base = api_base.unwrap_or_else(|| EE_API_BASE.to_string());
        Self {
            client: Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            project,
            access_token,
        }
    }

    fn project_url(&self, method: &str) -> String {
        format!("{}/projects/{}/{method}", self.api_base, self.project)
    }

    /// POST a JSON body and decode the JSON response.
    async fn post<T: DeserializeOwned>(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<T, ExtractError> {
        tracing::debug!(url = %url, "earth engine request");
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.access_token)
            .header("x-goog-user-project", &self.project)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let response_text = response.text().await?;

        if !status.is_success() {
            tracing::warn!(status = %status, url = %url, "earth engine error response");
            return Err(ExtractError::Api {
                status: status.as_u16(),
                message: error_message(&response_text),
            });
        }

        serde_json::from_str(&response_text).map_err(|e| {
            ExtractError::UnexpectedResponse(format!(
                "Failed to parse response: {e}. Body: {}",
                truncate(&response_text)
            ))
        })
    }
}

impl EarthEngine for EarthEngineClient {
    fn compute(&self, expression: &Expression) -> EngineFuture<'_, serde_json::Value> {
        let body = serde_json::json!({ "expression": expression });
        Box::pin(async move {
            let url = self.project_url("value:compute");
            let parsed: ComputeResponse = self.post(&url, &body).await?;
            Ok(parsed.result)
        })
    }

    fn download_url(&self, request: &DownloadRequest) -> EngineFuture<'_, String> {
        let file_format = if request.file_per_band { "ZIPPED_GEO_TIFF_PER_BAND" } else { "ZIPPED_GEO_TIFF" };
        let body = serde_json::json!({
            "expression": request.expression,
            "fileFormat": file_format,
            "bandIds": request.bands,
            "grid": { "crsCode": request.crs },
            "filenamePrefix": request.name,
        });
        Box::pin(async move {
            let url = self.project_url("thumbnails");
            let parsed: NamedResource = self.post(&url, &body).await?;
            Ok(format!("{}/{}:getPixels", self.api_base, parsed.name))
        })
    }

    fn export_to_drive(&self, request: &DriveExportRequest) -> EngineFuture<'_, ExportTask> {
        let body = serde_json::json!({
            "expression": request.expression,
            "description": request.description,
            "fileExportOptions": {
                "fileFormat": "GEO_TIFF",
                "driveDestination": {
                    "folder": request.folder,
                    "filenamePrefix": request.file_name_prefix,
                },
            },
        });
        Box::pin(async move {
            let url = self.project_url("image:export");
            let parsed: NamedResource = self.post(&url, &body).await?;
            Ok(ExportTask { name: parsed.name })
        })
    }
}

/// Pull `error.message` out of a Google API error body, or fall back to the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map_or_else(|_| truncate(body), |envelope| envelope.error.message)
}

fn truncate(text: &str) -> String {
    if text.len() > 500 {
        let cut = (0..=500).rev().find(|&i| text.is_char_boundary(i)).unwrap_or(0);
        format!("{}...", &text[..cut])
    } else {
        text.to_string()
    }
}

// --- Earth Engine API response types ---

#[derive(Deserialize)]
struct ComputeResponse {
    result: serde_json::Value,
}

#[derive(Deserialize)]
struct NamedResource {
    name: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}
