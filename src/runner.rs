//! Run orchestration: turn a raw request into a prepared run, execute it
//! against an Earth Engine port, and shape the response envelope.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::aoi::{self, Aoi};
use crate::catalog::{self, Satellite};
use crate::config::Config;
use crate::dates::{self, DateWindow};
use crate::error::ExtractError;
use crate::extractor::{DataExtractor, ExportMethod, MaskLayer};
use crate::output::Artifacts;
use crate::ports::EarthEngine;
use crate::request::{self, ExtractionConfig, HowType, MaskConfig};
use crate::validate;

/// Everything needed to run an extraction, resolved without network access.
#[derive(Debug, Clone, Serialize)]
pub struct PreparedRun {
    /// The parsed request.
    #[serde(skip)]
    pub config: ExtractionConfig,
    /// Catalog entry of the requested satellite.
    pub satellite: &'static Satellite,
    /// Bands to select.
    pub bands: Vec<String>,
    /// Area of interest.
    pub aoi: Aoi,
    /// One window per requested year.
    pub windows: Vec<DateWindow>,
    /// Mask applied to every image, if any.
    pub mask: Option<MaskLayer>,
    /// Export destination.
    pub export_method: ExportMethod,
}

/// Summary of a finished extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Always `success`.
    pub status: &'static str,
    /// Number of images left after filter, select and mask.
    pub images_found: u64,
    /// `drive` or `local`.
    pub export_method: ExportMethod,
    /// Earth Engine collection asset id.
    pub collection: String,
    /// Whether a mask was applied.
    pub mask_applied: bool,
    /// Mask filters as submitted.
    pub mask_filters: BTreeMap<String, String>,
    /// Method-specific export details.
    pub export_details: BTreeMap<String, String>,
}

/// JSON envelope printed for every `run`.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Response {
    /// The extraction ran.
    Success {
        /// Run summary.
        summary: RunSummary,
        /// Where the request and response were written.
        #[serde(skip_serializing_if = "Option::is_none")]
        artifacts: Option<Artifacts>,
    },
    /// Preparation or execution failed.
    Error {
        /// Human-readable error.
        message: String,
        /// Where the request and response were written.
        #[serde(skip_serializing_if = "Option::is_none")]
        artifacts: Option<Artifacts>,
    },
}

impl Response {
    /// Envelope for a successful run.
    #[must_use]
    pub fn success(summary: RunSummary) -> Self {
        Self::Success { summary, artifacts: None }
    }

    /// Envelope for a failed run.
    #[must_use]
    pub fn error(err: &ExtractError) -> Self {
        Self::Error { message: err.to_string(), artifacts: None }
    }

    /// Attach artifact paths to the envelope.
    #[must_use]
    pub fn with_artifacts(mut self, paths: Artifacts) -> Self {
        match &mut self {
            Self::Success { artifacts, .. } | Self::Error { artifacts, .. } => {
                *artifacts = Some(paths);
            }
        }
        self
    }
}

/// Parse, validate and resolve a raw request.
///
/// # Errors
///
/// Returns a client error for malformed requests, unknown catalog ids and
/// unsupported areas of interest.
pub fn prepare(raw: &serde_json::Value) -> Result<PreparedRun, ExtractError> {
    let config = request::parse(raw)?;
    validate::validate_config(&config)?;

    let satellite = catalog::satellite(&config.satellite_id)?;
    let aoi = aoi::build_aoi(&config.location)?;
    let mask = prepare_mask(&config.mask)?;

    let when = config.when;
    let (start_doy, end_doy) = validate::validate_doy(when.start_doy, when.end_doy)?;
    let windows = dates::yearly_windows(when.start_year, when.end_year, start_doy, end_doy)?;
    warn_on_rollover(&windows, start_doy, end_doy);

    let export_method = match config.how.kind {
        HowType::Drive => ExportMethod::Drive,
        HowType::Local => ExportMethod::Local,
    };

    tracing::debug!(
        satellite = satellite.id,
        windows = windows.len(),
        masked = mask.is_some(),
        method = export_method.as_str(),
        "run prepared"
    );

    Ok(PreparedRun {
        bands: config.what.bands.clone(),
        config,
        satellite,
        aoi,
        windows,
        mask,
        export_method,
    })
}

/// A disabled mask, or an enabled one without an id, applies nothing.
fn prepare_mask(mask: &MaskConfig) -> Result<Option<MaskLayer>, ExtractError> {
    if !mask.enabled {
        return Ok(None);
    }
    let Some(meta) = catalog::mask(mask.mask_id.as_deref())? else {
        return Ok(None);
    };
    for key in mask.filters.keys() {
        if !meta.filters.contains(&key.as_str()) {
            tracing::warn!(mask = meta.id, filter = %key, "mask filter is not a known property");
        }
    }
    Ok(Some(MaskLayer {
        collection_name: meta.ee_collection_name.to_string(),
        filters: mask.filters.clone(),
        band: meta.default_band.to_string(),
    }))
}

fn warn_on_rollover(windows: &[DateWindow], start_doy: u32, end_doy: u32) {
    for window in windows.iter().filter(|w| dates::rolled_over(w, start_doy, end_doy)) {
        tracing::warn!(
            start = %window.start,
            end = %window.end,
            "day 366 of a common year rolls over to January 1st"
        );
    }
}

/// Run filter, select, mask and export for a prepared request.
///
/// # Errors
///
/// Returns an error if any Earth Engine call fails.
pub async fn execute(
    prepared: &PreparedRun,
    engine: &dyn EarthEngine,
    config: &Config,
) -> Result<RunSummary, ExtractError> {
    let mut extractor = DataExtractor::new(
        prepared.satellite.ee_collection_name,
        prepared.windows.clone(),
        prepared.aoi,
        prepared.bands.clone(),
        prepared.satellite.pixel_size,
        prepared.mask.clone(),
    );

    let images_found = extractor.process(engine).await?;
    tracing::info!(images_found, collection = prepared.satellite.ee_collection_name, "collection filtered");

    let drive_folder = config.drive_folder(prepared.config.settings.drive_folder.as_deref());
    let prefix = config.output_prefix(prepared.config.how.output_filename.as_deref());
    let export = extractor.export(engine, prepared.export_method, &drive_folder, &prefix).await?;

    Ok(RunSummary {
        status: "success",
        images_found,
        export_method: export.method,
        collection: prepared.satellite.ee_collection_name.to_string(),
        mask_applied: prepared.mask.is_some(),
        mask_filters: prepared.config.mask.filters.clone(),
        export_details: export.extra,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::config::DefaultsConfig;
    use crate::extractor::tests::FakeEngine;
    use crate::request::tests::sample_config;

    fn with_mask(mut raw: serde_json::Value, mask: serde_json::Value) -> serde_json::Value {
        raw["mask"] = mask;
        raw
    }

    #[test]
    fn prepare_sample() {
        let prepared = prepare(&sample_config()).unwrap();
        assert_eq!(prepared.satellite.id, "CHIRPS_DAILY");
        assert_eq!(prepared.windows.len(), 1);
        assert_eq!(prepared.export_method, ExportMethod::Drive);
        assert!(prepared.mask.is_none());
    }

    #[test]
    fn prepare_checks_keys_before_values() {
        let mut raw = sample_config();
        raw.as_object_mut().unwrap().remove("mask");
        raw["when"]["startDoy"] = json!(400);
        let err = prepare(&raw).unwrap_err();
        assert_eq!(err.to_string(), "Missing configuration keys: mask");
    }

    #[test]
    fn prepare_rejects_bad_doy() {
        let mut raw = sample_config();
        raw["when"]["endDoy"] = json!(0);
        let err = prepare(&raw).unwrap_err();
        assert!(err.is_client_error());
        assert_eq!(err.to_string(), "Validation error: Day of year must be between 1 and 366");
    }

    #[test]
    fn prepare_rejects_wrap_past_last_year() {
        let mut raw = sample_config();
        raw["when"] = json!({"startYear": i32::MAX, "endYear": i32::MAX, "startDoy": 10, "endDoy": 5});
        let err = prepare(&raw).unwrap_err();
        assert!(err.is_client_error());
        assert_eq!(err.to_string(), format!("Validation error: year {} is out of range", i32::MAX));
    }

    #[test]
    fn prepare_rejects_unrepresentable_span_without_walking_it() {
        let mut raw = sample_config();
        raw["when"] = json!({"startYear": i32::MIN, "endYear": i32::MAX, "startDoy": 366, "endDoy": 1});
        let err = prepare(&raw).unwrap_err();
        assert_eq!(err.to_string(), format!("Validation error: year {} is out of range", i32::MIN));
    }

    #[test]
    fn prepare_rejects_negative_day() {
        let mut raw = sample_config();
        raw["when"]["startDoy"] = json!(-5);
        let err = prepare(&raw).unwrap_err();
        assert_eq!(err.to_string(), "Validation error: Day of year must be between 1 and 366");
    }

    #[test]
    fn prepare_accepts_day_366_in_common_year() {
        let mut raw = sample_config();
        raw["when"] = json!({"startYear": 2021, "endYear": 2021, "startDoy": 1, "endDoy": 366});
        let prepared = prepare(&raw).unwrap();
        assert_eq!(prepared.windows[0].end.to_string(), "2022-01-01");
    }

    #[test]
    fn prepare_rejects_unknown_satellite() {
        let mut raw = sample_config();
        raw["satelliteId"] = json!("LANDSAT_9");
        assert!(matches!(prepare(&raw), Err(ExtractError::UnknownSatellite(_))));
    }

    #[test]
    fn prepare_rejects_gadm() {
        let mut raw = sample_config();
        raw["where"]["type"] = json!("GADM Shape");
        let err = prepare(&raw).unwrap_err();
        assert_eq!(err.to_string(), "GADM Shape AOI is not yet implemented in the extraction runner.");
    }

    #[test]
    fn enabled_mask_without_id_is_skipped() {
        let raw = with_mask(sample_config(), json!({"enabled": true, "maskId": null, "filters": {}}));
        assert!(prepare(&raw).unwrap().mask.is_none());
    }

    #[test]
    fn unknown_mask_is_rejected() {
        let raw = with_mask(sample_config(), json!({"enabled": true, "maskId": "NOPE", "filters": {}}));
        assert!(matches!(prepare(&raw), Err(ExtractError::UnknownMask(_))));
    }

    #[test]
    fn worldcereal_mask_uses_catalog_band() {
        let raw = with_mask(
            sample_config(),
            json!({"enabled": true, "maskId": "ESA_WORLDCEREAL_V100", "filters": {"product": "temporarycrops"}}),
        );
        let mask = prepare(&raw).unwrap().mask.unwrap();
        assert_eq!(mask.collection_name, "ESA/WorldCereal/2021/MODELS/v100");
        assert_eq!(mask.band, "classification");
        assert_eq!(mask.filters["product"], "temporarycrops");
    }

    #[test]
    fn plan_serializes_without_request() {
        let plan = serde_json::to_value(prepare(&sample_config()).unwrap()).unwrap();
        assert_eq!(plan["satellite"]["ee_collection_name"], "UCSB-CHG/CHIRPS/DAILY");
        assert_eq!(plan["windows"][0]["start"], "2020-01-01");
        assert_eq!(plan["windows"][0]["end"], "2020-01-02");
        assert_eq!(plan["export_method"], "drive");
        assert!(plan.get("config").is_none());
    }

    #[tokio::test]
    async fn execute_drive_export() {
        let prepared = prepare(&sample_config()).unwrap();
        let engine = FakeEngine::with_results(vec![json!(2), json!(1_577_836_800_000_i64)]);
        let summary = execute(&prepared, &engine, &Config::default()).await.unwrap();

        assert_eq!(summary.status, "success");
        assert_eq!(summary.images_found, 2);
        assert_eq!(summary.export_method, ExportMethod::Drive);
        assert_eq!(summary.collection, "UCSB-CHG/CHIRPS/DAILY");
        assert!(!summary.mask_applied);
        assert_eq!(summary.export_details["task_description"], "chirps_test_2020-01-01");
        assert_eq!(summary.export_details["drive_folder"], "GEE_TESTS");
    }

    #[tokio::test]
    async fn execute_local_falls_back_to_default_prefix() {
        let mut raw = sample_config();
        raw["how"] = json!({"type": "Local Folder", "localPath": "/tmp", "outputFilename": ""});
        let prepared = prepare(&raw).unwrap();
        let engine = FakeEngine::with_results(vec![json!(1), json!(1_577_836_800_000_i64)]);
        let summary = execute(&prepared, &engine, &Config::default()).await.unwrap();

        assert_eq!(summary.export_method, ExportMethod::Local);
        assert_eq!(
            summary.export_details["download_url"],
            "https://example.com/download/gee_export_2020-01-01"
        );
    }

    #[tokio::test]
    async fn execute_uses_configured_drive_folder() {
        let mut raw = sample_config();
        raw["settings"]["driveFolder"] = json!("");
        let prepared = prepare(&raw).unwrap();
        let engine = FakeEngine::with_results(vec![json!(1), json!(1_577_836_800_000_i64)]);
        let config = Config {
            defaults: DefaultsConfig { drive_folder: "FROM_CONFIG".into(), output_prefix: "x".into() },
            ..Config::default()
        };
        let summary = execute(&prepared, &engine, &config).await.unwrap();
        assert_eq!(summary.export_details["drive_folder"], "FROM_CONFIG");
    }

    #[tokio::test]
    async fn execute_reports_mask_filters() {
        let raw = with_mask(
            sample_config(),
            json!({"enabled": true, "maskId": "ESA_WORLDCEREAL_V100", "filters": {"season": "tc-annual"}}),
        );
        let prepared = prepare(&raw).unwrap();
        let engine = FakeEngine::with_results(vec![json!(0)]);
        let summary = execute(&prepared, &engine, &Config::default()).await.unwrap();
        assert!(summary.mask_applied);
        assert_eq!(summary.mask_filters["season"], "tc-annual");
        assert_eq!(summary.images_found, 0);
        assert!(summary.export_details.is_empty());
    }

    #[test]
    fn error_envelope() {
        let response = Response::error(&ExtractError::UnknownSatellite("X".into()));
        let value = serde_json::to_value(response).unwrap();
        assert_eq!(value, json!({"status": "error", "message": "Unknown satellite id: X"}));
    }

    #[test]
    fn success_envelope_with_artifacts() {
        let summary = RunSummary {
            status: "success",
            images_found: 1,
            export_method: ExportMethod::Local,
            collection: "c".into(),
            mask_applied: false,
            mask_filters: BTreeMap::new(),
            export_details: BTreeMap::new(),
        };
        let response = Response::success(summary).with_artifacts(Artifacts {
            config_path: "/tmp/a/config.json".into(),
            output_path: "/tmp/a/output.json".into(),
        });
        let value = serde_json::to_value(response).unwrap();
        assert_eq!(value["status"], "success");
        assert_eq!(value["summary"]["status"], "success");
        assert_eq!(value["summary"]["export_method"], "local");
        assert_eq!(value["artifacts"]["output_path"], "/tmp/a/output.json");
    }
}
