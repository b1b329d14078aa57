//! Extraction pipeline: filter, select, mask and export against Earth Engine.
//!
//! Nothing here touches pixels. The extractor assembles expression graphs
//! and hands them to an [`EarthEngine`] implementation, which evaluates them
//! remotely.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::aoi::Aoi;
use crate::dates::{self, DateWindow};
use crate::error::ExtractError;
use crate::expr::{self, Expression, ValueNode};
use crate::ports::earth_engine::DOWNLOAD_CRS;
use crate::ports::{DownloadRequest, DriveExportRequest, EarthEngine};

/// Where the extracted image is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportMethod {
    /// Export task into Google Drive.
    Drive,
    /// Download URL.
    Local,
}

impl ExportMethod {
    /// Wire name used in run summaries.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Drive => "drive",
            Self::Local => "local",
        }
    }
}

/// Outcome of an export request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportResult {
    /// Method that was used.
    pub method: ExportMethod,
    /// Short outcome tag: `no-images`, `task-started` or `url-generated`.
    pub description: String,
    /// Method-specific details.
    pub extra: BTreeMap<String, String>,
}

/// A boolean mask derived from another collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaskLayer {
    /// Mask collection asset id.
    pub collection_name: String,
    /// Property equality filters applied to the mask collection.
    pub filters: BTreeMap<String, String>,
    /// Band whose non-zero pixels are kept.
    pub band: String,
}

impl MaskLayer {
    /// Mask image: mosaic of the filtered collection, `band != 0`.
    #[must_use]
    pub fn image(&self) -> ValueNode {
        let collection = self
            .filters
            .iter()
            .fold(expr::load_collection(&self.collection_name), |c, (key, value)| {
                expr::filter_eq(c, key, value)
            });
        let band = [self.band.clone()];
        expr::neq(expr::select_image(expr::mosaic(collection), &band), 0)
    }
}

/// Extraction of one collection over a set of yearly windows.
#[derive(Debug, Clone)]
pub struct DataExtractor {
    collection_name: String,
    windows: Vec<DateWindow>,
    aoi: Aoi,
    bands: Vec<String>,
    scale: u32,
    mask: Option<MaskLayer>,
    processed: Option<Processed>,
}

#[derive(Debug, Clone)]
struct Processed {
    collection: ValueNode,
    size: u64,
}

impl DataExtractor {
    /// Create an extractor. `windows` must be non-empty to match anything.
    #[must_use]
    pub fn new(
        collection_name: impl Into<String>,
        windows: Vec<DateWindow>,
        aoi: Aoi,
        bands: Vec<String>,
        scale: u32,
        mask: Option<MaskLayer>,
    ) -> Self {
        Self {
            collection_name: collection_name.into(),
            windows,
            aoi,
            bands,
            scale,
            mask,
            processed: None,
        }
    }

    /// The filtered, band-selected and masked collection.
    #[must_use]
    pub fn pipeline(&self) -> ValueNode {
        let load = || expr::load_collection(&self.collection_name);
        let filtered = self
            .windows
            .iter()
            .map(|w| expr::filter_date(load(), w.start_millis(), w.end_millis()))
            .reduce(expr::merge)
            // No windows: an empty date range matches nothing.
            .unwrap_or_else(|| expr::filter_date(load(), 0, 0));

        let selected = expr::select_collection(filtered, &self.bands);

        match &self.mask {
            Some(mask) => {
                expr::map(selected, expr::update_mask(expr::map_argument(), mask.image()))
            }
            None => selected,
        }
    }

    /// Run filter, select and mask remotely and return the number of images.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails or returns a non-integer size.
    pub async fn process(&mut self, engine: &dyn EarthEngine) -> Result<u64, ExtractError> {
        let collection = self.pipeline();
        let value = engine.compute(&Expression::new(expr::size(collection.clone()))).await?;
        let size = value.as_u64().ok_or_else(|| {
            ExtractError::UnexpectedResponse(format!("Collection size is not a count: {value}"))
        })?;
        tracing::debug!(collection = %self.collection_name, size, "collection processed");
        self.processed = Some(Processed { collection, size });
        Ok(size)
    }

    /// Export the first image of the processed collection.
    ///
    /// Processes the collection first if [`process`](Self::process) has not
    /// run yet.
    ///
    /// # Errors
    ///
    /// Returns an error if any API call fails.
    pub async fn export(
        &mut self,
        engine: &dyn EarthEngine,
        method: ExportMethod,
        drive_folder: &str,
        file_name_prefix: &str,
    ) -> Result<ExportResult, ExtractError> {
        if self.processed.is_none() {
            self.process(engine).await?;
        }
        let Some(processed) = self.processed.as_ref() else {
            return Err(ExtractError::Config("collection was not processed".to_string()));
        };

        if processed.size == 0 {
            return Ok(ExportResult {
                method,
                description: "no-images".to_string(),
                extra: BTreeMap::new(),
            });
        }

        let image = expr::first(processed.collection.clone());
        let time_start = engine
            .compute(&Expression::new(expr::get_property(image.clone(), "system:time_start")))
            .await?;
        let millis = time_start.as_f64().ok_or_else(|| {
            ExtractError::UnexpectedResponse(format!("Image has no system:time_start: {time_start}"))
        })?;
        #[allow(clippy::cast_possible_truncation)]
        let image_date = dates::format_millis(millis as i64)?;
        let final_prefix = format!("{file_name_prefix}_{image_date}");

        let clipped =
            Expression::new(expr::clip_to_bounds_and_scale(image, self.aoi.bounds(), self.scale));

        let mut extra = BTreeMap::new();
        let description = match method {
            ExportMethod::Drive => {
                let request = DriveExportRequest {
                    expression: clipped,
                    description: final_prefix.replace(' ', "_"),
                    folder: drive_folder.to_string(),
                    file_name_prefix: final_prefix.clone(),
                    scale: self.scale,
                };
                let task = engine.export_to_drive(&request).await?;
                tracing::info!(task = %task.name, folder = %drive_folder, "drive export started");
                extra.insert("task_description".to_string(), final_prefix);
                extra.insert("drive_folder".to_string(), drive_folder.to_string());
                extra.insert("task_id".to_string(), task.id().to_string());
                "task-started"
            }
            ExportMethod::Local => {
                let request = DownloadRequest {
                    expression: clipped,
                    name: final_prefix,
                    bands: self.bands.clone(),
                    scale: self.scale,
                    crs: DOWNLOAD_CRS.to_string(),
                    file_per_band: false,
                };
                let url = engine.download_url(&request).await?;
                tracing::info!(url = %url, "download url generated");
                extra.insert("download_url".to_string(), url);
                "url-generated"
            }
        };

        Ok(ExportResult { method, description: description.to_string(), extra })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use chrono::NaiveDate;
    use serde_json::json;

    use super::*;
    use crate::ports::earth_engine::EngineFuture;
    use crate::ports::ExportTask;

    /// Scripted engine: returns queued compute values and records every call.
    #[derive(Default)]
    pub(crate) struct FakeEngine {
        pub(crate) compute_results: Mutex<Vec<serde_json::Value>>,
        pub(crate) computed: Mutex<Vec<Expression>>,
        pub(crate) downloads: Mutex<Vec<DownloadRequest>>,
        pub(crate) exports: Mutex<Vec<DriveExportRequest>>,
    }

    impl FakeEngine {
        pub(crate) fn with_results(results: Vec<serde_json::Value>) -> Self {
            let engine = Self::default();
            *engine.compute_results.lock().unwrap() = results;
            engine
        }
    }

    impl EarthEngine for FakeEngine {
        fn compute(&self, expression: &Expression) -> EngineFuture<'_, serde_json::Value> {
            self.computed.lock().unwrap().push(expression.clone());
            let next = self.compute_results.lock().unwrap().remove(0);
            Box::pin(async move { Ok(next) })
        }

        fn download_url(&self, request: &DownloadRequest) -> EngineFuture<'_, String> {
            self.downloads.lock().unwrap().push(request.clone());
            let url = format!("https://example.com/download/{}", request.name);
            Box::pin(async move { Ok(url) })
        }

        fn export_to_drive(&self, request: &DriveExportRequest) -> EngineFuture<'_, ExportTask> {
            self.exports.lock().unwrap().push(request.clone());
            Box::pin(async { Ok(ExportTask { name: "projects/p/operations/TASK1".into() }) })
        }
    }

    fn window(y: i32) -> DateWindow {
        DateWindow {
            start: NaiveDate::from_ymd_opt(y, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(y, 1, 3).unwrap(),
        }
    }

    fn extractor(windows: Vec<DateWindow>, mask: Option<MaskLayer>) -> DataExtractor {
        DataExtractor::new(
            "UCSB-CHG/CHIRPS/DAILY",
            windows,
            Aoi::Point { lon: -84.0, lat: 10.0 },
            vec!["precipitation".to_string()],
            5566,
            mask,
        )
    }

    fn worldcereal() -> MaskLayer {
        MaskLayer {
            collection_name: "ESA/WorldCereal/2021/MODELS/v100".into(),
            filters: BTreeMap::from([
                ("product".to_string(), "temporarycrops".to_string()),
                ("season".to_string(), "tc-annual".to_string()),
            ]),
            band: "classification".into(),
        }
    }

    /// The exported image is clipped to the AOI bounds at the satellite scale.
    fn assert_clipped_to_aoi(expression: &Expression) {
        let root = expression.root().unwrap();
        assert_eq!(root.function_name(), Some("Image.clipToBoundsAndScale"));
        assert_eq!(root.argument("scale"), Some(&ValueNode::constant(5566_u32)));

        let region = root.argument("geometry").unwrap();
        assert_eq!(region.function_name(), Some("Geometry.bounds"));
        let point = region.argument("geometry").unwrap();
        assert_eq!(point.function_name(), Some("GeometryConstructors.Point"));
        assert_eq!(point.argument("coordinates"), Some(&ValueNode::constant(vec![-84.0, 10.0])));
    }

    #[test]
    fn pipeline_merges_years_then_selects() {
        let pipeline = extractor(vec![window(2020), window(2021)], None).pipeline();
        assert_eq!(pipeline.function_name(), Some("Collection.map"));
        let merged = pipeline.argument("collection").unwrap();
        assert_eq!(merged.function_name(), Some("ImageCollection.merge"));
        assert_eq!(
            merged.argument("collection1").and_then(ValueNode::function_name),
            Some("Collection.filter")
        );
    }

    #[test]
    fn single_window_is_not_merged() {
        let pipeline = extractor(vec![window(2020)], None).pipeline();
        let filtered = pipeline.argument("collection").unwrap();
        assert_eq!(filtered.function_name(), Some("Collection.filter"));
    }

    #[test]
    fn mask_is_mapped_over_selection() {
        let pipeline = extractor(vec![window(2020)], Some(worldcereal())).pipeline();
        let body = pipeline.argument("baseAlgorithm").and_then(ValueNode::pending_body).unwrap();
        assert_eq!(body.function_name(), Some("Image.updateMask"));
        let mask = body.argument("mask").unwrap();
        assert_eq!(mask.function_name(), Some("Image.neq"));
    }

    #[test]
    fn mask_image_filters_each_property() {
        let image = worldcereal().image();
        let text = serde_json::to_string(&image).unwrap();
        assert!(text.contains("temporarycrops"));
        assert!(text.contains("tc-annual"));
        assert!(text.contains("ImageCollection.mosaic"));
        assert!(text.contains("classification"));
    }

    #[tokio::test]
    async fn process_returns_size() {
        let engine = FakeEngine::with_results(vec![json!(2)]);
        let mut ex = extractor(vec![window(2020)], None);
        assert_eq!(ex.process(&engine).await.unwrap(), 2);
        let computed = engine.computed.lock().unwrap();
        assert_eq!(computed[0].root().and_then(ValueNode::function_name), Some("Collection.size"));
    }

    #[tokio::test]
    async fn non_integer_size_is_unexpected_response() {
        let engine = FakeEngine::with_results(vec![json!("many")]);
        let mut ex = extractor(vec![window(2020)], None);
        assert!(matches!(ex.process(&engine).await, Err(ExtractError::UnexpectedResponse(_))));
    }

    #[tokio::test]
    async fn missing_time_start_is_unexpected_response() {
        let engine = FakeEngine::with_results(vec![json!(1), serde_json::Value::Null]);
        let mut ex = extractor(vec![window(2020)], None);
        let err = ex.export(&engine, ExportMethod::Local, "", "p").await.unwrap_err();
        assert!(matches!(err, ExtractError::UnexpectedResponse(_)));
        assert!(engine.downloads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn export_without_images() {
        let engine = FakeEngine::with_results(vec![json!(0)]);
        let mut ex = extractor(vec![window(2020)], None);
        ex.process(&engine).await.unwrap();
        let result = ex.export(&engine, ExportMethod::Drive, "GEE", "prefix").await.unwrap();
        assert_eq!(result.description, "no-images");
        assert!(result.extra.is_empty());
        assert!(engine.exports.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn drive_export_uses_dated_prefix() {
        let engine = FakeEngine::with_results(vec![json!(2), json!(1_577_836_800_000_i64)]);
        let mut ex = extractor(vec![window(2020)], None);
        ex.process(&engine).await.unwrap();
        let result =
            ex.export(&engine, ExportMethod::Drive, "GEE_TESTS", "chirps test").await.unwrap();

        assert_eq!(result.method, ExportMethod::Drive);
        assert_eq!(result.description, "task-started");
        assert_eq!(result.extra["task_description"], "chirps test_2020-01-01");
        assert_eq!(result.extra["drive_folder"], "GEE_TESTS");
        assert_eq!(result.extra["task_id"], "TASK1");

        let exports = engine.exports.lock().unwrap();
        assert_eq!(exports[0].description, "chirps_test_2020-01-01");
        assert_eq!(exports[0].file_name_prefix, "chirps test_2020-01-01");
        assert_eq!(exports[0].scale, 5566);
        assert_clipped_to_aoi(&exports[0].expression);
    }

    #[tokio::test]
    async fn local_export_requests_download_url() {
        let engine = FakeEngine::with_results(vec![json!(1), json!(1_577_923_200_000_i64)]);
        let mut ex = extractor(vec![window(2020)], Some(worldcereal()));
        ex.process(&engine).await.unwrap();
        let result = ex.export(&engine, ExportMethod::Local, "", "chirps_test").await.unwrap();

        assert_eq!(result.description, "url-generated");
        assert_eq!(
            result.extra["download_url"],
            "https://example.com/download/chirps_test_2020-01-02"
        );
        let downloads = engine.downloads.lock().unwrap();
        assert_eq!(downloads[0].crs, "EPSG:4326");
        assert!(!downloads[0].file_per_band);
        assert_eq!(downloads[0].bands, vec!["precipitation".to_string()]);
        assert_eq!(downloads[0].scale, 5566);
        assert_clipped_to_aoi(&downloads[0].expression);
    }

    #[tokio::test]
    async fn export_processes_lazily() {
        let engine = FakeEngine::with_results(vec![json!(3), json!(1_577_836_800_000_i64)]);
        let mut ex = extractor(vec![window(2020)], None);
        let result = ex.export(&engine, ExportMethod::Local, "", "p").await.unwrap();
        assert_eq!(result.description, "url-generated");
        assert_eq!(engine.computed.lock().unwrap().len(), 2);
    }
}
