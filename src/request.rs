//! Extraction configuration as submitted by clients.
//!
//! The wire format is the camelCase JSON document produced by the web form,
//! so numeric fields may arrive either as numbers or as numeric strings.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ExtractError;

/// Top-level keys every configuration must carry.
pub const REQUIRED_KEYS: &[&str] = &["how", "mask", "satelliteId", "settings", "what", "when", "where"];

/// A complete extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionConfig {
    /// Catalog id of the satellite collection.
    pub satellite_id: String,
    /// Area of interest.
    #[serde(rename = "where")]
    pub location: WhereConfig,
    /// Date range.
    pub when: WhenConfig,
    /// Bands to extract.
    pub what: WhatConfig,
    /// Export target.
    pub how: HowConfig,
    /// Account-level settings.
    pub settings: SettingsConfig,
    /// Optional mask.
    pub mask: MaskConfig,
}

/// Kind of area of interest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WhereType {
    /// A single coordinate.
    #[serde(rename = "Point")]
    Point,
    /// A file of coordinates.
    #[serde(rename = "Set of Points")]
    Points,
    /// A GADM administrative boundary.
    #[serde(rename = "GADM Shape")]
    GadmShape,
    /// A user-supplied shapefile.
    #[serde(rename = "Personal Shape")]
    PersonalShape,
}

impl fmt::Display for WhereType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Point => "Point",
            Self::Points => "Set of Points",
            Self::GadmShape => "GADM Shape",
            Self::PersonalShape => "Personal Shape",
        };
        f.write_str(name)
    }
}

/// Area-of-interest section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhereConfig {
    /// Which of the fields below applies.
    #[serde(rename = "type")]
    pub kind: WhereType,
    /// Coordinates for [`WhereType::Point`].
    #[serde(default)]
    pub point: Option<PointConfig>,
    /// Points file for [`WhereType::Points`].
    #[serde(default)]
    pub points_file: Option<String>,
    /// Administrative names for [`WhereType::GadmShape`].
    #[serde(default)]
    pub gadm: Option<GadmConfig>,
    /// Shapefile for [`WhereType::PersonalShape`].
    #[serde(default)]
    pub personal_shape_file: Option<String>,
}

/// Latitude/longitude pair as typed into the form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointConfig {
    /// Latitude in degrees.
    #[serde(deserialize_with = "number_or_string")]
    pub lat: f64,
    /// Longitude in degrees.
    #[serde(deserialize_with = "number_or_string")]
    pub lon: f64,
}

/// GADM administrative names, most specific last.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GadmConfig {
    /// Country name.
    #[serde(default)]
    pub country: String,
    /// First-level region.
    #[serde(default)]
    pub region: String,
    /// Second-level region.
    #[serde(default)]
    pub subregion: String,
}

/// Date range expressed as a year span and a day-of-year window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhenConfig {
    /// First year (inclusive).
    #[serde(deserialize_with = "number_or_string")]
    pub start_year: i32,
    /// Last year (inclusive).
    #[serde(deserialize_with = "number_or_string")]
    pub end_year: i32,
    /// First day of year, 1-based. Range-checked by validation.
    #[serde(deserialize_with = "number_or_string")]
    pub start_doy: i64,
    /// Last day of year, 1-based. Range-checked by validation.
    #[serde(deserialize_with = "number_or_string")]
    pub end_doy: i64,
}

/// Band selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatConfig {
    /// Band names to select from the collection.
    #[serde(default, deserialize_with = "null_as_default")]
    pub bands: Vec<String>,
}

/// Export destination kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HowType {
    /// Start an export task into Google Drive.
    #[serde(rename = "Google Drive")]
    Drive,
    /// Generate a download URL. Any unrecognized value lands here.
    #[serde(rename = "Local Folder")]
    #[serde(other)]
    Local,
}

/// Export section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HowConfig {
    /// Destination kind.
    #[serde(rename = "type")]
    pub kind: HowType,
    /// Local folder chosen in the form.
    #[serde(default, deserialize_with = "null_as_default")]
    pub local_path: String,
    /// Prefix for exported files.
    #[serde(default)]
    pub output_filename: Option<String>,
}

/// Account-level settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsConfig {
    /// Google Cloud project registered for Earth Engine.
    #[serde(default)]
    pub gee_project: Option<String>,
    /// Drive folder for exports.
    #[serde(default)]
    pub drive_folder: Option<String>,
}

/// Mask section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaskConfig {
    /// Whether a mask is applied at all.
    #[serde(default)]
    pub enabled: bool,
    /// Catalog id of the mask.
    #[serde(default)]
    pub mask_id: Option<String>,
    /// Property equality filters on the mask collection.
    #[serde(default, deserialize_with = "null_as_default")]
    pub filters: BTreeMap<String, String>,
}

/// Ensure all required top-level keys are present in the raw document.
///
/// # Errors
///
/// Returns a validation error listing the missing keys in sorted order.
pub fn check_required_keys(raw: &serde_json::Value) -> Result<(), ExtractError> {
    let Some(object) = raw.as_object() else {
        return Err(ExtractError::Validation(
            "Validation error: configuration must be a JSON object".to_string(),
        ));
    };
    let missing: Vec<&str> =
        REQUIRED_KEYS.iter().copied().filter(|key| !object.contains_key(*key)).collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ExtractError::Validation(format!("Missing configuration keys: {}", missing.join(", "))))
    }
}

/// Parse a raw JSON document into a typed configuration.
///
/// # Errors
///
/// Returns a validation error if keys are missing or any field has the wrong shape.
pub fn parse(raw: &serde_json::Value) -> Result<ExtractionConfig, ExtractError> {
    check_required_keys(raw)?;
    ExtractionConfig::deserialize(raw)
        .map_err(|e| ExtractError::Validation(format!("Validation error: {e}")))
}

/// Accept a value either as a JSON number or as a string holding one.
fn number_or_string<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr + TryFromJsonNumber,
    T::Err: fmt::Display,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => s.trim().parse().map_err(serde::de::Error::custom),
        serde_json::Value::Number(n) => T::try_from_number(&n)
            .ok_or_else(|| serde::de::Error::custom(format!("number {n} out of range"))),
        other => Err(serde::de::Error::custom(format!("expected a number, got {other}"))),
    }
}

/// Treat an explicit `null` like an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Conversion from a JSON number into a concrete numeric field type.
trait TryFromJsonNumber: Sized {
    fn try_from_number(n: &serde_json::Number) -> Option<Self>;
}

impl TryFromJsonNumber for f64 {
    fn try_from_number(n: &serde_json::Number) -> Option<Self> {
        n.as_f64()
    }
}

/// Integers, plus floats with no fractional part. Whole floats beyond the
/// `i64` range saturate so range checks still see them as out of range.
impl TryFromJsonNumber for i64 {
    #[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
    fn try_from_number(n: &serde_json::Number) -> Option<Self> {
        n.as_i64().or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
    }
}

impl TryFromJsonNumber for i32 {
    fn try_from_number(n: &serde_json::Number) -> Option<Self> {
        i64::try_from_number(n).and_then(|v| Self::try_from(v).ok())
    }
}
