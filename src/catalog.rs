//! Satellite and mask catalog.

use serde::Serialize;

use crate::error::ExtractError;

/// An Earth Engine image collection that can be extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Satellite {
    /// Catalog identifier used in extraction configs.
    pub id: &'static str,
    /// Earth Engine collection asset id.
    pub ee_collection_name: &'static str,
    /// Native pixel size in meters, used as the export scale.
    pub pixel_size: u32,
    /// Bands offered by default for this collection.
    pub default_bands: &'static [&'static str],
}

/// A collection used to mask extracted images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Mask {
    /// Catalog identifier used in extraction configs.
    pub id: &'static str,
    /// Earth Engine collection asset id.
    pub ee_collection_name: &'static str,
    /// Band whose non-zero pixels are kept.
    pub default_band: &'static str,
    /// Property names the mask collection can be filtered on.
    pub filters: &'static [&'static str],
}

const ERA5_BANDS: &[&str] = &["dewpoint_temperature_2m", "temperature_2m", "skin_temperature"];

/// All supported satellites.
pub const SATELLITES: &[Satellite] = &[
    Satellite {
        id: "CHIRPS_DAILY",
        ee_collection_name: "UCSB-CHG/CHIRPS/DAILY",
        pixel_size: 5566,
        default_bands: &["precipitation"],
    },
    Satellite {
        id: "MODIS_MOD13Q1_061",
        ee_collection_name: "MODIS/061/MOD13Q1",
        pixel_size: 250,
        default_bands: &["NDVI", "EVI", "DetailedQA"],
    },
    Satellite {
        id: "ERA5_LAND_HOURLY",
        ee_collection_name: "ECMWF/ERA5_LAND/HOURLY",
        pixel_size: 11132,
        default_bands: ERA5_BANDS,
    },
    Satellite {
        id: "ERA5_LAND_DAILY_AGGR",
        ee_collection_name: "ECMWF/ERA5_LAND/DAILY_AGGR",
        pixel_size: 11132,
        default_bands: ERA5_BANDS,
    },
];

/// All supported masks.
pub const MASKS: &[Mask] = &[Mask {
    id: "ESA_WORLDCEREAL_V100",
    ee_collection_name: "ESA/WorldCereal/2021/MODELS/v100",
    default_band: "classification",
    filters: &["product", "season"],
}];

/// Look up a satellite by catalog id.
///
/// # Errors
///
/// Returns [`ExtractError::UnknownSatellite`] if the id is not in the catalog.
pub fn satellite(id: &str) -> Result<&'static Satellite, ExtractError> {
    SATELLITES
        .iter()
        .find(|s| s.id == id)
        .ok_or_else(|| ExtractError::UnknownSatellite(id.to_string()))
}

/// Look up an optional mask by catalog id.
///
/// # Errors
///
/// Returns [`ExtractError::UnknownMask`] if an id is given but not in the catalog.
pub fn mask(id: Option<&str>) -> Result<Option<&'static Mask>, ExtractError> {
    let Some(id) = id else {
        return Ok(None);
    };
    MASKS
        .iter()
        .find(|m| m.id == id)
        .map(Some)
        .ok_or_else(|| ExtractError::UnknownMask(id.to_string()))
}

/// The catalog as printed by the `catalog` subcommand.
#[derive(Debug, Serialize)]
pub struct CatalogListing {
    /// Supported satellites.
    pub satellites: &'static [Satellite],
    /// Supported masks.
    pub masks: &'static [Mask],
}

/// Snapshot of the full catalog.
#[must_use]
pub fn listing() -> CatalogListing {
    CatalogListing { satellites: SATELLITES, masks: MASKS }
}
