//! Area-of-interest geometry.

use serde::Serialize;

use crate::error::ExtractError;
use crate::expr::{self, ValueNode};
use crate::request::{WhereConfig, WhereType};

/// A resolved area of interest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Aoi {
    /// A single location.
    Point {
        /// Longitude in degrees.
        lon: f64,
        /// Latitude in degrees.
        lat: f64,
    },
}

impl Aoi {
    /// The geometry as an expression node.
    #[must_use]
    pub fn geometry(&self) -> ValueNode {
        match *self {
            Self::Point { lon, lat } => expr::point(lon, lat),
        }
    }

    /// Bounding geometry used as the export region.
    #[must_use]
    pub fn bounds(&self) -> ValueNode {
        expr::bounds(self.geometry())
    }
}

/// Build the area of interest from the `where` section.
///
/// # Errors
///
/// Returns [`ExtractError::UnsupportedAoi`] for AOI kinds that need manual
/// preparation, and a validation error for missing or out-of-range coordinates.
pub fn build_aoi(location: &WhereConfig) -> Result<Aoi, ExtractError> {
    match location.kind {
        WhereType::Point => {
            let point = location.point.as_ref().ok_or_else(|| {
                ExtractError::Validation("Validation error: Point AOI requires lat and lon".to_string())
            })?;
            validate_coordinates(point.lat, point.lon)?;
            Ok(Aoi::Point { lon: point.lon, lat: point.lat })
        }
        WhereType::Points => Err(ExtractError::UnsupportedAoi(
            "Set of Points AOI requires manual implementation in the backend.".to_string(),
        )),
        WhereType::GadmShape | WhereType::PersonalShape => Err(ExtractError::UnsupportedAoi(
            format!("{} AOI is not yet implemented in the extraction runner.", location.kind),
        )),
    }
}

fn validate_coordinates(lat: f64, lon: f64) -> Result<(), ExtractError> {
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(ExtractError::Validation(format!(
            "Validation error: latitude {lat} must be between -90 and 90"
        )));
    }
    if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
        return Err(ExtractError::Validation(format!(
            "Validation error: longitude {lon} must be between -180 and 180"
        )));
    }
    Ok(())
}
