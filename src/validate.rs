//! Validation rules for extraction configurations.

use crate::error::ExtractError;
use crate::request::ExtractionConfig;

/// Valid day-of-year range, inclusive.
const DOY_RANGE: std::ops::RangeInclusive<i64> = 1..=366;

/// Validate a parsed configuration.
///
/// # Errors
///
/// Returns the first failing rule as [`ExtractError::Validation`].
pub fn validate_config(config: &ExtractionConfig) -> Result<(), ExtractError> {
    validate_doy(config.when.start_doy, config.when.end_doy)?;
    validate_years(config.when.start_year, config.when.end_year)?;
    validate_bands(&config.what.bands)
}

/// Validate the day-of-year window and narrow it to calendar days.
///
/// # Errors
///
/// Returns an error if either day lies outside 1..=366.
pub fn validate_doy(start_doy: i64, end_doy: i64) -> Result<(u32, u32), ExtractError> {
    match (calendar_day(start_doy), calendar_day(end_doy)) {
        (Some(start), Some(end)) => Ok((start, end)),
        _ => Err(ExtractError::Validation(
            "Validation error: Day of year must be between 1 and 366".to_string(),
        )),
    }
}

fn calendar_day(doy: i64) -> Option<u32> {
    u32::try_from(doy).ok().filter(|_| DOY_RANGE.contains(&doy))
}

/// Validate the year span.
///
/// # Errors
///
/// Returns an error if the span is reversed.
pub fn validate_years(start_year: i32, end_year: i32) -> Result<(), ExtractError> {
    if start_year > end_year {
        return Err(ExtractError::Validation(
            "Validation error: startYear cannot be after endYear".to_string(),
        ));
    }
    Ok(())
}

/// Validate the band selection.
///
/// # Errors
///
/// Returns an error if no band is selected.
pub fn validate_bands(bands: &[String]) -> Result<(), ExtractError> {
    if bands.is_empty() {
        return Err(ExtractError::Validation(
            "Validation error: at least one band must be selected".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{parse, tests::sample_config};

    #[test]
    fn doy_bounds() {
        assert_eq!(validate_doy(1, 366).unwrap(), (1, 366));
        assert!(validate_doy(0, 10).is_err());
        assert!(validate_doy(10, 367).is_err());
        assert!(validate_doy(-5, 10).is_err());
        assert!(validate_doy(10, i64::MAX).is_err());
    }

    #[test]
    fn negative_day_gets_range_message() {
        let mut raw = sample_config();
        raw["when"]["startDoy"] = serde_json::json!("-5");
        let config = parse(&raw).unwrap();
        let err = validate_config(&config).unwrap_err();
        assert_eq!(err.to_string(), "Validation error: Day of year must be between 1 and 366");
    }

    #[test]
    fn doy_message_mentions_validation() {
        let err = validate_doy(0, 0).unwrap_err();
        assert!(err.to_string().to_lowercase().contains("validation"));
        assert!(err.is_client_error());
    }

    #[test]
    fn reversed_years() {
        assert!(validate_years(2020, 2020).is_ok());
        let err = validate_years(2021, 2020).unwrap_err();
        assert_eq!(err.to_string(), "Validation error: startYear cannot be after endYear");
    }

    #[test]
    fn empty_bands() {
        assert!(validate_bands(&[]).is_err());
        assert!(validate_bands(&["NDVI".to_string()]).is_ok());
    }

    #[test]
    fn doy_checked_before_years() {
        let mut raw = sample_config();
        raw["when"] = serde_json::json!({"startYear": 2022, "endYear": 2020, "startDoy": 400, "endDoy": 1});
        let config = parse(&raw).unwrap();
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("Day of year"));
    }

    #[test]
    fn sample_is_valid() {
        let config = parse(&sample_config()).unwrap();
        assert!(validate_config(&config).is_ok());
    }
}
