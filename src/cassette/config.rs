//! Cassette loading.

use std::path::Path;

use super::format::Cassette;
use super::replayer::CassetteReplayer;
use crate::error::ExtractError;

/// Read a YAML cassette from disk.
///
/// # Errors
///
/// Returns a config error if the file cannot be read or parsed.
pub fn read_cassette(path: &Path) -> Result<Cassette, ExtractError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        ExtractError::Config(format!("Failed to read cassette {}: {e}", path.display()))
    })?;
    serde_yaml::from_str(&content).map_err(|e| {
        ExtractError::Config(format!("Failed to parse cassette {}: {e}", path.display()))
    })
}

/// Load a cassette and wrap it in a replayer.
///
/// # Errors
///
/// Returns a config error if the cassette cannot be loaded.
pub fn load_cassette(path: &Path) -> Result<CassetteReplayer, ExtractError> {
    let cassette = read_cassette(path)?;
    let replayer = CassetteReplayer::new(&cassette);
    tracing::debug!(cassette = %cassette.name, interactions = replayer.remaining(), "loaded cassette");
    Ok(replayer)
}
