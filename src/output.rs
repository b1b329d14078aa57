//! Run artifacts: a per-run directory holding the submitted request and the
//! response it produced.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::error::ExtractError;

/// Paths reported back in the response envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifacts {
    /// The request as submitted.
    pub config_path: String,
    /// The response envelope without artifact paths.
    pub output_path: String,
}

/// A created artifact directory.
#[derive(Debug)]
pub struct ArtifactDir {
    directory: PathBuf,
}

impl ArtifactDir {
    /// Create `<base>/gee-run-<unix-seconds>[-n]` and write `config.json` into it.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub fn create(base: &Path, request: &serde_json::Value) -> Result<Self, ExtractError> {
        std::fs::create_dir_all(base)?;
        let directory = unique_run_dir(base);
        std::fs::create_dir(&directory)?;

        let dir = Self { directory };
        write_json(&dir.config_path(), request)?;
        tracing::debug!(dir = %dir.directory.display(), "artifacts directory created");
        Ok(dir)
    }

    /// Write the response envelope to `output.json`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write_output<T: Serialize>(&self, response: &T) -> Result<(), ExtractError> {
        write_json(&self.output_path(), response)
    }

    /// Paths for the response envelope.
    #[must_use]
    pub fn artifacts(&self) -> Artifacts {
        Artifacts {
            config_path: self.config_path().display().to_string(),
            output_path: self.output_path().display().to_string(),
        }
    }

    fn config_path(&self) -> PathBuf {
        self.directory.join("config.json")
    }

    fn output_path(&self) -> PathBuf {
        self.directory.join("output.json")
    }
}

fn unique_run_dir(base: &Path) -> PathBuf {
    let timestamp = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
    let first = base.join(format!("gee-run-{timestamp}"));
    if !first.exists() {
        return first;
    }
    (1..)
        .map(|n| base.join(format!("gee-run-{timestamp}-{n}")))
        .find(|p| !p.exists())
        .unwrap_or(first)
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), ExtractError> {
    let text = serde_json::to_string_pretty(value)?;
    std::fs::write(path, text)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_request_and_response() {
        let base = std::env::temp_dir().join("gee_extract_output_test");
        let _ = std::fs::remove_dir_all(&base);

        let request = serde_json::json!({"satelliteId": "CHIRPS_DAILY"});
        let dir = ArtifactDir::create(&base, &request).unwrap();
        dir.write_output(&serde_json::json!({"status": "success"})).unwrap();

        let paths = dir.artifacts();
        assert!(paths.config_path.ends_with("config.json"));
        let saved: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&paths.config_path).unwrap()).unwrap();
        assert_eq!(saved, request);
        let output = std::fs::read_to_string(&paths.output_path).unwrap();
        assert!(output.contains("success"));

        let _ = std::fs::remove_dir_all(&base);
    }

    #[test]
    fn run_dirs_do_not_collide() {
        let base = std::env::temp_dir().join("gee_extract_output_unique_test");
        let _ = std::fs::remove_dir_all(&base);

        let request = serde_json::json!({});
        let first = ArtifactDir::create(&base, &request).unwrap();
        let second = ArtifactDir::create(&base, &request).unwrap();
        assert_ne!(first.artifacts().config_path, second.artifacts().config_path);

        let _ = std::fs::remove_dir_all(&base);
    }
}
