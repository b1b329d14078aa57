//! Configuration file loading with environment variable overrides.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Environment variable holding an OAuth access token for Earth Engine.
pub const ACCESS_TOKEN_ENV: &str = "EE_ACCESS_TOKEN";
/// Environment variable holding the default cloud project.
pub const PROJECT_ENV: &str = "EE_PROJECT";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Earth Engine access.
    #[serde(default)]
    pub earthengine: EarthEngineConfig,

    /// Fallbacks for fields a request leaves empty.
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

/// Earth Engine access settings.
#[derive(Debug, Default, Deserialize)]
pub struct EarthEngineConfig {
    /// Cloud project used when a request does not name one.
    pub project: Option<String>,
    /// OAuth access token.
    pub access_token: Option<String>,
    /// REST endpoint override.
    pub api_base: Option<String>,
}

/// Default values for request fields.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Drive folder for exports.
    pub drive_folder: String,
    /// Prefix for exported file names.
    pub output_prefix: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self { drive_folder: String::new(), output_prefix: "gee_export".to_string() }
    }
}

impl Config {
    /// Load configuration from the given path, or return defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config {}: {e}", path.display()))?;
        toml::from_str(&contents)
            .map_err(|e| format!("Failed to parse config {}: {e}", path.display()))
    }

    /// Access token, preferring the environment variable.
    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        non_blank(std::env::var(ACCESS_TOKEN_ENV).ok())
            .or_else(|| non_blank(self.earthengine.access_token.clone()))
    }

    /// Resolve the project: request value, then environment, then file.
    #[must_use]
    pub fn project(&self, requested: Option<&str>) -> Option<String> {
        non_blank(requested.map(str::to_string))
            .or_else(|| non_blank(std::env::var(PROJECT_ENV).ok()))
            .or_else(|| non_blank(self.earthengine.project.clone()))
    }

    /// Drive folder: request value unless blank, else the configured default.
    #[must_use]
    pub fn drive_folder(&self, requested: Option<&str>) -> String {
        non_blank(requested.map(str::to_string))
            .unwrap_or_else(|| self.defaults.drive_folder.clone())
    }

    /// Output prefix: request value unless blank, else the configured default.
    #[must_use]
    pub fn output_prefix(&self, requested: Option<&str>) -> String {
        non_blank(requested.map(str::to_string))
            .unwrap_or_else(|| self.defaults.output_prefix.clone())
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Discover the config file path using the resolution order:
/// 1. Explicit path (from `--config` flag)
/// 2. `GEE_EXTRACT_CONFIG` environment variable
/// 3. `~/.config/gee-extract/config.toml`
#[must_use]
pub fn discover_config_path(explicit: Option<&str>) -> PathBuf {
    if let Some(p) = explicit {
        return PathBuf::from(p);
    }

    if let Ok(p) = std::env::var("GEE_EXTRACT_CONFIG") {
        return PathBuf::from(p);
    }

    default_config_path()
}

fn default_config_path() -> PathBuf {
    if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".config/gee-extract/config.toml")
    } else {
        PathBuf::from("gee-extract.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert!(config.earthengine.project.is_none());
        assert!(config.earthengine.api_base.is_none());
        assert_eq!(config.defaults.output_prefix, "gee_export");
        assert_eq!(config.defaults.drive_folder, "");
    }

    #[test]
    fn load_nonexistent_returns_defaults() {
        let config = Config::load(Path::new("/nonexistent/path/config.toml")).unwrap();
        assert_eq!(config.defaults.output_prefix, "gee_export");
    }

    #[test]
    fn load_valid_toml() {
        let dir = std::env::temp_dir().join("gee_extract_config_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(
            &path,
            r#"
[earthengine]
project = "file-project"
access_token = "file-token"
api_base = "http://localhost:9000/v1"

[defaults]
drive_folder = "GEE_EXTRACTIONS"
"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.earthengine.project.as_deref(), Some("file-project"));
        assert_eq!(config.earthengine.api_base.as_deref(), Some("http://localhost:9000/v1"));
        assert_eq!(config.defaults.drive_folder, "GEE_EXTRACTIONS");
        // Unset keys inside a present table keep their defaults.
        assert_eq!(config.defaults.output_prefix, "gee_export");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn load_invalid_toml() {
        let dir = std::env::temp_dir().join("gee_extract_config_bad_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad.toml");
        std::fs::write(&path, "this is not valid toml {{{").unwrap();

        assert!(Config::load(&path).is_err());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn request_project_wins() {
        let config = Config {
            earthengine: EarthEngineConfig { project: Some("from-file".into()), ..Default::default() },
            ..Config::default()
        };
        assert_eq!(config.project(Some("from-request")).as_deref(), Some("from-request"));
    }

    #[test]
    fn blank_request_values_fall_back() {
        let config = Config {
            defaults: DefaultsConfig {
                drive_folder: "DEFAULT_FOLDER".into(),
                output_prefix: "gee_export".into(),
            },
            ..Config::default()
        };
        assert_eq!(config.drive_folder(Some("  ")), "DEFAULT_FOLDER");
        assert_eq!(config.drive_folder(Some("MINE")), "MINE");
        assert_eq!(config.output_prefix(None), "gee_export");
        assert_eq!(config.output_prefix(Some("")), "gee_export");
        assert_eq!(config.output_prefix(Some("chirps")), "chirps");
    }

    #[test]
    fn discover_explicit_path() {
        let path = discover_config_path(Some("/tmp/my-config.toml"));
        assert_eq!(path, PathBuf::from("/tmp/my-config.toml"));
    }
}
