//! Unified error type for gee-extract.

use thiserror::Error;

/// Errors that can occur while preparing or running an extraction.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The extraction configuration failed validation.
    #[error("{0}")]
    Validation(String),

    /// The configuration names a satellite that is not in the catalog.
    #[error("Unknown satellite id: {0}")]
    UnknownSatellite(String),

    /// The configuration names a mask that is not in the catalog.
    #[error("Unknown mask id: {0}")]
    UnknownMask(String),

    /// The requested area of interest cannot be built.
    #[error("{0}")]
    UnsupportedAoi(String),

    /// The Earth Engine API returned an error response.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message from the API.
        message: String,
    },

    /// The API answered, but the payload is not what the call expects.
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// An error recorded in a cassette, replayed verbatim.
    #[error("{0}")]
    Replayed(String),

    /// A network error occurred.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON document could not be read or written.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),

    /// A credential or project needed for live API access is not configured.
    #[error("No {what} configured. Set {env_var} or add it to the config file.")]
    MissingCredential {
        /// What is missing (e.g. "access token").
        what: String,
        /// The environment variable that would provide it.
        env_var: String,
    },
}

impl ExtractError {
    /// Whether the error was caused by the submitted configuration rather than
    /// by the environment or the remote API.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::UnknownSatellite(_)
                | Self::UnknownMask(_)
                | Self::UnsupportedAoi(_)
        )
    }
}
