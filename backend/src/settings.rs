//! Pipeline configuration loaded via OrthoConfig.
//!
//! Every value can come from a `CIVET_*` environment variable. Optional
//! values fall back to local-development defaults; provider secrets and the
//! database URL have no default and surface as [`SettingsError::Missing`].

use std::path::PathBuf;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use url::Url;
use zeroize::Zeroizing;

use crate::outbound::openai::DEFAULT_OPENAI_MODEL;

const DEFAULT_CACHE_DIR: &str = "cache";
const DEFAULT_BLOB_ROOT: &str = "blobs";
const DEFAULT_BLOB_PUBLIC_URL: &str = "http://localhost:8080/blobs/";
const DEFAULT_VISION_ENDPOINT: &str = "https://vision.googleapis.com";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Errors raised when a setting is absent or malformed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    /// A required setting has no value.
    #[error("missing required setting {name}")]
    Missing {
        /// Environment variable that should carry the value.
        name: &'static str,
    },
    /// A URL setting could not be parsed.
    #[error("setting {name} is not a valid URL: {message}")]
    InvalidUrl {
        /// Environment variable carrying the bad value.
        name: &'static str,
        /// Parser failure.
        message: String,
    },
}

/// Configuration for the receipt ingestion pipeline.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "CIVET")]
pub struct PipelineSettings {
    /// PostgreSQL connection URL.
    pub database_url: Option<String>,
    /// Directory holding cached provider responses.
    pub cache_dir: Option<PathBuf>,
    /// Directory the filesystem blob store writes into.
    pub blob_root: Option<PathBuf>,
    /// Base URL under which stored blobs are served.
    pub blob_public_url: Option<String>,
    /// Google Cloud Vision API key.
    pub vision_api_key: Option<String>,
    /// Google Cloud Vision base URL.
    pub vision_endpoint: Option<String>,
    /// OpenAI API key.
    pub openai_api_key: Option<String>,
    /// OpenAI API base URL.
    pub openai_base_url: Option<String>,
    /// Chat model used for structured extraction.
    pub openai_model: Option<String>,
    /// Per-request timeout for provider calls, in seconds.
    #[ortho_config(default = 60)]
    pub request_timeout_secs: u64,
    /// Vertical distance within which words share a line.
    #[ortho_config(default = 10.0)]
    pub line_y_threshold: f64,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|raw| !raw.trim().is_empty())
}

fn parse_url(name: &'static str, raw: &str) -> Result<Url, SettingsError> {
    Url::parse(raw).map_err(|err| SettingsError::InvalidUrl {
        name,
        message: err.to_string(),
    })
}

impl PipelineSettings {
    /// Return the database URL.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Missing`] when unset or blank.
    pub fn database_url(&self) -> Result<&str, SettingsError> {
        non_empty(self.database_url.as_deref()).ok_or(SettingsError::Missing {
            name: "CIVET_DATABASE_URL",
        })
    }

    /// Return the response cache directory, falling back to `cache`.
    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR))
    }

    /// Return the blob store root, falling back to `blobs`.
    pub fn blob_root(&self) -> PathBuf {
        self.blob_root
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_BLOB_ROOT))
    }

    /// Return the public base URL for stored blobs.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidUrl`] when the configured value does
    /// not parse.
    pub fn blob_public_url(&self) -> Result<Url, SettingsError> {
        let raw = non_empty(self.blob_public_url.as_deref()).unwrap_or(DEFAULT_BLOB_PUBLIC_URL);
        parse_url("CIVET_BLOB_PUBLIC_URL", raw)
    }

    /// Return the Vision API key.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Missing`] when unset or blank.
    pub fn vision_api_key(&self) -> Result<Zeroizing<String>, SettingsError> {
        non_empty(self.vision_api_key.as_deref())
            .map(|key| Zeroizing::new(key.to_owned()))
            .ok_or(SettingsError::Missing {
                name: "CIVET_VISION_API_KEY",
            })
    }

    /// Return the Vision base URL.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidUrl`] when the configured value does
    /// not parse.
    pub fn vision_endpoint(&self) -> Result<Url, SettingsError> {
        let raw = non_empty(self.vision_endpoint.as_deref()).unwrap_or(DEFAULT_VISION_ENDPOINT);
        parse_url("CIVET_VISION_ENDPOINT", raw)
    }

    /// Return the OpenAI API key.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Missing`] when unset or blank.
    pub fn openai_api_key(&self) -> Result<Zeroizing<String>, SettingsError> {
        non_empty(self.openai_api_key.as_deref())
            .map(|key| Zeroizing::new(key.to_owned()))
            .ok_or(SettingsError::Missing {
                name: "CIVET_OPENAI_API_KEY",
            })
    }

    /// Return the OpenAI base URL.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidUrl`] when the configured value does
    /// not parse.
    pub fn openai_base_url(&self) -> Result<Url, SettingsError> {
        let raw = non_empty(self.openai_base_url.as_deref()).unwrap_or(DEFAULT_OPENAI_BASE_URL);
        parse_url("CIVET_OPENAI_BASE_URL", raw)
    }

    /// Return the chat model, falling back to [`DEFAULT_OPENAI_MODEL`].
    pub fn openai_model(&self) -> &str {
        non_empty(self.openai_model.as_deref()).unwrap_or(DEFAULT_OPENAI_MODEL)
    }

    /// Return the provider request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Return the line clustering threshold.
    pub fn line_y_threshold(&self) -> f64 {
        self.line_y_threshold
    }
}
