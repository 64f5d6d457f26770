//! Resolver settings file, e.g.
//!
//! ```json
//! { "strictNullChecks": true, "extensions": [".ts", ".d.ts"] }
//! ```
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

use crate::manager::ManagerOptions;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub strict_null_checks: bool,
    /// Replaces the default import extensions when present.
    #[serde(default)]
    pub extensions: Option<Vec<String>>,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let src = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&src).map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })
    }

    pub fn from_json(src: &str) -> Result<Self, String> {
        from_str_with_path(src)
    }
}

impl From<Config> for ManagerOptions {
    fn from(config: Config) -> Self {
        let defaults = ManagerOptions::default();
        ManagerOptions {
            strict_null_checks: config.strict_null_checks,
            extensions: config.extensions.unwrap_or(defaults.extensions),
        }
    }
}

/// Deserialize with JSON-path context in error messages.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T, String> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(|err| {
        let path = err.path().to_string();
        format!("at JSON path {path} → {}", err.into_inner())
    })
}

// ------------------------------- Tests ------------------------------------ //
