use std::path::PathBuf;

use thiserror::Error;

/// Reasons a recipe could not be produced or accepted.
#[derive(Debug, Error)]
pub enum RecipeError {
    #[error("recipe is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("recipe '{name}' is invalid: {reason}")]
    Invalid { name: String, reason: String },

    #[error("unable to read recipe file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("recipe generator failed: {0}")]
    Generator(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config file is not valid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid setting: {0}")]
    Invalid(String),
}
