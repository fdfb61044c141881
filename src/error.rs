/*
 * Error Module
 *
 * The simulation core never fails; the only fallible surface is reading
 * the JSON configuration document.
 */

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading a configuration document.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config document: {0}")]
    Parse(#[from] serde_json::Error),
}
