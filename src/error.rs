use thiserror::Error;

use crate::browser::BrowserError;

#[derive(Debug, Error)]
pub enum AutoApplyError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("No targets found in {0}")]
    NoTargets(String),

    #[error("Browser error: {0}")]
    Browser(#[from] BrowserError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}
