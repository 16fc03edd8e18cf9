use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported config file format: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("invalid config in {path}: {message}")]
    Invalid { path: PathBuf, message: String },
}
