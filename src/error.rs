use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read config file at {path:?} | {e}")]
    ReadConfig { e: std::io::Error, path: PathBuf },

    #[error("failed to parse toml config at {path:?} | {e}")]
    ParseConfig { e: toml::de::Error, path: PathBuf },

    #[error("unsupported config file type at {path:?}, expected .toml")]
    UnsupportedConfigType { path: PathBuf },

    #[error("invalid value for {key} in config | {reason}")]
    InvalidConfigValue { key: &'static str, reason: String },

    #[error("min_{dimension} ({min}) is greater than max_{dimension} ({max})")]
    InvertedBounds {
        dimension: &'static str,
        min: i32,
        max: i32,
    },

    #[error("{key} must be -1 (unbounded) or a pixel count, got {value}")]
    NegativeDimension { key: &'static str, value: i32 },

    #[error("--begin-date ({begin}) is after --end-date ({end})")]
    InvertedDates { begin: String, end: String },

    #[error("failed to render options | {e}")]
    RenderOptions { e: serde_json::Error },

    #[error("failed to write scraper output | {e}")]
    Write { e: std::io::Error },
}

pub type Result<T> = ::core::result::Result<T, Error>;
