use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{
    error::{Error, Result},
    values::{RateLimit, ResizeSpec},
};

/// Option defaults read from `--config-file`. Keys mirror the long flag names
/// in snake_case, handler flags live under `[tumblr]` and `[twitter]`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub user_agent: Option<String>,
    pub cookie_file: Option<PathBuf>,
    pub cert_file: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub recursive: Option<bool>,
    pub num_resources: Option<u8>,
    pub min_width: Option<i32>,
    pub max_width: Option<i32>,
    pub min_height: Option<i32>,
    pub max_height: Option<i32>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub limit_rate: Option<RateLimit>,
    pub sleep: Option<u64>,
    pub wait: Option<u64>,
    pub extensions: Option<Vec<String>>,
    pub names: Option<String>,
    pub no_follow: Option<bool>,
    pub resize: Option<ResizeSpec>,
    pub login_type: Option<String>,
    pub login_page: Option<String>,
    pub tumblr: TumblrConfig,
    pub twitter: TwitterConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TumblrConfig {
    pub count: Option<u32>,
}

/// Dates stay as text here so a bad value is reported against its key.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TwitterConfig {
    pub begin_date: Option<String>,
    pub end_date: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<FileConfig> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => {}
            _ => {
                return Err(Error::UnsupportedConfigType {
                    path: path.to_path_buf(),
                })
            }
        }
        let contents = std::fs::read_to_string(path).map_err(|e| Error::ReadConfig {
            e,
            path: path.to_path_buf(),
        })?;
        let config = FileConfig::parse(&contents).map_err(|e| Error::ParseConfig {
            e,
            path: path.to_path_buf(),
        })?;
        tracing::debug!("loaded config from {path:?}");
        Ok(config)
    }

    pub fn parse(contents: &str) -> ::core::result::Result<FileConfig, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Checks the values serde cannot check on its own.
    pub fn validate(&self) -> Result<()> {
        if let Some(n) = self.num_resources {
            if !(1..=9).contains(&n) {
                return Err(Error::InvalidConfigValue {
                    key: "num_resources",
                    reason: format!("{n} is not in 1..=9"),
                });
            }
        }
        Ok(())
    }
}
