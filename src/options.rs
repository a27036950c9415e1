use std::path::PathBuf;

use chrono::NaiveDateTime;
use regex::Regex;
use serde::{Serialize, Serializer};

use crate::{
    config::FileConfig,
    error::{Error, Result},
    terminal_interface::{CommonArgs, GenericArgs, TumblrArgs, TwitterArgs, PASSWORD_MASK},
    values::{self, RateLimit, ResizeSpec},
};

pub const DEFAULT_USER_AGENT: &str = "ScraperBot";
pub const DEFAULT_COUNT: u32 = 1000;
pub const DEFAULT_BEGIN_DATE: &str = "1970-01-01 00:00:00.00";
pub const DEFAULT_END_DATE: &str = "2099-12-12 23:59:59.999";
/// -1 leaves a width or height bound open.
pub const UNBOUNDED: i32 = -1;

/// The resolved option set every scraper receives. Command line values win
/// over the config file, which wins over the built-in defaults.
#[derive(Debug, Serialize)]
pub struct CommonOptions {
    pub user_agent: String,
    pub cookie_file: Option<PathBuf>,
    pub cert_file: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub recursive: bool,
    pub num_resources: Option<u8>,
    pub min_width: i32,
    pub max_width: i32,
    pub min_height: i32,
    pub max_height: i32,
    pub username: Option<String>,
    #[serde(serialize_with = "mask_password")]
    pub password: Option<String>,
    pub limit_rate: Option<RateLimit>,
    pub sleep: u64,
    pub wait: u64,
    pub extensions: Vec<String>,
    #[serde(serialize_with = "pattern_text")]
    pub names: Option<Regex>,
    pub no_follow: bool,
    pub resize: Option<ResizeSpec>,
    pub login_type: Option<String>,
    pub login_page: Option<String>,
    pub uris: Vec<String>,
}

impl CommonOptions {
    pub fn resolve(args: CommonArgs, file: &FileConfig) -> Result<CommonOptions> {
        file.validate()?;

        let names = match (args.names, &file.names) {
            (Some(names), _) => Some(names),
            (None, Some(pattern)) => {
                Some(Regex::new(pattern).map_err(|e| Error::InvalidConfigValue {
                    key: "names",
                    reason: e.to_string(),
                })?)
            }
            (None, None) => None,
        };
        let extensions = if args.extensions.is_empty() {
            values::normalize_extensions(file.extensions.iter().flatten())
        } else {
            values::normalize_extensions(&args.extensions)
        };

        let options = CommonOptions {
            user_agent: args
                .user_agent
                .or_else(|| file.user_agent.clone())
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_owned()),
            cookie_file: args.cookie_file.or_else(|| file.cookie_file.clone()),
            cert_file: args.cert_file.or_else(|| file.cert_file.clone()),
            data_dir: args.data_dir.or_else(|| file.data_dir.clone()),
            output_dir: args.output_dir.or_else(|| file.output_dir.clone()),
            log_file: args.log_file.or_else(|| file.log_file.clone()),
            recursive: args.recursive || file.recursive.unwrap_or(false),
            num_resources: args.num_resources.or(file.num_resources),
            min_width: args.min_width.or(file.min_width).unwrap_or(UNBOUNDED),
            max_width: args.max_width.or(file.max_width).unwrap_or(UNBOUNDED),
            min_height: args.min_height.or(file.min_height).unwrap_or(UNBOUNDED),
            max_height: args.max_height.or(file.max_height).unwrap_or(UNBOUNDED),
            username: args.username.or_else(|| file.username.clone()),
            password: args.password.or_else(|| file.password.clone()),
            limit_rate: args.limit_rate.or(file.limit_rate),
            sleep: args.sleep.or(file.sleep).unwrap_or(0),
            wait: args.wait.or(file.wait).unwrap_or(0),
            extensions,
            names,
            no_follow: args.no_follow || file.no_follow.unwrap_or(false),
            resize: args.resize.or(file.resize),
            login_type: args.login_type.or_else(|| file.login_type.clone()),
            login_page: args.login_page.or_else(|| file.login_page.clone()),
            uris: args.uris,
        };
        options.check_bounds()?;
        if let Some(rate) = options.limit_rate {
            tracing::debug!("download rate capped at {} bytes/s", rate.bytes_per_second());
        }
        Ok(options)
    }

    fn check_bounds(&self) -> Result<()> {
        for (key, value) in [
            ("min_width", self.min_width),
            ("max_width", self.max_width),
            ("min_height", self.min_height),
            ("max_height", self.max_height),
        ] {
            if value < UNBOUNDED {
                return Err(Error::NegativeDimension { key, value });
            }
        }
        for (dimension, min, max) in [
            ("width", self.min_width, self.max_width),
            ("height", self.min_height, self.max_height),
        ] {
            if min != UNBOUNDED && max != UNBOUNDED && min > max {
                return Err(Error::InvertedBounds { dimension, min, max });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct GenericOptions {
    #[serde(flatten)]
    pub common: CommonOptions,
}

impl GenericOptions {
    pub fn resolve(args: GenericArgs, file: &FileConfig) -> Result<GenericOptions> {
        Ok(GenericOptions {
            common: CommonOptions::resolve(args.common, file)?,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct TumblrOptions {
    pub count: u32,
    #[serde(flatten)]
    pub common: CommonOptions,
}

impl TumblrOptions {
    pub fn resolve(args: TumblrArgs, file: &FileConfig) -> Result<TumblrOptions> {
        Ok(TumblrOptions {
            count: args.count.or(file.tumblr.count).unwrap_or(DEFAULT_COUNT),
            common: CommonOptions::resolve(args.common, file)?,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct TwitterOptions {
    pub begin_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    #[serde(flatten)]
    pub common: CommonOptions,
}

impl TwitterOptions {
    pub fn resolve(args: TwitterArgs, file: &FileConfig) -> Result<TwitterOptions> {
        let begin_date = resolve_date(
            args.begin_date,
            file.twitter.begin_date.as_deref(),
            "begin_date",
            DEFAULT_BEGIN_DATE,
        )?;
        let end_date = resolve_date(
            args.end_date,
            file.twitter.end_date.as_deref(),
            "end_date",
            DEFAULT_END_DATE,
        )?;
        if begin_date > end_date {
            return Err(Error::InvertedDates {
                begin: begin_date.to_string(),
                end: end_date.to_string(),
            });
        }
        Ok(TwitterOptions {
            begin_date,
            end_date,
            common: CommonOptions::resolve(args.common, file)?,
        })
    }
}

fn resolve_date(
    flag: Option<NaiveDateTime>,
    file: Option<&str>,
    key: &'static str,
    default: &str,
) -> Result<NaiveDateTime> {
    if let Some(date) = flag {
        return Ok(date);
    }
    let text = file.unwrap_or(default);
    values::parse_date(text).map_err(|e| Error::InvalidConfigValue {
        key,
        reason: format!("`{text}` | {e}"),
    })
}

fn mask_password<S: Serializer>(
    password: &Option<String>,
    serializer: S,
) -> ::core::result::Result<S::Ok, S::Error> {
    match password {
        Some(_) => serializer.serialize_some(PASSWORD_MASK),
        None => serializer.serialize_none(),
    }
}

fn pattern_text<S: Serializer>(
    names: &Option<Regex>,
    serializer: S,
) -> ::core::result::Result<S::Ok, S::Error> {
    match names {
        Some(regex) => serializer.serialize_some(regex.as_str()),
        None => serializer.serialize_none(),
    }
}
