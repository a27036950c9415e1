use std::{fmt, str::FromStr};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Format accepted for `--begin-date` and `--end-date`.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

const RATE_UNITS: [(u64, char); 3] = [(1 << 30, 'G'), (1 << 20, 'M'), (1 << 10, 'k')];

/// Download rate cap in bytes per second, written as `512k`, `2M` or `100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RateLimit(u64);

impl RateLimit {
    pub fn bytes_per_second(self) -> u64 {
        self.0
    }
}

impl FromStr for RateLimit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (digits, multiplier) = match s.char_indices().last() {
            Some((i, 'k' | 'K')) => (&s[..i], 1 << 10),
            Some((i, 'm' | 'M')) => (&s[..i], 1 << 20),
            Some((i, 'g' | 'G')) => (&s[..i], 1 << 30),
            _ => (s, 1),
        };
        let value: u64 = digits
            .parse()
            .map_err(|_| format!("invalid rate `{s}`, expected something like 512k or 2M"))?;
        if value == 0 {
            return Err("rate must be greater than zero".to_owned());
        }
        value
            .checked_mul(multiplier)
            .map(RateLimit)
            .ok_or_else(|| format!("rate `{s}` is too large"))
    }
}

impl TryFrom<String> for RateLimit {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RateLimit> for String {
    fn from(rate: RateLimit) -> Self {
        rate.to_string()
    }
}

impl fmt::Display for RateLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (size, suffix) in RATE_UNITS {
            if self.0 % size == 0 {
                return write!(f, "{}{}", self.0 / size, suffix);
            }
        }
        write!(f, "{}", self.0)
    }
}

/// Target bounding box for resized images. Either side may be left open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResizeSpec {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl FromStr for ResizeSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (width, height) = s
            .trim()
            .split_once(|c| c == 'x' || c == 'X')
            .ok_or_else(|| format!("invalid resize `{s}`, expected WxH, Wx or xH"))?;
        let side = |v: &str| -> Result<Option<u32>, String> {
            if v.is_empty() {
                return Ok(None);
            }
            match v.parse::<u32>() {
                Ok(0) | Err(_) => Err(format!("invalid resize dimension `{v}`")),
                Ok(n) => Ok(Some(n)),
            }
        };
        let spec = ResizeSpec {
            width: side(width)?,
            height: side(height)?,
        };
        if spec.width.is_none() && spec.height.is_none() {
            return Err("resize needs at least a width or a height".to_owned());
        }
        Ok(spec)
    }
}

impl TryFrom<String> for ResizeSpec {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ResizeSpec> for String {
    fn from(spec: ResizeSpec) -> Self {
        spec.to_string()
    }
}

impl fmt::Display for ResizeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(width) = self.width {
            write!(f, "{width}")?;
        }
        f.write_str("x")?;
        if let Some(height) = self.height {
            write!(f, "{height}")?;
        }
        Ok(())
    }
}

/// Accepts `YYYY-MM-DD HH:MM:SS[.fraction]` or a bare `YYYY-MM-DD` (midnight).
pub fn parse_date(s: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, DATE_FORMAT).or_else(|e| {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(|date| date.and_time(NaiveTime::MIN))
            .map_err(|_| e)
    })
}

/// Lowercases, strips leading dots and drops empty or repeated entries.
pub fn normalize_extensions<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut extensions: Vec<String> = Vec::new();
    for ext in raw {
        let ext = ext.as_ref().trim().trim_start_matches('.').to_lowercase();
        if !ext.is_empty() && !extensions.contains(&ext) {
            extensions.push(ext);
        }
    }
    extensions
}

#[cfg(test)]
mod tests {
    use chrono::Timelike;

    use super::*;

    #[test]
    fn rate_suffixes() {
        assert_eq!("512k".parse::<RateLimit>().unwrap().bytes_per_second(), 512 * 1024);
        assert_eq!("2M".parse::<RateLimit>().unwrap().bytes_per_second(), 2 * 1024 * 1024);
        assert_eq!("100".parse::<RateLimit>().unwrap().bytes_per_second(), 100);
        assert_eq!("1g".parse::<RateLimit>().unwrap().to_string(), "1G");
        assert_eq!("1024k".parse::<RateLimit>().unwrap().to_string(), "1M");
        assert_eq!("1500".parse::<RateLimit>().unwrap().to_string(), "1500");
    }

    #[test]
    fn rate_rejects_garbage() {
        assert!("".parse::<RateLimit>().is_err());
        assert!("k".parse::<RateLimit>().is_err());
        assert!("0k".parse::<RateLimit>().is_err());
        assert!("fast".parse::<RateLimit>().is_err());
        assert!("-5k".parse::<RateLimit>().is_err());
        assert!("99999999999999999999G".parse::<RateLimit>().is_err());
    }

    #[test]
    fn resize_sides() {
        let spec: ResizeSpec = "800x600".parse().unwrap();
        assert_eq!((spec.width, spec.height), (Some(800), Some(600)));
        let spec: ResizeSpec = "800x".parse().unwrap();
        assert_eq!((spec.width, spec.height), (Some(800), None));
        let spec: ResizeSpec = "X600".parse().unwrap();
        assert_eq!((spec.width, spec.height), (None, Some(600)));
        assert_eq!(spec.to_string(), "x600");
    }

    #[test]
    fn resize_rejects_garbage() {
        assert!("x".parse::<ResizeSpec>().is_err());
        assert!("800".parse::<ResizeSpec>().is_err());
        assert!("0x10".parse::<ResizeSpec>().is_err());
        assert!("axb".parse::<ResizeSpec>().is_err());
    }

    #[test]
    fn dates() {
        let begin = parse_date("1970-01-01 00:00:00.00").unwrap();
        assert_eq!(begin.and_utc().timestamp(), 0);
        let end = parse_date("2099-12-12 23:59:59.999").unwrap();
        assert_eq!(end.nanosecond(), 999_000_000);
        let day = parse_date("2017-06-01").unwrap();
        assert_eq!(day, parse_date("2017-06-01 00:00:00").unwrap());
        assert!(parse_date("yesterday").is_err());
        assert!(parse_date("2017-13-01").is_err());
    }

    #[test]
    fn extensions_are_normalized() {
        assert_eq!(
            normalize_extensions(["JPG", ".png", "", " gif ", "jpg"]),
            vec!["jpg", "png", "gif"]
        );
    }
}
