use std::{
    io::Write,
    path::{Path, PathBuf},
};

use serde::Serialize;

use crate::{
    config::FileConfig,
    error::{Error, Result},
    options::{GenericOptions, TumblrOptions, TwitterOptions},
    terminal_interface::{masked_argv, ScraperCommand},
};

/// Registered scrapers, in the order the help text lists them.
pub const NAMES: [&str; 3] = [GenericScraper::NAME, TumblrScraper::NAME, TwitterScraper::NAME];

/// What the driver knows about the process beyond the scraper's own options.
#[derive(Debug, Clone, Default)]
pub struct Invocation {
    pub argv: Vec<String>,
    pub debug: bool,
    pub config_file: Option<PathBuf>,
}

pub trait Scraper {
    fn name(&self) -> &'static str;

    /// Runs the scraper, writing its report to `out`.
    fn handle(&self, out: &mut dyn Write) -> Result<()>;
}

/// Resolves the parsed subcommand into its handler.
pub fn from_command(
    command: ScraperCommand,
    file: &FileConfig,
    invocation: Invocation,
) -> Result<Box<dyn Scraper>> {
    let scraper: Box<dyn Scraper> = match command {
        ScraperCommand::Generic(args) => Box::new(GenericScraper {
            options: GenericOptions::resolve(args, file)?,
            invocation,
        }),
        ScraperCommand::Tumblr(args) => Box::new(TumblrScraper {
            options: TumblrOptions::resolve(args, file)?,
            invocation,
        }),
        ScraperCommand::Twitter(args) => Box::new(TwitterScraper {
            options: TwitterOptions::resolve(args, file)?,
            invocation,
        }),
    };
    tracing::debug!("resolved {} scraper", scraper.name());
    Ok(scraper)
}

#[derive(Debug)]
pub struct GenericScraper {
    pub options: GenericOptions,
    pub invocation: Invocation,
}

impl GenericScraper {
    pub const NAME: &'static str = "generic";
}

impl Scraper for GenericScraper {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn handle(&self, out: &mut dyn Write) -> Result<()> {
        report(out, self.name(), &self.invocation, &self.options)?;
        writeln!(out, "This is the GenericScraper.").map_err(|e| Error::Write { e })
    }
}

#[derive(Debug)]
pub struct TumblrScraper {
    pub options: TumblrOptions,
    pub invocation: Invocation,
}

impl TumblrScraper {
    pub const NAME: &'static str = "tumblr";
}

impl Scraper for TumblrScraper {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn handle(&self, out: &mut dyn Write) -> Result<()> {
        report(out, self.name(), &self.invocation, &self.options)?;
        writeln!(out, "This is the TumblrScraper.").map_err(|e| Error::Write { e })
    }
}

#[derive(Debug)]
pub struct TwitterScraper {
    pub options: TwitterOptions,
    pub invocation: Invocation,
}

impl TwitterScraper {
    pub const NAME: &'static str = "twitter";
}

impl Scraper for TwitterScraper {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn handle(&self, out: &mut dyn Write) -> Result<()> {
        report(out, self.name(), &self.invocation, &self.options)?;
        writeln!(out, "This is the TwitterScraper.").map_err(|e| Error::Write { e })
    }
}

#[derive(Serialize)]
struct Report<'a, T> {
    scraper: &'a str,
    debug: bool,
    config_file: Option<&'a Path>,
    #[serde(flatten)]
    options: &'a T,
}

fn report<T: Serialize>(
    out: &mut dyn Write,
    scraper: &str,
    invocation: &Invocation,
    options: &T,
) -> Result<()> {
    let rendered = serde_json::to_string_pretty(&Report {
        scraper,
        debug: invocation.debug,
        config_file: invocation.config_file.as_deref(),
        options,
    })
    .map_err(|e| Error::RenderOptions { e })?;
    let argv = masked_argv(&invocation.argv);
    writeln!(out, "Args: {argv:?}")
        .and_then(|_| writeln!(out, "Parsed options:"))
        .and_then(|_| writeln!(out, "{rendered}"))
        .and_then(|_| writeln!(out))
        .map_err(|e| Error::Write { e })
}
