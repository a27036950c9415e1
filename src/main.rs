use std::{
    io::{self, Write},
    process::ExitCode,
};

use anyhow::Context;
use clap::{CommandFactory, Parser};

use crate::terminal_interface::Args;

mod config;
mod error;
mod logging;
mod options;
mod scrapers;
mod terminal_interface;
mod values;

fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();
    logging::init(args.debug);

    let argv: Vec<String> = std::env::args_os()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();
    let mut stdout = io::stdout().lock();
    let code = run(args, argv, &mut stdout)?;
    stdout.flush()?;
    Ok(code)
}

/// Resolves the chosen scraper and writes its report (or the usage text) to `out`.
fn run(args: Args, argv: Vec<String>, out: &mut dyn Write) -> anyhow::Result<ExitCode> {
    tracing::debug!(argv = ?terminal_interface::masked_argv(&argv), "args");

    // Without a scraper there is nothing to run
    let Some(command) = args.scraper else {
        write!(out, "{}", Args::command().render_help())?;
        writeln!(out, "\nChoose a scraper from [ {} ]", scrapers::NAMES.join(" | "))?;
        return Ok(ExitCode::FAILURE);
    };

    let file = match &args.config_file {
        Some(path) => config::FileConfig::load(path).context("failed to load config file")?,
        None => config::FileConfig::default(),
    };
    tracing::debug!(uris = ?command.common().uris, "resolving scraper");
    let invocation = scrapers::Invocation {
        argv,
        debug: args.debug,
        config_file: args.config_file,
    };
    let scraper =
        scrapers::from_command(command, &file, invocation).context("invalid scraper options")?;

    scraper
        .handle(out)
        .with_context(|| format!("{} scraper failed", scraper.name()))?;
    Ok(ExitCode::SUCCESS)
}
