use std::path::PathBuf;

use chrono::NaiveDateTime;
use clap::{CommandFactory, Parser, Subcommand};
use regex::Regex;

use crate::values::{self, RateLimit, ResizeSpec};

macro_rules! license_block {
    () => {
        concat!(
            "License:\n  ",
            env!("CARGO_PKG_NAME"),
            " is licensed under the ",
            env!("CARGO_PKG_LICENSE"),
            " license."
        )
    };
}

const LICENSE: &str = license_block!();

const EXAMPLES: &str = concat!(
    "\
Examples:
  $ image_scraper generic [OPTIONS] URI [URI ...]
                        Run the generic scraper. Run with --help for details.

  $ image_scraper twitter [OPTIONS] URI [URI ...]
                        Run the twitter scraper. Run with --help for details.

  $ image_scraper tumblr [OPTIONS] URI [URI ...]
                        Run the tumblr scraper. Run with --help for details.\n\n",
    license_block!()
);

const GENERIC_EXAMPLES: &str = concat!(
    "\
Examples:
  $ image_scraper generic https://foo.example.com/
                        Scrape all images located at https://foo.example.com/
                        without recursing into any sub-resources.

  $ image_scraper generic --config-file scraper.toml http://foo.example.com/
                        Read option defaults from scraper.toml, then scrape
                        http://foo.example.com/.

  $ image_scraper generic -r -R 4 /usr/share/icons
                        Recursively scrape the local directory /usr/share/icons,
                        downloading 4 resources at a time.

  $ image_scraper generic -a ScraperBot --cookie cookie.txt -D images \\
        -e jpg,png -t site -p http://foo.example.com/login -l 512k \\
        --no-follow --names '^img[0-9]+' -U myuser -P mypass -r \\
        -o log.txt -s 10 -w 7 -R 9 http://foo.example.com/
                        Recursively scrape jpg and png images named img<N>
                        into ./images, logging in through the site login page
                        and capping downloads at 512k per second.

  $ image_scraper generic -U anonymous ftps://bar.example.com/images
                        Scrape the ftps resource anonymously.\n\n",
    license_block!()
);

/// Scrape one or more URI resources for images
#[derive(Parser, Debug)]
#[command(version, about, long_about = None, after_help = EXAMPLES)]
#[command(subcommand_value_name = "SCRAPER", subcommand_help_heading = "Scrapers")]
pub struct Args {
    /// Display debug information
    #[arg(long, global = true)]
    pub debug: bool,

    /// Read option defaults from a TOML file. Flags given on the command line win
    #[arg(long, visible_alias = "cf", value_name = "CONFIG_FILE", global = true)]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub scraper: Option<ScraperCommand>,
}

/// Scraper to run: [ generic | tumblr | twitter ]
#[derive(Subcommand, Debug)]
pub enum ScraperCommand {
    /// Scrape images off of any URI resource. General purpose, may not grab every image
    #[command(after_help = GENERIC_EXAMPLES)]
    Generic(GenericArgs),
    /// Scrape images off of tumblr blogs
    #[command(after_help = LICENSE)]
    Tumblr(TumblrArgs),
    /// Scrape images off of twitter profiles
    #[command(after_help = LICENSE)]
    Twitter(TwitterArgs),
}

#[derive(clap::Args, Debug)]
pub struct GenericArgs {
    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(clap::Args, Debug)]
pub struct TumblrArgs {
    /// Download at most COUNT images from each blog [default: 1000]
    #[arg(long, value_name = "COUNT")]
    pub count: Option<u32>,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(clap::Args, Debug)]
pub struct TwitterArgs {
    /// Download images modified after BEGIN_DATE [default: 1970-01-01 00:00:00.00]
    #[arg(long, value_name = "BEGIN_DATE", value_parser = values::parse_date)]
    pub begin_date: Option<NaiveDateTime>,

    /// Download images modified before END_DATE [default: 2099-12-12 23:59:59.999]
    #[arg(long, value_name = "END_DATE", value_parser = values::parse_date)]
    pub end_date: Option<NaiveDateTime>,

    #[command(flatten)]
    pub common: CommonArgs,
}

/// Flags shared by every scraper. Values left unset here may still come
/// from the config file before defaults apply.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// The user agent to report when downloading resources [default: ScraperBot]
    #[arg(short = 'a', long, value_name = "USER_AGENT")]
    pub user_agent: Option<String>,

    /// Use cookie file, created if missing. By default cookies are kept in memory
    #[arg(short = 'c', long = "cookie", value_name = "COOKIE_FILE")]
    pub cookie_file: Option<PathBuf>,

    /// Certificate used to authenticate https, ftps or ssh connections
    #[arg(short = 'C', long = "cert", value_name = "CERTIFICATE")]
    pub cert_file: Option<PathBuf>,

    /// Directory inside OUTPUT_DIR where images are saved. Random name by default
    #[arg(short = 'd', long, value_name = "DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Where the data directory and metadata file go. Current directory by default
    #[arg(short = 'D', long, visible_alias = "od", value_name = "OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Write the scrape log to LOG_FILE
    #[arg(short = 'o', long, visible_alias = "of", value_name = "LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Scrape URIs recursively
    #[arg(short = 'r', long)]
    pub recursive: bool,

    /// Download NUM_RESOURCES resources at once (1-9)
    #[arg(
        short = 'R',
        long,
        value_name = "NUM_RESOURCES",
        value_parser = clap::value_parser!(u8).range(1..10)
    )]
    pub num_resources: Option<u8>,

    /// Scrape images at least MIN_WIDTH pixels wide. -1 for no bound
    #[arg(short = 'x', long, value_name = "MIN_WIDTH", allow_negative_numbers = true)]
    pub min_width: Option<i32>,

    /// Scrape images at most MAX_WIDTH pixels wide. -1 for no bound
    #[arg(short = 'X', long, value_name = "MAX_WIDTH", allow_negative_numbers = true)]
    pub max_width: Option<i32>,

    /// Scrape images at least MIN_HEIGHT pixels high. -1 for no bound
    #[arg(short = 'y', long, value_name = "MIN_HEIGHT", allow_negative_numbers = true)]
    pub min_height: Option<i32>,

    /// Scrape images at most MAX_HEIGHT pixels high. -1 for no bound
    #[arg(short = 'Y', long, value_name = "MAX_HEIGHT", allow_negative_numbers = true)]
    pub max_height: Option<i32>,

    /// Username for the URI resource. Use "anonymous" for anonymous ftp(s)
    #[arg(short = 'U', long, value_name = "USERNAME")]
    pub username: Option<String>,

    /// Password for the URI resource. Leave unset for anonymous ftp(s)
    #[arg(short = 'P', long, value_name = "PASSWORD")]
    pub password: Option<String>,

    /// Cap download speed, e.g. 512k or 2M (bytes per second)
    #[arg(short = 'l', long, value_name = "RATE")]
    pub limit_rate: Option<RateLimit>,

    /// Sleep between 0 and SECONDS before each sub-resource request [default: 0]
    #[arg(short = 's', long, value_name = "SECONDS")]
    pub sleep: Option<u64>,

    /// Wait between 0 and SECONDS for each resource [default: 0]
    #[arg(short = 'w', long, value_name = "SECONDS")]
    pub wait: Option<u64>,

    /// Only keep files with these extensions, comma separated
    #[arg(short = 'e', long, value_name = "EXTENSIONS", value_delimiter = ',')]
    pub extensions: Vec<String>,

    /// Only keep files whose name matches this regular expression
    #[arg(short = 'n', long, value_name = "REGEX")]
    pub names: Option<Regex>,

    /// Do not send a referrer when requesting resources
    #[arg(long)]
    pub no_follow: bool,

    /// Resize downloaded images to fit WxH. Either side may be omitted (800x, x600)
    #[arg(long, value_name = "WxH")]
    pub resize: Option<ResizeSpec>,

    /// How to log in before scraping, e.g. "site"
    #[arg(short = 't', long, value_name = "LOGIN_TYPE")]
    pub login_type: Option<String>,

    /// Page used to log in when LOGIN_TYPE needs one
    #[arg(short = 'p', long, value_name = "LOGIN_PAGE")]
    pub login_page: Option<String>,

    /// The URI to scrape. Separate multiple URIs by spaces. Directory paths and
    /// http, https, ftp, ftps, sftp and ssh URIs are accepted
    #[arg(value_name = "URI", required = true)]
    pub uris: Vec<String>,
}

impl ScraperCommand {
    pub fn common(&self) -> &CommonArgs {
        match self {
            ScraperCommand::Generic(args) => &args.common,
            ScraperCommand::Tumblr(args) => &args.common,
            ScraperCommand::Twitter(args) => &args.common,
        }
    }
}

/// Stand-in for password values in anything printed or logged.
pub const PASSWORD_MASK: &str = "********";

const PASSWORD_SHORT: char = 'P';
const PASSWORD_LONG: &str = "--password";

/// Copy of argv with every password value replaced by [`PASSWORD_MASK`].
///
/// Short flags may be grouped (`-rP pw`, `-rPpw`), so each group is walked
/// the way clap reads it: flags until the first one that takes a value, whose
/// value is the rest of the group or else the next argument.
pub fn masked_argv(argv: &[String]) -> Vec<String> {
    let value_shorts = value_taking_shorts();
    let mut masked = Vec::with_capacity(argv.len());
    let mut tokens = argv.iter();
    while let Some(arg) = tokens.next() {
        if arg == "--" {
            masked.push(arg.clone());
            masked.extend(tokens.by_ref().cloned());
            break;
        }
        let password_follows = if arg == PASSWORD_LONG {
            masked.push(arg.clone());
            true
        } else if arg.starts_with(&format!("{PASSWORD_LONG}=")) {
            masked.push(format!("{PASSWORD_LONG}={PASSWORD_MASK}"));
            false
        } else if let Some(group) = arg.strip_prefix('-').filter(|g| !g.starts_with('-')) {
            match mask_short_group(group, &value_shorts) {
                ShortGroup::Inline(text) => {
                    masked.push(format!("-{text}"));
                    false
                }
                ShortGroup::PasswordFollows => {
                    masked.push(arg.clone());
                    true
                }
                ShortGroup::NoPassword => {
                    masked.push(arg.clone());
                    false
                }
            }
        } else {
            masked.push(arg.clone());
            false
        };
        if password_follows && tokens.next().is_some() {
            masked.push(PASSWORD_MASK.to_owned());
        }
    }
    masked
}

enum ShortGroup {
    /// The password was attached to the group, text already masked.
    Inline(String),
    /// The group ends in the password flag, its value is the next argument.
    PasswordFollows,
    NoPassword,
}

fn mask_short_group(group: &str, value_shorts: &[char]) -> ShortGroup {
    for (i, c) in group.char_indices() {
        if !value_shorts.contains(&c) {
            continue;
        }
        if c != PASSWORD_SHORT {
            // Whatever follows is this option's value.
            return ShortGroup::NoPassword;
        }
        let end = i + c.len_utf8();
        if end == group.len() {
            return ShortGroup::PasswordFollows;
        }
        return ShortGroup::Inline(format!("{}{PASSWORD_MASK}", &group[..end]));
    }
    ShortGroup::NoPassword
}

/// Short flags that take a value in any scraper's grammar.
fn value_taking_shorts() -> Vec<char> {
    let mut command = Args::command();
    command.build();
    let mut shorts: Vec<char> = command
        .get_subcommands()
        .flat_map(|sub| sub.get_arguments())
        .chain(command.get_arguments())
        .filter(|arg| arg.get_action().takes_values())
        .filter_map(|arg| arg.get_short())
        .collect();
    shorts.sort_unstable();
    shorts.dedup();
    shorts
}

#[cfg(test)]
mod tests {
    use clap::error::ErrorKind;

    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    fn parse_err(argv: &[&str]) -> ErrorKind {
        Args::try_parse_from(argv).unwrap_err().kind()
    }

    #[test]
    fn verify_cli_args() {
        // Catches short flag clashes and duplicate ids across the flattened groups.
        Args::command().debug_assert();
    }

    #[test]
    fn scraper_is_optional() {
        let args = parse(&["image_scraper"]);
        assert!(args.scraper.is_none());
        assert!(!args.debug);
    }

    #[test]
    fn unknown_scraper_is_rejected() {
        let kind = parse_err(&["image_scraper", "flickr", "http://example.com"]);
        assert!(
            matches!(kind, ErrorKind::InvalidSubcommand | ErrorKind::UnknownArgument),
            "{kind:?}"
        );
    }

    #[test]
    fn help_and_version_short_circuit() {
        assert_eq!(parse_err(&["image_scraper", "--help"]), ErrorKind::DisplayHelp);
        assert_eq!(parse_err(&["image_scraper", "tumblr", "--help"]), ErrorKind::DisplayHelp);
        assert_eq!(parse_err(&["image_scraper", "--version"]), ErrorKind::DisplayVersion);
    }

    #[test]
    fn uris_are_required() {
        assert_eq!(
            parse_err(&["image_scraper", "generic", "-r"]),
            ErrorKind::MissingRequiredArgument
        );
    }

    #[test]
    fn omitted_flags_stay_unset() {
        let args = parse(&["image_scraper", "generic", "http://example.com"]);
        let common = args.scraper.unwrap().common().clone();
        assert_eq!(common.uris, vec!["http://example.com"]);
        assert!(common.user_agent.is_none());
        assert!(common.num_resources.is_none());
        assert!(common.min_width.is_none());
        assert!(common.extensions.is_empty());
        assert!(!common.recursive);
        assert!(!common.no_follow);
    }

    #[test]
    fn every_shared_flag_is_parsed() {
        let args = parse(&[
            "image_scraper",
            "generic",
            "-a",
            "TestBot",
            "-c",
            "cookie.txt",
            "-C",
            "cert.pem",
            "-d",
            "data",
            "-D",
            "images",
            "-o",
            "log.txt",
            "-r",
            "-R",
            "4",
            "-x",
            "10",
            "-X",
            "-1",
            "-y",
            "20",
            "-Y",
            "2000",
            "-U",
            "myuser",
            "-P",
            "mypass",
            "-l",
            "512k",
            "-s",
            "10",
            "-w",
            "7",
            "-e",
            "jpg,png",
            "-n",
            "^img[0-9]+",
            "--no-follow",
            "--resize",
            "800x600",
            "-t",
            "site",
            "-p",
            "http://foo.example.com/login",
            "http://foo.example.com/",
            "/usr/share/icons",
        ]);
        let Some(ScraperCommand::Generic(GenericArgs { common })) = args.scraper else {
            panic!("expected generic scraper");
        };
        assert_eq!(common.user_agent.as_deref(), Some("TestBot"));
        assert_eq!(common.cookie_file, Some(PathBuf::from("cookie.txt")));
        assert_eq!(common.cert_file, Some(PathBuf::from("cert.pem")));
        assert_eq!(common.data_dir, Some(PathBuf::from("data")));
        assert_eq!(common.output_dir, Some(PathBuf::from("images")));
        assert_eq!(common.log_file, Some(PathBuf::from("log.txt")));
        assert!(common.recursive);
        assert_eq!(common.num_resources, Some(4));
        assert_eq!(common.min_width, Some(10));
        assert_eq!(common.max_width, Some(-1));
        assert_eq!(common.min_height, Some(20));
        assert_eq!(common.max_height, Some(2000));
        assert_eq!(common.username.as_deref(), Some("myuser"));
        assert_eq!(common.password.as_deref(), Some("mypass"));
        assert_eq!(common.limit_rate.map(RateLimit::bytes_per_second), Some(512 * 1024));
        assert_eq!(common.sleep, Some(10));
        assert_eq!(common.wait, Some(7));
        assert_eq!(common.extensions, vec!["jpg", "png"]);
        assert_eq!(common.names.as_ref().map(Regex::as_str), Some("^img[0-9]+"));
        assert!(common.no_follow);
        assert_eq!(common.resize.and_then(|r| r.width), Some(800));
        assert_eq!(common.login_type.as_deref(), Some("site"));
        assert_eq!(common.login_page.as_deref(), Some("http://foo.example.com/login"));
        assert_eq!(common.uris, vec!["http://foo.example.com/", "/usr/share/icons"]);
    }

    #[test]
    fn aliases_match_long_names() {
        let args = parse(&["image_scraper", "generic", "--od", "images", "--of", "log.txt", "x"]);
        let common = args.scraper.unwrap().common().clone();
        assert_eq!(common.output_dir, Some(PathBuf::from("images")));
        assert_eq!(common.log_file, Some(PathBuf::from("log.txt")));
    }

    #[test]
    fn num_resources_is_bounded() {
        for bad in ["0", "10", "-1", "many"] {
            assert!(
                Args::try_parse_from(["image_scraper", "generic", "-R", bad, "x"]).is_err(),
                "{bad} accepted"
            );
        }
        for good in ["1", "9"] {
            assert!(Args::try_parse_from(["image_scraper", "generic", "-R", good, "x"]).is_ok());
        }
    }

    #[test]
    fn malformed_values_are_rejected() {
        assert_eq!(
            parse_err(&["image_scraper", "generic", "-l", "fast", "x"]),
            ErrorKind::ValueValidation
        );
        assert_eq!(
            parse_err(&["image_scraper", "generic", "--resize", "big", "x"]),
            ErrorKind::ValueValidation
        );
        assert_eq!(
            parse_err(&["image_scraper", "generic", "-n", "img[", "x"]),
            ErrorKind::ValueValidation
        );
        assert_eq!(
            parse_err(&["image_scraper", "twitter", "--begin-date", "soon", "x"]),
            ErrorKind::ValueValidation
        );
    }

    #[test]
    fn handler_flags_stay_with_their_handler() {
        let args = parse(&["image_scraper", "tumblr", "--count", "50", "blog.tumblr.com"]);
        let Some(ScraperCommand::Tumblr(tumblr)) = args.scraper else {
            panic!("expected tumblr scraper");
        };
        assert_eq!(tumblr.count, Some(50));

        let args = parse(&[
            "image_scraper",
            "twitter",
            "--begin-date",
            "2017-01-01",
            "--end-date",
            "2018-01-01 12:00:00.5",
            "@someone",
        ]);
        let Some(ScraperCommand::Twitter(twitter)) = args.scraper else {
            panic!("expected twitter scraper");
        };
        assert_eq!(twitter.begin_date, Some(values::parse_date("2017-01-01").unwrap()));
        assert!(twitter.end_date.is_some());

        assert_eq!(
            parse_err(&["image_scraper", "generic", "--count", "5", "x"]),
            ErrorKind::UnknownArgument
        );
        assert_eq!(
            parse_err(&["image_scraper", "tumblr", "--begin-date", "2017-01-01", "x"]),
            ErrorKind::UnknownArgument
        );
    }

    #[test]
    fn global_flags_work_on_either_side_of_the_scraper() {
        let args = parse(&["image_scraper", "--debug", "generic", "x"]);
        assert!(args.debug);
        let args = parse(&["image_scraper", "generic", "x", "--debug", "--cf", "s.toml"]);
        assert!(args.debug);
        assert_eq!(args.config_file, Some(PathBuf::from("s.toml")));
    }

    fn strings(argv: &[&str]) -> Vec<String> {
        argv.iter().map(|a| a.to_string()).collect()
    }

    #[test]
    fn masking_leaves_other_args_alone() {
        let argv = strings(&["image_scraper", "generic", "-U", "me", "--password", "pw", "x"]);
        assert_eq!(
            masked_argv(&argv),
            ["image_scraper", "generic", "-U", "me", "--password", PASSWORD_MASK, "x"]
        );
        let argv = strings(&["image_scraper", "generic", "--password=pw", "-Ppw", "x"]);
        assert_eq!(
            masked_argv(&argv),
            ["image_scraper", "generic", "--password=********", "-P********", "x"]
        );
    }

    #[test]
    fn masking_follows_grouped_short_flags() {
        let argv = strings(&["image_scraper", "generic", "-rP", "hunter2", "x"]);
        assert_eq!(
            masked_argv(&argv),
            ["image_scraper", "generic", "-rP", PASSWORD_MASK, "x"]
        );
        let argv = strings(&["image_scraper", "generic", "-rPhunter2", "x"]);
        assert_eq!(
            masked_argv(&argv),
            ["image_scraper", "generic", "-rP********", "x"]
        );
        // Both groups must parse the way they are masked.
        for argv in [
            &["image_scraper", "generic", "-rP", "hunter2", "x"][..],
            &["image_scraper", "generic", "-rPhunter2", "x"][..],
        ] {
            let common = parse(argv).scraper.unwrap().common().clone();
            assert!(common.recursive);
            assert_eq!(common.password.as_deref(), Some("hunter2"));
        }
    }

    #[test]
    fn masking_skips_values_of_other_short_flags() {
        // `P` here is the user agent, the next argument is a uri.
        let argv = strings(&["image_scraper", "generic", "-aP", "http://example.com"]);
        assert_eq!(masked_argv(&argv), argv);
        let argv = strings(&["image_scraper", "generic", "-rR", "4", "-P", "pw", "x"]);
        assert_eq!(
            masked_argv(&argv),
            ["image_scraper", "generic", "-rR", "4", "-P", PASSWORD_MASK, "x"]
        );
    }

    #[test]
    fn masking_stops_at_the_terminator() {
        let argv = strings(&["image_scraper", "generic", "-P", "pw", "--", "-P", "x"]);
        assert_eq!(
            masked_argv(&argv),
            ["image_scraper", "generic", "-P", PASSWORD_MASK, "--", "-P", "x"]
        );
        let argv = strings(&["image_scraper", "generic", "-rP"]);
        assert_eq!(masked_argv(&argv), argv);
    }

    #[test]
    fn help_carries_the_license() {
        let mut command = Args::command();
        let top = command.render_help().to_string();
        assert!(top.contains("License:"), "{top}");
        assert!(top.contains("image_scraper is licensed under the MIT license."), "{top}");
        for name in ["generic", "tumblr", "twitter"] {
            let sub = command
                .find_subcommand_mut(name)
                .unwrap()
                .render_help()
                .to_string();
            assert!(sub.contains("License:"), "{name}: {sub}");
            assert!(sub.contains("MIT"), "{name}: {sub}");
        }
    }
}
