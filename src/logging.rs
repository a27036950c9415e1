use tracing_subscriber::EnvFilter;

/// Logs go to stderr so stdout carries only the scraper report.
/// `RUST_LOG` takes precedence over `--debug`.
pub fn init(debug: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if debug {
            "image_scraper=debug"
        } else {
            "image_scraper=warn"
        })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
