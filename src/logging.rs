//! Tracing subscriber setup.
//!
//! Diagnostics go to stderr so command output on stdout stays pipeable.
//! `RUST_LOG` takes precedence over the built-in filter.

use tracing_subscriber::EnvFilter;

fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "tradedesk=debug"
    } else {
        "tradedesk=info"
    }
}

pub fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)))
}

pub fn init_logging(verbose: bool) {
    // A subscriber may already be installed (tests); keep it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
