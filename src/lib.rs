// library crate for sldbridge
// the binary in main.rs is a thin clap front end over these modules

pub mod cli;
pub mod config;
pub mod error;
pub mod filters;
pub mod pipeline;
pub mod style;

use tracing_subscriber::EnvFilter;

/// env var holding a tracing filter directive, e.g. `sldbridge=debug`
pub const LOG_ENV_VAR: &str = "SLDBRIDGE_LOG";

/// default filter directive for a `-v` count
pub fn default_log_level(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

/// install the stderr subscriber; `SLDBRIDGE_LOG` wins over `-v`
pub fn init_tracing(verbosity: u8) {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(default_log_level(verbosity)));

    // a second init (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
