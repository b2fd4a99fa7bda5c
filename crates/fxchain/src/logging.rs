#![forbid(unsafe_code)]

//! Global tracing subscriber setup.
//!
//! Libraries in this workspace only emit events. Hosts that want them on
//! stderr call [`init`] once at startup. The filter comes from `RUST_LOG`
//! and falls back to [`DEFAULT_DIRECTIVES`].

use tracing_subscriber::EnvFilter;

use crate::Error;

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_DIRECTIVES: &str = "warn";

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Single-line human-readable output.
    #[default]
    Compact,
    /// Multi-line output with source locations.
    Pretty,
    /// Newline-delimited JSON.
    #[cfg(feature = "tracing-json")]
    Json,
}

/// Build the env filter, falling back to the defaults.
#[must_use]
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))
}

/// Install the global subscriber.
///
/// Fails if a global subscriber is already set.
pub fn init(format: LogFormat) -> Result<(), Error> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr);
    let result = match format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        #[cfg(feature = "tracing-json")]
        LogFormat::Json => builder.json().try_init(),
    };
    result.map_err(|err| Error::Logging(err.to_string()))
}
