//! Runtime configuration, resolved from the page URL and command-line flags.

use std::time::Duration;

use crate::debounce::DEFAULT_DELAY;
use crate::fragment::PageLocation;

/// Backend port used when neither the page nor the command line names one.
pub const DEFAULT_PORT: u16 = 8080;

/// Backend host used when none is given.
pub const DEFAULT_HOST: &str = "localhost";

/// Upper bound on a single availability request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Name of the page query parameter carrying the backend port.
pub const PORT_PARAM: &str = "port";

/// A configuration value that cannot be used.
///
/// These are reported before any request is built; nothing falls back to a
/// default once a value has been given.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The port is not a number.
    #[error("invalid port `{value}`: not a number")]
    InvalidPort {
        /// The rejected value, verbatim.
        value: String,
    },
    /// The port is numeric but outside 1..=65535.
    #[error("invalid port `{value}`: must be between 1 and 65535")]
    PortOutOfRange {
        /// The rejected value, verbatim.
        value: String,
    },
    /// The page URL does not parse.
    #[error("invalid page URL `{page}`")]
    InvalidPage {
        /// The rejected URL.
        page: String,
        /// Why it was rejected.
        #[source]
        source: url::ParseError,
    },
}

/// What to show when a search succeeds with zero platforms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EmptyResults {
    /// An explicit "No results found" line.
    #[default]
    Indicator,
    /// Nothing at all.
    Blank,
}

/// Values given explicitly on the command line. `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// Raw `--port` value, validated like the page parameter.
    pub port: Option<String>,
    /// `--host`.
    pub host: Option<String>,
    /// `--delay-ms`.
    pub debounce: Option<Duration>,
    /// `--timeout-secs`.
    pub timeout: Option<Duration>,
    /// `--blank-empty`.
    pub empty_results: Option<EmptyResults>,
}

/// Resolved settings for one search session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Backend host name.
    pub host: String,
    /// Backend port.
    pub port: u16,
    /// Quiet interval before a keystroke burst becomes a search.
    pub debounce: Duration,
    /// Per-request timeout; expiry counts as a network failure.
    pub timeout: Duration,
    /// Rendering of an empty result set.
    pub empty_results: EmptyResults,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            debounce: DEFAULT_DELAY,
            timeout: DEFAULT_TIMEOUT,
            empty_results: EmptyResults::default(),
        }
    }
}

impl Config {
    /// Resolve settings: command-line overrides win over the page's query
    /// string, which wins over the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the effective port is not a valid port.
    pub fn from_page(page: &PageLocation, overrides: &Overrides) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let raw_port = overrides
            .port
            .clone()
            .or_else(|| page.query_param(PORT_PARAM));
        let port = match raw_port {
            Some(raw) => parse_port(&raw)?,
            None => defaults.port,
        };
        Ok(Self {
            host: overrides.host.clone().unwrap_or(defaults.host),
            port,
            debounce: overrides.debounce.unwrap_or(defaults.debounce),
            timeout: overrides.timeout.unwrap_or(defaults.timeout),
            empty_results: overrides.empty_results.unwrap_or(defaults.empty_results),
        })
    }

    /// Base URL of the availability backend, without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// Parse a page in the form the command line accepts it.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidPage`] when `page` is not an absolute URL.
pub fn parse_page(page: &str) -> Result<PageLocation, ConfigError> {
    PageLocation::parse(page).map_err(|source| ConfigError::InvalidPage {
        page: page.to_string(),
        source,
    })
}

/// Validate a port value.
///
/// Surrounding whitespace is tolerated; anything else that is not a decimal
/// number in 1..=65535 is rejected.
///
/// # Errors
///
/// [`ConfigError::InvalidPort`] for non-numeric input,
/// [`ConfigError::PortOutOfRange`] for numbers outside the port range.
///
/// ```
/// use handle_avail::config::parse_port;
/// assert_eq!(parse_port("8080").unwrap(), 8080);
/// assert!(parse_port("eighty").is_err());
/// assert!(parse_port("0").is_err());
/// ```
pub fn parse_port(raw: &str) -> Result<u16, ConfigError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ConfigError::InvalidPort {
            value: raw.to_string(),
        });
    }
    match trimmed.parse::<u16>() {
        Ok(port) if port != 0 => Ok(port),
        _ => Err(ConfigError::PortOutOfRange {
            value: raw.to_string(),
        }),
    }
}
