//! Availability lookups: the response model, the HTTP client and the static
//! dataset backend.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use ureq::Agent;

use crate::config::Config;

/// Availability of one username on one platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlatformResult {
    /// Platform name as reported by the backend.
    pub platform: String,
    /// The platform accepts the username's shape.
    pub valid: bool,
    /// Nobody holds the username. Meaningless when `error` is set.
    pub available: bool,
    /// The backend could not check this platform.
    pub error: bool,
}

/// A backend answer for one username.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// The username as canonicalized by the backend.
    pub username: String,
    /// Per-platform results, in backend order.
    pub results: Vec<PlatformResult>,
}

/// The backend answered, but not with a usable availability report.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// A status outside 2xx.
    #[error("backend returned HTTP {0}")]
    Status(u16),
    /// The body is not JSON, or lacks the expected fields.
    #[error("malformed response body: {0}")]
    Body(#[source] serde_json::Error),
}

/// Errors that can occur when checking a username.
///
/// Per-platform check failures are not errors; they arrive as
/// [`PlatformResult::error`].
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CheckError {
    /// The backend could not be reached, or the exchange timed out.
    #[error("network error: {0}")]
    Network(#[source] Box<ureq::Error>),
    /// The backend replied with something other than a report.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    /// The lookup could not be started at all (e.g. worker spawn failure).
    #[error("internal error: {0}")]
    Internal(String),
}

impl CheckError {
    /// Whether the lookup ended without any reply from the backend.
    ///
    /// True for transport failures and for lookups that never started
    /// ([`Internal`](Self::Internal)); false once the backend has answered.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Internal(_))
    }
}

/// Anything that can answer "is this username available".
///
/// Implementations block; the search controller calls them from a worker
/// thread.
pub trait Backend: Send + Sync {
    /// Look up `username`, which is already trimmed and non-empty.
    ///
    /// # Errors
    ///
    /// Returns [`CheckError`] when no report could be obtained.
    fn check(&self, username: &str) -> Result<SearchResponse, CheckError>;
}

/// An HTTP client for the availability backend.
///
/// Wraps the underlying HTTP agent to insulate callers from the specific
/// HTTP library version used internally.
///
/// ```no_run
/// use handle_avail::check::Client;
/// use handle_avail::config::Config;
///
/// let client = Client::new(&Config::default());
/// let report = client.check("bob")?;
/// println!("{} platforms", report.results.len());
/// # Ok::<(), handle_avail::check::CheckError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Client {
    agent: Agent,
    base_url: String,
}

impl Client {
    /// Create a client for the backend named by `config`.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        let agent_config = Agent::config_builder()
            .timeout_global(Some(config.timeout))
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build();
        Self {
            agent: Agent::new_with_config(agent_config),
            base_url: config.base_url(),
        }
    }

    /// The request target for `username`.
    ///
    /// ```
    /// use handle_avail::check::Client;
    /// use handle_avail::config::Config;
    ///
    /// let client = Client::new(&Config::default());
    /// assert_eq!(
    ///     client.request_url("a b"),
    ///     "http://localhost:8080/check?username=a%20b"
    /// );
    /// ```
    #[must_use]
    pub fn request_url(&self, username: &str) -> String {
        format!(
            "{}/check?username={}",
            self.base_url,
            urlencoding::encode(username)
        )
    }

    /// Issue a single request for `username`. No retries.
    ///
    /// # Errors
    ///
    /// [`CheckError::Network`] on transport failure or timeout,
    /// [`CheckError::Protocol`] on a non-2xx status or an unusable body.
    pub fn check(&self, username: &str) -> Result<SearchResponse, CheckError> {
        let url = self.request_url(username);
        tracing::debug!(%url, "checking availability");
        let mut response = match self.agent.get(&url).call() {
            Ok(response) => response,
            Err(ureq::Error::StatusCode(code)) => {
                return Err(ProtocolError::Status(code).into());
            }
            Err(e) => return Err(CheckError::Network(Box::new(e))),
        };
        let status = response.status();
        if !status.is_success() {
            return Err(ProtocolError::Status(status.as_u16()).into());
        }
        // Read raw bytes: only I/O failures here are transport errors, bad
        // UTF-8 is judged with the JSON.
        let body = response
            .body_mut()
            .read_to_vec()
            .map_err(|e| CheckError::Network(Box::new(e)))?;
        parse_response(&body)
    }
}

impl Backend for Client {
    fn check(&self, username: &str) -> Result<SearchResponse, CheckError> {
        Client::check(self, username)
    }
}

/// Decode a backend reply body.
///
/// # Errors
///
/// [`ProtocolError::Body`] when the body is not UTF-8 JSON holding a
/// complete report.
pub fn parse_response(body: &[u8]) -> Result<SearchResponse, CheckError> {
    serde_json::from_slice(body).map_err(|e| ProtocolError::Body(e).into())
}

/// Failure to load a static dataset.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DatasetError {
    /// The file could not be read.
    #[error("cannot read dataset {}", path.display())]
    Io {
        /// Dataset path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The dataset URL could not be fetched.
    #[error("cannot fetch dataset {url}")]
    Fetch {
        /// Dataset URL.
        url: String,
        /// Underlying error.
        #[source]
        source: Box<ureq::Error>,
    },
    /// The content is not a result list or a report.
    #[error("dataset {origin} is not a result list")]
    Json {
        /// Path or URL the dataset came from.
        origin: String,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
}

/// `Accept` value sent when fetching a dataset: raw file contents from the
/// GitHub contents API, plain JSON from anything else.
const DATASET_ACCEPT: &str = "application/vnd.github.v3.raw, application/json";

#[derive(Deserialize)]
#[serde(untagged)]
enum DatasetFile {
    Results(Vec<PlatformResult>),
    Report(SearchResponse),
}

/// A fixed result list served for every username, for use without a backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticDataset {
    results: Vec<PlatformResult>,
}

impl StaticDataset {
    /// Wrap an in-memory result list.
    #[must_use]
    pub fn new(results: Vec<PlatformResult>) -> Self {
        Self { results }
    }

    /// Load a JSON file holding either a bare array of platform results or a
    /// full report (whose `username` is ignored).
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, DatasetError> {
        let bytes = fs::read(path).map_err(|source| DatasetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&bytes, &path.display().to_string())
    }

    /// Download a dataset with `client`'s agent (same timeout and user
    /// agent as availability lookups).
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::Fetch`] on transport failure or a non-2xx
    /// status, [`DatasetError::Json`] when the body is not a result list.
    pub fn fetch(client: &Client, url: &str) -> Result<Self, DatasetError> {
        let fetch_error = |e| DatasetError::Fetch {
            url: url.to_string(),
            source: Box::new(e),
        };
        let mut response = client
            .agent
            .get(url)
            .header("Accept", DATASET_ACCEPT)
            .call()
            .map_err(fetch_error)?;
        let bytes = response.body_mut().read_to_vec().map_err(fetch_error)?;
        Self::parse(&bytes, url)
    }

    /// Load from `location`: an `http://` or `https://` URL is fetched with
    /// `client`, anything else is read as a file path.
    ///
    /// # Errors
    ///
    /// As [`load`](Self::load) or [`fetch`](Self::fetch).
    pub fn open(location: &str, client: &Client) -> Result<Self, DatasetError> {
        if location.starts_with("http://") || location.starts_with("https://") {
            Self::fetch(client, location)
        } else {
            Self::load(Path::new(location))
        }
    }

    fn parse(bytes: &[u8], origin: &str) -> Result<Self, DatasetError> {
        let file: DatasetFile =
            serde_json::from_slice(bytes).map_err(|source| DatasetError::Json {
                origin: origin.to_string(),
                source,
            })?;
        let results = match file {
            DatasetFile::Results(results) => results,
            DatasetFile::Report(report) => report.results,
        };
        tracing::debug!(origin, platforms = results.len(), "loaded dataset");
        Ok(Self { results })
    }

    /// The results served for every query.
    #[must_use]
    pub fn results(&self) -> &[PlatformResult] {
        &self.results
    }
}

impl Backend for StaticDataset {
    fn check(&self, username: &str) -> Result<SearchResponse, CheckError> {
        Ok(SearchResponse {
            username: username.to_string(),
            results: self.results.clone(),
        })
    }
}
