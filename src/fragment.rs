//! The page location and the percent-encoded query kept in its fragment.
//!
//! The fragment makes the current search shareable: printing the
//! [`PageLocation`] gives a URL that restores the same query on startup.

use std::fmt;
use std::str::FromStr;
use std::string::FromUtf8Error;

use url::Url;

/// Page used when none is given on the command line.
pub const DEFAULT_PAGE: &str = "http://localhost/";

/// Failure to turn a fragment back into a query.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DecodeError {
    /// A `%` not followed by two hex digits.
    #[error("malformed percent-escape at byte {offset}")]
    MalformedEscape {
        /// Byte offset of the offending `%`.
        offset: usize,
    },
    /// The escapes decode to bytes that are not UTF-8.
    #[error("fragment is not valid UTF-8 once decoded")]
    InvalidUtf8(#[source] FromUtf8Error),
}

/// Percent-encode a query for use as a URL fragment.
///
/// Everything except ASCII alphanumerics and `-_.~` is escaped, so the
/// result is safe in any URL component.
///
/// ```
/// assert_eq!(handle_avail::fragment::encode("a b/c"), "a%20b%2Fc");
/// ```
#[must_use]
pub fn encode(query: &str) -> String {
    urlencoding::encode(query).into_owned()
}

/// Reverse [`encode`].
///
/// # Errors
///
/// Returns [`DecodeError`] for a dangling or non-hex escape, or when the
/// decoded bytes are not UTF-8.
///
/// ```
/// assert_eq!(handle_avail::fragment::decode("%62ob").unwrap(), "bob");
/// assert!(handle_avail::fragment::decode("50%").is_err());
/// ```
pub fn decode(fragment: &str) -> Result<String, DecodeError> {
    // urlencoding passes bad escapes through untouched; reject them first.
    let bytes = fragment.as_bytes();
    for (offset, _) in fragment.match_indices('%') {
        let well_formed = bytes
            .get(offset + 1..offset + 3)
            .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
        if !well_formed {
            return Err(DecodeError::MalformedEscape { offset });
        }
    }
    urlencoding::decode(fragment)
        .map(|decoded| decoded.into_owned())
        .map_err(DecodeError::InvalidUtf8)
}

/// The URL of the "page" hosting the search.
///
/// Its query string carries configuration (`port`), its fragment carries the
/// current query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLocation {
    url: Url,
}

impl PageLocation {
    /// Parse a page URL.
    ///
    /// # Errors
    ///
    /// Returns the parser's error when `page` is not an absolute URL.
    pub fn parse(page: &str) -> Result<Self, url::ParseError> {
        Url::parse(page).map(|url| Self { url })
    }

    /// The raw (still encoded) fragment, or `None` when absent or empty.
    #[must_use]
    pub fn read(&self) -> Option<&str> {
        self.url.fragment().filter(|f| !f.is_empty())
    }

    /// Replace the fragment. An empty fragment removes it.
    pub fn write(&mut self, fragment: &str) {
        if fragment.is_empty() {
            self.url.set_fragment(None);
        } else {
            self.url.set_fragment(Some(fragment));
        }
    }

    /// First value of the named query-string parameter.
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }

    /// The full URL, fragment included.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }
}

impl Default for PageLocation {
    fn default() -> Self {
        Self {
            url: Url::parse(DEFAULT_PAGE).expect("default page URL is valid"),
        }
    }
}

impl FromStr for PageLocation {
    type Err = url::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PageLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
