//! Turning search outcomes into what the terminal shows.

use std::borrow::Cow;
use std::fmt::{self, Write as _};

use crate::check::{CheckError, PlatformResult, SearchResponse};
use crate::config::EmptyResults;

/// Line shown for a successful search that matched no platform.
pub const NO_RESULTS: &str = "No results found";

/// A three-valued cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Glyph {
    /// ✅
    Yes,
    /// ❌
    No,
    /// ❓, used when the platform check failed and the answer is not known.
    Unknown,
}

impl Glyph {
    fn from_bool(value: bool) -> Self {
        if value { Self::Yes } else { Self::No }
    }

    /// The symbol printed for this cell.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Yes => "✅",
            Self::No => "❌",
            Self::Unknown => "❓",
        }
    }
}

impl fmt::Display for Glyph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// One rendered platform line. `platform` is already escaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    /// Escaped platform name.
    pub platform: String,
    /// Username shape accepted.
    pub valid: Glyph,
    /// Username free, or [`Glyph::Unknown`] when the platform check failed.
    pub available: Glyph,
}

impl Row {
    fn from_result(result: &PlatformResult) -> Self {
        Self {
            platform: escape(&result.platform).into_owned(),
            valid: Glyph::from_bool(result.valid),
            available: if result.error {
                Glyph::Unknown
            } else {
                Glyph::from_bool(result.available)
            },
        }
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}\t{}", self.platform, self.valid, self.available)
    }
}

/// Everything the results area can show.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DisplayState {
    /// No query: nothing shown.
    #[default]
    Empty,
    /// The search succeeded with zero platforms.
    NoResults,
    /// The search failed; the message is escaped.
    Failed {
        /// Human-readable reason.
        message: String,
    },
    /// Rows sorted by platform name.
    Rows {
        /// Escaped, server-canonical username the rows belong to.
        username: String,
        /// One row per platform.
        rows: Vec<Row>,
    },
}

impl fmt::Display for DisplayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::NoResults => writeln!(f, "{NO_RESULTS}"),
            Self::Failed { message } => writeln!(f, "search failed: {message}"),
            Self::Rows { rows, .. } => rows.iter().try_for_each(|row| writeln!(f, "{row}")),
        }
    }
}

/// Input to [`Renderer::render`].
#[derive(Debug, Clone, Copy)]
pub enum Update<'a> {
    /// The query is empty.
    Clear,
    /// A report for the current query.
    Response(&'a SearchResponse),
    /// The current query's lookup failed.
    Failed(&'a CheckError),
}

/// Owner of the display state; rebuilds it from scratch on every update.
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    state: DisplayState,
    empty_results: EmptyResults,
}

impl Renderer {
    /// A renderer showing nothing yet.
    #[must_use]
    pub fn new(empty_results: EmptyResults) -> Self {
        Self {
            state: DisplayState::Empty,
            empty_results,
        }
    }

    /// Replace the display with the rendering of `update`.
    pub fn render(&mut self, update: Update<'_>) -> &DisplayState {
        self.state = match update {
            Update::Clear => DisplayState::Empty,
            Update::Response(response) if response.results.is_empty() => match self.empty_results
            {
                EmptyResults::Indicator => DisplayState::NoResults,
                EmptyResults::Blank => DisplayState::Empty,
            },
            Update::Response(response) => DisplayState::Rows {
                username: escape(&response.username).into_owned(),
                rows: sorted_rows(&response.results),
            },
            Update::Failed(err) => DisplayState::Failed {
                message: escape(&err.to_string()).into_owned(),
            },
        };
        &self.state
    }

    /// What is currently shown.
    #[must_use]
    pub fn state(&self) -> &DisplayState {
        &self.state
    }
}

/// Rows ordered by platform name (byte-wise), ties kept in server order.
#[must_use]
pub fn sorted_rows(results: &[PlatformResult]) -> Vec<Row> {
    let mut ordered: Vec<&PlatformResult> = results.iter().collect();
    // sort_by is stable
    ordered.sort_by(|a, b| a.platform.cmp(&b.platform));
    ordered.into_iter().map(Row::from_result).collect()
}

/// Make untrusted text safe to print on a terminal.
///
/// Control characters (ESC included, so no escape sequences get through)
/// are replaced by their `\u{..}` form; everything else is kept.
///
/// ```
/// use handle_avail::render::escape;
/// assert_eq!(escape("bob"), "bob");
/// assert_eq!(escape("\u{1b}[2Jx"), "\\u{1b}[2Jx");
/// ```
#[must_use]
pub fn escape(text: &str) -> Cow<'_, str> {
    if !text.chars().any(char::is_control) {
        return Cow::Borrowed(text);
    }
    let mut escaped = String::with_capacity(text.len() + 8);
    for ch in text.chars() {
        if ch.is_control() {
            let _ = write!(escaped, "\\u{{{:x}}}", ch as u32);
        } else {
            escaped.push(ch);
        }
    }
    Cow::Owned(escaped)
}
