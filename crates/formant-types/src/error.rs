//! Typed errors shared across the formant crates.
//!
//! Two families, handled very differently:
//!
//! - [`PathParseError`] — a path string did not parse. At runtime entry
//!   points this is recovered locally (the operation becomes a no-op);
//!   at configuration time it is fatal.
//! - [`ConfigError`] — the integrator misconfigured the engine. Always
//!   fatal at setup, never tolerated silently.

use thiserror::Error;

/// Failure to parse a dotted/bracket field-path string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathParseError {
    /// The input string was empty.
    #[error("empty field path")]
    Empty,

    /// A dotted segment was empty (`a..b`, leading or trailing dot).
    #[error("empty segment in field path `{input}`")]
    EmptySegment {
        /// The full path string that failed to parse.
        input: String,
    },

    /// A `[` had no matching `]`, or a stray `]` appeared in a segment.
    #[error("unmatched bracket in field path `{input}`")]
    UnmatchedBracket {
        /// The full path string that failed to parse.
        input: String,
    },

    /// Bracket contents were not a non-negative integer.
    #[error("invalid array index `[{index}]` in field path `{input}`")]
    InvalidIndex {
        /// The full path string that failed to parse.
        input: String,
        /// The offending bracket contents.
        index: String,
    },

    /// Characters followed a closing bracket without a `.` or `[`.
    #[error("unexpected characters after `]` in field path `{input}`")]
    TrailingCharacters {
        /// The full path string that failed to parse.
        input: String,
    },
}

/// Integrator misconfiguration, detected when a form session is built.
///
/// These indicate programming mistakes, not runtime data conditions, so
/// they fail loud instead of degrading silently.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An error-display mode string was not recognized.
    #[error("unknown error display mode `{0}` (expected immediate, on-touch, on-submit, or manual)")]
    UnknownDisplayMode(String),

    /// A warning-visibility mode string was not recognized.
    #[error("unknown warning visibility `{0}` (expected always, on-change, or never)")]
    UnknownWarningVisibility(String),

    /// A root-validation mode string was not recognized.
    #[error("unknown root validation mode `{0}` (expected live or submit)")]
    UnknownRootMode(String),

    /// A preserve-list entry did not parse as a field path.
    #[error("malformed preserve-list path `{path}`")]
    InvalidPreservePath {
        /// The raw preserve-list entry.
        path: String,
        /// The underlying parse failure.
        #[source]
        source: PathParseError,
    },

    /// A debounce-override key did not parse as a field path.
    #[error("malformed debounce override path `{path}`")]
    InvalidDebouncePath {
        /// The raw override key.
        path: String,
        /// The underlying parse failure.
        #[source]
        source: PathParseError,
    },
}
