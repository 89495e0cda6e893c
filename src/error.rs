//! Error types for weft
//!
//! Centralized error handling using snafu for ergonomic error definitions.
//! Failures are never swallowed inside the composition chain: every combinator
//! that awaits a child computation re-propagates its failure unchanged.

use snafu::Snafu;

/// Main error type for the toolkit
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    /// A component required a context key that no ancestor provided
    #[snafu(display("Missing context key: {key}"))]
    MissingContext { key: &'static str },

    /// No route pattern accepted the current path
    #[snafu(display("No route matched path: {path}"))]
    NoRoute { path: String },

    /// The host element factory rejected a tag
    #[snafu(display("Element factory failed for <{tag}>: {message}"))]
    Factory { tag: String, message: String },

    /// A component setup phase reported a failure
    #[snafu(display("Component setup failed: {message}"))]
    Setup { message: String },
}

impl Error {
    /// Create a setup error from a plain message
    pub fn setup(message: impl Into<String>) -> Self {
        Error::Setup {
            message: message.into(),
        }
    }
}

/// Result type alias for convenience
pub type Result<T, E = Error> = std::result::Result<T, E>;
