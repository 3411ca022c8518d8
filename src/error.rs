//! Crate-wide error type.
//!
//! Most failures in a run are fatal and simply bubble up to `main`. The two
//! exceptions are handled by callers rather than here: a failed search query
//! is logged and skipped by the pool builder, and an empty pool ends the run
//! without an error.

use thiserror::Error;

/// Everything that can go wrong while building and publishing an episode.
#[derive(Debug, Error)]
pub enum Error {
    /// Transport-level HTTP failure (DNS, TLS, connection reset, body read).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A remote service answered with a non-success status.
    #[error("{service} returned HTTP {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    /// The remote service answered successfully but the payload was unusable.
    #[error("{service} returned an unusable response: {reason}")]
    BadResponse {
        service: &'static str,
        reason: String,
    },

    /// XML could not be tokenized.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// A second top-level element followed the document root.
    #[error("XML document has more than one root element (extra <{0}>)")]
    ExtraRoot(String),

    /// The feed document parsed but lacks the structure we append into.
    #[error("malformed feed document: {0}")]
    MalformedFeed(String),

    /// A value needed for the current step was not configured.
    #[error("missing required configuration: {0}")]
    MissingConfig(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        Error::Xml(e.into())
    }
}

impl From<quick_xml::encoding::EncodingError> for Error {
    fn from(e: quick_xml::encoding::EncodingError) -> Self {
        Error::Xml(e.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
