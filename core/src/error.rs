//! Error types for the HTTP interfaces, recorder and spec generator.
//!
//! # Design
//! Transport failures are carried as the transport's own `reqwest::Error`
//! with no extra context, so callers can still ask it `is_connect()`,
//! `is_timeout()` or `is_builder()`. Every other variant belongs to the
//! layers built on top of the transport (path templating, configuration,
//! HAR files, OpenAPI output).

use thiserror::Error;

/// Errors produced by this crate.
#[derive(Error, Debug)]
pub enum Error {
    /// Connection refused, DNS failure, malformed URL, timeout, or any other
    /// failure reported by the underlying HTTP client.
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    /// A `{name}` placeholder in a templated path had no matching segment.
    #[error("missing value for path segment '{name}' in '{template}'")]
    MissingSegment { name: String, template: String },

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),


    /// YAML serialization failed.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Configuration could not be extracted from its sources.
    #[error("configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    /// Reading or writing a file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}

impl Error {
    /// Returns the transport error if this is one.
    pub fn as_transport(&self) -> Option<&reqwest::Error> {
        match self {
            Error::Transport(err) => Some(err),
            _ => None,
        }
    }
}
