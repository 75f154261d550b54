// Error types for the Phial dispatch core

use crate::HttpStatus;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A view reported failure. Displays as the bare message.
    #[error("{0}")]
    Handler(String),

    #[error("Handler panicked: {0}")]
    Panic(String),

    #[error("Missing path parameter: {0}")]
    MissingParam(String),

    #[error("Invalid route pattern {pattern}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    // Malformed requests
    #[error("Malformed header: {0}")]
    MalformedHeader(String),

    #[error("Malformed query string: {0}")]
    MalformedQuery(String),

    #[error("Malformed multipart body: {0}")]
    Multipart(String),

    #[error("Invalid content-length: {0}")]
    InvalidContentLength(String),

    #[error("Payload too large: {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: usize, limit: usize },

    // Transport
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Shorthand for a view failure.
    pub fn handler(message: impl std::fmt::Display) -> Self {
        Error::Handler(message.to_string())
    }

    /// Wrap any foreign error.
    pub fn other<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Other(Box::new(error))
    }

    /// Whether this error came from an unusable request rather than from a view.
    pub fn is_malformed_request(&self) -> bool {
        matches!(
            self,
            Error::MalformedHeader(_)
                | Error::MalformedQuery(_)
                | Error::Multipart(_)
                | Error::InvalidContentLength(_)
                | Error::PayloadTooLarge { .. }
        )
    }

    /// The HTTP status an application would naturally answer with.
    ///
    /// The default server-error handler ignores this and always answers 500.
    pub fn status_code(&self) -> u16 {
        self.http_status().code()
    }

    pub fn http_status(&self) -> HttpStatus {
        match self {
            Error::MalformedHeader(_)
            | Error::MalformedQuery(_)
            | Error::Multipart(_)
            | Error::InvalidContentLength(_) => HttpStatus::BadRequest,
            Error::PayloadTooLarge { .. } => HttpStatus::PayloadTooLarge,
            _ => HttpStatus::InternalServerError,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::other(err)
    }
}

impl From<multer::Error> for Error {
    fn from(err: multer::Error) -> Self {
        Error::Multipart(err.to_string())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
