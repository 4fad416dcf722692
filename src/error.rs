//! Exchange fault taxonomy.
use http::StatusCode;
use std::{error::Error as StdError, fmt, io};

use crate::status::{self, InvalidStatusName};

/// A fault raised while handling an exchange.
///
/// Exposable errors reveal their message to the client; anything else is
/// rendered as the generic reason phrase for the resolved status. A fault
/// that occurs after the response headers were flushed is marked post-flush
/// and can only be logged.
#[derive(Debug)]
pub struct Error {
    message: String,
    status: Option<StatusCode>,
    expose: bool,
    post_flush: bool,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    /// A deliberate, user-triggered error whose message may reach the client.
    pub fn user(message: impl Into<String>, status: Option<StatusCode>) -> Self {
        Self {
            message: message.into(),
            status,
            expose: true,
            post_flush: false,
            source: None,
        }
    }

    /// An internal fault; the client only sees the reason phrase.
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            expose: false,
            post_flush: false,
            source: None,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// The status this fault renders with, defaulting to 500.
    pub fn resolved_status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = Some(status);
    }

    pub fn expose(&self) -> bool {
        self.expose
    }

    pub(crate) fn set_expose(&mut self, expose: bool) {
        self.expose = expose;
    }

    /// Whether this fault occurred after the response headers were sent.
    pub fn is_post_flush(&self) -> bool {
        self.post_flush
    }

    pub(crate) fn mark_post_flush(&mut self) {
        self.post_flush = true;
    }

    /// True when the fault chain bottoms out in a missing-entity condition.
    pub(crate) fn is_not_found(&self) -> bool {
        let mut source = self.source.as_deref().map(|e| e as &dyn StdError);
        while let Some(err) = source {
            if let Some(io) = err.downcast_ref::<io::Error>() {
                return io.kind() == io::ErrorKind::NotFound;
            }
            source = err.source();
        }
        false
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.as_deref().map(|e| e as _)
    }
}

// ===== Conversions =====

impl From<u16> for Error {
    fn from(code: u16) -> Self {
        let status =
            StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self::user(status::reason(status), Some(status))
    }
}

impl From<StatusCode> for Error {
    fn from(status: StatusCode) -> Self {
        Self::user(status::reason(status), Some(status))
    }
}

impl From<&str> for Error {
    fn from(message: &str) -> Self {
        Self::user(message, None)
    }
}

impl From<String> for Error {
    fn from(message: String) -> Self {
        Self::user(message, None)
    }
}

impl From<(&str, u16)> for Error {
    fn from((message, code): (&str, u16)) -> Self {
        Self::user(message, StatusCode::from_u16(code).ok())
    }
}

impl From<(&str, StatusCode)> for Error {
    fn from((message, status): (&str, StatusCode)) -> Self {
        Self::user(message, Some(status))
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self {
            message: err.to_string(),
            status: None,
            expose: false,
            post_flush: false,
            source: Some(Box::new(err)),
        }
    }
}

impl From<InvalidStatusName> for Error {
    fn from(err: InvalidStatusName) -> Self {
        Self {
            message: err.to_string(),
            status: None,
            expose: false,
            post_flush: false,
            source: Some(Box::new(err)),
        }
    }
}

impl From<http::Error> for Error {
    fn from(err: http::Error) -> Self {
        Self {
            message: err.to_string(),
            status: None,
            expose: false,
            post_flush: false,
            source: Some(Box::new(err)),
        }
    }
}
