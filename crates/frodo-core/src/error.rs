//! Error taxonomy and HTTP status mapping.

use serde::{Deserialize, Serialize};

/// A service failure carrying an HTTP status and a formatted message.
///
/// This is both the in-process error type and the wire shape: gateways
/// serialize failures as `{"status": n, "message": s}` and clients decode
/// that body back into an equal `Error`, so a caller cannot tell whether
/// the failure happened locally or on the far side of an HTTP hop.
///
/// Construct values through the kind constructors:
///
/// ```
/// use frodo_core::Error;
///
/// let err = Error::not_found("no such game");
/// assert_eq!(err.status(), 404);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct Error {
    /// HTTP status code for this failure.
    pub status: u16,
    /// Human-readable description.
    pub message: String,
}

impl Error {
    /// Create an error with an explicit status code.
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// 400 Bad Request
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(400, message)
    }

    /// 401 Unauthorized
    pub fn bad_credentials(message: impl Into<String>) -> Self {
        Self::new(401, message)
    }

    /// 403 Forbidden
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(403, message)
    }

    /// 404 Not Found
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(404, message)
    }

    /// 408 Request Timeout
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(408, message)
    }

    /// 409 Conflict
    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::new(409, message)
    }

    /// 429 Too Many Requests
    pub fn throttled(message: impl Into<String>) -> Self {
        Self::new(429, message)
    }

    /// 500 Internal Server Error
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(500, message)
    }

    /// 500 Internal Server Error (alias for readability at call sites
    /// that deal in HTTP vocabulary rather than failure vocabulary)
    pub fn internal_server_error(message: impl Into<String>) -> Self {
        Self::new(500, message)
    }

    /// 503 Service Unavailable
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(503, message)
    }

    /// Wrap an arbitrary error as a 500 without losing its message.
    pub fn wrap(source: impl std::fmt::Display) -> Self {
        Self::new(500, source.to_string())
    }

    /// The HTTP status for this failure.
    pub fn status(&self) -> u16 {
        self.status
    }
}

/// Status lookup for values flowing into the response writer.
///
/// The writer asks any error it is handed for a status through this
/// trait; types outside the taxonomy implement it to pick their own
/// code, and anything that does not falls back to 500 by wrapping
/// through [`Error::wrap`].
pub trait HttpStatus {
    /// HTTP status code to respond with.
    fn http_status(&self) -> u16;
}

impl HttpStatus for Error {
    fn http_status(&self) -> u16 {
        self.status
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::bad_request(err.to_string())
    }
}
