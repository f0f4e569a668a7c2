//! Response writing: JSON values, taxonomy errors, raw content streams.

use bytes::Bytes;
use http::{HeaderValue, StatusCode, header};
use serde::Serialize;

use crate::error::HttpStatus;
use crate::{Error, Response};

/// Response values that bypass JSON encoding and write raw bytes with
/// their own content type, optionally as a named attachment.
pub trait ContentStream {
    /// Value for the `Content-Type` header.
    fn content_type(&self) -> &str;

    /// When set, emitted as `Content-Disposition: attachment; filename=...`.
    fn file_name(&self) -> Option<&str> {
        None
    }

    /// The response payload.
    fn content(self) -> Bytes;
}

/// The concrete content-stream response shape. Declare an operation's
/// response as `RawResponse` and the gateway passes the bytes through
/// untouched instead of JSON-encoding them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawResponse {
    pub content_type: String,
    pub file_name: Option<String>,
    pub content: Bytes,
}

impl ContentStream for RawResponse {
    fn content_type(&self) -> &str {
        &self.content_type
    }

    fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    fn content(self) -> Bytes {
        self.content
    }
}

const FALLBACK_ERROR_BODY: &[u8] = br#"{"status":500,"message":"failed to encode response"}"#;

/// Encode a value as a JSON response with the given success status.
pub fn json<T: Serialize>(status: StatusCode, value: &T) -> Response {
    match serde_json::to_vec(value) {
        Ok(body) => {
            let mut resp = Response::new(Bytes::from(body));
            *resp.status_mut() = status;
            resp.headers_mut().insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
            resp
        }
        Err(err) => {
            tracing::warn!(%err, "response value failed to serialize");
            error(&Error::unexpected(format!("failed to encode response: {err}")))
        }
    }
}

/// Encode a failure as `{"status": n, "message": s}` with the HTTP
/// status taken from the error itself.
pub fn error<E>(err: &E) -> Response
where
    E: HttpStatus + std::fmt::Display + ?Sized,
{
    let status = StatusCode::from_u16(err.http_status())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let wire = Error::new(status.as_u16(), err.to_string());

    let body = serde_json::to_vec(&wire).unwrap_or_else(|_| FALLBACK_ERROR_BODY.to_vec());
    let mut resp = Response::new(Bytes::from(body));
    *resp.status_mut() = status;
    resp.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    resp
}

/// Write a content stream: raw bytes, the stream's content type, and an
/// attachment disposition when a file name is present.
pub fn stream<S: ContentStream>(status: StatusCode, value: S) -> Response {
    let content_type = HeaderValue::from_str(value.content_type())
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));

    let disposition = value.file_name().and_then(|name| {
        let sanitized = name.replace(['"', '\r', '\n'], "");
        HeaderValue::from_str(&format!("attachment; filename=\"{sanitized}\"")).ok()
    });

    let mut resp = Response::new(value.content());
    *resp.status_mut() = status;
    resp.headers_mut().insert(header::CONTENT_TYPE, content_type);
    if let Some(disposition) = disposition {
        resp.headers_mut()
            .insert(header::CONTENT_DISPOSITION, disposition);
    }
    resp
}
