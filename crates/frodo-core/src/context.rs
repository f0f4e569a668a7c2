//! Request-scoped context: path captures, credentials, cancellation.

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::Request;

/// Path parameters captured by the router, stored on the request
/// extensions so downstream stages (binder, handlers) can read them
/// without re-matching the URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams(pub Vec<(String, String)>);

impl PathParams {
    /// Look up a captured parameter by name (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Read-only bag of request-scoped values handed to every operation.
///
/// Populated by the gateway from the inbound request; handlers pass it
/// (or a derived copy) to downstream clients so credentials and
/// deadlines propagate across service hops.
#[derive(Debug, Clone, Default)]
pub struct Context {
    path_params: PathParams,
    authorization: String,
    deadline: Option<Instant>,
    cancel: CancellationToken,
}

impl Context {
    /// An empty context with no credential, captures, or deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a context from a dispatched request: path captures from the
    /// router and the credential from the `Authorization` header.
    pub fn from_request(req: &Request) -> Self {
        let path_params = req
            .extensions()
            .get::<PathParams>()
            .cloned()
            .unwrap_or_default();

        let authorization = req
            .headers()
            .get(http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_string())
            .unwrap_or_default();

        Self {
            path_params,
            authorization,
            deadline: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Captured path parameters for this request.
    pub fn path_params(&self) -> &PathParams {
        &self.path_params
    }

    /// The opaque credential string, stripped of surrounding whitespace.
    /// An unset carrier reads as the empty string.
    pub fn authorization(&self) -> &str {
        &self.authorization
    }

    /// Replace the credential. Leading/trailing whitespace is stripped.
    pub fn with_authorization(mut self, credential: impl AsRef<str>) -> Self {
        self.authorization = credential.as_ref().trim().to_string();
        self
    }

    /// Attach an absolute deadline. Clients cap their request timeout to
    /// the remaining time; handlers may consult [`Context::remaining`].
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Convenience for [`Context::with_deadline`] relative to now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Time left before the deadline, if one is set. `Some(ZERO)` once
    /// the deadline has passed.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// The advisory cancellation signal for this request. Handlers and
    /// downstream calls are expected to observe it; nothing in the core
    /// enforces it.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Share an externally owned cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }
}
