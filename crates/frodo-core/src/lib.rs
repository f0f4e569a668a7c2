//! Runtime for frodo gateways and clients.
//!
//! Generated code is deliberately thin; the behavior lives here:
//!
//! - [`binder`] — merge query, body, and path values into one typed
//!   request value through a single JSON decode (the core of the
//!   gateway side)
//! - [`router`] — `:name`-capture path matching
//! - [`gateway`] — endpoint registry, middleware chain, dispatch,
//!   serving via axum
//! - [`respond`] — JSON / error / content-stream response writing
//! - [`compose`] — several gateways behind one listener
//! - [`client`] — the remote caller generated clients delegate to
//!
//! Requests and responses are plain `http` types with buffered
//! [`bytes::Bytes`] bodies; streaming transports are out of scope.

pub mod binder;
pub mod client;
pub mod compose;
pub mod context;
pub mod error;
pub mod gateway;
pub mod respond;
pub mod router;
pub mod shape;

/// An inbound request with its body fully buffered.
pub type Request = http::Request<bytes::Bytes>;

/// An outbound response with its body fully buffered.
pub type Response = http::Response<bytes::Bytes>;

pub use binder::{BindError, bind};
pub use client::{Client, ClientBuilder};
pub use compose::Compose;
pub use context::{Context, PathParams};
pub use error::{Error, HttpStatus};
pub use gateway::{Endpoint, Gateway, Handler, Middleware, Next};
pub use respond::{ContentStream, RawResponse};
pub use router::{Router, RouterError};
pub use shape::{Bindable, Field, Shape};
