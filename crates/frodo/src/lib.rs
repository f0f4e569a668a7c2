//! Frodo - service traits projected into HTTP gateways and clients
//!
//! Frodo takes a **contract-first** approach: declare your service as a
//! trait, implement it however you like, and the `#[service]` macro
//! projects it into an HTTP/JSON gateway plus a strongly-typed remote
//! client that satisfies the same trait.
//!
//! # Quick Start
//!
//! ```ignore
//! use frodo::prelude::*;
//! use std::sync::Arc;
//!
//! #[derive(Default, Serialize, Deserialize, Bindable)]
//! #[serde(default)]
//! pub struct AddRequest {
//!     #[serde(rename = "A")]
//!     pub a: i64,
//!     #[serde(rename = "B")]
//!     pub b: i64,
//! }
//!
//! #[derive(Default, Serialize, Deserialize)]
//! pub struct AddResponse {
//!     #[serde(rename = "Result")]
//!     pub result: i64,
//! }
//!
//! #[service]
//! pub trait CalculatorService {
//!     /// Add two numbers.
//!     async fn add(&self, ctx: &Context, req: AddRequest) -> Result<AddResponse, Error>;
//! }
//!
//! struct Calculator;
//!
//! #[async_trait]
//! impl CalculatorService for Calculator {
//!     async fn add(&self, _ctx: &Context, req: AddRequest) -> Result<AddResponse, Error> {
//!         Ok(AddResponse { result: req.a + req.b })
//!     }
//! }
//!
//! // Serve it:
//! //   POST /CalculatorService.Add  {"A":5,"B":2}  ->  {"Result":7}
//! let gateway = new_calculator_service_gateway(Arc::new(Calculator));
//! gateway.serve("0.0.0.0:9004").await?;
//!
//! // Or call a remote one - the client satisfies the same trait:
//! let remote: Arc<dyn CalculatorService> =
//!     Arc::new(CalculatorServiceClient::new("http://localhost:9004")?);
//! ```
//!
//! # Interface symmetry
//!
//! Both generated artifacts implement the declared trait, so callers
//! hold an `Arc<dyn FooService>` and never know whether the work
//! happens in-process or across the network. That makes deployments a
//! wiring decision: one binary serving a [`Compose`] of every gateway,
//! or one binary per service with clients in between, with no handler
//! code changing either way.
//!
//! # Request binding
//!
//! Gateway-side, each operation's request value is bound from up to
//! three sources merged at leaf granularity - query string, then JSON
//! body, then `:name` path captures, later sources winning. Binding
//! names are serde names matched case-insensitively, with dotted keys
//! reaching nested shapes (`?address.city=Seattle`). See
//! [`binder`] for the full semantics.
//!
//! # Routing conventions
//!
//! | Declaration | Route |
//! |-------------|-------|
//! | (none) | `POST /<Service>.<Op>`, status 200 |
//! | `/// GET /game/:GameID` | `GET`, capture bound into the request |
//! | `/// HTTP 202` | success status override |
//! | `/// PREFIX /v2` (trait) | prepended to every route |
//!
//! Errors ride as `{"status": n, "message": s}` with the matching HTTP
//! status; see [`Error`] for the taxonomy.

// Re-export macros
pub use frodo_macros::Bindable;
pub use frodo_macros::service;

// Re-export the runtime
pub use frodo_core::*;

// Re-export dependencies users and generated code will need
pub use async_trait::async_trait;
pub use http;
pub use serde;
pub use serde_json;

/// Prelude for convenient imports
pub mod prelude {
    pub use super::{
        Bindable, Compose, Context, ContentStream, Error, Gateway, Middleware, Next,
        RawResponse, async_trait, service,
    };
    pub use serde::{Deserialize, Serialize};
}
