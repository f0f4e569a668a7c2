//! Serving several gateways behind one HTTP entry point.

use crate::gateway::{Gateway, dispatch_axum};
use crate::{Error, Request, Response, respond};

/// An ordered collection of gateways sharing one listener. Dispatch
/// goes to the first gateway whose endpoints match the request, so with
/// duplicate registrations across services the first one registered
/// wins; keeping routes distinct across the composite is the operator's
/// concern.
#[derive(Debug, Default)]
pub struct Compose {
    gateways: Vec<Gateway>,
}

impl Compose {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a gateway. Order of registration is order of precedence.
    pub fn register(mut self, gateway: Gateway) -> Self {
        tracing::debug!(service = %gateway.name(), "composed gateway");
        self.gateways.push(gateway);
        self
    }

    /// The composed gateways, in precedence order.
    pub fn gateways(&self) -> &[Gateway] {
        &self.gateways
    }

    /// Dispatch to the first matching gateway, or 404.
    pub async fn handle(&self, req: Request) -> Response {
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        match self
            .gateways
            .iter()
            .find(|gw| gw.matches(&method, &path))
        {
            Some(gateway) => gateway.handle(req).await,
            None => respond::error(&Error::not_found(format!(
                "no endpoint for {method} {path}"
            ))),
        }
    }

    /// Wrap the composite in an `axum::Router`.
    pub fn into_router(self) -> axum::Router {
        let compose = std::sync::Arc::new(self);
        axum::Router::new().fallback(move |req: axum::extract::Request| {
            let compose = compose.clone();
            async move { dispatch_axum(req, move |req| async move { compose.handle(req).await }).await }
        })
    }

    /// Bind the address and serve all composed gateways.
    pub async fn serve(self, addr: impl AsRef<str>) -> std::io::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr.as_ref()).await?;
        axum::serve(listener, self.into_router()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::Endpoint;
    use bytes::Bytes;
    use http::{Method, StatusCode};

    fn gateway(name: &str, path: &str, tag: &'static str) -> Gateway {
        let mut gw = Gateway::new(name);
        gw.register(
            Endpoint::new(Method::POST, path, move |_req| async move {
                respond::json(StatusCode::OK, &tag)
            })
            .service("Service")
            .operation(tag),
        );
        gw
    }

    fn post(compose: &Compose, path: &str) -> Response {
        futures::executor::block_on(compose.handle(
            http::Request::builder()
                .method(Method::POST)
                .uri(path)
                .body(Bytes::new())
                .unwrap(),
        ))
    }

    #[test]
    fn test_dispatch_by_service_path() {
        let compose = Compose::new()
            .register(gateway("CalculatorService", "/CalculatorService.Add", "Add"))
            .register(gateway("ScoreService", "/ScoreService.Record", "Record"));

        assert_eq!(&post(&compose, "/CalculatorService.Add").body()[..], br#""Add""#);
        assert_eq!(&post(&compose, "/ScoreService.Record").body()[..], br#""Record""#);
    }

    #[test]
    fn test_unmatched_is_404() {
        let compose = Compose::new().register(gateway("A", "/A.Op", "Op"));
        assert_eq!(post(&compose, "/B.Op").status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_duplicate_routes_first_registered_wins() {
        let compose = Compose::new()
            .register(gateway("First", "/Shared.Op", "first"))
            .register(gateway("Second", "/Shared.Op", "second"));

        assert_eq!(&post(&compose, "/Shared.Op").body()[..], br#""first""#);
    }
}
