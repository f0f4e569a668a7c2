//! The HTTP-facing gateway: endpoint registry, middleware chain, and
//! dispatch.
//!
//! A gateway is assembled once at startup (usually by generated code)
//! and is read-only afterwards, so dispatch takes `&self` with no
//! locking. Serving rides on axum: the whole gateway becomes the
//! fallback handler of an `axum::Router`, which keeps routing semantics
//! entirely in [`Router`](crate::router::Router).

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use futures::future::BoxFuture;
use http::{Method, StatusCode};

use crate::context::PathParams;
use crate::router::{RouteMatch, Router};
use crate::{Error, Request, Response, respond};

/// Type-erased endpoint callback. Generated handlers bind the typed
/// request, invoke the service operation, and write the response.
pub type Handler = Arc<dyn Fn(Request) -> BoxFuture<'static, Response> + Send + Sync>;

/// An immutable record tying one service operation to its route.
#[derive(Clone)]
pub struct Endpoint {
    pub method: Method,
    pub path: String,
    pub service: &'static str,
    pub operation: &'static str,
    pub status: StatusCode,
    handler: Handler,
}

impl Endpoint {
    /// Start describing an endpoint. Service/operation names and the
    /// success status are filled in with the builder methods below.
    pub fn new<F, Fut>(method: Method, path: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        Self {
            method,
            path: path.into(),
            service: "",
            operation: "",
            status: StatusCode::OK,
            handler: Arc::new(move |req| -> BoxFuture<'static, Response> {
                Box::pin(handler(req))
            }),
        }
    }

    pub fn service(mut self, service: &'static str) -> Self {
        self.service = service;
        self
    }

    pub fn operation(mut self, operation: &'static str) -> Self {
        self.operation = operation;
        self
    }

    /// Success status for this operation. Out-of-range values fall back
    /// to 200.
    pub fn status(mut self, status: u16) -> Self {
        self.status = StatusCode::from_u16(status).unwrap_or(StatusCode::OK);
        self
    }
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("service", &self.service)
            .field("operation", &self.operation)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// One link in the gateway's interceptor chain.
///
/// Links run in registration order; each receives the request and a
/// [`Next`] continuation. Returning without calling `next.run(...)`
/// terminates the chain early with that response.
#[async_trait::async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(&self, req: Request, next: Next<'_>) -> Response;
}

/// Continuation through the remaining middleware into the endpoint
/// handler.
pub struct Next<'a> {
    chain: &'a [Arc<dyn Middleware>],
    handler: &'a Handler,
}

impl Next<'_> {
    pub async fn run(self, req: Request) -> Response {
        match self.chain.split_first() {
            Some((link, rest)) => {
                link.handle(
                    req,
                    Next {
                        chain: rest,
                        handler: self.handler,
                    },
                )
                .await
            }
            None => (self.handler)(req).await,
        }
    }
}

/// A service's endpoints behind one HTTP dispatcher.
pub struct Gateway {
    name: String,
    version: Option<String>,
    router: Router<usize>,
    endpoints: Vec<Endpoint>,
    middleware: Vec<Arc<dyn Middleware>>,
}

impl Gateway {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
            router: Router::new(),
            endpoints: Vec::new(),
            middleware: Vec::new(),
        }
    }

    /// The service name this gateway fronts.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Free-form version string from the service declaration, if any.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn set_version(&mut self, version: impl Into<String>) {
        self.version = Some(version.into());
    }

    /// Add an endpoint.
    ///
    /// # Panics
    ///
    /// Panics when the route conflicts with one already registered.
    /// Registration is startup configuration; a conflicting route table
    /// is a programming error, not a runtime condition.
    pub fn register(&mut self, endpoint: Endpoint) {
        let index = self.endpoints.len();
        if let Err(err) = self
            .router
            .register(endpoint.method.clone(), &endpoint.path, index)
        {
            panic!(
                "{}.{}: {err}",
                self.name,
                if endpoint.operation.is_empty() {
                    "<endpoint>"
                } else {
                    endpoint.operation
                }
            );
        }
        tracing::debug!(
            service = %self.name,
            operation = endpoint.operation,
            method = %endpoint.method,
            path = %endpoint.path,
            "registered endpoint"
        );
        self.endpoints.push(endpoint);
    }

    /// Append a middleware link. Links run in the order they were added.
    pub fn middleware(&mut self, link: impl Middleware + 'static) {
        self.middleware.push(Arc::new(link));
    }

    /// The registered endpoints, in registration order.
    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    /// Whether any registered endpoint matches this method and path.
    pub fn matches(&self, method: &Method, path: &str) -> bool {
        self.router.matches(method, path)
    }

    /// Dispatch one request: resolve the endpoint, stash the path
    /// captures on the request, and run the middleware chain into the
    /// handler. Unmatched requests produce a 404 taxonomy error.
    pub async fn handle(&self, mut req: Request) -> Response {
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        let Some(RouteMatch { value, params }) = self.router.lookup(&method, &path) else {
            tracing::debug!(%method, %path, service = %self.name, "no matching endpoint");
            return respond::error(&Error::not_found(format!(
                "no endpoint for {method} {path}"
            )));
        };
        let endpoint = &self.endpoints[*value];

        tracing::debug!(
            service = endpoint.service,
            operation = endpoint.operation,
            %method,
            %path,
            "dispatching"
        );
        req.extensions_mut().insert(PathParams(params));

        Next {
            chain: &self.middleware,
            handler: &endpoint.handler,
        }
        .run(req)
        .await
    }

    /// Wrap the gateway in an `axum::Router` so it can be served or
    /// merged into a larger application.
    pub fn into_router(self) -> axum::Router {
        let gateway = Arc::new(self);
        axum::Router::new().fallback(move |req: axum::extract::Request| {
            let gateway = gateway.clone();
            async move { dispatch_axum(req, move |req| async move { gateway.handle(req).await }).await }
        })
    }

    /// Bind the address and serve until the task is cancelled.
    pub async fn serve(self, addr: impl AsRef<str>) -> std::io::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr.as_ref()).await?;
        axum::serve(listener, self.into_router()).await
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("name", &self.name)
            .field("endpoints", &self.endpoints)
            .finish_non_exhaustive()
    }
}

/// Buffer an axum request body, dispatch, and convert back. Shared with
/// [`Compose`](crate::compose::Compose).
pub(crate) async fn dispatch_axum<F, Fut>(
    req: axum::extract::Request,
    dispatch: F,
) -> http::Response<axum::body::Body>
where
    F: FnOnce(Request) -> Fut,
    Fut: Future<Output = Response>,
{
    let (parts, body) = req.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(err) => {
            return respond::error(&Error::bad_request(format!("unreadable body: {err}")))
                .map(axum::body::Body::from);
        }
    };
    dispatch(http::Request::from_parts(parts, Bytes::from(bytes)))
        .await
        .map(axum::body::Body::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn echo_endpoint(method: Method, path: &str, tag: &'static str) -> Endpoint {
        Endpoint::new(method, path, move |_req| async move {
            respond::json(StatusCode::OK, &tag)
        })
        .service("EchoService")
        .operation(tag)
    }

    fn get(gateway: &Gateway, path: &str) -> Response {
        futures::executor::block_on(gateway.handle(
            http::Request::builder()
                .method(Method::GET)
                .uri(path)
                .body(Bytes::new())
                .unwrap(),
        ))
    }

    #[test]
    fn test_dispatch_reaches_handler() {
        let mut gateway = Gateway::new("EchoService");
        gateway.register(echo_endpoint(Method::GET, "/echo", "Echo"));

        let resp = get(&gateway, "/echo");
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(&resp.body()[..], br#""Echo""#);
    }

    #[test]
    fn test_unmatched_request_is_404() {
        let gateway = Gateway::new("EchoService");
        let resp = get(&gateway, "/nothing");
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let wire: Error = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(wire.status, 404);
    }

    #[test]
    #[should_panic(expected = "duplicate route")]
    fn test_conflicting_registration_panics() {
        let mut gateway = Gateway::new("EchoService");
        gateway.register(echo_endpoint(Method::GET, "/echo/:a", "One"));
        gateway.register(echo_endpoint(Method::GET, "/echo/:b", "Two"));
    }

    #[test]
    fn test_path_params_attached_before_handler() {
        let mut gateway = Gateway::new("EchoService");
        gateway.register(
            Endpoint::new(Method::GET, "/game/:GameID", |req: Request| async move {
                let params = req.extensions().get::<PathParams>().cloned().unwrap_or_default();
                respond::json(StatusCode::OK, &params.get("gameid").unwrap_or(""))
            })
            .operation("Game"),
        );

        let resp = get(&gateway, "/game/7");
        assert_eq!(&resp.body()[..], br#""7""#);
    }

    struct Recorder {
        tag: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
        terminate: bool,
    }

    #[async_trait::async_trait]
    impl Middleware for Recorder {
        async fn handle(&self, req: Request, next: Next<'_>) -> Response {
            self.log.lock().unwrap().push(self.tag);
            if self.terminate {
                return respond::error(&Error::bad_credentials("denied"));
            }
            next.run(req).await
        }
    }

    #[test]
    fn test_middleware_runs_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut gateway = Gateway::new("EchoService");
        gateway.register(echo_endpoint(Method::GET, "/echo", "Echo"));
        gateway.middleware(Recorder {
            tag: "first",
            log: log.clone(),
            terminate: false,
        });
        gateway.middleware(Recorder {
            tag: "second",
            log: log.clone(),
            terminate: false,
        });

        let resp = get(&gateway, "/echo");
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn test_middleware_early_termination() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut gateway = Gateway::new("EchoService");
        gateway.register(echo_endpoint(Method::GET, "/echo", "Echo"));
        gateway.middleware(Recorder {
            tag: "gatekeeper",
            log: log.clone(),
            terminate: true,
        });
        gateway.middleware(Recorder {
            tag: "unreached",
            log: log.clone(),
            terminate: false,
        });

        let resp = get(&gateway, "/echo");
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(*log.lock().unwrap(), vec!["gatekeeper"]);
    }

    #[test]
    fn test_middleware_skipped_for_unmatched_routes() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut gateway = Gateway::new("EchoService");
        gateway.register(echo_endpoint(Method::GET, "/echo", "Echo"));
        gateway.middleware(Recorder {
            tag: "mw",
            log: log.clone(),
            terminate: false,
        });

        let resp = get(&gateway, "/nothing");
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(log.lock().unwrap().is_empty());
    }
}
