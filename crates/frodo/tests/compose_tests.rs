//! Composition tests: several gateways behind one entry point.

#![allow(dead_code)]

use std::sync::Arc;

use frodo::prelude::*;
use serde::{Deserialize, Serialize};
use tower::util::ServiceExt;

#[derive(Debug, Default, Clone, Serialize, Deserialize, Bindable)]
#[serde(default)]
pub struct AddRequest {
    #[serde(rename = "A")]
    pub a: i64,
    #[serde(rename = "B")]
    pub b: i64,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AddResponse {
    #[serde(rename = "Result")]
    pub result: i64,
}

#[service]
pub trait CalculatorService {
    /// Add two numbers.
    async fn add(&self, ctx: &Context, req: AddRequest) -> Result<AddResponse, Error>;
}

pub struct Calculator;

#[async_trait]
impl CalculatorService for Calculator {
    async fn add(&self, _ctx: &Context, req: AddRequest) -> Result<AddResponse, Error> {
        Ok(AddResponse {
            result: req.a + req.b,
        })
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize, Bindable)]
#[serde(default)]
pub struct ShoutRequest {
    pub text: String,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ShoutResponse {
    pub text: String,
}

#[service]
pub trait ShoutService {
    /// Upper-case the input.
    async fn shout(&self, ctx: &Context, req: ShoutRequest) -> Result<ShoutResponse, Error>;
}

pub struct Shouter;

#[async_trait]
impl ShoutService for Shouter {
    async fn shout(&self, _ctx: &Context, req: ShoutRequest) -> Result<ShoutResponse, Error> {
        Ok(ShoutResponse {
            text: req.text.to_uppercase(),
        })
    }
}

fn composed_router() -> axum::Router {
    Compose::new()
        .register(new_calculator_service_gateway(Arc::new(Calculator)))
        .register(new_shout_service_gateway(Arc::new(Shouter)))
        .into_router()
}

async fn post(router: axum::Router, uri: &str, body: &str) -> (http::StatusCode, serde_json::Value) {
    let request = http::Request::builder()
        .method("POST")
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(body.to_string()))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null))
}

#[tokio::test]
async fn test_each_service_routes_independently() {
    let router = composed_router();

    let (status, body) = post(router.clone(), "/CalculatorService.Add", r#"{"A":5,"B":2}"#).await;
    assert_eq!(status, http::StatusCode::OK);
    assert_eq!(body["Result"], 7);

    let (status, body) = post(router, "/ShoutService.Shout", r#"{"text":"hi"}"#).await;
    assert_eq!(status, http::StatusCode::OK);
    assert_eq!(body["text"], "HI");
}

#[tokio::test]
async fn test_unmatched_path_is_404_from_the_composite() {
    let (status, body) = post(composed_router(), "/NobodyService.Nothing", "{}").await;
    assert_eq!(status, http::StatusCode::NOT_FOUND);
    assert_eq!(body["status"], 404);
}

#[tokio::test]
async fn test_duplicate_routes_first_registered_wins() {
    fn tagged_gateway(tag: &'static str) -> Gateway {
        let mut gateway = Gateway::new(tag);
        gateway.register(
            frodo::Endpoint::new(
                http::Method::POST,
                "/Shared.Op",
                move |_req: frodo::Request| async move {
                    frodo::respond::json(http::StatusCode::OK, &tag)
                },
            )
            .service(tag)
            .operation("Op"),
        );
        gateway
    }

    let router = Compose::new()
        .register(tagged_gateway("first"))
        .register(tagged_gateway("second"))
        .into_router();

    let (_, body) = post(router, "/Shared.Op", "{}").await;
    assert_eq!(body, serde_json::json!("first"));
}

#[tokio::test]
async fn test_clients_reach_their_service_through_the_composite() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, composed_router()).await.unwrap();
    });
    let base_url = format!("http://{addr}");

    let calc = CalculatorServiceClient::new(base_url.clone()).unwrap();
    let shout = ShoutServiceClient::new(base_url).unwrap();

    let sum = calc
        .add(&Context::new(), AddRequest { a: 40, b: 2 })
        .await
        .unwrap();
    assert_eq!(sum.result, 42);

    let loud = shout
        .shout(&Context::new(), ShoutRequest { text: "quiet".into() })
        .await
        .unwrap();
    assert_eq!(loud.text, "QUIET");
}
