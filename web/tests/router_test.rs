//! Integration tests for serving an adapter through Axum.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use axum::body::{Body, to_bytes};
use http::{Request, StatusCode};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;
use vellox_runtime::{Adapter, LifespanState};
use vellox_testing::apps::{
    LifespanProbe, content_type, echo_app, failing_startup_app, faulting_app, json_app, responder,
    text_app,
};

async fn body_of(response: axum::response::Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
}

#[tokio::test]
async fn test_json_response_is_served() {
    let probe = LifespanProbe::new();
    let adapter = Arc::new(
        Adapter::builder(probe.wrap(json_app(&json!({"Hello": "World"}))))
            .lifespan("on")
            .build()
            .unwrap(),
    );

    let response = vellox_web::router(Arc::clone(&adapter))
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "application/json");
    let body: Value = serde_json::from_slice(&body_of(response).await).unwrap();
    assert_eq!(body, json!({"Hello": "World"}));
    assert_eq!(probe.startups(), 1);
    assert_eq!(adapter.lifespan_state(), LifespanState::Started);
}

#[tokio::test]
async fn test_binary_body_is_sent_as_bytes() {
    let bytes = vec![0_u8, 1, 2, 254, 255];
    let adapter = Arc::new(Adapter::new(responder(
        200,
        vec![content_type("application/octet-stream")],
        bytes.clone(),
    )));

    let response = vellox_web::router(adapter)
        .oneshot(Request::get("/download").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(body_of(response).await, bytes);
}

#[tokio::test]
async fn test_request_is_forwarded() {
    let adapter = Arc::new(Adapter::builder(echo_app()).base_path("/v1").build().unwrap());

    let response = vellox_web::router(adapter)
        .oneshot(
            Request::post("/v1/notes?draft=true")
                .header("content-type", "text/plain")
                .body(Body::from("remember the milk"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.headers()["x-echo-method"], "POST");
    assert_eq!(response.headers()["x-echo-path"], "/notes");
    assert_eq!(response.headers()["x-echo-query"], "draft=true");
    assert_eq!(body_of(response).await, b"remember the milk".to_vec());
}

#[tokio::test]
async fn test_application_fault_becomes_500() {
    let adapter = Arc::new(Adapter::new(faulting_app("boom")));

    let response = vellox_web::router(adapter)
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = serde_json::from_slice(&body_of(response).await).unwrap();
    assert_eq!(body["code"], "INTERNAL_SERVER_ERROR");
    assert_eq!(body["message"], "An internal error occurred");
}

#[tokio::test]
async fn test_strict_startup_failure_becomes_503() {
    let adapter = Arc::new(
        Adapter::builder(failing_startup_app(text_app("unreachable")))
            .lifespan("on")
            .build()
            .unwrap(),
    );

    let response = vellox_web::router(adapter)
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let adapter = Arc::new(Adapter::new(echo_app()));

    let response = vellox_web::router_with_body_limit(adapter, 8)
        .oneshot(Request::post("/").body(Body::from(vec![b'x'; 64])).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}
