//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use trustgate::session::PageContext;
use trustgate::storage::MemoryStore;
use trustgate::{GuardConfig, GuardServer, TrustLayer};

pub const ADMIN_KEY: &str = "admin-key-for-tests-0001";
pub const VIEWER_KEY: &str = "viewer-key-for-tests-0001";

/// Config with known operator keys and a small attempt budget.
pub fn test_config() -> GuardConfig {
    let mut config = GuardConfig::default();
    config.admin.enabled = true;
    config.admin.api_key = ADMIN_KEY.to_string();
    config.admin.viewer_key = VIEWER_KEY.to_string();
    config.gate.max_attempts = 5;
    config.gate.window_secs = 300;
    config
}

/// A server over fresh in-memory stores.
pub fn test_server(config: GuardConfig) -> (GuardServer, MemoryStore) {
    let persistent = MemoryStore::new();
    let layer = TrustLayer::new(
        Arc::new(MemoryStore::new()),
        Arc::new(persistent.clone()),
        PageContext::new("app://test/contact", "trustgate-tests"),
        config.audit.capacity,
    );
    (GuardServer::new(config, layer), persistent)
}

/// Send one request through the router and decode the JSON body, if any.
pub async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    bearer: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(key) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", key));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

/// Mount `form_id` and return its token.
pub async fn mount(router: &Router, form_id: &str) -> String {
    let (status, body) = send(
        router,
        Method::POST,
        &format!("/forms/{}/mount", form_id),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}
