//! Form submission flow through the HTTP surface.

use axum::http::{Method, StatusCode};
use serde_json::json;

use trustgate::gate::GateState;

mod common;
use common::{mount, send, test_config, test_server, ADMIN_KEY};

#[tokio::test]
async fn test_mount_and_accept_sanitized_submission() {
    let (server, _) = test_server(test_config());
    let router = server.router();

    let token = mount(&router, "contact").await;
    assert!(token.len() > 10);

    let (status, body) = send(
        &router,
        Method::POST,
        "/forms/contact/submit",
        None,
        Some(json!({
            "token": token,
            "fields": { "name": "Ana", "message": "5 > 3 isn't it" },
            "rules": { "name": { "required": true, "min_length": 2 } }
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["accepted"], true);
    assert_eq!(body["fields"]["name"], "Ana");
    assert_eq!(body["fields"]["message"], "5 &gt; 3 isn&#x27;t it");
    assert_eq!(body["state"]["blocked"], false);
}

#[tokio::test]
async fn test_stale_token_rejected() {
    let (server, _) = test_server(test_config());
    let router = server.router();
    let first = mount(&router, "contact").await;

    // A remount rotates the token.
    let second = mount(&router, "contact").await;
    assert_ne!(first, second);

    let (status, body) = send(
        &router,
        Method::POST,
        "/forms/contact/submit",
        None,
        Some(json!({ "token": first, "fields": { "name": "Ana" } })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["accepted"], false);
    assert!(body["message"].as_str().unwrap().contains("session has expired"));

    let audit = server.state().inner.layer.audit.read_recent(10);
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].event.action(), "invalid_csrf_token");
}

#[tokio::test]
async fn test_sixth_attempt_is_rate_limited() {
    let (server, _) = test_server(test_config());
    let router = server.router();
    let token = mount(&router, "booking").await;
    let submit = json!({ "token": token, "fields": { "name": "Ana" } });

    for _ in 0..5 {
        let (status, _) = send(
            &router,
            Method::POST,
            "/forms/booking/submit",
            None,
            Some(submit.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = send(
        &router,
        Method::POST,
        "/forms/booking/submit",
        None,
        Some(submit),
    )
    .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["state"]["blocked"], true);
    let remaining = body["state"]["remaining_seconds"].as_u64().unwrap();
    assert!(remaining > 0 && remaining <= 300);

    let (status, state) = send(&router, Method::GET, "/forms/booking/state", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(state["blocked"], true);

    let audit = server.state().inner.layer.audit.read_recent(10);
    assert_eq!(audit.last().unwrap().event.action(), "rate_limit_exceeded");
}

#[tokio::test]
async fn test_malicious_field_rejected_and_audited() {
    let (server, _) = test_server(test_config());
    let router = server.router();
    let token = mount(&router, "contact").await;

    let (status, body) = send(
        &router,
        Method::POST,
        "/forms/contact/submit",
        None,
        Some(json!({
            "token": token,
            "fields": { "message": "<script>alert(1)</script>" },
            "page_url": "app://test/contact?ref=mail"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["accepted"], false);

    let audit = server.state().inner.layer.audit.read_recent(10);
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].event.action(), "malicious_content_detected");
    assert_eq!(audit[0].page_url, "app://test/contact?ref=mail");
    assert_eq!(audit[0].agent, "trustgate-tests");
}

#[tokio::test]
async fn test_rule_failures_listed() {
    let (server, _) = test_server(test_config());
    let router = server.router();
    let token = mount(&router, "signup").await;

    let (status, body) = send(
        &router,
        Method::POST,
        "/forms/signup/submit",
        None,
        Some(json!({
            "token": token,
            "fields": { "email": "not-an-email", "name": "" },
            "rules": {
                "email": { "pattern": "^[^@\\s]+@[^@\\s]+$" },
                "name": { "required": true }
            }
        })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let errors: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e.as_str().unwrap())
        .collect();
    assert_eq!(errors, vec!["email has an invalid format", "name is required"]);
}

#[tokio::test]
async fn test_bad_rule_pattern_is_bad_request() {
    let (server, _) = test_server(test_config());
    let router = server.router();
    let token = mount(&router, "signup").await;

    let (status, _) = send(
        &router,
        Method::POST,
        "/forms/signup/submit",
        None,
        Some(json!({
            "token": token,
            "fields": { "code": "abc" },
            "rules": { "code": { "pattern": "([" } }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unmounted_form_routes() {
    let (server, _) = test_server(test_config());
    let router = server.router();

    let (status, _) = send(&router, Method::GET, "/forms/ghost/state", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&router, Method::POST, "/forms/bad%20id/mount", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    mount(&router, "contact").await;
    let (status, _) = send(&router, Method::DELETE, "/forms/contact", None, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&router, Method::DELETE, "/forms/contact", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(server.state().gate("contact").is_none());
}

#[tokio::test]
async fn test_monitor_events_reach_audit_trail() {
    let (server, _) = test_server(test_config());
    let router = server.router();

    let (status, _) = send(
        &router,
        Method::POST,
        "/monitor/events",
        None,
        Some(json!({
            "type": "nodes_added",
            "nodes": [{ "tag": "div", "children": [{ "tag": "script" }] }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    // The background monitor is not running here; feed it directly.
    let state = server.state();
    state.inner.monitor.handle(trustgate::monitor::MonitorEvent::NodesAdded {
        nodes: vec![trustgate::monitor::ElementSnapshot::new("iframe")],
    });
    assert_eq!(state.inner.monitor.suspicious_count(), 1);

    let (status, entries) = send(
        &router,
        Method::GET,
        "/admin/audit",
        Some(ADMIN_KEY),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(entries[0]["event"]["action"], "suspicious_dom_modification");
    assert_eq!(entries[0]["event"]["details"]["tag"], "iframe");
}

#[tokio::test]
async fn test_page_report_updates_audit_context() {
    let (server, _) = test_server(test_config());
    let router = server.router();

    let (status, _) = send(
        &router,
        Method::POST,
        "/page",
        None,
        Some(json!({ "url": "app://test/checkout" })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(server.state().inner.layer.audit.page().url(), "app://test/checkout");
}

#[tokio::test(start_paused = true)]
async fn test_gate_state_counts_down_to_idle() {
    let mut config = test_config();
    config.gate.max_attempts = 1;
    config.gate.window_secs = 3;
    let (server, _) = test_server(config);
    let router = server.router();
    let token = mount(&router, "contact").await;
    let submit = json!({ "token": token, "fields": {} });

    send(&router, Method::POST, "/forms/contact/submit", None, Some(submit.clone())).await;
    let (status, _) = send(&router, Method::POST, "/forms/contact/submit", None, Some(submit)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    let gate = server.state().gate("contact").unwrap();
    let mut rx = gate.subscribe();
    assert_eq!(*rx.borrow_and_update(), GateState::blocked_for(3));

    tokio::time::advance(std::time::Duration::from_secs(3)).await;
    while rx.borrow().blocked {
        rx.changed().await.unwrap();
    }
    assert_eq!(gate.state(), GateState::IDLE);
}

#[tokio::test]
async fn test_health() {
    let (server, _) = test_server(test_config());
    let router = server.router();
    let (status, _) = send(&router, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
}
