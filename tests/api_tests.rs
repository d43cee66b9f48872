//! HTTP API 集成测试

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

mod common;
use common::{
    create_recording_app, create_test_config, RecordingScheduler, StubClassifier, StubGenerator,
    MASTER_KEY,
};

fn router_with(classifier_label: &str) -> Router {
    let app = create_recording_app(
        create_test_config(),
        StubClassifier::label(classifier_label),
        StubGenerator::text("Root cause: disk full."),
        RecordingScheduler::new(),
    );
    log_sentinel::routes::create_router(app.state)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

fn admin(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-master-key", MASTER_KEY)
        .header("content-type", "application/json");
    match body {
        Some(body) => builder.body(Body::from(body.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn webhook(token: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/v1/webhook")
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("x-api-key", token);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn create_system(app: &Router) -> String {
    let (status, json) = send(
        app,
        admin(
            "POST",
            "/api/v1/systems",
            Some(json!({
                "name": "billing-api",
                "client_email": "ops@acme.test",
                "maintenance_email": "maint@acme.test",
                "status": "production"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    json["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_endpoints_are_public() {
    let app = router_with("normal");

    let (status, json) = send(&app, Request::builder().uri("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());

    let (status, json) = send(&app, Request::builder().uri("/ready").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ready"], true);
    assert!(json["checks"].is_array());
}

#[tokio::test]
async fn test_admin_routes_require_master_key() {
    let app = router_with("normal");

    let request = Request::builder()
        .uri("/api/v1/systems")
        .body(Body::empty())
        .unwrap();
    let (status, json) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"]["code"], 401);

    let request = Request::builder()
        .uri("/api/v1/systems")
        .header("x-master-key", "wrong-master-key-000000")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, json) = send(&app, admin("GET", "/api/v1/systems", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!([]));
}

#[tokio::test]
async fn test_system_registration_and_update() {
    let app = router_with("normal");
    let id = create_system(&app).await;
    assert!(id.starts_with("pbpm-"));

    let (status, json) = send(
        &app,
        admin(
            "PUT",
            &format!("/api/v1/systems/{}", id),
            Some(json!({ "technical_info": "Debian 12, nginx" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["technical_info"], "Debian 12, nginx");
    assert_eq!(json["name"], "billing-api");

    let (status, _) = send(&app, admin("GET", "/api/v1/systems/pbpm-missing", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        admin(
            "POST",
            "/api/v1/systems",
            Some(json!({
                "name": "",
                "client_email": "nope",
                "maintenance_email": "maint@acme.test"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_webhook_authentication() {
    let app = router_with("error");
    let id = create_system(&app).await;

    let (status, _) = send(&app, webhook(None, r#"{"message":"boom"}"#)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, webhook(Some("pbpm-unknown"), r#"{"message":"boom"}"#)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // 未知令牌 + 非法请求体仍然是 401
    let (status, _) = send(&app, webhook(Some("pbpm-unknown"), "not json")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, webhook(Some(&id), "not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = send(
        &app,
        webhook(Some(&id), r#"{"message":"panic: boom","container":"api-1"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "stored");
    assert_eq!(json["severity"], "error");
    assert_eq!(json["report_scheduled"], true);
}

#[tokio::test]
async fn test_filters_flow() {
    let app = router_with("attention");
    let id = create_system(&app).await;

    let (status, filter) = send(
        &app,
        admin(
            "POST",
            &format!("/api/v1/systems/{}/filters", id),
            Some(json!({ "pattern": "heartbeat" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(filter["match_kind"], "substring");
    let filter_id = filter["id"].as_i64().unwrap();

    let (status, _) = send(
        &app,
        admin(
            "POST",
            &format!("/api/v1/systems/{}/filters", id),
            Some(json!({ "pattern": "([bad", "match_kind": "regex" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, json) = send(&app, webhook(Some(&id), r#"{"message":"heartbeat ok"}"#)).await;
    assert_eq!(json, json!({ "status": "filtered" }));

    let (status, json) = send(
        &app,
        admin("DELETE", &format!("/api/v1/systems/{}/filters/{}", id, filter_id), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "deleted");

    let (status, _) = send(
        &app,
        admin("DELETE", &format!("/api/v1/systems/{}/filters/{}", id, filter_id), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, json) = send(&app, webhook(Some(&id), r#"{"message":"heartbeat ok"}"#)).await;
    assert_eq!(json["status"], "stored");
}

#[tokio::test]
async fn test_events_listing_and_cleanup() {
    let app = router_with("normal");
    let id = create_system(&app).await;

    for message in ["cron started", "cron done", "request served"] {
        let body = json!({ "message": message }).to_string();
        let (status, _) = send(&app, webhook(Some(&id), &body)).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (_, _) = send(
        &app,
        webhook(Some(&id), r#"{"message":{"level":"info","msg":"structured"}}"#),
    )
    .await;

    let (status, events) = send(
        &app,
        admin("GET", &format!("/api/v1/events?system_id={}&severity=normal", id), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let events = events.as_array().unwrap();
    assert_eq!(events.len(), 4);
    // 结构化负载按原样返回
    assert!(events
        .iter()
        .any(|e| e["message"] == json!({"level": "info", "msg": "structured"})));

    let (status, json) = send(
        &app,
        admin(
            "POST",
            &format!("/api/v1/systems/{}/cleanup", id),
            Some(json!({ "pattern": "cron" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "success");
    assert_eq!(json["cleaned_count"], 2);

    let (_, events) = send(&app, admin("GET", "/api/v1/events?limit=10", None)).await;
    assert_eq!(events.as_array().unwrap().len(), 2);

    let (status, _) = send(&app, admin("GET", "/api/v1/events?limit=0", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_report_trigger_and_lookup() {
    let app = router_with("error");
    let id = create_system(&app).await;

    let (_, json) = send(&app, webhook(Some(&id), r#"{"message":"disk full"}"#)).await;
    let event_id = json["event_id"].as_i64().unwrap();

    let (status, report) = send(
        &app,
        admin("POST", &format!("/api/v1/events/{}/report", event_id), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["event_id"], event_id);
    assert_eq!(report["content"], "Root cause: disk full.");
    let report_id = report["id"].as_i64().unwrap();

    let (status, json) = send(&app, admin("GET", &format!("/api/v1/reports/{}", report_id), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["id"], report_id);

    let (_, status_map) = send(&app, admin("GET", "/api/v1/events/status", None)).await;
    assert_eq!(status_map[event_id.to_string()], "completed");

    let (status, _) = send(&app, admin("POST", "/api/v1/events/99999/report", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, json) = send(
        &app,
        admin("POST", "/api/v1/commands", Some(json!({ "content": "help" }))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["reply"].as_str().unwrap().starts_with("Commands:"));
}

#[tokio::test]
async fn test_ip_whitelist_blocks_unknown_clients() {
    let mut config = create_test_config();
    config.security.allowed_ips = Some(vec!["10.0.0.1".to_string()]);
    let app = create_recording_app(
        config,
        StubClassifier::label("normal"),
        StubGenerator::text("report"),
        RecordingScheduler::new(),
    );
    let router = log_sentinel::routes::create_router(app.state);

    let (status, _) = send(&router, Request::builder().uri("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
