//! HTTP tests for the JSON API against the in-memory backend.

#![allow(clippy::unwrap_used)]

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::{TestRequest, TestServer};
use removal_desk_core::RequestStore;
use removal_desk_testing::test_clock;
use removal_desk_web::{ACTOR_KEY_HEADER, ACTOR_ROLE_HEADER, AppState, build_router};
use serde_json::{Value, json};
use std::sync::Arc;

fn server() -> TestServer {
    let state = AppState::new(RequestStore::in_memory(Arc::new(test_clock())));
    let app = build_router(state, &["http://localhost:5173".to_string()]);
    TestServer::new(app).unwrap()
}

fn as_actor(request: TestRequest, role: &'static str, key: &'static str) -> TestRequest {
    request
        .add_header(
            HeaderName::from_static(ACTOR_ROLE_HEADER),
            HeaderValue::from_static(role),
        )
        .add_header(
            HeaderName::from_static(ACTOR_KEY_HEADER),
            HeaderValue::from_static(key),
        )
}

fn submission(serial: &str) -> Value {
    json!({
        "parentName": "Dana Levi",
        "phone": "050-1234567",
        "email": "-",
        "studentName": "Noa Levi",
        "classRoom": "7B",
        "serial": serial,
        "reason": "Leaving the school",
    })
}

async fn submit(server: &TestServer, serial: &str) -> Value {
    let response = as_actor(server.post("/api/requests"), "parent", "p1")
        .json(&submission(serial))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<Value>()
}

#[tokio::test]
async fn test_health_reports_store_snapshot() {
    let server = server();
    submit(&server, "AB-01").await;

    let body = server.get("/api/health").await.json::<Value>();

    assert_eq!(body["ok"], true);
    assert_eq!(body["store"]["backend"], "memory");
    assert_eq!(body["store"]["counter"], 1);
    assert_eq!(body["store"]["requests"], 1);
    assert_eq!(body["store"]["auditEntries"], 1);
}

#[tokio::test]
async fn test_create_fills_owner_from_actor() {
    let server = server();

    let body = submit(&server, "AB-01").await;

    assert_eq!(body["ok"], true);
    assert_eq!(body["request"]["id"], "000001");
    assert_eq!(body["request"]["ownerKey"], "p1");
    assert_eq!(body["request"]["status"], "submitted");
    assert!(body["request"].get("email").is_none());
}

#[tokio::test]
async fn test_create_rejects_missing_fields() {
    let server = server();

    let response = as_actor(server.post("/api/requests"), "parent", "p1")
        .json(&json!({ "serial": "AB-01" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body = response.json::<Value>();
    assert_eq!(body["ok"], false);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(body["details"]["field"], "studentName");
}

#[tokio::test]
async fn test_explicit_id_bounds() {
    let server = server();

    let mut body = submission("AB-01");
    body["id"] = json!("");
    let response = as_actor(server.post("/api/requests"), "parent", "p1")
        .json(&body)
        .await;
    response.assert_status(StatusCode::CREATED);
    assert_eq!(response.json::<Value>()["request"]["id"], "000001");

    let mut body = submission("AB-02");
    body["id"] = json!("1000000");
    as_actor(server.post("/api/requests"), "parent", "p1")
        .json(&body)
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let list = server.get("/api/requests").await.json::<Vec<Value>>();
    assert_eq!(list.len(), 1);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let server = server();

    let response = server
        .post("/api/requests")
        .content_type("application/json")
        .bytes("{not json".into())
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["ok"], false);
}

#[tokio::test]
async fn test_duplicate_returns_existing_request() {
    let server = server();
    submit(&server, "AB-01").await;

    let response = as_actor(server.post("/api/requests"), "parent", "p1")
        .json(&submission(" ab - 01 "))
        .await;

    response.assert_status(StatusCode::CONFLICT);
    let body = response.json::<Value>();
    assert_eq!(body["code"], "DUPLICATE_ACTIVE_REQUEST");
    assert_eq!(body["details"]["existingId"], "000001");
    assert_eq!(body["details"]["status"], "submitted");
}

#[tokio::test]
async fn test_get_and_list() {
    let server = server();
    submit(&server, "AB-01").await;
    submit(&server, "AB-02").await;

    let list = server.get("/api/requests").await.json::<Vec<Value>>();
    let ids: Vec<&str> = list.iter().filter_map(|r| r["id"].as_str()).collect();
    assert_eq!(ids, ["000002", "000001"]);

    let one = server.get("/api/requests/1").await.json::<Value>();
    assert_eq!(one["serial"], "AB-01");

    server
        .get("/api/requests/000042")
        .await
        .assert_status(StatusCode::NOT_FOUND);
    server
        .get("/api/requests/abc")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_full_status_workflow() {
    let server = server();
    submit(&server, "AB-01").await;

    let response = as_actor(server.post("/api/requests/000001/status"), "registrar", "reg")
        .json(&json!({ "status": "pending_it" }))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["request"]["status"], "pending_it");

    let response = as_actor(server.post("/api/requests/000001/status"), "it", "tech")
        .json(&json!({ "status": "it_approved" }))
        .await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["request"]["status"], "it_approved");
    assert!(body["request"]["updatedAt"].is_string());

    // Approved no longer blocks a new submission for the device.
    submit(&server, "AB-01").await;
}

#[tokio::test]
async fn test_transition_denials() {
    let server = server();
    submit(&server, "AB-01").await;

    let parent = as_actor(server.post("/api/requests/000001/status"), "parent", "p1")
        .json(&json!({ "status": "pending_it" }))
        .await;
    parent.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(parent.json::<Value>()["code"], "ACCESS_DENIED");

    let anonymous = server
        .post("/api/requests/000001/status")
        .json(&json!({ "status": "pending_it" }))
        .await;
    anonymous.assert_status(StatusCode::FORBIDDEN);

    let skip = as_actor(server.post("/api/requests/000001/status"), "registrar", "reg")
        .json(&json!({ "status": "it_approved" }))
        .await;
    skip.assert_status(StatusCode::CONFLICT);
    assert_eq!(skip.json::<Value>()["code"], "INVALID_TRANSITION");

    let unknown = as_actor(server.post("/api/requests/000001/status"), "registrar", "reg")
        .json(&json!({ "status": "Rejected" }))
        .await;
    unknown.assert_status(StatusCode::BAD_REQUEST);

    let stored = server.get("/api/requests/000001").await.json::<Value>();
    assert_eq!(stored["status"], "submitted");
}

#[tokio::test]
async fn test_patch_ignores_status_and_audits_with_label() {
    let server = server();
    submit(&server, "AB-01").await;

    let response = as_actor(server.patch("/api/requests/000001"), "registrar", "reg")
        .json(&json!({
            "note": "Called parent",
            "status": "it_approved",
            "action": "Added note",
            "detail": "phone call",
        }))
        .await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["request"]["note"], "Called parent");
    assert_eq!(body["request"]["status"], "submitted");

    let logs = server
        .get("/api/logs")
        .add_query_param("requestId", "000001")
        .add_query_param("limit", 1)
        .await
        .json::<Vec<Value>>();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0]["action"], "Added note");
    assert_eq!(logs[0]["user"], "reg");
    assert_eq!(logs[0]["detail"], "phone call");
}

#[tokio::test]
async fn test_patch_rejects_blanking_required_field() {
    let server = server();
    submit(&server, "AB-01").await;

    let response = as_actor(server.patch("/api/requests/000001"), "registrar", "reg")
        .json(&json!({ "reason": "  " }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["details"]["field"], "reason");
}

#[tokio::test]
async fn test_append_and_filter_logs() {
    let server = server();

    let response = server
        .post("/api/logs")
        .json(&json!({ "user": "", "action": "Changed password", "requestId": "" }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body = response.json::<Value>();
    assert_eq!(body["ok"], true);
    assert_eq!(body["log"]["user"], "system");
    assert!(body["log"].get("requestId").is_none());

    submit(&server, "AB-01").await;

    let all = server.get("/api/logs").await.json::<Vec<Value>>();
    assert_eq!(all.len(), 2);

    let by_user = server
        .get("/api/logs")
        .add_query_param("user", "system")
        .await
        .json::<Vec<Value>>();
    assert_eq!(by_user.len(), 1);
    assert_eq!(by_user[0]["action"], "Changed password");

    server
        .get("/api/logs")
        .add_query_param("requestId", "nope")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_legacy_export_vocabulary() {
    let server = server();
    submit(&server, "AB-01").await;
    as_actor(server.post("/api/requests/000001/status"), "registrar", "reg")
        .json(&json!({ "status": "pending_it" }))
        .await
        .assert_status_ok();

    let legacy = server.get("/api/legacy/requests").await.json::<Vec<Value>>();

    assert_eq!(legacy.len(), 1);
    assert_eq!(legacy[0]["status"], "Submitted");
    assert_eq!(legacy[0]["deviceSerial"], "AB-01");
    assert_eq!(legacy[0]["phone1"], "050-1234567");
    assert_eq!(legacy[0]["email"], "");
}
