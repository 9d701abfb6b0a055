use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::classifier::{FLAT_RULES, GROUPED_RULES};
use crate::clock::FixedClock;
use crate::models::ActivityRecord;
use crate::routes::{router, AppState};
use crate::store::ActivityStore;

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 1).unwrap().and_hms_opt(15, 30, 0).unwrap()
}

fn test_app() -> Router {
    let store = ActivityStore::open_in_memory().unwrap();
    store.migrate().unwrap();
    router(AppState::new(store, FixedClock(now()), &GROUPED_RULES))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<&str>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::ORIGIN, "http://localhost:3000")
        .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, bytes.to_vec())
}

async fn send_json(app: &Router, method: Method, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
    let (status, _, bytes) = send(app, method, uri, body).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_record_then_list_applies_defaults() {
    let app = test_app();

    let (status, body) = send_json(
        &app,
        Method::POST,
        "/activity",
        Some(r#"{"app":"VSCode","title":"main.rs","category":"work"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "Activity saved successfully"}));

    let (status, body) = send_json(&app, Method::GET, "/activity", None).await;
    assert_eq!(status, StatusCode::OK);
    let records: Vec<ActivityRecord> = serde_json::from_value(body).unwrap();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.timestamp, "2024-06-01 15:30:00");
    assert_eq!(record.app, "VSCode");
    assert_eq!(record.title, "main.rs");
    assert_eq!(record.category, "work");
    assert_eq!(record.duration, 0);
    assert_eq!(record.user_id, "default");
}

#[tokio::test]
async fn test_list_respects_limit_param() {
    let app = test_app();
    for n in 0..3 {
        let body = format!(r#"{{"app":"app-{n}","title":"t","category":"work","duration":{n}}}"#);
        let (status, _) = send_json(&app, Method::POST, "/activity", Some(&body)).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, body) = send_json(&app, Method::GET, "/activity?limit=2", None).await;
    let records: Vec<ActivityRecord> = serde_json::from_value(body).unwrap();
    // equal timestamps: most recent insert first
    assert_eq!(records.iter().map(|r| r.app.as_str()).collect::<Vec<_>>(), vec!["app-2", "app-1"]);

    let (status, body) = send_json(&app, Method::GET, "/activity?limit=many", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_record_missing_field_is_rejected_without_insert() {
    let app = test_app();

    let (status, body) = send_json(&app, Method::POST, "/activity", Some(r#"{"app":"Zoom","title":"Standup"}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "missing required field: category"}));

    let (_, body) = send_json(&app, Method::GET, "/activity", None).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_malformed_bodies_yield_error_responses() {
    let app = test_app();

    for uri in ["/activity", "/categorize"] {
        for payload in ["{not json", "", r#"{"app":"#] {
            let (status, body) = send_json(&app, Method::POST, uri, Some(payload)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri} {payload:?}");
            assert!(body["error"].as_str().unwrap().starts_with("invalid request body"));
        }
    }

    let (status, body) = send_json(&app, Method::POST, "/categorize", Some(r#"{"app": 42}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_categorize_uses_configured_rules() {
    let app = test_app();
    let (status, body) =
        send_json(&app, Method::POST, "/categorize", Some(r#"{"app":"VSCode","title":"index.ts"}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"category": "work"}));

    let (_, body) = send_json(&app, Method::POST, "/categorize", Some("{}")).await;
    assert_eq!(body, json!({"category": "other"}));

    let store = ActivityStore::open_in_memory().unwrap();
    let flat = router(AppState::new(store, FixedClock(now()), &FLAT_RULES));
    let (_, body) = send_json(&flat, Method::POST, "/categorize", Some(r#"{"app":"Chrome","title":"GitHub"}"#)).await;
    assert_eq!(body, json!({"category": "Work"}));
}

#[tokio::test]
async fn test_analytics_shapes() {
    let app = test_app();
    for (app_name, category, duration) in [("Steam", "entertainment", 600), ("VSCode", "work", 120), ("Slack", "work", 60)] {
        let body = json!({"app": app_name, "title": "x", "category": category, "duration": duration}).to_string();
        send_json(&app, Method::POST, "/activity", Some(&body)).await;
    }

    let (status, body) = send_json(&app, Method::GET, "/analytics", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "category_stats": [
                {"category": "entertainment", "count": 1, "duration": 600},
                {"category": "work", "count": 2, "duration": 180}
            ],
            "hourly_stats": [{"hour": 15, "count": 3}],
            "daily_stats": [{"date": "2024-06-01", "count": 3}]
        })
    );

    let (status, body) = send_json(&app, Method::GET, "/analytics/totals", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "apps": [
                {"app": "Steam", "total_time": 600},
                {"app": "VSCode", "total_time": 120},
                {"app": "Slack", "total_time": 60}
            ],
            "categories": [
                {"category": "entertainment", "total_time": 600},
                {"category": "work", "total_time": 180}
            ]
        })
    );
}

#[tokio::test]
async fn test_preflight_advertises_endpoint_methods() {
    let app = test_app();

    let (status, headers, body) = send(&app, Method::OPTIONS, "/activity", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_empty());
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    let methods = headers[header::ACCESS_CONTROL_ALLOW_METHODS].to_str().unwrap();
    assert!(methods.contains("GET") && methods.contains("POST"));

    let (status, headers, _) = send(&app, Method::OPTIONS, "/analytics", None).await;
    assert_eq!(status, StatusCode::OK);
    let methods = headers[header::ACCESS_CONTROL_ALLOW_METHODS].to_str().unwrap();
    assert!(methods.contains("GET") && !methods.contains("POST"));

    let (status, headers, _) = send(&app, Method::OPTIONS, "/categorize", None).await;
    assert_eq!(status, StatusCode::OK);
    let methods = headers[header::ACCESS_CONTROL_ALLOW_METHODS].to_str().unwrap();
    assert!(methods.contains("POST") && !methods.contains("GET"));
}

#[tokio::test]
async fn test_responses_carry_cors_and_request_id() {
    let app = test_app();

    let (_, headers, _) = send(&app, Method::GET, "/activity", None).await;
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert!(!headers["x-request-id"].is_empty());

    let (_, headers, _) = send(&app, Method::POST, "/activity", Some("oops")).await;
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");

    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "trace-me")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "trace-me");
}

#[tokio::test]
async fn test_store_failure_maps_to_server_error() {
    // schema never migrated
    let store = ActivityStore::open_in_memory().unwrap();
    let app = router(AppState::new(store, FixedClock(now()), &GROUPED_RULES));

    let (status, body) = send_json(&app, Method::GET, "/analytics", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().starts_with("store error"));
}

#[tokio::test]
async fn test_concurrent_records_all_land() {
    let dir = tempfile::tempdir().unwrap();
    let store = ActivityStore::open(&dir.path().join("activity.db")).unwrap();
    store.migrate().unwrap();
    let app = router(AppState::new(store, FixedClock(now()), &GROUPED_RULES));

    let tasks: Vec<_> = (0..20)
        .map(|n| {
            let app = app.clone();
            tokio::spawn(async move {
                let body = format!(r#"{{"app":"app-{n}","title":"t","category":"work"}}"#);
                send(&app, Method::POST, "/activity", Some(&body)).await.0
            })
        })
        .collect();
    for task in tasks {
        assert_eq!(task.await.unwrap(), StatusCode::OK);
    }

    let (_, body) = send_json(&app, Method::GET, "/activity", None).await;
    let records: Vec<ActivityRecord> = serde_json::from_value(body).unwrap();
    let mut ids: Vec<i64> = records.iter().map(|r| r.id).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 20);
}

#[tokio::test]
async fn test_empty_title_round_trips() {
    let app = test_app();

    let (status, _) = send_json(
        &app,
        Method::POST,
        "/activity",
        Some(r#"{"app":"Finder","title":"","category":"other"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send_json(&app, Method::GET, "/activity", None).await;
    let records: Vec<ActivityRecord> = serde_json::from_value(body).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].app, "Finder");
    assert_eq!(records[0].title, "");
    assert_eq!(records[0].category, "other");
}

#[tokio::test]
async fn test_oversized_durations_cannot_break_analytics() {
    let app = test_app();
    let huge = r#"{"app":"Idle","title":"t","category":"other","duration":9223372036854775807}"#;
    for _ in 0..2 {
        let (status, body) = send_json(&app, Method::POST, "/activity", Some(huge)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("duration"));
    }

    let max = format!(r#"{{"app":"Idle","title":"t","category":"other","duration":{}}}"#, i32::MAX);
    for _ in 0..2 {
        let (status, _) = send_json(&app, Method::POST, "/activity", Some(&max)).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = send_json(&app, Method::GET, "/analytics/totals", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["apps"][0]["total_time"], json!(2 * i32::MAX as i64));

    let (status, body) = send_json(&app, Method::GET, "/analytics", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["category_stats"][0]["duration"], json!(2 * i32::MAX as i64));
}

#[tokio::test]
async fn test_zero_limit_returns_empty_list() {
    let app = test_app();
    let (status, _) =
        send_json(&app, Method::POST, "/activity", Some(r#"{"app":"Zoom","title":"t","category":"work"}"#)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send_json(&app, Method::GET, "/activity?limit=0", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}
