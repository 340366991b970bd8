use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use superstore::server::{router, AppState};
use superstore_core::DataSource;
use superstore_parser::TextEncoding;
use tower::ServiceExt;

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../superstore-parser/tests/data/store_sample.csv")
}

fn app_for(path: PathBuf) -> (Arc<AppState>, Router) {
    let state = AppState::new(DataSource::new(path, TextEncoding::Latin1), 10);
    (state.clone(), router(state))
}

async fn send(app: Router, method: Method, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = app
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes()
        .to_vec();
    (status, bytes)
}

async fn summary_json(app: Router, uri: &str) -> Value {
    let (status, body) = send(app, Method::GET, uri).await;
    assert_eq!(status, StatusCode::OK);
    serde_json::from_slice(&body).expect("summary json")
}

#[tokio::test]
async fn dashboard_page_renders_all_regions() {
    let (_, app) = app_for(fixture());
    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).expect("request"))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/html"), "{content_type}");

    let body = response.into_body().collect().await.expect("body").to_bytes();
    let html = String::from_utf8(body.to_vec()).expect("utf8 html");
    assert!(html.contains("Superstore Sales Dashboard"));
    assert!(html.contains("$3,470"));
    assert_eq!(html.matches("<section>").count(), 7);
    assert_eq!(html.matches(" selected>").count(), 3);
}

#[tokio::test]
async fn summary_reflects_region_selection() {
    let (_, app) = app_for(fixture());

    let all = summary_json(app.clone(), "/api/summary").await;
    assert_eq!(all["rows"], 13);
    assert_eq!(all["regions"], serde_json::json!(["South", "West", "Central"]));
    assert_eq!(all["selected"], serde_json::json!([]));

    let central = summary_json(app.clone(), "/api/summary?region=Central").await;
    assert_eq!(central["rows"], 2);
    assert_eq!(central["selected"], serde_json::json!(["Central"]));
    let sales = central["total_sales"].as_f64().expect("total sales");
    assert!((sales - 734.69).abs() < 1e-6, "{sales}");

    let pair = summary_json(app, "/api/summary?region=Central&region=West").await;
    let sales = pair["total_sales"].as_f64().expect("total sales");
    assert!((sales - (734.69 + 746.196)).abs() < 1e-6, "{sales}");
}

#[tokio::test]
async fn table_is_cached_until_cleared() {
    let (state, app) = app_for(fixture());
    assert!(!state.is_cached().await);

    let (status, _) = send(app.clone(), Method::GET, "/api/summary").await;
    assert_eq!(status, StatusCode::OK);
    assert!(state.is_cached().await);

    let (status, body) = send(app, Method::POST, "/cache/clear").await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_empty());
    assert!(!state.is_cached().await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_requests_share_one_loaded_table() {
    let (state, app) = app_for(fixture());

    let (first, second) = tokio::join!(
        summary_json(app.clone(), "/api/summary"),
        summary_json(app, "/api/summary?region=West"),
    );
    assert_eq!(first["rows"], 13);
    assert!(second["rows"].as_u64().is_some_and(|rows| rows > 0));

    let cached = state.table().await.expect("cached table");
    let again = state.table().await.expect("cached table");
    assert!(Arc::ptr_eq(&cached, &again));
    assert_eq!(cached.height(), 13);
}

#[tokio::test]
async fn missing_data_file_is_a_server_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (state, app) = app_for(dir.path().join("absent.csv"));

    let (status, _) = send(app.clone(), Method::GET, "/").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let (status, _) = send(app, Method::GET, "/api/summary").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!state.is_cached().await);
}
