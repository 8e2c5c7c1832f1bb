// tests/metrics.rs
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use trend_aggregator::{app_with_config, TrendsConfig};

#[tokio::test]
async fn metrics_endpoint_contains_expected_series() {
    // Metrics explicitly on; no keys so everything degrades locally.
    let app = app_with_config(&TrendsConfig::default(), true);

    let req = Request::post("/api/trends/analyze")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"topic":"electric bikes"}"#))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // axum::body::to_bytes requires an explicit limit
    let body = body::to_bytes(resp.into_body(), 1_048_576).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();

    for needle in [
        "trend_source_status_total",
        "trend_reports_total",
        "trend_synthesis_fallback_total",
        "trend_analyze_ms",
    ] {
        assert!(text.contains(needle), "missing series '{needle}' in:\n{text}");
    }
    assert!(text.contains(r#"status="error""#));
}

#[tokio::test]
async fn metrics_route_absent_when_disabled() {
    let app = app_with_config(&TrendsConfig::default(), false);
    let resp = app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
