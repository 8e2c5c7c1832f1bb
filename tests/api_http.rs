// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
// No provider keys are configured, so every source degrades locally.

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::json;
use serde_json::Value as Json;
use tower::ServiceExt as _; // for `oneshot`

use trend_aggregator::{app_with_config, TrendsConfig};

const BODY_LIMIT: usize = 1024 * 1024;

fn test_router() -> Router {
    app_with_config(&TrendsConfig::default(), false)
}

async fn post_analyze(body: String) -> (StatusCode, Json) {
    let req = Request::builder()
        .method("POST")
        .uri("/api/trends/analyze")
        .header("content-type", "application/json")
        .body(Body::from(body))
        .expect("build POST /api/trends/analyze");

    let resp = test_router().oneshot(req).await.expect("oneshot analyze");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    let v: Json = serde_json::from_slice(&bytes).expect("json body");
    (status, v)
}

#[tokio::test]
async fn health_returns_200_and_ok_body() {
    let req = Request::get("/health").body(Body::empty()).unwrap();
    let resp = test_router().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    assert_eq!(String::from_utf8(bytes.to_vec()).unwrap(), "ok");
}

#[tokio::test]
async fn missing_or_blank_topic_is_400() {
    for payload in [json!({}), json!({ "topic": "   " }), json!({ "topic": 7 })] {
        let (status, v) = post_analyze(payload.to_string()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "payload {payload}");
        assert!(v["error"].as_str().unwrap().contains("topic"));
    }
}

#[tokio::test]
async fn bad_timeframe_and_malformed_json_are_400() {
    let (status, v) = post_analyze(json!({ "topic": "x", "timeframe": "2w" }).to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(v["error"].as_str().unwrap().contains("timeframe"));

    let (status, v) = post_analyze("{not json".to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(v.get("error").is_some());
}

#[tokio::test]
async fn no_keys_ai_topic_returns_degraded_but_complete_report() {
    let (status, v) = post_analyze(
        json!({ "topic": "artificial intelligence", "timeframe": "30d" }).to_string(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(v["dataStatus"]["googleTrends"], "mock");
    assert_eq!(v["dataStatus"]["socialMedia"], "mock");
    assert_eq!(v["dataStatus"]["news"], "error");
    assert_eq!(v["dataStatus"]["aiConversations"], "mock");

    let velocity = v["trendVelocity"].as_u64().unwrap();
    assert!((60..=100).contains(&velocity), "velocity {velocity}");

    let sources: Vec<&str> = v["dataSources"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s.as_str().unwrap())
        .collect();
    assert!(!sources.iter().any(|s| s.starts_with("News")));
    assert!(sources.contains(&"Google Trends (simulated)"));

    assert!(!v["insights"].as_array().unwrap().is_empty());
    assert_eq!(v["synthesis"], "fallback");
    assert_eq!(v["timeframe"], "30d");
    assert!(v["statusMessages"]["news"]
        .as_str()
        .unwrap()
        .contains("NEWS_API_KEY"));
}

#[tokio::test]
async fn report_carries_every_contract_field() {
    let (status, v) = post_analyze(
        json!({ "topic": "sourdough starter", "industry": "food", "timeframe": "7d" }).to_string(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    for key in [
        "topic",
        "industry",
        "timeframe",
        "trendVelocity",
        "aiEngagementScore",
        "queryVolume",
        "forecastConfidence",
        "topicClustering",
        "relatedTopics",
        "insights",
        "dataSources",
        "dataStatus",
        "statusMessages",
        "healthLog",
        "synthesis",
        "sources",
        "generatedAt",
    ] {
        assert!(v.get(key).is_some(), "missing '{key}'");
    }
    for score in ["trendVelocity", "aiEngagementScore", "queryVolume", "forecastConfidence"] {
        assert!(v[score].as_u64().unwrap() <= 100, "{score} out of range");
    }
    let series = v["sources"]["googleTrends"]["payload"]["timeSeries"]
        .as_array()
        .unwrap();
    assert!(!series.is_empty() && series.len() <= 7);
    assert!(v["topicClustering"].as_array().unwrap().len() <= 5);
    assert_eq!(v["healthLog"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn same_topic_gives_same_synthetic_scores() {
    let body = json!({ "topic": "heat pumps" }).to_string();
    let (_, a) = post_analyze(body.clone()).await;
    let (_, b) = post_analyze(body).await;
    assert_eq!(a["trendVelocity"], b["trendVelocity"]);
    assert_eq!(a["queryVolume"], b["queryVolume"]);
    assert_eq!(a["relatedTopics"], b["relatedTopics"]);
}
