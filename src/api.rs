use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

use crate::error::QueryError;
use crate::query::{Timeframe, TrendQuery};
use crate::service::TrendAggregationService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<TrendAggregationService>,
}

impl AppState {
    pub fn new(service: TrendAggregationService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/trends/analyze", post(analyze))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Alias kept for callers that build the router by the short name.
pub fn router(state: AppState) -> Router {
    create_router(state)
}

/// Loose request shape; field types are checked by hand so every bad input
/// maps to the same `400 {"error": ...}` body.
#[derive(serde::Deserialize)]
struct AnalyzeReq {
    #[serde(default)]
    topic: Option<Value>,
    #[serde(default)]
    industry: Option<String>,
    #[serde(default)]
    timeframe: Option<String>,
}

fn bad_request(msg: impl Into<String>) -> Response {
    let msg = msg.into();
    tracing::debug!(error = %msg, "rejected analyze request");
    (StatusCode::BAD_REQUEST, Json(json!({ "error": msg }))).into_response()
}

fn parse_query(req: AnalyzeReq) -> Result<TrendQuery, QueryError> {
    let topic = match req.topic {
        Some(Value::String(s)) => s,
        _ => return Err(QueryError::EmptyTopic),
    };
    let timeframe = match req.timeframe.as_deref() {
        None => Timeframe::default(),
        Some(s) => s.parse::<Timeframe>()?,
    };
    TrendQuery::new(topic, req.industry.as_deref(), timeframe)
}

async fn analyze(
    State(state): State<AppState>,
    body: Result<Json<AnalyzeReq>, JsonRejection>,
) -> Response {
    let Json(req) = match body {
        Ok(b) => b,
        Err(rej) => return bad_request(format!("invalid request body: {}", rej.body_text())),
    };
    let query = match parse_query(req) {
        Ok(q) => q,
        Err(e) => return bad_request(e.to_string()),
    };
    Json(state.service.analyze(query).await).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(v: Value) -> AnalyzeReq {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn topic_must_be_a_non_blank_string() {
        assert_eq!(parse_query(req(json!({}))), Err(QueryError::EmptyTopic));
        assert_eq!(
            parse_query(req(json!({ "topic": 42 }))),
            Err(QueryError::EmptyTopic)
        );
        assert_eq!(
            parse_query(req(json!({ "topic": "  " }))),
            Err(QueryError::EmptyTopic)
        );
    }

    #[test]
    fn timeframe_defaults_and_validates() {
        let q = parse_query(req(json!({ "topic": "ev charging", "industry": "" }))).unwrap();
        assert_eq!(q.timeframe(), Timeframe::Month);
        assert_eq!(q.industry(), None);

        let q = parse_query(req(json!({ "topic": "x", "timeframe": "1y" }))).unwrap();
        assert_eq!(q.timeframe(), Timeframe::Year);

        assert!(matches!(
            parse_query(req(json!({ "topic": "x", "timeframe": "2w" }))),
            Err(QueryError::BadTimeframe(_))
        ));
    }
}
