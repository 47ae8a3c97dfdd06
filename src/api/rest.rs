// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// All endpoints live under `/api/v1/`. Market views are served from the last
// published snapshot, so every response for one version describes the same
// pair at the same instant. Before the first publication they answer 503.
//
// CORS is configured permissively for development; tighten `allowed_origins`
// in production.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::api::ApiError;
use crate::app_state::{AppState, MarketSnapshot};
use crate::market_data::Timeframe;

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/pairs", get(pairs))
        // ── Published market views ──────────────────────────────────
        .route("/api/v1/state", get(full_state))
        .route("/api/v1/orderbook", get(orderbook))
        .route("/api/v1/trades", get(trades))
        .route("/api/v1/positions", get(positions))
        .route("/api/v1/klines", get(klines))
        // ── Selection ───────────────────────────────────────────────
        .route("/api/v1/select-pair", post(select_pair))
        .route("/api/v1/timeframe", post(set_timeframe))
        // ── WebSocket (handled separately in ws module but mounted here) ─
        .route("/api/v1/ws", get(crate::api::ws::ws_handler))
        // ── Middleware & State ───────────────────────────────────────
        .layer(cors)
        .with_state(state)
}

fn published(state: &AppState) -> Result<Arc<MarketSnapshot>, ApiError> {
    state.snapshot().ok_or(ApiError::NotReady)
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    state_version: u64,
    server_time: i64,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let resp = HealthResponse {
        status: "ok",
        state_version: state.current_state_version(),
        server_time: state.now_ms(),
    };
    Json(resp)
}

// =============================================================================
// Pair catalogue
// =============================================================================

async fn pairs(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.pairs())
}

// =============================================================================
// Market views
// =============================================================================

async fn full_state(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let snapshot = published(&state)?;
    Ok(Json(state.view(Some(&snapshot))).into_response())
}

async fn orderbook(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let snapshot = published(&state)?;
    Ok(Json(snapshot.order_book.clone()))
}

async fn trades(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let snapshot = published(&state)?;
    Ok(Json(snapshot.trades.clone()))
}

async fn positions(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let snapshot = published(&state)?;
    Ok(Json(snapshot.positions.clone()))
}

#[derive(Deserialize)]
struct KlinesQuery {
    timeframe: Option<String>,
}

/// Candles of the published pair for `?timeframe=`, or for the selected
/// chart timeframe when the parameter is absent.
async fn klines(
    State(state): State<Arc<AppState>>,
    Query(query): Query<KlinesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let timeframe = match query.timeframe {
        Some(raw) => raw.parse::<Timeframe>()?,
        None => state.selected_timeframe(),
    };
    let snapshot = published(&state)?;
    let series = snapshot
        .klines
        .get(timeframe)
        .cloned()
        .ok_or(ApiError::NotReady)?;
    Ok(Json(series))
}

// =============================================================================
// Selection
// =============================================================================

#[derive(Deserialize)]
struct SelectPairRequest {
    symbol: String,
}

#[derive(Serialize)]
struct SelectionResponse {
    symbol: String,
    timeframe: Timeframe,
    state_version: u64,
}

async fn select_pair(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SelectPairRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let snapshot = state.select_pair(&req.symbol)?;
    info!(symbol = %snapshot.pair.symbol, "pair changed via API");

    Ok(Json(SelectionResponse {
        symbol: snapshot.pair.symbol.clone(),
        timeframe: state.selected_timeframe(),
        state_version: state.current_state_version(),
    }))
}

#[derive(Deserialize)]
struct TimeframeRequest {
    timeframe: String,
}

async fn set_timeframe(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TimeframeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let timeframe: Timeframe = req.timeframe.parse()?;
    state.set_timeframe(timeframe);

    Ok(Json(SelectionResponse {
        symbol: state.selected_pair().symbol,
        timeframe,
        state_version: state.current_state_version(),
    }))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_state::tests::test_state;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    async fn call(state: &Arc<AppState>, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let resp = router(Arc::clone(state)).oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, body)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_and_pairs() {
        let state = Arc::new(test_state());
        let (status, body) = call(&state, get("/api/v1/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");

        let (status, body) = call(&state, get("/api/v1/pairs")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 6);
    }

    #[tokio::test]
    async fn market_views_unavailable_before_first_publication() {
        let state = Arc::new(test_state());
        for uri in ["/api/v1/state", "/api/v1/orderbook", "/api/v1/trades", "/api/v1/klines"] {
            let (status, body) = call(&state, get(uri)).await;
            assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE, "{uri}");
            assert!(body["error"].is_string());
        }
    }

    #[tokio::test]
    async fn market_views_after_refresh() {
        let state = Arc::new(test_state());
        state.refresh().unwrap();

        let (status, body) = call(&state, get("/api/v1/state")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["market"]["pair"]["symbol"], "BTC-USD");

        let (_, book) = call(&state, get("/api/v1/orderbook")).await;
        assert_eq!(book["asks"].as_array().unwrap().len(), 10);

        let (_, tape) = call(&state, get("/api/v1/trades")).await;
        assert_eq!(tape["trades"].as_array().unwrap().len(), 10);

        let (_, positions) = call(&state, get("/api/v1/positions")).await;
        assert_eq!(positions.as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn klines_by_timeframe() {
        let state = Arc::new(test_state());
        state.refresh().unwrap();

        let (status, body) = call(&state, get("/api/v1/klines?timeframe=1h")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["timeframe"], "1h");
        assert_eq!(body["candles"].as_array().unwrap().len(), 30);

        let (_, body) = call(&state, get("/api/v1/klines")).await;
        assert_eq!(body["timeframe"], "15m");

        let (status, _) = call(&state, get("/api/v1/klines?timeframe=2h")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn select_pair_switches_published_market() {
        let state = Arc::new(test_state());
        state.refresh().unwrap();

        let req = post_json("/api/v1/select-pair", serde_json::json!({ "symbol": "ARB-USD" }));
        let (status, body) = call(&state, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["symbol"], "ARB-USD");

        let (_, tape) = call(&state, get("/api/v1/trades")).await;
        assert_eq!(tape["symbol"], "ARB-USD");

        let req = post_json("/api/v1/select-pair", serde_json::json!({ "symbol": "XYZ-USD" }));
        let (status, _) = call(&state, req).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn timeframe_selection() {
        let state = Arc::new(test_state());

        let req = post_json("/api/v1/timeframe", serde_json::json!({ "timeframe": "4h" }));
        let (status, body) = call(&state, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["timeframe"], "4h");
        assert_eq!(state.selected_timeframe(), Timeframe::H4);

        let req = post_json("/api/v1/timeframe", serde_json::json!({ "timeframe": "3m" }));
        let (status, _) = call(&state, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(state.selected_timeframe(), Timeframe::H4);
    }
}
