// =============================================================================
// Dashboard API — REST endpoints and WebSocket push feed
// =============================================================================

pub mod rest;
pub mod ws;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::error::SimError;

/// Errors surfaced to API clients as JSON `{ "error": ... }` bodies.
#[derive(Debug)]
pub enum ApiError {
    /// No refresh pass has been published yet.
    NotReady,
    Sim(SimError),
}

impl From<SimError> for ApiError {
    fn from(e: SimError) -> Self {
        Self::Sim(e)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::NotReady => StatusCode::SERVICE_UNAVAILABLE,
            Self::Sim(SimError::UnknownPair(_)) => StatusCode::NOT_FOUND,
            Self::Sim(SimError::UnknownTimeframe(_)) => StatusCode::BAD_REQUEST,
            Self::Sim(SimError::NonFinitePrice { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            Self::NotReady => "market data not published yet".to_string(),
            Self::Sim(e) => e.to_string(),
        };
        (self.status(), Json(serde_json::json!({ "error": message }))).into_response()
    }
}
