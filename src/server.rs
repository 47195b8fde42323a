use axum::{
    extract::{DefaultBodyLimit, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::error::AnalysisError;
use crate::handlers::Analyzer;
use crate::models::{non_empty, AnalyzeRequestBody, AnalyzeResponse, ErrorBody};

pub struct AppState {
    pub analyzer: Arc<Analyzer>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelsQuery {
    api_key: Option<String>,
}

pub fn create_router(analyzer: Arc<Analyzer>) -> Router {
    let static_dir = analyzer.config().static_dir.clone();
    let body_limit = analyzer.config().body_limit_bytes;
    let state = Arc::new(AppState { analyzer });

    Router::new()
        .route("/api/analyze-image", post(analyze_handler))
        .route("/api/models/gemini", get(gemini_models_handler))
        .route("/health", get(health_check))
        .fallback_service(ServeDir::new(static_dir))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

impl IntoResponse for AnalysisError {
    fn into_response(self) -> Response {
        let status = match &self {
            e if e.is_client_error() => StatusCode::BAD_REQUEST,
            AnalysisError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            log::error!("❌ Analysis failed: {}", self);
        } else {
            log::warn!("⚠️ Rejected request: {}", self);
        }

        let body = ErrorBody {
            error: self.to_string(),
            code: self.code().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// POST /api/analyze-image
async fn analyze_handler(
    State(state): State<Arc<AppState>>,
    body: String,
) -> Result<Json<AnalyzeResponse>, AnalysisError> {
    log::info!("📨 Analyze request received ({} bytes)", body.len());

    // Parsed by hand: a bad body gets the JSON error shape, not axum's plain-text rejection
    let payload: AnalyzeRequestBody = serde_json::from_str(&body)
        .map_err(|e| AnalysisError::InvalidRequest(format!("body is not valid JSON: {}", e)))?;
    let request = payload.into_request()?;

    let result = state.analyzer.analyze(request).await?;
    Ok(Json(AnalyzeResponse {
        provider: result.provider,
        result,
    }))
}

/// GET /api/models/gemini
async fn gemini_models_handler(
    Query(query): Query<ModelsQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, AnalysisError> {
    let api_key = non_empty(query.api_key);
    let models = state.analyzer.gemini_models(api_key.as_deref()).await?;
    log::info!("📋 {} Gemini models support generateContent", models.len());
    Ok(Json(serde_json::json!({ "models": models })))
}

async fn health_check() -> &'static str {
    "OK"
}
