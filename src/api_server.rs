// Axum API Server Module
//
// Purpose: HTTP surface for crop recommendation and production accumulation
// Endpoints used by the form client: POST /predict_crop, POST /add_production

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};

use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::TraceLayer,
};

use serde_json::Value;
use std::sync::Arc;

use crate::classifier::{Classifier, ModelArtifact};
use crate::config::ServerConfig;
use crate::crops::{is_known_crop, CROP_NAMES};
use crate::error::{RecommenderError, ValidationError};
use crate::features::{parse_real, SoilClimateInput};
use crate::production_store::{self, ProductionStore};
use crate::recommender::{CropRecommender, RecommenderSettings};

// ============================================================================
// Application State
// ============================================================================

#[derive(Clone)]
pub struct AppState {
    pub recommender: Arc<CropRecommender>,
}

impl AppState {
    /// Load the classifier and connect the store. Both are fatal on failure.
    pub async fn new(config: &ServerConfig) -> anyhow::Result<Self> {
        tracing::info!("Loading classifier artifact from {:?}...", config.model_path);
        let classifier: Arc<dyn Classifier> = Arc::new(ModelArtifact::load(&config.model_path)?);

        tracing::info!("Connecting production store ({:?})...", config.store);
        let store = production_store::connect(&config.store).await?;

        Ok(Self::from_parts(classifier, store, config.recommender.clone()))
    }

    pub fn from_parts(
        classifier: Arc<dyn Classifier>,
        store: Arc<dyn ProductionStore>,
        settings: RecommenderSettings,
    ) -> Self {
        Self {
            recommender: Arc::new(CropRecommender::new(classifier, store, settings)),
        }
    }
}

// ============================================================================
// Router
// ============================================================================

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))

        // Recommendation + accumulation
        .route("/predict_crop", post(predict_crop))
        .route("/add_production", post(add_production))

        // Read-only helpers
        .route("/api/crops", get(list_crops))
        .route("/api/production/:crop", get(get_production))

        // Middleware (applied in reverse order)
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive()) // Form client is served from another origin
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================================
// Endpoint Handlers
// ============================================================================

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "store": state.recommender.store().name(),
    }))
}

async fn predict_crop(
    State(state): State<AppState>,
    payload: Option<Json<Value>>,
) -> Result<Json<Value>, AppError> {
    let payload = payload.map(|Json(v)| v).unwrap_or(Value::Null);
    let input = SoilClimateInput::from_json(&payload)?;

    tracing::debug!("Recommending crop for {:?}", input);
    let recommendation = state.recommender.recommend(&input).await?;

    Ok(Json(serde_json::to_value(&recommendation).map_err(|e| {
        AppError::Internal(format!("Failed to serialize recommendation: {}", e))
    })?))
}

async fn add_production(
    State(state): State<AppState>,
    payload: Option<Json<Value>>,
) -> Result<Json<Value>, AppError> {
    let payload = payload.map(|Json(v)| v).unwrap_or(Value::Null);
    let fields = match payload.as_object() {
        Some(map) if !map.is_empty() => map,
        _ => return Err(ValidationError::NoData.into()),
    };

    let missing: Vec<String> = ["crop_name", "production_value"]
        .iter()
        .filter(|name| !fields.contains_key(**name))
        .map(|name| name.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ValidationError::MissingFields(missing).into());
    }

    let crop_name = match &fields["crop_name"] {
        Value::String(s) => s.as_str(),
        other => return Err(ValidationError::InvalidLabel(other.to_string()).into()),
    };
    if !is_known_crop(crop_name) {
        return Err(ValidationError::InvalidLabel(crop_name.to_string()).into());
    }
    let production_value =
        parse_real(&fields["production_value"]).ok_or(ValidationError::InvalidValue)?;

    let new_value = state.recommender.accumulate(crop_name, production_value).await?;

    Ok(Json(serde_json::json!({
        "message": format!("Updated production for {}", crop_name),
        "new_value": new_value,
    })))
}

async fn list_crops() -> impl IntoResponse {
    Json(serde_json::json!({
        "count": CROP_NAMES.len(),
        "crops": CROP_NAMES,
    }))
}

async fn get_production(
    State(state): State<AppState>,
    Path(crop): Path<String>,
) -> Result<Json<Value>, AppError> {
    let production = state.recommender.production_of(&crop).await?;
    Ok(Json(serde_json::json!({
        "crop_name": crop,
        "production": production,
    })))
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Internal(String),
    StoreUnavailable(String),
}

impl From<ValidationError> for AppError {
    fn from(e: ValidationError) -> Self {
        AppError::BadRequest(e.to_string())
    }
}

impl From<RecommenderError> for AppError {
    fn from(e: RecommenderError) -> Self {
        match e {
            RecommenderError::Validation(v) => v.into(),
            RecommenderError::Computation(_) => AppError::Internal(e.to_string()),
            RecommenderError::Collaborator(_) => AppError::StoreUnavailable(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::StoreUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
        };

        if status.is_server_error() {
            tracing::error!("{}: {}", status, message);
        }

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
