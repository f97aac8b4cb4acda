//! Configuration read and merge-write endpoints.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde::Serialize;

use crate::config::{ConfigUpdate, DashboardConfig};
use crate::routes::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/config", get(get_config).post(update_config))
}

/// GET /api/config
async fn get_config(State(state): State<AppState>) -> Json<DashboardConfig> {
    Json(state.store.read().await.config().clone())
}

#[derive(Serialize)]
pub struct UpdateConfigResponse {
    pub success: bool,
    pub config: DashboardConfig,
}

/// POST /api/config - shallow-merge the sections present in the body.
async fn update_config(
    State(state): State<AppState>,
    Json(update): Json<ConfigUpdate>,
) -> Result<Json<UpdateConfigResponse>, AppError> {
    let mut store = state.store.write().await;
    store.config_mut().apply(update);
    store.save()?;

    Ok(Json(UpdateConfigResponse {
        success: true,
        config: store.config().clone(),
    }))
}
