//! Calendar subscription management.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, post},
};
use famdash_core::CalendarKind;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::CalendarEntry;
use crate::routes::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/calendars/add", post(add_calendar))
        .route("/api/calendars/{kind}/{id}", delete(delete_calendar))
}

#[derive(Deserialize)]
pub struct AddCalendarRequest {
    #[serde(rename = "type")]
    pub kind: CalendarKind,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Serialize)]
pub struct AddCalendarResponse {
    pub success: bool,
    pub calendar: CalendarEntry,
}

/// POST /api/calendars/add - append an enabled subscription with a fresh id.
async fn add_calendar(
    State(state): State<AppState>,
    Json(req): Json<AddCalendarRequest>,
) -> Result<Json<AddCalendarResponse>, AppError> {
    let entry = CalendarEntry {
        id: Uuid::new_v4().to_string(),
        name: req.name,
        url: req.url,
        color: req.color,
        enabled: true,
    };

    let mut store = state.store.write().await;
    store
        .config_mut()
        .calendars
        .list_mut(req.kind)
        .push(entry.clone());
    store.save()?;

    Ok(Json(AddCalendarResponse {
        success: true,
        calendar: entry,
    }))
}

#[derive(Serialize)]
pub struct DeleteResponse {
    pub success: bool,
}

/// DELETE /api/calendars/:kind/:id
async fn delete_calendar(
    State(state): State<AppState>,
    Path((kind, id)): Path<(CalendarKind, String)>,
) -> Result<Json<DeleteResponse>, AppError> {
    let mut store = state.store.write().await;
    store
        .config_mut()
        .calendars
        .list_mut(kind)
        .retain(|entry| entry.id != id);
    store.save()?;

    Ok(Json(DeleteResponse { success: true }))
}
