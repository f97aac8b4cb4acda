//! The aggregated calendar events endpoint.

use axum::{Json, Router, extract::State, routing::get};
use chrono::Utc;
use famdash_core::{EventInstance, Window, aggregate_events};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/events", get(list_events))
}

/// GET /api/events - expand every enabled calendar into the viewing window.
///
/// Always answers 200: failed sources are skipped inside the aggregator,
/// so the worst case is an empty list.
async fn list_events(State(state): State<AppState>) -> Json<Vec<EventInstance>> {
    let sources = state.store.read().await.config().calendars.sources();
    let window = Window::around(Utc::now());

    let instances = aggregate_events(&sources, &state.fetcher, &window).await;
    Json(instances)
}
