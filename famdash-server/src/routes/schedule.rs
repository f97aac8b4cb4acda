//! School timetable endpoints.
//!
//! The dashboard shows today's lessons per child; on weekends it already
//! shows Monday so the evening prep view is useful.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post, put},
};
use chrono::{Datelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::config::{DaySchedule, ScheduleChild, ScheduleConfig, default_child_color};
use crate::routes::AppError;
use crate::state::AppState;

const WEEKDAY_KEYS: [&str; 7] = [
    "sunday", "monday", "tuesday", "wednesday", "thursday", "friday", "saturday",
];
const WEEKDAY_NAMES_DE: [&str; 7] = [
    "Sonntag", "Montag", "Dienstag", "Mittwoch", "Donnerstag", "Freitag", "Samstag",
];

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/schedule", get(get_schedule))
        .route("/api/schedule/config", post(update_schedule))
        .route("/api/schedule/child/add", post(add_child))
        .route("/api/schedule/child/{id}", put(update_child).delete(delete_child))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleReply {
    enabled: bool,
    day_name: &'static str,
    day_key: &'static str,
    is_weekend: bool,
    children: Vec<ChildDay>,
}

#[derive(Serialize)]
struct ChildDay {
    id: String,
    name: String,
    color: String,
    schedule: Option<DaySchedule>,
}

/// The weekday to display: the current one, or Monday on weekends.
fn display_day(weekday: Weekday) -> (usize, bool) {
    let index = weekday.num_days_from_sunday() as usize;
    let is_weekend = matches!(weekday, Weekday::Sat | Weekday::Sun);
    if is_weekend { (1, true) } else { (index, false) }
}

/// GET /api/schedule
async fn get_schedule(State(state): State<AppState>) -> Json<ScheduleReply> {
    let schedule = state.store.read().await.config().schedule.clone();

    if !schedule.enabled {
        return Json(ScheduleReply {
            enabled: false,
            day_name: "",
            day_key: "",
            is_weekend: false,
            children: Vec::new(),
        });
    }

    let (day, is_weekend) = display_day(Utc::now().weekday());
    let day_key = WEEKDAY_KEYS[day];

    let children = schedule
        .children
        .iter()
        .map(|child| ChildDay {
            id: child.id.clone(),
            name: child.name.clone(),
            color: child.color.clone(),
            schedule: child.timetable.get(day_key).cloned(),
        })
        .collect();

    Json(ScheduleReply {
        enabled: true,
        day_name: WEEKDAY_NAMES_DE[day],
        day_key,
        is_weekend,
        children,
    })
}

#[derive(Deserialize)]
pub struct ScheduleUpdate {
    pub enabled: Option<bool>,
}

#[derive(Serialize)]
pub struct ScheduleUpdateResponse {
    pub success: bool,
    pub schedule: ScheduleConfig,
}

/// POST /api/schedule/config
async fn update_schedule(
    State(state): State<AppState>,
    Json(update): Json<ScheduleUpdate>,
) -> Result<Json<ScheduleUpdateResponse>, AppError> {
    let mut store = state.store.write().await;
    if let Some(enabled) = update.enabled {
        store.config_mut().schedule.enabled = enabled;
    }
    store.save()?;

    Ok(Json(ScheduleUpdateResponse {
        success: true,
        schedule: store.config().schedule.clone(),
    }))
}

#[derive(Deserialize)]
pub struct AddChildRequest {
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Serialize)]
pub struct ChildResponse {
    pub success: bool,
    pub child: ScheduleChild,
}

/// POST /api/schedule/child/add
async fn add_child(
    State(state): State<AppState>,
    Json(req): Json<AddChildRequest>,
) -> Result<Json<ChildResponse>, AppError> {
    if req.name.is_empty() {
        return Err(AppError::bad_request("name required"));
    }

    let child = ScheduleChild {
        id: Uuid::new_v4().to_string(),
        name: req.name,
        color: req.color.unwrap_or_else(default_child_color),
        timetable: BTreeMap::new(),
    };

    let mut store = state.store.write().await;
    store.config_mut().schedule.children.push(child.clone());
    store.save()?;

    Ok(Json(ChildResponse {
        success: true,
        child,
    }))
}

#[derive(Deserialize)]
pub struct UpdateChildRequest {
    pub name: Option<String>,
    pub color: Option<String>,
    pub timetable: Option<BTreeMap<String, DaySchedule>>,
}

/// PUT /api/schedule/child/:id
async fn update_child(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateChildRequest>,
) -> Result<Json<ChildResponse>, AppError> {
    let mut store = state.store.write().await;

    let child = store
        .config_mut()
        .schedule
        .children
        .iter_mut()
        .find(|child| child.id == id)
        .ok_or_else(|| AppError::not_found("child not found"))?;

    if let Some(name) = req.name {
        child.name = name;
    }
    if let Some(color) = req.color {
        child.color = color;
    }
    if let Some(timetable) = req.timetable {
        child.timetable = timetable;
    }
    let child = child.clone();
    store.save()?;

    Ok(Json(ChildResponse {
        success: true,
        child,
    }))
}

#[derive(Serialize)]
pub struct DeleteChildResponse {
    pub success: bool,
}

/// DELETE /api/schedule/child/:id
async fn delete_child(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteChildResponse>, AppError> {
    let mut store = state.store.write().await;
    store
        .config_mut()
        .schedule
        .children
        .retain(|child| child.id != id);
    store.save()?;

    Ok(Json(DeleteChildResponse { success: true }))
}
