//! Basel-Stadt waste collection proxy (data.bs.ch dataset 100096).
//!
//! The upstream dataset changes a handful of times per year, so results
//! are cached for six hours per zone. Stale data is kept as a fallback
//! when the upstream is unreachable.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::WasteConfig;
use crate::routes::AppError;
use crate::state::AppState;

const WASTE_API: &str = "https://data.bs.ch/api/explore/v2.1/catalog/datasets/100096/records";

const WEEKDAYS_DE: [&str; 7] = [
    "Montag",
    "Dienstag",
    "Mittwoch",
    "Donnerstag",
    "Freitag",
    "Samstag",
    "Sonntag",
];
const WEEKDAYS_DE_SHORT: [&str; 7] = ["Mo", "Di", "Mi", "Do", "Fr", "Sa", "So"];
const MONTHS_DE: [&str; 12] = [
    "Januar",
    "Februar",
    "März",
    "April",
    "Mai",
    "Juni",
    "Juli",
    "August",
    "September",
    "Oktober",
    "November",
    "Dezember",
];
const MONTHS_DE_SHORT: [&str; 12] = [
    "Jan", "Feb", "Mär", "Apr", "Mai", "Jun", "Jul", "Aug", "Sep", "Okt", "Nov", "Dez",
];

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/waste", get(get_waste))
        .route("/api/waste/config", post(update_waste))
        .route("/api/waste/zones", get(list_zones))
        .route("/api/waste/refresh", post(refresh_waste))
}

/// One collection date as served to the dashboard.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WastePickup {
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: String,
    pub zone: String,
    pub area: String,
}

/// Cached upstream data, valid for six hours per zone.
#[derive(Default)]
pub struct WasteCache {
    pickups: Vec<WastePickup>,
    zone: String,
    fetched_at: Option<DateTime<Utc>>,
}

impl WasteCache {
    fn is_fresh(&self, zone: &str, now: DateTime<Utc>) -> bool {
        !self.pickups.is_empty()
            && self.zone == zone
            && self
                .fetched_at
                .is_some_and(|fetched| now - fetched < Duration::hours(6))
    }

    fn update(&mut self, pickups: Vec<WastePickup>, zone: &str, now: DateTime<Utc>) {
        self.pickups = pickups;
        self.zone = zone.to_string();
        self.fetched_at = Some(now);
    }

    pub fn invalidate(&mut self) {
        self.pickups.clear();
        self.zone.clear();
        self.fetched_at = None;
    }
}

// Upstream shapes.

#[derive(Deserialize)]
struct WasteRecords {
    #[serde(default)]
    results: Vec<WasteRecord>,
}

#[derive(Deserialize)]
struct WasteRecord {
    #[serde(default)]
    termin: Option<String>,
    #[serde(default)]
    art: Option<String>,
    #[serde(default)]
    zone: Option<String>,
    #[serde(default)]
    gebiet: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WasteReply {
    enabled: bool,
    zone: String,
    reminders: Vec<PickupView>,
    today_items: Vec<PickupView>,
    upcoming: Vec<UpcomingView>,
    total_loaded: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_update: Option<DateTime<Utc>>,
}

impl WasteReply {
    fn disabled() -> Self {
        WasteReply {
            enabled: false,
            zone: String::new(),
            reminders: Vec::new(),
            today_items: Vec::new(),
            upcoming: Vec::new(),
            total_loaded: 0,
            last_update: None,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PickupView {
    #[serde(flatten)]
    pickup: WastePickup,
    date_formatted: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpcomingView {
    #[serde(flatten)]
    pickup: WastePickup,
    date_formatted: String,
    days_until: i64,
}

/// GET /api/waste
async fn get_waste(State(state): State<AppState>) -> Result<Json<WasteReply>, AppError> {
    let waste = state.store.read().await.config().waste.clone();
    if !waste.enabled {
        return Ok(Json(WasteReply::disabled()));
    }

    let now = Utc::now();
    let today = now.date_naive();

    let mut cache = state.waste_cache.lock().await;

    if !cache.is_fresh(&waste.zone, now) {
        match fetch_pickups(&state.http, &waste.zone, today.year()).await {
            Ok(pickups) => {
                info!(count = pickups.len(), zone = %waste.zone, "loaded waste collection dates");
                cache.update(pickups, &waste.zone, now);
            }
            Err(err) => {
                // Stale data beats an empty widget.
                warn!(%err, "waste upstream failed, serving cached data");
            }
        }
    }

    let filtered = upcoming_pickups(&cache.pickups, &waste.show_types, today);
    let reminder_date = today + Duration::days(i64::from(waste.reminder_days_before));

    let reminders = filtered
        .iter()
        .filter(|p| p.date == reminder_date)
        .map(|p| PickupView {
            pickup: p.clone(),
            date_formatted: format_date_long(p.date),
        })
        .collect();

    let today_items = filtered
        .iter()
        .filter(|p| p.date == today)
        .map(|p| PickupView {
            pickup: p.clone(),
            date_formatted: "Heute".to_string(),
        })
        .collect();

    let upcoming = filtered
        .iter()
        .take(3)
        .map(|p| UpcomingView {
            pickup: p.clone(),
            date_formatted: format_date_short(p.date),
            days_until: (p.date - today).num_days(),
        })
        .collect();

    Ok(Json(WasteReply {
        enabled: true,
        zone: waste.zone,
        reminders,
        today_items,
        upcoming,
        total_loaded: cache.pickups.len(),
        last_update: cache.fetched_at,
    }))
}

async fn fetch_pickups(
    http: &reqwest::Client,
    zone: &str,
    year: i32,
) -> anyhow::Result<Vec<WastePickup>> {
    let records: WasteRecords = http
        .get(WASTE_API)
        .query(&[
            ("limit", "100".to_string()),
            ("refine", format!("zone:\"{zone}\"")),
            ("refine", format!("termin:\"{year}\"")),
            ("order_by", "termin".to_string()),
        ])
        .header("Accept", "application/json")
        .header("User-Agent", "famdash/0.1")
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    let pickups = records
        .results
        .into_iter()
        .filter_map(|record| {
            let date = NaiveDate::parse_from_str(record.termin.as_deref()?, "%Y-%m-%d").ok()?;
            Some(WastePickup {
                date,
                kind: record.art.unwrap_or_else(|| "Unbekannt".to_string()),
                zone: record.zone.unwrap_or_default(),
                area: record.gebiet.unwrap_or_default(),
            })
        })
        .collect();

    Ok(pickups)
}

/// Today's and future pickups matching the configured types, sorted by
/// date. Type matching is a case-insensitive substring test: the API
/// reports "Papierabfuhr" for the configured "Papier".
fn upcoming_pickups(
    pickups: &[WastePickup],
    show_types: &[String],
    today: NaiveDate,
) -> Vec<WastePickup> {
    let mut filtered: Vec<WastePickup> = pickups
        .iter()
        .filter(|pickup| pickup.date >= today)
        .filter(|pickup| {
            show_types
                .iter()
                .any(|wanted| pickup.kind.to_lowercase().contains(&wanted.to_lowercase()))
        })
        .cloned()
        .collect();

    filtered.sort_by_key(|pickup| pickup.date);
    filtered
}

/// "Montag, 9. März"
fn format_date_long(date: NaiveDate) -> String {
    format!(
        "{}, {}. {}",
        WEEKDAYS_DE[date.weekday().num_days_from_monday() as usize],
        date.day(),
        MONTHS_DE[date.month0() as usize]
    )
}

/// "Mo 9. Mär"
fn format_date_short(date: NaiveDate) -> String {
    format!(
        "{} {}. {}",
        WEEKDAYS_DE_SHORT[date.weekday().num_days_from_monday() as usize],
        date.day(),
        MONTHS_DE_SHORT[date.month0() as usize]
    )
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WasteUpdate {
    pub enabled: Option<bool>,
    pub zone: Option<String>,
    pub reminder_days_before: Option<u32>,
    pub show_types: Option<Vec<String>>,
}

#[derive(Serialize)]
pub struct WasteUpdateResponse {
    pub success: bool,
    pub waste: WasteConfig,
}

/// POST /api/waste/config - a zone change invalidates the cache.
async fn update_waste(
    State(state): State<AppState>,
    Json(update): Json<WasteUpdate>,
) -> Result<Json<WasteUpdateResponse>, AppError> {
    let mut store = state.store.write().await;
    let waste = &mut store.config_mut().waste;

    if let Some(enabled) = update.enabled {
        waste.enabled = enabled;
    }
    if let Some(zone) = update.zone {
        waste.zone = zone.to_uppercase();
        state.waste_cache.lock().await.invalidate();
    }
    if let Some(days) = update.reminder_days_before {
        waste.reminder_days_before = days;
    }
    if let Some(types) = update.show_types {
        waste.show_types = types;
    }
    store.save()?;

    Ok(Json(WasteUpdateResponse {
        success: true,
        waste: store.config().waste.clone(),
    }))
}

#[derive(Serialize)]
pub struct WasteZone {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

/// GET /api/waste/zones - the Basel-Stadt collection zones.
async fn list_zones() -> Json<Vec<WasteZone>> {
    let zones = vec![
        WasteZone { id: "A", name: "Zone A", description: "Altstadt Grossbasel, Vorstädte, Am Ring" },
        WasteZone { id: "B", name: "Zone B", description: "Clara, Wettstein, Hirzbrunnen" },
        WasteZone { id: "C", name: "Zone C", description: "Breite, St. Alban, Gundeldingen" },
        WasteZone { id: "D", name: "Zone D", description: "Bruderholz, Bachletten" },
        WasteZone { id: "E", name: "Zone E", description: "Gotthelf, Iselin, St. Johann" },
        WasteZone { id: "F", name: "Zone F", description: "Matthäus, Klybeck, Kleinhüningen" },
        WasteZone { id: "G", name: "Zone G", description: "Rosental, Erlenmatt" },
        WasteZone { id: "GUF", name: "Zone GUF", description: "Rosental Unterflur" },
        WasteZone { id: "H", name: "Zone H", description: "Riehen, Bettingen" },
    ];
    Json(zones)
}

#[derive(Serialize)]
pub struct RefreshResponse {
    pub success: bool,
    pub message: &'static str,
}

/// POST /api/waste/refresh - manual cache clear.
async fn refresh_waste(State(state): State<AppState>) -> Json<RefreshResponse> {
    state.waste_cache.lock().await.invalidate();
    info!("waste cache cleared manually");
    Json(RefreshResponse {
        success: true,
        message: "Cache cleared",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pickup(date: (i32, u32, u32), kind: &str) -> WastePickup {
        WastePickup {
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            kind: kind.to_string(),
            zone: "A".to_string(),
            area: String::new(),
        }
    }

    fn show_types() -> Vec<String> {
        vec!["Kehricht".to_string(), "Papier".to_string()]
    }

    #[test]
    fn past_dates_and_unwanted_types_are_filtered_out() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let pickups = vec![
            pickup((2026, 3, 9), "Kehrichtabfuhr"),
            pickup((2026, 3, 11), "Kehrichtabfuhr"),
            pickup((2026, 3, 12), "Christbaumabfuhr"),
            pickup((2026, 3, 10), "Papierabfuhr"),
        ];

        let filtered = upcoming_pickups(&pickups, &show_types(), today);

        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered[0].kind, "Papierabfuhr", "sorted by date, today first");
        assert_eq!(filtered[1].kind, "Kehrichtabfuhr");
    }

    #[test]
    fn type_matching_is_case_insensitive_substring() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let pickups = vec![pickup((2026, 3, 11), "GRÜNGUTABFUHR")];

        let filtered = upcoming_pickups(&pickups, &["grüngut".to_string()], today);
        assert_eq!(filtered.len(), 1);
    }

    #[test]
    fn german_date_formatting() {
        // 2026-03-09 is a Monday.
        let date = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
        assert_eq!(format_date_long(date), "Montag, 9. März");
        assert_eq!(format_date_short(date), "Mo 9. Mär");
    }

    #[test]
    fn cache_freshness_depends_on_zone_and_age() {
        let now = Utc::now();
        let mut cache = WasteCache::default();
        cache.update(vec![pickup((2026, 3, 11), "Kehrichtabfuhr")], "A", now);

        assert!(cache.is_fresh("A", now));
        assert!(!cache.is_fresh("B", now), "zone change must invalidate");
        assert!(
            !cache.is_fresh("A", now + Duration::hours(7)),
            "six-hour TTL must expire"
        );

        cache.invalidate();
        assert!(!cache.is_fresh("A", now));
    }
}
