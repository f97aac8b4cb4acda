//! Swiss public transport proxy (transport.opendata.ch).
//!
//! Per configured station the next departures are fetched from the
//! station board, with the delay derived from the prognosis. When no
//! stations are configured the nearest three are discovered from the
//! configured coordinates and persisted.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, post},
};
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::TransportStation;
use crate::routes::AppError;
use crate::state::AppState;

const TRANSPORT_API: &str = "https://transport.opendata.ch/v1";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/transport", get(get_departures))
        .route("/api/transport/config", post(update_transport))
        .route("/api/transport/search", get(search_stations))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TransportReply {
    enabled: bool,
    stations: Vec<StationBoard>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_update: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
struct StationBoard {
    station: TransportStation,
    departures: Vec<Departure>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Departure {
    line: String,
    category: String,
    number: String,
    destination: String,
    departure: String,
    departure_time: String,
    actual_departure: String,
    actual_time: String,
    delay: Option<i64>,
    platform: String,
    operator: Option<String>,
}

// Upstream shapes.

#[derive(Deserialize)]
struct LocationsResponse {
    #[serde(default)]
    stations: Vec<TransportStation>,
}

#[derive(Deserialize)]
struct BoardResponse {
    #[serde(default)]
    station: Option<TransportStation>,
    #[serde(default)]
    stationboard: Vec<Journey>,
}

#[derive(Deserialize)]
struct Journey {
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    number: Option<String>,
    #[serde(default)]
    to: Option<String>,
    #[serde(default)]
    operator: Option<String>,
    stop: Stop,
}

#[derive(Deserialize)]
struct Stop {
    #[serde(default)]
    departure: Option<String>,
    #[serde(default)]
    prognosis: Option<Prognosis>,
    #[serde(default)]
    platform: Option<String>,
}

#[derive(Deserialize)]
struct Prognosis {
    #[serde(default)]
    departure: Option<String>,
}

/// GET /api/transport
async fn get_departures(State(state): State<AppState>) -> Result<Json<TransportReply>, AppError> {
    let transport = state.store.read().await.config().transport.clone();

    if !transport.enabled {
        return Ok(Json(TransportReply {
            enabled: false,
            stations: Vec::new(),
            last_update: None,
        }));
    }

    let mut stations = transport.stations.clone();

    if stations.is_empty() {
        stations = discover_stations(&state, transport.lat, transport.lon).await;
    }
    if stations.is_empty() {
        stations = fallback_stations();
    }

    let mut boards = Vec::new();
    for station in stations {
        match fetch_board(&state, &station, transport.limit).await {
            Ok(Some(board)) => boards.push(board),
            Ok(None) => {}
            Err(err) => {
                warn!(station = %station.name, %err, "skipping station board");
            }
        }
    }

    Ok(Json(TransportReply {
        enabled: true,
        stations: boards,
        last_update: Some(Utc::now()),
    }))
}

/// Look up the nearest stations and persist them, so discovery only runs
/// until the first success.
async fn discover_stations(state: &AppState, lat: f64, lon: f64) -> Vec<TransportStation> {
    if lat == 0.0 && lon == 0.0 {
        return Vec::new();
    }

    let response = state
        .http
        .get(format!("{TRANSPORT_API}/locations"))
        .query(&[
            ("x", lat.to_string()),
            ("y", lon.to_string()),
            ("type", "station".to_string()),
        ])
        .send()
        .await
        .and_then(|r| r.error_for_status());

    let locations: LocationsResponse = match response {
        Ok(response) => match response.json().await {
            Ok(locations) => locations,
            Err(err) => {
                warn!(%err, "station discovery returned an unreadable body");
                return Vec::new();
            }
        },
        Err(err) => {
            warn!(%err, "station discovery failed");
            return Vec::new();
        }
    };

    let stations: Vec<TransportStation> = locations.stations.into_iter().take(3).collect();
    if stations.is_empty() {
        return stations;
    }

    let mut store = state.store.write().await;
    store.config_mut().transport.stations = stations.clone();
    if let Err(err) = store.save() {
        warn!(%err, "could not persist discovered stations");
    }
    info!(
        stations = %stations.iter().map(|s| s.name.as_str()).collect::<Vec<_>>().join(", "),
        "discovered nearby stations"
    );

    stations
}

fn fallback_stations() -> Vec<TransportStation> {
    vec![
        TransportStation {
            id: Some("8500096".to_string()),
            name: "Basel, Kannenfeldplatz".to_string(),
            distance: None,
        },
        TransportStation {
            id: Some("8500097".to_string()),
            name: "Basel, Schützenhaus".to_string(),
            distance: None,
        },
    ]
}

async fn fetch_board(
    state: &AppState,
    station: &TransportStation,
    limit: u32,
) -> anyhow::Result<Option<StationBoard>> {
    let station_param = match &station.id {
        Some(id) => ("id", id.clone()),
        None => ("station", station.name.clone()),
    };

    let board: BoardResponse = state
        .http
        .get(format!("{TRANSPORT_API}/stationboard"))
        .query(&[station_param, ("limit", limit.to_string())])
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    if board.stationboard.is_empty() {
        return Ok(None);
    }

    let departures = board
        .stationboard
        .iter()
        .filter_map(build_departure)
        .collect();

    let resolved = board.station.unwrap_or_else(|| station.clone());
    Ok(Some(StationBoard {
        station: TransportStation {
            distance: station.distance,
            ..resolved
        },
        departures,
    }))
}

fn build_departure(journey: &Journey) -> Option<Departure> {
    let planned = parse_departure(journey.stop.departure.as_deref()?)?;

    let actual = journey
        .stop
        .prognosis
        .as_ref()
        .and_then(|p| p.departure.as_deref())
        .and_then(parse_departure);

    let delay = actual.map(|actual| (actual - planned).num_minutes());
    let actual = actual.unwrap_or(planned);

    let category = journey.category.clone().unwrap_or_default();
    let number = journey.number.clone().unwrap_or_default();

    Some(Departure {
        line: format!("{} {}", category, number).trim().to_string(),
        category,
        number,
        destination: journey.to.clone().unwrap_or_default(),
        departure: planned.to_rfc3339(),
        departure_time: planned.format("%H:%M").to_string(),
        actual_departure: actual.to_rfc3339(),
        actual_time: actual.format("%H:%M").to_string(),
        delay,
        platform: journey.stop.platform.clone().unwrap_or_default(),
        operator: journey.operator.clone(),
    })
}

/// The API emits offsets without a colon ("+0200"); accept RFC 3339 too.
fn parse_departure(value: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%z")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(value).ok())
}

#[derive(Deserialize)]
pub struct TransportUpdate {
    pub enabled: Option<bool>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub stations: Option<Vec<TransportStation>>,
    pub limit: Option<u32>,
}

#[derive(Serialize)]
pub struct TransportUpdateResponse {
    pub success: bool,
    pub transport: crate::config::TransportConfig,
}

/// POST /api/transport/config
async fn update_transport(
    State(state): State<AppState>,
    Json(update): Json<TransportUpdate>,
) -> Result<Json<TransportUpdateResponse>, AppError> {
    let mut store = state.store.write().await;
    let transport = &mut store.config_mut().transport;

    if let Some(enabled) = update.enabled {
        transport.enabled = enabled;
    }
    if let Some(lat) = update.lat {
        transport.lat = lat;
    }
    if let Some(lon) = update.lon {
        transport.lon = lon;
    }
    if let Some(stations) = update.stations {
        transport.stations = stations;
    }
    if let Some(limit) = update.limit {
        transport.limit = limit;
    }
    store.save()?;

    Ok(Json(TransportUpdateResponse {
        success: true,
        transport: store.config().transport.clone(),
    }))
}

#[derive(Deserialize)]
pub struct SearchQuery {
    pub query: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

/// GET /api/transport/search - station lookup by name or coordinates.
async fn search_stations(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<Vec<TransportStation>>, AppError> {
    let query = match (&params.query, params.lat, params.lon) {
        (Some(query), _, _) => vec![
            ("query", query.clone()),
            ("type", "station".to_string()),
        ],
        (None, Some(lat), Some(lon)) => vec![
            ("x", lat.to_string()),
            ("y", lon.to_string()),
            ("type", "station".to_string()),
        ],
        _ => return Err(AppError::bad_request("query or coordinates required")),
    };

    let locations: LocationsResponse = state
        .http
        .get(format!("{TRANSPORT_API}/locations"))
        .query(&query)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    Ok(Json(locations.stations))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_offsets_without_colon() {
        let parsed = parse_departure("2026-03-10T08:58:00+0200").expect("should parse");
        assert_eq!(parsed.to_rfc3339(), "2026-03-10T08:58:00+02:00");
    }

    #[test]
    fn delay_comes_from_the_prognosis() {
        let journey = Journey {
            category: Some("Tram".to_string()),
            number: Some("8".to_string()),
            to: Some("Kleinhüningen".to_string()),
            operator: Some("BVB".to_string()),
            stop: Stop {
                departure: Some("2026-03-10T08:58:00+0100".to_string()),
                prognosis: Some(Prognosis {
                    departure: Some("2026-03-10T09:01:00+0100".to_string()),
                }),
                platform: None,
            },
        };

        let departure = build_departure(&journey).expect("should build");
        assert_eq!(departure.delay, Some(3));
        assert_eq!(departure.line, "Tram 8");
        assert_eq!(departure.departure_time, "08:58");
        assert_eq!(departure.actual_time, "09:01");
    }

    #[test]
    fn journey_without_departure_time_is_dropped() {
        let journey = Journey {
            category: None,
            number: None,
            to: None,
            operator: None,
            stop: Stop {
                departure: None,
                prognosis: None,
                platform: None,
            },
        };

        assert!(build_departure(&journey).is_none());
    }
}
