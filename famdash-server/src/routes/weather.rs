//! OpenWeatherMap proxy: current conditions plus a 5-day forecast.

use axum::{Json, Router, extract::State, routing::get};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::routes::AppError;
use crate::state::AppState;

const API_BASE: &str = "https://api.openweathermap.org/data/2.5";

pub fn router() -> Router<AppState> {
    Router::new().route("/api/weather", get(get_weather))
}

#[derive(Serialize)]
#[serde(untagged)]
enum WeatherReply {
    Ready(WeatherResponse),
    NotConfigured { error: String },
}

#[derive(Serialize)]
struct WeatherResponse {
    current: CurrentWeather,
    forecast: Vec<ForecastDay>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CurrentWeather {
    temp: i32,
    feels_like: i32,
    humidity: f64,
    description: String,
    icon: String,
    wind: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ForecastDay {
    date: DateTime<Utc>,
    temp: i32,
    temp_min: i32,
    temp_max: i32,
    icon: String,
    description: String,
    rain: f64,
}

// Upstream shapes, reduced to the fields the dashboard shows.

#[derive(Deserialize)]
struct OwmCurrent {
    main: OwmMain,
    #[serde(default)]
    weather: Vec<OwmCondition>,
    #[serde(default)]
    wind: OwmWind,
}

#[derive(Deserialize)]
struct OwmMain {
    temp: f64,
    feels_like: f64,
    humidity: f64,
}

#[derive(Deserialize, Default)]
struct OwmCondition {
    #[serde(default)]
    description: String,
    #[serde(default)]
    icon: String,
}

#[derive(Deserialize, Default)]
struct OwmWind {
    #[serde(default)]
    speed: f64,
}

#[derive(Deserialize)]
struct OwmForecast {
    #[serde(default)]
    list: Vec<OwmForecastEntry>,
}

#[derive(Deserialize)]
struct OwmForecastEntry {
    dt: i64,
    main: OwmForecastMain,
    #[serde(default)]
    weather: Vec<OwmCondition>,
    #[serde(default)]
    rain: Option<OwmRain>,
}

#[derive(Deserialize)]
struct OwmForecastMain {
    temp: f64,
    temp_min: f64,
    temp_max: f64,
}

#[derive(Deserialize)]
struct OwmRain {
    #[serde(rename = "3h", default)]
    three_hour: Option<f64>,
}

/// GET /api/weather
///
/// An unconfigured API key is not an error: the dashboard shows a hint
/// instead, so the reply is 200 with an `error` body like the rest of the
/// optional widgets.
async fn get_weather(State(state): State<AppState>) -> Result<Json<WeatherReply>, AppError> {
    let weather = state.store.read().await.config().weather.clone();

    if weather.api_key.is_empty() {
        return Ok(Json(WeatherReply::NotConfigured {
            error: "Weather API key not configured".to_string(),
        }));
    }

    let query = [
        ("lat", weather.lat.to_string()),
        ("lon", weather.lon.to_string()),
        ("appid", weather.api_key.clone()),
        ("units", "metric".to_string()),
        ("lang", "de".to_string()),
    ];

    let current: OwmCurrent = state
        .http
        .get(format!("{API_BASE}/weather"))
        .query(&query)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    let forecast: OwmForecast = state
        .http
        .get(format!("{API_BASE}/forecast"))
        .query(&query)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    let condition = current.weather.into_iter().next().unwrap_or_default();

    // The forecast comes in 3-hour slots; one sample per day is enough
    // for the outlook row.
    let days: Vec<ForecastDay> = forecast
        .list
        .iter()
        .step_by(8)
        .take(5)
        .filter_map(|entry| {
            let date = DateTime::from_timestamp(entry.dt, 0)?;
            let condition = entry.weather.first();
            Some(ForecastDay {
                date,
                temp: entry.main.temp.round() as i32,
                temp_min: entry.main.temp_min.round() as i32,
                temp_max: entry.main.temp_max.round() as i32,
                icon: condition.map(|c| c.icon.clone()).unwrap_or_default(),
                description: condition.map(|c| c.description.clone()).unwrap_or_default(),
                rain: entry
                    .rain
                    .as_ref()
                    .and_then(|rain| rain.three_hour)
                    .unwrap_or(0.0),
            })
        })
        .collect();

    Ok(Json(WeatherReply::Ready(WeatherResponse {
        current: CurrentWeather {
            temp: current.main.temp.round() as i32,
            feels_like: current.main.feels_like.round() as i32,
            humidity: current.main.humidity,
            description: condition.description,
            icon: condition.icon,
            wind: current.wind.speed,
        },
        forecast: days,
    })))
}
