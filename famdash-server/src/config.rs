//! Dashboard configuration: a persisted JSON document with env-derived
//! defaults.
//!
//! The document is merged section by section: a saved file that only
//! carries some sections keeps the defaults for the rest, so configs
//! written by older versions keep loading.

use std::collections::BTreeMap;
use std::path::PathBuf;

use famdash_core::{CalendarKind, CalendarSource, FamDashError, FamDashResult};
use serde::{Deserialize, Serialize};

/// The whole configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardConfig {
    pub weather: WeatherConfig,
    pub calendars: CalendarsConfig,
    pub images: ImagesConfig,
    pub transport: TransportConfig,
    pub waste: WasteConfig,
    pub schedule: ScheduleConfig,
    pub display: DisplayConfig,
}

impl DashboardConfig {
    /// Shallow merge: replace every section the update carries.
    pub fn apply(&mut self, update: ConfigUpdate) {
        if let Some(weather) = update.weather {
            self.weather = weather;
        }
        if let Some(calendars) = update.calendars {
            self.calendars = calendars;
        }
        if let Some(images) = update.images {
            self.images = images;
        }
        if let Some(transport) = update.transport {
            self.transport = transport;
        }
        if let Some(waste) = update.waste {
            self.waste = waste;
        }
        if let Some(schedule) = update.schedule {
            self.schedule = schedule;
        }
        if let Some(display) = update.display {
            self.display = display;
        }
    }
}

/// Partial document accepted by `POST /api/config`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigUpdate {
    pub weather: Option<WeatherConfig>,
    pub calendars: Option<CalendarsConfig>,
    pub images: Option<ImagesConfig>,
    pub transport: Option<TransportConfig>,
    pub waste: Option<WasteConfig>,
    pub schedule: Option<ScheduleConfig>,
    pub display: Option<DisplayConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WeatherConfig {
    pub api_key: String,
    pub city: String,
    pub country: String,
    pub lat: f64,
    pub lon: f64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        WeatherConfig {
            api_key: env_or("WEATHER_API_KEY", ""),
            city: env_or("WEATHER_CITY", "Basel"),
            country: env_or("WEATHER_COUNTRY", "CH"),
            lat: env_parse_or("WEATHER_LAT", 47.5596),
            lon: env_parse_or("WEATHER_LON", 7.5886),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarsConfig {
    pub google: Vec<CalendarEntry>,
    pub icloud: Vec<CalendarEntry>,
}

impl CalendarsConfig {
    /// Flatten both lists into kind-tagged sources for the aggregator.
    pub fn sources(&self) -> Vec<CalendarSource> {
        self.google
            .iter()
            .map(|entry| entry.to_source(CalendarKind::Google))
            .chain(
                self.icloud
                    .iter()
                    .map(|entry| entry.to_source(CalendarKind::Icloud)),
            )
            .collect()
    }

    pub fn list_mut(&mut self, kind: CalendarKind) -> &mut Vec<CalendarEntry> {
        match kind {
            CalendarKind::Google => &mut self.google,
            CalendarKind::Icloud => &mut self.icloud,
        }
    }
}

/// One subscription as stored in the document; its kind comes from which
/// list it sits in.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEntry {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl CalendarEntry {
    pub fn to_source(&self, kind: CalendarKind) -> CalendarSource {
        CalendarSource {
            id: self.id.clone(),
            name: self.name.clone(),
            url: self.url.clone(),
            color: self.color.clone(),
            enabled: self.enabled,
            kind,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImagesConfig {
    /// Carousel rotation interval in milliseconds.
    pub change_interval: u64,
    pub sources: Vec<ImageSource>,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        ImagesConfig {
            change_interval: env_parse_or("IMAGE_CHANGE_INTERVAL", 120_000),
            sources: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSource {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ImageSourceKind,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageSourceKind {
    IcloudShared,
    Url,
    LocalFolder,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransportConfig {
    pub enabled: bool,
    pub lat: f64,
    pub lon: f64,
    pub stations: Vec<TransportStation>,
    /// Departures requested per station board.
    pub limit: u32,
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig {
            enabled: true,
            lat: 47.5417,
            lon: 7.6028,
            stations: Vec::new(),
            limit: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportStation {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub distance: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WasteConfig {
    pub enabled: bool,
    /// Basel-Stadt collection zone (A-H).
    pub zone: String,
    pub reminder_days_before: u32,
    pub show_types: Vec<String>,
}

impl Default for WasteConfig {
    fn default() -> Self {
        WasteConfig {
            enabled: true,
            zone: "A".to_string(),
            reminder_days_before: 1,
            show_types: ["Kehricht", "Papier", "Karton", "Grüngut", "Metall", "Sperrgut"]
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScheduleConfig {
    pub enabled: bool,
    pub children: Vec<ScheduleChild>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        ScheduleConfig {
            enabled: true,
            children: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleChild {
    pub id: String,
    pub name: String,
    #[serde(default = "default_child_color")]
    pub color: String,
    /// Keyed by lowercase English weekday ("monday" .. "friday").
    #[serde(default)]
    pub timetable: BTreeMap<String, DaySchedule>,
}

pub fn default_child_color() -> String {
    "#4ade80".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DaySchedule {
    pub morning_start: Option<String>,
    pub morning_subjects: Vec<String>,
    pub lunch_start: Option<String>,
    pub afternoon_start: Option<String>,
    pub afternoon_subjects: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DisplayConfig {
    pub locale: String,
    pub timezone: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            locale: env_or("LOCALE", "de-CH"),
            timezone: env_or("TIMEZONE", "Europe/Zurich"),
        }
    }
}

/// Loads and persists the configuration document.
pub struct ConfigStore {
    path: PathBuf,
    config: DashboardConfig,
}

impl ConfigStore {
    /// Open the store at `path`. A missing file yields the env-derived
    /// defaults; a present one is merged over them section by section.
    pub fn open(path: PathBuf) -> FamDashResult<Self> {
        let config = if path.exists() {
            let data = std::fs::read_to_string(&path)?;
            serde_json::from_str(&data)
                .map_err(|e| FamDashError::Config(format!("invalid config file: {e}")))?
        } else {
            DashboardConfig::default()
        };

        Ok(ConfigStore { path, config })
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut DashboardConfig {
        &mut self.config
    }

    /// Persist the current document.
    pub fn save(&self) -> FamDashResult<()> {
        let data = serde_json::to_string_pretty(&self.config)
            .map_err(|e| FamDashError::Config(e.to_string()))?;
        std::fs::write(&self.path, data)?;
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

fn env_or(key: &str, fallback: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| fallback.to_string())
}

fn env_parse_or<T: std::str::FromStr>(key: &str, fallback: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::open(dir.path().join("config.json")).unwrap();

        assert_eq!(store.config().waste.zone, "A");
        assert!(store.config().schedule.enabled);
        assert!(store.config().calendars.google.is_empty());
    }

    #[test]
    fn save_and_reload_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut store = ConfigStore::open(path.clone()).unwrap();
        store.config_mut().calendars.google.push(CalendarEntry {
            id: "1".to_string(),
            name: "Family".to_string(),
            url: "webcal://cal.example/f.ics".to_string(),
            color: Some("#123456".to_string()),
            enabled: true,
        });
        store.config_mut().waste.zone = "GUF".to_string();
        store.save().unwrap();

        let reloaded = ConfigStore::open(path).unwrap();
        assert_eq!(reloaded.config().calendars.google.len(), 1);
        assert_eq!(reloaded.config().calendars.google[0].name, "Family");
        assert_eq!(reloaded.config().waste.zone, "GUF");
    }

    #[test]
    fn partial_document_keeps_defaults_for_missing_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"waste": {"zone": "B"}}"#).unwrap();

        let store = ConfigStore::open(path).unwrap();

        assert_eq!(store.config().waste.zone, "B");
        assert!(store.config().waste.enabled, "absent waste fields keep defaults");
        assert!(store.config().transport.enabled, "absent sections keep defaults");
    }

    #[test]
    fn apply_replaces_only_the_sections_present() {
        let mut config = DashboardConfig::default();
        let update = ConfigUpdate {
            waste: Some(WasteConfig {
                zone: "H".to_string(),
                ..WasteConfig::default()
            }),
            ..ConfigUpdate::default()
        };

        config.apply(update);

        assert_eq!(config.waste.zone, "H");
        assert!(config.schedule.enabled, "untouched sections keep their values");
    }

    #[test]
    fn sources_are_tagged_with_their_list_kind() {
        let entry = CalendarEntry {
            id: "1".to_string(),
            name: "School".to_string(),
            url: "https://cal.example/s.ics".to_string(),
            color: None,
            enabled: true,
        };
        let config = CalendarsConfig {
            google: vec![entry.clone()],
            icloud: vec![entry],
        };

        let sources = config.sources();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].kind, CalendarKind::Google);
        assert_eq!(sources[1].kind, CalendarKind::Icloud);
    }

    #[test]
    fn image_source_kind_uses_snake_case_wire_names() {
        let json = r#"{"id":"1","name":"Album","type":"icloud_shared","url":"https://www.icloud.com/sharedalbum/#B0abcDEF"}"#;
        let source: ImageSource = serde_json::from_str(json).unwrap();

        assert_eq!(source.kind, ImageSourceKind::IcloudShared);
        assert!(source.enabled, "enabled defaults to true");
    }
}
