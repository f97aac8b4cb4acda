//! Shared application state.

use std::path::PathBuf;
use std::sync::Arc;

use famdash_core::FamDashResult;
use famdash_webcal::WebcalFetcher;
use tokio::sync::{Mutex, RwLock};

use crate::config::ConfigStore;
use crate::routes::images::ImageCache;
use crate::routes::waste::WasteCache;

/// State shared by every handler.
///
/// The config store sits behind a RwLock (reads dominate writes by far);
/// the two proxy caches are independent mutexes so a slow upstream fetch
/// in one never blocks the other.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RwLock<ConfigStore>>,
    pub http: reqwest::Client,
    pub fetcher: WebcalFetcher,
    pub waste_cache: Arc<Mutex<WasteCache>>,
    pub image_cache: Arc<Mutex<ImageCache>>,
}

impl AppState {
    pub fn new(config_path: PathBuf) -> FamDashResult<Self> {
        let store = ConfigStore::open(config_path)?;

        Ok(AppState {
            store: Arc::new(RwLock::new(store)),
            http: reqwest::Client::new(),
            fetcher: WebcalFetcher::new(),
            waste_cache: Arc::new(Mutex::new(WasteCache::default())),
            image_cache: Arc::new(Mutex::new(ImageCache::default())),
        })
    }
}
