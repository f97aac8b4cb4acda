//! Photo carousel sources.
//!
//! Configured sources resolve to a flat image list with a five-minute
//! cache: direct URLs, local folders, and public iCloud shared albums
//! (photo URLs scraped from the album page). Local folder images are
//! served through `/local-images/{filename}`.

use std::collections::HashSet;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{ImageSource, ImageSourceKind};
use crate::routes::AppError;
use crate::state::AppState;

const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/images", get(list_images))
        .route("/api/images/add", post(add_source))
        .route("/api/images/{id}", delete(delete_source))
        .route("/local-images/{filename}", get(serve_local_image))
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageView {
    pub url: String,
    pub source: String,
}

/// Resolved image list, refreshed at most every five minutes.
#[derive(Default)]
pub struct ImageCache {
    images: Vec<ImageView>,
    fetched_at: Option<DateTime<Utc>>,
}

impl ImageCache {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        !self.images.is_empty()
            && self
                .fetched_at
                .is_some_and(|fetched| now - fetched < Duration::minutes(5))
    }
}

/// GET /api/images
async fn list_images(State(state): State<AppState>) -> Result<Json<Vec<ImageView>>, AppError> {
    let now = Utc::now();

    let mut cache = state.image_cache.lock().await;
    if cache.is_fresh(now) {
        return Ok(Json(cache.images.clone()));
    }

    let sources = state.store.read().await.config().images.sources.clone();

    let mut images = Vec::new();
    for source in sources.iter().filter(|s| s.enabled) {
        match source.kind {
            ImageSourceKind::Url => {
                if let Some(url) = &source.url {
                    images.push(ImageView {
                        url: url.clone(),
                        source: source.name.clone(),
                    });
                }
            }
            ImageSourceKind::LocalFolder => {
                images.extend(list_local_folder(source));
            }
            ImageSourceKind::IcloudShared => {
                images.extend(fetch_icloud_album(&state.http, source).await);
            }
        }
    }

    if images.is_empty() {
        images = placeholder_images();
    }

    info!(count = images.len(), "resolved carousel images");
    cache.images = images.clone();
    cache.fetched_at = Some(now);

    Ok(Json(images))
}

fn list_local_folder(source: &ImageSource) -> Vec<ImageView> {
    let Some(path) = &source.path else {
        return Vec::new();
    };

    let entries = match std::fs::read_dir(path) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(path = %path.display(), %err, "cannot read image folder");
            return Vec::new();
        }
    };

    entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| is_image_file(path))
        .filter_map(|path| {
            let filename = path.file_name()?.to_str()?.to_string();
            Some(ImageView {
                url: format!("/local-images/{}", filename),
                source: source.name.clone(),
            })
        })
        .collect()
}

fn is_image_file(path: &std::path::Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// Scrape photo URLs from a public shared-album page.
async fn fetch_icloud_album(http: &reqwest::Client, source: &ImageSource) -> Vec<ImageView> {
    let Some(url) = &source.url else {
        return Vec::new();
    };
    let Some(token) = extract_album_token(url) else {
        warn!(%url, "no album token in iCloud URL");
        return Vec::new();
    };

    let album_url = format!("https://www.icloud.com/sharedalbum/#{}", token);
    let response = http
        .get(&album_url)
        .header(
            header::USER_AGENT.as_str(),
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36",
        )
        .send()
        .await
        .and_then(|r| r.error_for_status());

    let html = match response {
        Ok(response) => match response.text().await {
            Ok(html) => html,
            Err(err) => {
                warn!(%err, "iCloud album body unreadable");
                return Vec::new();
            }
        },
        Err(err) => {
            warn!(%err, "iCloud album fetch failed");
            return Vec::new();
        }
    };

    extract_photo_urls(&html)
        .into_iter()
        .map(|url| ImageView {
            url,
            source: source.name.clone(),
        })
        .collect()
}

fn extract_album_token(url: &str) -> Option<String> {
    let re = Regex::new(r"#([A-Za-z0-9]+)").ok()?;
    Some(re.captures(url)?.get(1)?.as_str().to_string())
}

fn extract_photo_urls(html: &str) -> Vec<String> {
    let Ok(re) = Regex::new(r#"https://cvws\.icloud-content\.com/[^"'\s]+"#) else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    re.find_iter(html)
        .map(|m| m.as_str().to_string())
        .filter(|url| seen.insert(url.clone()))
        .collect()
}

fn placeholder_images() -> Vec<ImageView> {
    (1..=3)
        .map(|n| ImageView {
            url: format!("https://picsum.photos/1080/1920?random={}", n),
            source: "Beispiel".to_string(),
        })
        .collect()
}

#[derive(Deserialize)]
pub struct AddImageSourceRequest {
    #[serde(rename = "type")]
    pub kind: ImageSourceKind,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub path: Option<std::path::PathBuf>,
}

#[derive(Serialize)]
pub struct AddImageSourceResponse {
    pub success: bool,
    pub source: ImageSource,
}

/// POST /api/images/add
async fn add_source(
    State(state): State<AppState>,
    Json(req): Json<AddImageSourceRequest>,
) -> Result<Json<AddImageSourceResponse>, AppError> {
    let source = ImageSource {
        id: Uuid::new_v4().to_string(),
        name: req.name.unwrap_or_else(|| "Bildquelle".to_string()),
        kind: req.kind,
        url: req.url,
        path: req.path,
        enabled: true,
    };

    let mut store = state.store.write().await;
    store.config_mut().images.sources.push(source.clone());
    store.save()?;

    Ok(Json(AddImageSourceResponse {
        success: true,
        source,
    }))
}

#[derive(Serialize)]
pub struct DeleteSourceResponse {
    pub success: bool,
}

/// DELETE /api/images/:id
async fn delete_source(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteSourceResponse>, AppError> {
    let mut store = state.store.write().await;
    store
        .config_mut()
        .images
        .sources
        .retain(|source| source.id != id);
    store.save()?;

    Ok(Json(DeleteSourceResponse { success: true }))
}

/// GET /local-images/:filename - serve a file from the configured folder.
async fn serve_local_image(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    // The filename is a single path segment from the listing above.
    if filename.contains('/') || filename.contains("..") {
        return Err(AppError::bad_request("invalid filename"));
    }

    let folder = state
        .store
        .read()
        .await
        .config()
        .images
        .sources
        .iter()
        .find(|source| source.kind == ImageSourceKind::LocalFolder)
        .and_then(|source| source.path.clone())
        .ok_or_else(|| AppError::not_found("no local image source configured"))?;

    let path = folder.join(&filename);
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|_| AppError::not_found("image not found"))?;

    let content_type = match path.extension().and_then(|ext| ext.to_str()) {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    };

    Ok(([(header::CONTENT_TYPE, content_type)], bytes).into_response())
}
