//! SRF news headline proxy.

use axum::{Json, Router, extract::State, routing::get};
use quick_xml::Reader;
use quick_xml::events::Event;
use serde::Serialize;

use crate::routes::AppError;
use crate::state::AppState;

const NEWS_FEED_URL: &str = "https://www.srf.ch/news/bnf/rss/19032223";
const MAX_ITEMS: usize = 20;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/news", get(get_news))
}

#[derive(Debug, Default, Clone, Serialize, PartialEq)]
pub struct NewsItem {
    pub title: String,
    pub link: String,
}

/// GET /api/news
async fn get_news(State(state): State<AppState>) -> Result<Json<Vec<NewsItem>>, AppError> {
    let xml = state
        .http
        .get(NEWS_FEED_URL)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;

    let mut items = parse_rss_items(&xml);
    items.truncate(MAX_ITEMS);
    Ok(Json(items))
}

enum Field {
    Title,
    Link,
}

/// Extract `<item>` titles and links from an RSS payload. Titles usually
/// arrive as CDATA; the channel-level title outside any `<item>` is
/// ignored.
fn parse_rss_items(xml: &str) -> Vec<NewsItem> {
    let mut reader = Reader::from_reader(xml.as_bytes());
    reader.config_mut().trim_text(true);

    let mut items = Vec::new();
    let mut buf = Vec::new();
    let mut in_item = false;
    let mut field: Option<Field> = None;
    let mut current = NewsItem::default();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"item" => {
                    in_item = true;
                    current = NewsItem::default();
                }
                b"title" if in_item => field = Some(Field::Title),
                b"link" if in_item => field = Some(Field::Link),
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"item" => {
                    in_item = false;
                    if !current.title.is_empty() {
                        items.push(std::mem::take(&mut current));
                    }
                }
                b"title" | b"link" => field = None,
                _ => {}
            },
            Ok(Event::Text(ref e)) => {
                if let Some(field) = &field {
                    let text = e.unescape().unwrap_or_default();
                    match field {
                        Field::Title => current.title.push_str(&text),
                        Field::Link => current.link.push_str(&text),
                    }
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(field) = &field {
                    let raw = e.into_inner();
                    let text = String::from_utf8_lossy(&raw);
                    match field {
                        Field::Title => current.title.push_str(&text),
                        Field::Link => current.link.push_str(&text),
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    items
}
