//! Source aggregation: fetch every enabled subscription, expand, merge,
//! and sort.

use async_trait::async_trait;
use tracing::{debug, error};

use crate::error::FamDashResult;
use crate::event::{CalendarSource, EventInstance, RawEvent};
use crate::expand::expand_event;
use crate::window::Window;

/// Capability to turn a subscription URL into raw events.
///
/// The server wires the webcal collaborator in here; tests substitute
/// in-memory fixtures.
#[async_trait]
pub trait EventFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> FamDashResult<Vec<RawEvent>>;
}

/// Fetch and expand every enabled source, returning all instances sorted
/// by start time ascending.
///
/// A failing source is logged and skipped; the result is the best-effort
/// union of the healthy sources. Nothing here is fatal — the worst case
/// is an empty list.
pub async fn aggregate_events<F: EventFetcher>(
    sources: &[CalendarSource],
    fetcher: &F,
    window: &Window,
) -> Vec<EventInstance> {
    let mut instances = Vec::new();

    for source in sources {
        if !source.enabled || source.url.is_empty() {
            continue;
        }

        let url = normalize_url(&source.url);
        let events = match fetcher.fetch(&url).await {
            Ok(events) => events,
            Err(err) => {
                error!(calendar = %source.name, %err, "skipping calendar source");
                continue;
            }
        };

        let color = match source.color.as_deref() {
            Some(color) if !color.is_empty() => color.to_string(),
            _ => source.kind.default_color().to_string(),
        };

        let before = instances.len();
        for event in &events {
            instances.extend(expand_event(event, &source.name, &color, window));
        }
        debug!(
            calendar = %source.name,
            events = events.len(),
            instances = instances.len() - before,
            "expanded calendar source"
        );
    }

    instances.sort_by_key(|instance| instance.start);
    instances
}

/// Subscription links are often published with the `webcal://` scheme;
/// fetch them over https instead.
pub fn normalize_url(url: &str) -> String {
    let scheme = "webcal://";
    if url.len() >= scheme.len() && url[..scheme.len()].eq_ignore_ascii_case(scheme) {
        format!("https://{}", &url[scheme.len()..])
    } else {
        url.to_string()
    }
}
