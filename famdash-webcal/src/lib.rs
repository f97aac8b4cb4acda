//! Webcal subscription fetching and ICS parsing.
//!
//! This crate is the boundary between the wire format and the expansion
//! engine: it downloads a subscription feed over HTTPS and converts every
//! VEVENT into a [`famdash_core::RawEvent`]. The engine itself never sees
//! ICS text.

mod fetch;
mod parse;

pub use fetch::WebcalFetcher;
pub use parse::parse_events;
