//! Localized display text.
//!
//! Name, title and description values may be serialized as a JSON object
//! keyed by locale id (`{"en_US": "Title", "es_ES": "Título"}`). Two such
//! values are equal when their maps are equal, whatever the entry order.

use std::collections::BTreeMap;

pub type LocaleMap = BTreeMap<String, String>;

/// Parse `text` as a locale map. Plain text and empty objects yield `None`.
pub fn parse(text: &str) -> Option<LocaleMap> {
    let trimmed = text.trim_start();
    if !trimmed.starts_with('{') {
        return None;
    }
    serde_json::from_str::<LocaleMap>(trimmed)
        .ok()
        .filter(|map| !map.is_empty())
}

/// Map equality when both sides parse, `None` otherwise.
pub fn equals(a: &str, b: &str) -> Option<bool> {
    Some(parse(a)? == parse(b)?)
}
