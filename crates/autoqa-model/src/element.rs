use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Recorded identity of a DOM node, as produced by the DOM enricher.
///
/// Invariant: for events that require an element, at least one of
/// `id`, `name`, `css`, `xpath` is non-empty. Construction does not
/// enforce this by itself — callers that build events from live capture
/// should call [`ElementInfo::has_any_identity`] before persisting.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ElementInfo {
    pub tag_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub css: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xpath: Option<String>,
    /// Normalized visible text, truncated to at most 200 characters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub element_type: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,
}

impl ElementInfo {
    /// Truncates `text` to at most 200 characters, matching the enricher's contract.
    pub fn normalize_text(raw: &str) -> String {
        let trimmed = raw.trim();
        if trimmed.chars().count() <= 200 {
            trimmed.to_string()
        } else {
            trimmed.chars().take(200).collect()
        }
    }

    /// True when at least one locator-bearing field is non-empty.
    pub fn has_any_identity(&self) -> bool {
        [&self.id, &self.name, &self.css, &self.xpath]
            .into_iter()
            .any(|field| field.as_deref().is_some_and(|value| !value.trim().is_empty()))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

/// A resolved locator: the strategy that succeeded plus the value used.
///
/// Never persisted inside [`crate::RecordedEvent`] — events hold
/// [`ElementInfo`], which can yield many candidate locators; this type is
/// produced transiently by the locator resolver at playback time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementLocator {
    pub strategy: LocatorStrategy,
    pub value: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LocatorStrategy {
    Id,
    Name,
    Css,
    Xpath,
    Healed,
    Text,
}
