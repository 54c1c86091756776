use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::checkpoint::CheckpointData;
use crate::element::ElementInfo;
use crate::input::InputData;
use crate::timestamp::iso8601_millis;

/// Closed set of event kinds. The derived `Deserialize` already rejects
/// any JSON string that is not one of these variants (no `#[serde(other)]`
/// catch-all), which is what gives invariant 1 ("unknown eventType is a
/// load failure, not a silent skip") for free.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    Navigate,
    Click,
    DoubleClick,
    ContextMenu,
    Input,
    KeyPress,
    Select,
    Scroll,
    Alert,
    WindowSwitch,
    Hover,
    FrameSwitch,
    DragDrop,
    Wait,
    Checkpoint,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinates {
    pub x: f64,
    pub y: f64,
}

/// One user-observable interaction. Immutable once appended to a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecordedEvent {
    #[serde(with = "iso8601_millis")]
    pub timestamp: DateTime<Utc>,
    pub event_type: EventType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element: Option<ElementInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_data: Option<InputData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    /// Ordered frame identifiers from the top document down to the
    /// context containing the target element; empty means top document.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub frame_chain: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint_data: Option<CheckpointData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl RecordedEvent {
    /// Event types whose dispatch handler requires a resolvable element.
    pub fn requires_element(&self) -> bool {
        matches!(
            self.event_type,
            EventType::Click
                | EventType::DoubleClick
                | EventType::ContextMenu
                | EventType::Input
                | EventType::Select
                | EventType::Hover
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_timestamp() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-15T10:30:00.000Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn navigate_event_round_trips_through_json() {
        let event = RecordedEvent {
            timestamp: sample_timestamp(),
            event_type: EventType::Navigate,
            url: Some("https://example.com".to_string()),
            element: None,
            input_data: None,
            coordinates: None,
            frame_chain: Vec::new(),
            window_handle: None,
            object_name: None,
            checkpoint_data: None,
            comment: None,
        };
        let json = serde_json::to_string(&event).expect("serialize");
        let parsed: RecordedEvent = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, event);
    }

    #[test]
    fn unknown_event_type_fails_to_parse() {
        let json = r#"{"timestamp":"2026-01-15T10:30:00.000Z","eventType":"TELEPORT"}"#;
        let error = serde_json::from_str::<RecordedEvent>(json).expect_err("should fail to parse");
        assert!(error.to_string().contains("unknown variant"));
    }

    #[test]
    fn requires_element_matches_handlers_that_dispatch_on_a_resolved_element() {
        let mut event = RecordedEvent {
            timestamp: sample_timestamp(),
            event_type: EventType::Click,
            url: None,
            element: None,
            input_data: None,
            coordinates: None,
            frame_chain: Vec::new(),
            window_handle: None,
            object_name: None,
            checkpoint_data: None,
            comment: None,
        };
        assert!(event.requires_element());
        event.event_type = EventType::Wait;
        assert!(!event.requires_element());
        event.event_type = EventType::FrameSwitch;
        assert!(!event.requires_element());
    }

    #[test]
    fn omitted_optional_fields_are_absent_rather_than_null() {
        let event = RecordedEvent {
            timestamp: sample_timestamp(),
            event_type: EventType::Wait,
            url: None,
            element: None,
            input_data: None,
            coordinates: None,
            frame_chain: Vec::new(),
            window_handle: None,
            object_name: None,
            checkpoint_data: None,
            comment: None,
        };
        let json = serde_json::to_string(&event).expect("serialize");
        assert!(!json.contains("null"));
        assert!(!json.contains("frameChain"));
    }
}
