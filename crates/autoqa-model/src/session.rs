use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Map;
use thiserror::Error;

use crate::event::RecordedEvent;
use crate::timestamp::iso8601_millis_opt;

pub const CURRENT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to parse session json: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read session file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write session file: {0}")]
    Write(#[from] anyhow::Error),
    #[error("invalid session fixture: {0}")]
    Validation(String),
}

/// Ordered sequence of recorded events plus session metadata. Created once
/// at recording start, appended to monotonically, frozen at save.
///
/// Unknown top-level JSON fields are preserved in `extra` and re-emitted
/// on serialize, per the session file format's round-trip contract.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecordedSession {
    pub session_id: String,
    pub browser_name: String,
    #[serde(with = "iso8601_millis_opt")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(with = "iso8601_millis_opt")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default = "current_schema_version")]
    pub schema_version: u32,
    pub events: Vec<RecordedEvent>,
    #[serde(flatten)]
    pub extra: Map<String, serde_json::Value>,
}

fn current_schema_version() -> u32 {
    CURRENT_SCHEMA_VERSION
}

impl RecordedSession {
    /// Creates a new, empty session. `started_at` is stamped immediately;
    /// `ended_at` is populated only when the session is sealed.
    pub fn new(session_id: impl Into<String>, browser_name: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            browser_name: browser_name.into(),
            started_at: Some(Utc::now()),
            ended_at: None,
            schema_version: CURRENT_SCHEMA_VERSION,
            events: Vec::new(),
            extra: Map::new(),
        }
    }

    pub fn push(&mut self, event: RecordedEvent) {
        self.events.push(event);
    }

    /// Seals the session by stamping `ended_at`. Idempotent.
    pub fn seal(&mut self) {
        self.ended_at = Some(Utc::now());
    }

    pub fn to_json(&self) -> Result<String, ModelError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(raw: &str) -> Result<Self, ModelError> {
        let session: Self = serde_json::from_str(raw)?;
        autoqa_contract::validate_fixture_header_allow_empty(
            "autoqa-session",
            session.schema_version,
            CURRENT_SCHEMA_VERSION,
            &session.session_id,
        )
        .map_err(|error| ModelError::Validation(error.to_string()))?;
        Ok(session)
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ModelError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ModelError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// Writes the session to `{dir}/{prefix}-{sessionId}.json` atomically
    /// (write temp + rename), per the recording session lifecycle.
    pub fn save_to_dir(&self, dir: &Path, prefix: &str) -> Result<std::path::PathBuf, ModelError> {
        let file_name = format!("{prefix}-{}.json", self.session_id);
        let path = dir.join(file_name);
        let rendered = self.to_json()?;
        autoqa_core::write_text_atomic(&path, &rendered).map_err(ModelError::Write)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventType;

    fn sample_event() -> RecordedEvent {
        RecordedEvent {
            timestamp: Utc::now(),
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
        }
    }

    #[test]
    fn new_session_starts_empty_and_unsealed() {
        let session = RecordedSession::new("sess-1", "chrome");
        assert!(session.events.is_empty());
        assert!(session.started_at.is_some());
        assert!(session.ended_at.is_none());
        assert_eq!(session.schema_version, CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn round_trip_preserves_events_and_unknown_fields() {
        let mut session = RecordedSession::new("sess-2", "chrome");
        session.push(sample_event());
        session.seal();
        session
            .extra
            .insert("futureField".to_string(), serde_json::json!("kept"));

        let json = session.to_json().expect("serialize");
        let parsed = RecordedSession::from_json(&json).expect("deserialize");
        assert_eq!(parsed, session);
        assert_eq!(
            parsed.extra.get("futureField"),
            Some(&serde_json::json!("kept"))
        );
    }

    #[test]
    fn unknown_event_type_in_file_fails_with_parse_error() {
        let raw = r#"{
            "sessionId": "sess-3",
            "browserName": "chrome",
            "schemaVersion": 1,
            "events": [{"timestamp":"2026-01-15T10:30:00.000Z","eventType":"TELEPORT"}]
        }"#;
        let error = RecordedSession::from_json(raw).expect_err("should fail");
        assert!(matches!(error, ModelError::Parse(_)));
    }

    #[test]
    fn save_to_dir_writes_atomically_named_file() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let mut session = RecordedSession::new("abc123", "chrome");
        session.push(sample_event());
        let path = session
            .save_to_dir(tempdir.path(), "recording")
            .expect("save");
        assert_eq!(path.file_name().unwrap(), "recording-abc123.json");
        assert!(path.exists());
        let reloaded = RecordedSession::load_from_file(&path).expect("reload");
        assert_eq!(reloaded.session_id, "abc123");
    }

    #[test]
    fn empty_session_round_trips() {
        let session = RecordedSession::new("empty", "chrome");
        let json = session.to_json().expect("serialize");
        let parsed = RecordedSession::from_json(&json).expect("deserialize");
        assert!(parsed.events.is_empty());
    }

    #[test]
    fn unsupported_schema_version_fails_validation_on_load() {
        let raw = r#"{
            "sessionId": "sess-4",
            "browserName": "chrome",
            "schemaVersion": 99,
            "events": [{"timestamp":"2026-01-15T10:30:00.000Z","eventType":"NAVIGATE","url":"https://example.com"}]
        }"#;
        let error = RecordedSession::from_json(raw).expect_err("should fail validation");
        assert!(matches!(error, ModelError::Validation(_)));
    }
}
