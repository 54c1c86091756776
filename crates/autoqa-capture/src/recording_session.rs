use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use autoqa_dom::{Enricher, ScriptEvaluator};
use autoqa_model::{Coordinates, RecordedEvent, RecordedSession};

use crate::classifier::classify;
use crate::input_capture::{InputSource, ModifierState};
use crate::redactor::Redactor;

/// How often the recording loop polls the sentinel lock file for removal.
const DEFAULT_LOCK_POLL_INTERVAL: Duration = Duration::from_millis(500);

const LOCK_FILE_NAME: &str = ".autoqa-recording.lock";

/// Supplies the current page URL for whitelist filtering and event
/// stamping. The live implementation queries the debug-protocol
/// connector; tests use a fixed or scripted value.
#[async_trait]
pub trait UrlSource: Send + Sync {
    async fn current_url(&self) -> Option<String>;
}

pub struct FixedUrlSource(pub Option<String>);

#[async_trait]
impl UrlSource for FixedUrlSource {
    async fn current_url(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Returns the path of the sentinel lock file a recording session polls
/// for removal to know when to stop gracefully.
pub fn lock_file_path(recordings_dir: &Path) -> PathBuf {
    recordings_dir.join(LOCK_FILE_NAME)
}

/// Orchestrates DOM enrichment, input capture, and field redaction,
/// appending resulting events to a [`RecordedSession`] and saving it
/// atomically when told to stop.
pub struct RecordingSession<E: ScriptEvaluator> {
    session: RecordedSession,
    enricher: Enricher<E>,
    redactor: Redactor,
    url_whitelist: Vec<String>,
    output_dir: PathBuf,
    session_prefix: String,
    lock_poll_interval: Duration,
}

impl<E: ScriptEvaluator> RecordingSession<E> {
    pub fn new(
        session_id: impl Into<String>,
        browser_name: impl Into<String>,
        enricher: Enricher<E>,
        redactor: Redactor,
        url_whitelist: Vec<String>,
        output_dir: PathBuf,
        session_prefix: String,
    ) -> Self {
        Self {
            session: RecordedSession::new(session_id, browser_name),
            enricher,
            redactor,
            url_whitelist,
            output_dir,
            session_prefix,
            lock_poll_interval: DEFAULT_LOCK_POLL_INTERVAL,
        }
    }

    #[cfg(test)]
    fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.lock_poll_interval = interval;
        self
    }

    /// Runs the capture loop until the sentinel lock file disappears (or
    /// `input_source` is exhausted, used by tests), then seals and saves
    /// the session. Returns the path the session was written to.
    pub async fn run(
        mut self,
        mut input_source: impl InputSource,
        url_source: &impl UrlSource,
    ) -> anyhow::Result<PathBuf> {
        let lock_path = lock_file_path(&self.output_dir);
        let mut modifiers = ModifierState::default();

        loop {
            if lock_path.exists() {
                tokio::select! {
                    raw = input_source.next_event() => {
                        match raw {
                            Some(event) => {
                                self.handle_raw_event(&event, &mut modifiers, url_source).await;
                            }
                            None => break,
                        }
                    }
                    _ = tokio::time::sleep(self.lock_poll_interval) => {}
                }
            } else {
                break;
            }
        }

        self.session.seal();
        self.session.save_to_dir(&self.output_dir, &self.session_prefix)
            .map_err(anyhow::Error::from)
    }

    async fn handle_raw_event(
        &mut self,
        raw: &crate::input_capture::RawInputEvent,
        modifiers: &mut ModifierState,
        url_source: &impl UrlSource,
    ) {
        let Some(classified) = classify(raw, modifiers) else {
            return;
        };

        let current_url = url_source.current_url().await;
        if !self.url_whitelisted(current_url.as_deref()) {
            return;
        }

        let (element, frame_chain) = match classified.coordinates {
            Some(Coordinates { x, y }) => (
                self.enricher.enrich(x, y).await,
                self.enricher.detect_frame_chain(x, y).await,
            ),
            None => (None, Vec::new()),
        };

        let mut event = RecordedEvent {
            timestamp: chrono::Utc::now(),
            event_type: classified.event_type,
            url: current_url,
            element,
            input_data: classified.input_data,
            coordinates: classified.coordinates,
            frame_chain,
            window_handle: None,
            object_name: None,
            checkpoint_data: None,
            comment: None,
        };

        self.redactor.redact(&mut event);
        self.session.push(event);
    }

    /// An empty whitelist means every URL is recorded.
    fn url_whitelisted(&self, url: Option<&str>) -> bool {
        if self.url_whitelist.is_empty() {
            return true;
        }
        match url {
            Some(url) => self
                .url_whitelist
                .iter()
                .any(|allowed| url.contains(allowed.as_str())),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input_capture::{MouseButton, RawInputEvent, ScriptedInputSource};
    use async_trait::async_trait;
    use autoqa_dom::DomError;
    use serde_json::Value;

    struct StaticEvaluator;

    #[async_trait]
    impl ScriptEvaluator for StaticEvaluator {
        async fn evaluate(&self, _expression: &str, _deadline: Duration) -> Result<Value, DomError> {
            Ok(serde_json::json!({
                "tagName": "button",
                "id": "submit",
                "css": "#submit",
                "attributes": {}
            }))
        }
    }

    fn enricher() -> Enricher<StaticEvaluator> {
        Enricher::new(Arc::new(StaticEvaluator), Duration::from_secs(1))
    }

    #[tokio::test]
    async fn captures_click_with_enriched_element() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        std::fs::write(lock_file_path(tempdir.path()), "").expect("create lock");

        let source = ScriptedInputSource::new(vec![RawInputEvent::MouseClick {
            x: 5.0,
            y: 6.0,
            button: MouseButton::Left,
            click_count: 1,
        }]);

        let session = RecordingSession::new(
            "sess-1",
            "chrome",
            enricher(),
            Redactor::with_defaults(),
            Vec::new(),
            tempdir.path().to_path_buf(),
            "recording".to_string(),
        );

        let url_source = FixedUrlSource(Some("https://example.com/checkout".to_string()));
        let path = session.run(source, &url_source).await.expect("run");
        let saved = RecordedSession::load_from_file(&path).expect("reload");
        assert_eq!(saved.events.len(), 1);
        assert_eq!(saved.events[0].element.as_ref().unwrap().id.as_deref(), Some("submit"));
    }

    #[tokio::test]
    async fn skips_events_outside_url_whitelist() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        std::fs::write(lock_file_path(tempdir.path()), "").expect("create lock");

        let source = ScriptedInputSource::new(vec![RawInputEvent::MouseClick {
            x: 5.0,
            y: 6.0,
            button: MouseButton::Left,
            click_count: 1,
        }]);

        let session = RecordingSession::new(
            "sess-2",
            "chrome",
            enricher(),
            Redactor::with_defaults(),
            vec!["allowed.example.com".to_string()],
            tempdir.path().to_path_buf(),
            "recording".to_string(),
        );

        let url_source = FixedUrlSource(Some("https://other.example.com".to_string()));
        let path = session.run(source, &url_source).await.expect("run");
        let saved = RecordedSession::load_from_file(&path).expect("reload");
        assert!(saved.events.is_empty());
    }

    #[tokio::test]
    async fn redacts_sensitive_input_before_saving() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        std::fs::write(lock_file_path(tempdir.path()), "").expect("create lock");

        struct PasswordEvaluator;
        #[async_trait]
        impl ScriptEvaluator for PasswordEvaluator {
            async fn evaluate(
                &self,
                _expression: &str,
                _deadline: Duration,
            ) -> Result<Value, DomError> {
                Ok(serde_json::json!({
                    "tagName": "input",
                    "type": "password",
                    "attributes": {}
                }))
            }
        }

        let source = ScriptedInputSource::new(vec![RawInputEvent::PrintableChar {
            ch: 'x',
            x: Some(1.0),
            y: Some(1.0),
        }]);

        let session = RecordingSession::new(
            "sess-3",
            "chrome",
            Enricher::new(Arc::new(PasswordEvaluator), Duration::from_secs(1)),
            Redactor::with_defaults(),
            Vec::new(),
            tempdir.path().to_path_buf(),
            "recording".to_string(),
        );

        let url_source = FixedUrlSource(None);
        let path = session.run(source, &url_source).await.expect("run");
        let saved = RecordedSession::load_from_file(&path).expect("reload");
        let input_data = saved.events[0].input_data.clone().unwrap();
        match input_data {
            autoqa_model::InputData::Keys { keys } => {
                assert_eq!(keys, crate::redactor::REDACTED_PLACEHOLDER);
            }
            other => panic!("unexpected input data: {other:?}"),
        }
    }

    #[tokio::test]
    async fn stops_when_lock_file_is_removed_mid_poll() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let lock_path = lock_file_path(tempdir.path());
        std::fs::write(&lock_path, "").expect("create lock");
        std::fs::remove_file(&lock_path).expect("remove lock immediately");

        let source = ScriptedInputSource::new(Vec::new());
        let session = RecordingSession::new(
            "sess-4",
            "chrome",
            enricher(),
            Redactor::with_defaults(),
            Vec::new(),
            tempdir.path().to_path_buf(),
            "recording".to_string(),
        )
        .with_poll_interval(Duration::from_millis(5));

        let url_source = FixedUrlSource(None);
        let path = session.run(source, &url_source).await.expect("run");
        assert!(path.exists());
    }
}
