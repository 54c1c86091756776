use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use autoqa_capture::redactor::{Redactor, REDACTED_PLACEHOLDER};
use autoqa_heal::{ChatClient, ChatMessage};
use autoqa_model::{
    CheckpointData, CheckpointType, ElementInfo, EventType, InputData, LocatorStrategy, MatchMode,
    RecordedEvent, RecordedSession,
};
use autoqa_playback::driver::{Driver, ElementHandle, RgbaImage};
use autoqa_playback::tests_support::FakeDriver;
use autoqa_playback::PlaybackError;
use autoqa_player::{PlaybackPolicy, PlayerEngine};

fn test_policy() -> PlaybackPolicy {
    PlaybackPolicy {
        explicit_wait: Duration::from_millis(200),
        page_load_timeout: Duration::from_millis(200),
        step_delay: Duration::ZERO,
        evidence_dir: std::env::temp_dir().join("autoqa-integration-evidence"),
        locator_fallback_attempts: 3,
        screenshot_on_failure: false,
        page_source_on_failure: false,
        console_logs_on_failure: false,
        healing_enabled: false,
        ai_healer_dom_snippet_chars: 4000,
    }
}

fn bare_event(event_type: EventType) -> RecordedEvent {
    RecordedEvent {
        timestamp: Utc::now(),
        event_type,
        url: None,
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

fn element_with(id: Option<&str>, name: Option<&str>, css: Option<&str>, xpath: Option<&str>) -> ElementInfo {
    ElementInfo {
        tag_name: "button".to_string(),
        id: id.map(str::to_string),
        name: name.map(str::to_string),
        css: css.map(str::to_string),
        xpath: xpath.map(str::to_string),
        ..Default::default()
    }
}

fn session_with(events: Vec<RecordedEvent>) -> RecordedSession {
    let mut session = RecordedSession::new("scenario", "chrome");
    for event in events {
        session.push(event);
    }
    session
}

#[tokio::test]
async fn pure_click_session_reaches_success_with_one_navigate_and_one_click() {
    let driver = Arc::new(FakeDriver::new());
    let handle = ElementHandle("submit-1".to_string());
    driver.set_present(LocatorStrategy::Id, "submit", handle.clone());

    let mut navigate = bare_event(EventType::Navigate);
    navigate.url = Some("https://example.com".to_string());
    let mut click = bare_event(EventType::Click);
    click.element = Some(element_with(Some("submit"), None, None, None));

    let session = session_with(vec![navigate, click]);
    let mut engine = PlayerEngine::new(driver.clone(), test_policy(), "s1");
    let result = engine.run(&session).await;

    assert!(result.success, "{:?}", result.failure_reason);
    assert_eq!(result.steps_completed, 2);
    assert_eq!(result.total_steps, 2);
    assert!(driver.action_log().contains(&"navigate:https://example.com".to_string()));
    assert!(driver.action_log().contains(&format!("click:{}", handle.0)));
}

#[tokio::test]
async fn locator_cascade_falls_through_id_to_name_with_exactly_two_queries() {
    let driver = Arc::new(FakeDriver::new());
    let handle = ElementHandle("name-b".to_string());
    driver.set_absent(LocatorStrategy::Id, "a");
    driver.set_present(LocatorStrategy::Name, "b", handle.clone());

    let mut navigate = bare_event(EventType::Navigate);
    navigate.url = Some("https://example.com".to_string());
    let mut click = bare_event(EventType::Click);
    click.element = Some(element_with(Some("a"), Some("b"), Some("#a"), Some("//button")));

    let session = session_with(vec![navigate, click]);
    let mut engine = PlayerEngine::new(driver.clone(), test_policy(), "s2");
    let result = engine.run(&session).await;

    assert!(result.success, "{:?}", result.failure_reason);
    assert_eq!(
        driver.query_log(),
        vec![
            (LocatorStrategy::Id, "a".to_string()),
            (LocatorStrategy::Name, "b".to_string()),
        ]
    );
}

#[tokio::test]
async fn redacted_keys_are_sent_verbatim_not_rehydrated() {
    let mut input_event = bare_event(EventType::Input);
    input_event.element = Some(ElementInfo {
        tag_name: "input".to_string(),
        id: Some("pw".to_string()),
        element_type: Some("password".to_string()),
        ..Default::default()
    });
    input_event.input_data = Some(InputData::Keys { keys: "hunter2".to_string() });

    let redactor = Redactor::with_defaults();
    assert!(redactor.redact(&mut input_event));
    assert_eq!(
        input_event.input_data,
        Some(InputData::Keys { keys: REDACTED_PLACEHOLDER.to_string() })
    );

    // Round-trip through the session file format before playback, per the
    // on-disk/playback contract: what was written is what gets replayed.
    let session = session_with(vec![input_event]);
    let reloaded = RecordedSession::from_json(&session.to_json().expect("serialize")).expect("deserialize");

    let driver = Arc::new(FakeDriver::new());
    let handle = ElementHandle("pw-handle".to_string());
    driver.set_present(LocatorStrategy::Id, "pw", handle.clone());

    let mut engine = PlayerEngine::new(driver.clone(), test_policy(), "s3");
    let result = engine.run(&reloaded).await;

    assert!(result.success, "{:?}", result.failure_reason);
    assert!(driver
        .action_log()
        .contains(&format!("send_keys:{}:{REDACTED_PLACEHOLDER}", handle.0)));
}

#[tokio::test]
async fn url_contains_checkpoint_passes_case_insensitively() {
    let driver = Arc::new(FakeDriver::new());
    driver.set_current_url("https://app/Dashboard");

    let mut checkpoint = bare_event(EventType::Checkpoint);
    checkpoint.checkpoint_data = Some(CheckpointData {
        checkpoint_type: CheckpointType::Url,
        expected_value: Some("dashboard".to_string()),
        match_mode: MatchMode::Contains,
        case_sensitive: false,
        attribute_name: None,
        baseline_image_path: None,
        screenshot_threshold: 0.0,
        checkpoint_name: Some("dashboard-loaded".to_string()),
    });

    let session = session_with(vec![checkpoint]);
    let mut engine = PlayerEngine::new(driver, test_policy(), "s4");
    let result = engine.run(&session).await;

    assert!(result.success, "{:?}", result.failure_reason);
}

#[test]
fn screenshot_diff_ratio_matches_the_documented_thresholds() {
    let baseline = solid_image(100, 100, [10, 20, 30, 255]);
    let identical = baseline.clone();
    assert_eq!(autoqa_playback::checkpoint::screenshot_diff_ratio(&baseline, &identical), 0.0);

    let mut one_pixel_changed = baseline.clone();
    one_pixel_changed.pixels[0] = 255;
    let ratio = autoqa_playback::checkpoint::screenshot_diff_ratio(&baseline, &one_pixel_changed);
    assert!((ratio - 0.0001).abs() < 1e-9);
}

fn solid_image(width: u32, height: u32, rgba: [u8; 4]) -> RgbaImage {
    let mut pixels = Vec::with_capacity((width * height * 4) as usize);
    for _ in 0..(width * height) {
        pixels.extend_from_slice(&rgba);
    }
    RgbaImage { width, height, pixels }
}

struct FixedChatClient {
    response: String,
}

#[async_trait]
impl ChatClient for FixedChatClient {
    async fn complete(&self, _messages: &[ChatMessage]) -> Result<String, PlaybackError> {
        Ok(self.response.clone())
    }
}

#[tokio::test]
async fn healing_cascade_requeries_with_the_llm_proposed_css_locator() {
    let driver = Arc::new(FakeDriver::new());
    driver.set_absent(LocatorStrategy::Id, "submit");
    let healed_handle = ElementHandle("healed-submit".to_string());
    driver.set_present(LocatorStrategy::Css, "#newId", healed_handle.clone());

    let mut policy = test_policy();
    policy.healing_enabled = true;

    let mut click = bare_event(EventType::Click);
    click.element = Some(element_with(Some("submit"), None, None, None));
    let session = session_with(vec![click]);

    let chat = Arc::new(FixedChatClient { response: "#newId".to_string() });
    let mut engine = PlayerEngine::new(driver.clone(), policy, "s6").with_healing(chat);
    let result = engine.run(&session).await;

    assert!(result.success, "{:?}", result.failure_reason);
    assert!(driver.query_log().contains(&(LocatorStrategy::Css, "#newId".to_string())));
    assert!(driver.action_log().contains(&format!("click:{}", healed_handle.0)));
}

#[tokio::test]
async fn healing_cascade_exhausts_into_healing_exhausted_when_both_stages_fail() {
    let driver = Arc::new(FakeDriver::new());
    driver.set_absent(LocatorStrategy::Id, "submit");

    let mut policy = test_policy();
    policy.healing_enabled = true;

    let mut click = bare_event(EventType::Click);
    // No visible text on the element, so the text-similarity fallback has
    // nothing to build an XPath from either.
    click.element = Some(element_with(Some("submit"), None, None, None));
    let session = session_with(vec![click]);

    let chat = Arc::new(FixedChatClient { response: "CANNOT_HEAL".to_string() });
    let mut engine = PlayerEngine::new(driver, policy, "s6-exhausted").with_healing(chat);
    let result = engine.run(&session).await;

    assert!(!result.success);
    assert!(result.failure_reason.unwrap().contains("HealingExhausted"));
}
