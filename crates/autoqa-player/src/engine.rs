use std::sync::Arc;

use autoqa_heal::ChatClient;
use autoqa_model::{
    AlertAction, CheckpointData, ElementInfo, EventType, InputData, LocatorStrategy,
    ObjectRepository, RecordedEvent, RecordedSession,
};
use autoqa_playback::driver::{Driver, ElementHandle};
use autoqa_playback::{checkpoint, frame_nav, locator, sentinel, PlaybackError};

use crate::keymap::canonicalize_key_code;
use crate::policy::PlaybackPolicy;
use crate::result::PlaybackResult;

/// `about:blank` is not a real target worth auto-navigating to.
const BLANK_PAGE_SENTINEL: &str = "about:blank";

/// The playback dispatch state machine: drives one `RecordedSession`
/// against a live or fake [`Driver`], handler by handler.
pub struct PlayerEngine {
    driver: Arc<dyn Driver>,
    policy: PlaybackPolicy,
    session_id: String,
    object_repository: Option<ObjectRepository>,
    chat_client: Option<Arc<dyn ChatClient>>,
    known_window_count: usize,
}

impl PlayerEngine {
    pub fn new(driver: Arc<dyn Driver>, policy: PlaybackPolicy, session_id: impl Into<String>) -> Self {
        Self {
            driver,
            policy,
            session_id: session_id.into(),
            object_repository: None,
            chat_client: None,
            known_window_count: 0,
        }
    }

    pub fn with_object_repository(mut self, repository: ObjectRepository) -> Self {
        self.object_repository = Some(repository);
        self
    }

    pub fn with_healing(mut self, chat_client: Arc<dyn ChatClient>) -> Self {
        self.chat_client = Some(chat_client);
        self
    }

    pub async fn run(&mut self, session: &RecordedSession) -> PlaybackResult {
        let total_steps = session.events.len();
        if let Err(error) = self.pre_playback(session).await {
            return PlaybackResult::failure(0, total_steps, error.terminal_message(0, total_steps));
        }

        self.known_window_count = self.driver.window_handles().await.map(|h| h.len()).unwrap_or(1);

        for (index, event) in session.events.iter().enumerate() {
            if let Err(error) = self.run_step(event).await {
                let reason = error.terminal_message(index, total_steps);
                self.collect_failure_evidence(index, event).await;
                return PlaybackResult::failure(index, total_steps, reason);
            }
        }

        PlaybackResult::success(total_steps)
    }

    async fn pre_playback(&self, session: &RecordedSession) -> Result<(), PlaybackError> {
        let starts_with_navigate =
            matches!(session.events.first().map(|event| event.event_type), Some(EventType::Navigate));
        if starts_with_navigate {
            return Ok(());
        }
        let Some(url) = session
            .events
            .iter()
            .find_map(|event| event.url.as_deref())
            .filter(|url| !url.trim().is_empty() && *url != BLANK_PAGE_SENTINEL)
        else {
            return Ok(());
        };
        self.driver.navigate(url).await?;
        autoqa_playback::waits::wait_for_page_load(&*self.driver, self.policy.page_load_timeout).await
    }

    async fn run_step(&mut self, event: &RecordedEvent) -> Result<(), PlaybackError> {
        let report = sentinel::check(&*self.driver, self.known_window_count).await?;
        if report.extra_windows_detected {
            tracing::warn!("unexpected window detected, leaving baseline untouched until an intentional switch");
        }

        let frame_entered = !event.frame_chain.is_empty();
        if frame_entered {
            frame_nav::enter_frames(&*self.driver, &event.frame_chain).await?;
        }

        let dispatch_result = self.dispatch(event).await;

        if frame_entered {
            // Best-effort: a failing exit must not mask the dispatch error.
            let _ = frame_nav::exit_frames(&*self.driver).await;
        }

        dispatch_result?;
        tokio::time::sleep(self.policy.step_delay).await;
        Ok(())
    }

    async fn collect_failure_evidence(&self, step_index: usize, event: &RecordedEvent) {
        if let Err(error) = autoqa_playback::evidence::collect(
            &*self.driver,
            &self.policy.evidence_dir,
            &self.session_id,
            step_index,
            event,
            event.url.as_deref(),
            self.policy.screenshot_on_failure,
            self.policy.page_source_on_failure,
            self.policy.console_logs_on_failure,
        )
        .await
        {
            tracing::warn!(%error, step_index, "failed to collect evidence for failed step");
        }
    }

    fn effective_element_info(&self, event: &RecordedEvent) -> Option<ElementInfo> {
        if event.element.is_some() {
            return event.element.clone();
        }
        let object_name = event.object_name.as_ref()?;
        let repository = self.object_repository.as_ref()?;
        let object = repository.get(object_name)?;
        let mut info = ElementInfo::default();
        for (strategy, value) in &object.locators {
            match strategy {
                LocatorStrategy::Id => info.id.get_or_insert_with(|| value.clone()),
                LocatorStrategy::Name => info.name.get_or_insert_with(|| value.clone()),
                LocatorStrategy::Css => info.css.get_or_insert_with(|| value.clone()),
                LocatorStrategy::Xpath => info.xpath.get_or_insert_with(|| value.clone()),
                LocatorStrategy::Healed | LocatorStrategy::Text => continue,
            };
        }
        Some(info)
    }

    /// Resolves the element for an event, invoking the healing cascade
    /// exactly once if the primary resolver fails and healing is enabled.
    async fn resolve(&self, event: &RecordedEvent) -> Result<ElementHandle, PlaybackError> {
        let info = self
            .effective_element_info(event)
            .ok_or_else(|| PlaybackError::Config("event requires an element but carries neither inline element nor a resolvable objectName".to_string()))?;

        let primary = locator::resolve(&*self.driver, &info, self.policy.locator_fallback_attempts).await;
        match primary {
            Ok(resolved) => Ok(resolved.handle),
            Err(original) => self.try_heal(&info, original).await,
        }
    }

    async fn try_heal(&self, info: &ElementInfo, original: PlaybackError) -> Result<ElementHandle, PlaybackError> {
        let (Some(chat_client), true) = (&self.chat_client, self.policy.healing_enabled) else {
            return Err(original);
        };

        let url = self.driver.current_url().await.unwrap_or_default();
        let dom_source = self.driver.page_source().await.unwrap_or_default();
        let healed = autoqa_heal::heal(
            chat_client.as_ref(),
            info,
            &url,
            &dom_source,
            self.policy.ai_healer_dom_snippet_chars,
            original,
        )
        .await?;

        match self.driver.query(healed.strategy, &healed.value).await? {
            Some(handle) => Ok(handle),
            None => Err(PlaybackError::ElementNotFound {
                tried: vec![healed.strategy],
                candidates: vec![healed.value],
                identity: format!("{}(healed)", info.tag_name),
            }),
        }
    }

    async fn dispatch(&mut self, event: &RecordedEvent) -> Result<(), PlaybackError> {
        match event.event_type {
            EventType::Navigate => self.handle_navigate(event).await,
            EventType::Click => self.handle_click(event).await,
            EventType::DoubleClick => {
                let handle = self.resolve(event).await?;
                self.driver.double_click(&handle).await
            }
            EventType::ContextMenu => {
                let handle = self.resolve(event).await?;
                self.driver.context_click(&handle).await
            }
            EventType::Input => self.handle_input(event).await,
            EventType::KeyPress => self.handle_key_press(event).await,
            EventType::Select => self.handle_select(event).await,
            EventType::Scroll => self.handle_scroll(event).await,
            EventType::Alert => self.handle_alert(event).await,
            EventType::WindowSwitch => self.handle_window_switch(event).await,
            EventType::Hover => {
                let handle = self.resolve(event).await?;
                self.driver.hover(&handle).await
            }
            EventType::FrameSwitch => Ok(()),
            EventType::DragDrop => {
                tracing::warn!("DRAG_DROP is unimplemented, skipping step without failure");
                Ok(())
            }
            EventType::Wait => Ok(()),
            EventType::Checkpoint => self.handle_checkpoint(event).await,
        }
    }

    /// Polls an already-resolved element handle for visible+enabled, since
    /// the strategy/value-based `wait_for_clickable` in `autoqa-playback`
    /// would have to re-run locator resolution (including a possible
    /// healed locator) rather than reuse the handle CLICK already has.
    async fn wait_for_handle_clickable(&self, handle: &ElementHandle) -> Result<(), PlaybackError> {
        let deadline = std::time::Instant::now() + self.policy.explicit_wait;
        loop {
            if self.driver.is_visible(handle).await? && self.driver.is_enabled(handle).await? {
                return Ok(());
            }
            if std::time::Instant::now() >= deadline {
                return Err(PlaybackError::Timeout {
                    wait_kind: "waitForClickable".to_string(),
                    timeout_sec: self.policy.explicit_wait.as_secs(),
                    query: handle.0.clone(),
                });
            }
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }
    }

    async fn handle_navigate(&self, event: &RecordedEvent) -> Result<(), PlaybackError> {
        let url = event
            .url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| PlaybackError::Config("NAVIGATE event is missing a url".to_string()))?;
        self.driver.navigate(url).await?;
        autoqa_playback::waits::wait_for_page_load(&*self.driver, self.policy.page_load_timeout).await
    }

    async fn handle_click(&self, event: &RecordedEvent) -> Result<(), PlaybackError> {
        match self.resolve(event).await {
            Ok(handle) => {
                self.wait_for_handle_clickable(&handle).await?;
                self.driver.click(&handle).await
            }
            Err(error) => {
                let Some(coords) = event.coordinates else {
                    return Err(error);
                };
                self.driver.click_at(coords.x, coords.y).await
            }
        }
    }

    async fn handle_input(&self, event: &RecordedEvent) -> Result<(), PlaybackError> {
        let handle = self.resolve(event).await?;
        let keys = match &event.input_data {
            Some(InputData::Keys { keys }) => keys.clone(),
            Some(_) => String::new(),
            None => return Err(PlaybackError::Config("INPUT event is missing inputData".to_string())),
        };
        self.driver.clear(&handle).await?;
        self.driver.send_keys(&handle, &keys).await
    }

    async fn handle_key_press(&self, event: &RecordedEvent) -> Result<(), PlaybackError> {
        let Some(InputData::KeyPress { key_code, modifiers }) = &event.input_data else {
            return Err(PlaybackError::Config("KEY_PRESS event is missing inputData".to_string()));
        };
        let canonical = canonicalize_key_code(key_code)
            .ok_or_else(|| PlaybackError::Config(format!("unknown keyCode '{key_code}'")))?;

        let element = match &event.element {
            Some(_) => Some(self.resolve(event).await?),
            None => None,
        };

        for modifier in modifiers {
            self.driver.press_modifier(*modifier, true).await?;
        }

        let result = match &element {
            Some(handle) => self.driver.send_key_to_element(handle, canonical).await,
            None => self.driver.send_key_to_active(canonical).await,
        };

        for modifier in modifiers.iter().rev() {
            self.driver.press_modifier(*modifier, false).await?;
        }

        result
    }

    async fn handle_select(&self, event: &RecordedEvent) -> Result<(), PlaybackError> {
        let handle = self.resolve(event).await?;
        let Some(InputData::Select { text, value, index }) = &event.input_data else {
            return Err(PlaybackError::Config("SELECT event is missing inputData".to_string()));
        };

        if self.driver.is_select_tag(&handle).await? {
            if let Some(text) = text {
                if self.driver.select_by_text(&handle, text).await? {
                    return Ok(());
                }
            }
            if let Some(value) = value {
                if self.driver.select_by_value(&handle, value).await? {
                    return Ok(());
                }
            }
            if let Some(index) = index {
                if self.driver.select_by_index(&handle, *index).await? {
                    return Ok(());
                }
            }
            return Err(PlaybackError::ElementNotFound {
                tried: vec![LocatorStrategy::Text],
                candidates: vec![text.clone().or_else(|| value.clone()).unwrap_or_default()],
                identity: "select option".to_string(),
            });
        }

        let target = text
            .as_deref()
            .or(value.as_deref())
            .ok_or_else(|| PlaybackError::Config("SELECT on a custom dropdown needs text or value".to_string()))?;
        self.driver.click(&handle).await?;
        let xpath = format!(".//*[normalize-space(text())='{}']", target.replace('\'', "\\'"));
        if let Some(option) = self.driver.find_by_xpath(&xpath, Some(&handle)).await? {
            return self.driver.click(&option).await;
        }
        let page_wide = format!("//*[normalize-space(text())='{}']", target.replace('\'', "\\'"));
        match self.driver.find_by_xpath(&page_wide, None).await? {
            Some(option) => self.driver.click(&option).await,
            None => Err(PlaybackError::ElementNotFound {
                tried: vec![LocatorStrategy::Xpath],
                candidates: vec![page_wide],
                identity: "custom dropdown option".to_string(),
            }),
        }
    }

    async fn handle_scroll(&self, event: &RecordedEvent) -> Result<(), PlaybackError> {
        if event.element.is_some() || event.object_name.is_some() {
            let handle = self.resolve(event).await?;
            return self.driver.scroll_into_view(&handle).await;
        }
        let coords = event
            .coordinates
            .ok_or_else(|| PlaybackError::Config("SCROLL event has neither an element nor coordinates".to_string()))?;
        self.driver.scroll_to(coords.x, coords.y).await
    }

    async fn handle_alert(&self, event: &RecordedEvent) -> Result<(), PlaybackError> {
        autoqa_playback::waits::wait_for_alert_present(&*self.driver, self.policy.explicit_wait).await?;
        let (action, text) = match &event.input_data {
            Some(InputData::Alert { action, text }) => (*action, text.clone()),
            _ => (AlertAction::Accept, None),
        };
        match action {
            AlertAction::Accept => self.driver.accept_dialog(None).await,
            AlertAction::Dismiss => self.driver.dismiss_dialog().await,
            AlertAction::SendKeys => self.driver.accept_dialog(text.as_deref()).await,
        }
    }

    async fn handle_window_switch(&mut self, event: &RecordedEvent) -> Result<(), PlaybackError> {
        let handles = self.driver.window_handles().await?;
        let target = match &event.window_handle {
            Some(handle) if handles.contains(handle) => handle.clone(),
            _ => {
                let known: Vec<String> = handles;
                autoqa_playback::waits::wait_for_new_window(&*self.driver, &known, self.policy.explicit_wait).await?
            }
        };
        self.driver.switch_to_window(&target).await?;
        self.known_window_count = self.driver.window_handles().await?.len();
        autoqa_playback::waits::wait_for_page_load(&*self.driver, self.policy.page_load_timeout).await
    }

    async fn handle_checkpoint(&self, event: &RecordedEvent) -> Result<(), PlaybackError> {
        let checkpoint_data: &CheckpointData = event
            .checkpoint_data
            .as_ref()
            .ok_or_else(|| PlaybackError::Config("CHECKPOINT event is missing checkpointData".to_string()))?;

        let element = if event.element.is_some() || event.object_name.is_some() {
            Some(self.resolve(event).await?)
        } else {
            None
        };

        let baseline = match &checkpoint_data.baseline_image_path {
            Some(path) => crate::baseline::load(std::path::Path::new(path)),
            None => None,
        };

        checkpoint::evaluate(&*self.driver, checkpoint_data, element.as_ref(), baseline.as_ref()).await
    }
}
