//! In-memory [`Driver`] fake shared by this crate's unit tests.
use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use autoqa_model::{LocatorStrategy, Modifier};

use crate::driver::{ConsoleLogEntry, Driver, ElementHandle, RgbaImage};
use crate::error::PlaybackError;

#[derive(Clone)]
enum QueryRule {
    Present(ElementHandle),
    Absent,
    AppearsAfter(ElementHandle, u32),
}

#[derive(Default)]
struct FakeState {
    rules: HashMap<(LocatorStrategy, String), QueryRule>,
    call_counts: HashMap<(LocatorStrategy, String), u32>,
    query_log: Vec<(LocatorStrategy, String)>,
    visible: HashMap<String, bool>,
    enabled: HashMap<String, bool>,
    select_tags: HashMap<String, bool>,
    attributes: HashMap<(String, String), String>,
    text: HashMap<String, String>,
    current_url: String,
    title: String,
    ready_state: String,
    ready_state_target: Option<(String, u32)>,
    ready_state_calls: u32,
    window_handles: Vec<String>,
    new_window_after: Option<(String, u32)>,
    window_handles_calls: u32,
    dialog_present: bool,
    dialog_text: Option<String>,
    modal_selectors: Vec<String>,
    screenshot: RgbaImage,
    page_source: String,
    console_logs: Vec<ConsoleLogEntry>,
    action_log: Vec<String>,
    xpath_matches: HashMap<String, ElementHandle>,
    frame_tokens: Vec<String>,
    fail_enter_frame: Option<String>,
}

pub struct FakeDriver {
    state: Mutex<FakeState>,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                ready_state: "complete".to_string(),
                screenshot: RgbaImage {
                    width: 0,
                    height: 0,
                    pixels: Vec::new(),
                },
                ..Default::default()
            }),
        }
    }

    pub fn set_present(&self, strategy: LocatorStrategy, value: &str, handle: ElementHandle) {
        self.state
            .lock()
            .unwrap()
            .rules
            .insert((strategy, value.to_string()), QueryRule::Present(handle));
    }

    pub fn set_absent(&self, strategy: LocatorStrategy, value: &str) {
        self.state
            .lock()
            .unwrap()
            .rules
            .insert((strategy, value.to_string()), QueryRule::Absent);
    }

    pub fn schedule_appear_after(
        &self,
        strategy: LocatorStrategy,
        value: &str,
        handle: ElementHandle,
        after_calls: u32,
    ) {
        self.state.lock().unwrap().rules.insert(
            (strategy, value.to_string()),
            QueryRule::AppearsAfter(handle, after_calls),
        );
    }

    pub fn set_visible(&self, element: &ElementHandle, visible: bool) {
        self.state.lock().unwrap().visible.insert(element.0.clone(), visible);
    }

    pub fn set_enabled(&self, element: &ElementHandle, enabled: bool) {
        self.state.lock().unwrap().enabled.insert(element.0.clone(), enabled);
    }

    pub fn set_select_tag(&self, element: &ElementHandle, is_select: bool) {
        self.state
            .lock()
            .unwrap()
            .select_tags
            .insert(element.0.clone(), is_select);
    }

    pub fn set_attribute(&self, element: &ElementHandle, name: &str, value: &str) {
        self.state
            .lock()
            .unwrap()
            .attributes
            .insert((element.0.clone(), name.to_string()), value.to_string());
    }

    pub fn set_text(&self, element: &ElementHandle, text: &str) {
        self.state.lock().unwrap().text.insert(element.0.clone(), text.to_string());
    }

    pub fn set_current_url(&self, url: &str) {
        self.state.lock().unwrap().current_url = url.to_string();
    }

    pub fn set_title(&self, title: &str) {
        self.state.lock().unwrap().title = title.to_string();
    }

    pub fn schedule_ready_state_after(&self, initial: &str, target: &str, after_calls: u32) {
        let mut state = self.state.lock().unwrap();
        state.ready_state = initial.to_string();
        state.ready_state_target = Some((target.to_string(), after_calls));
    }

    pub fn set_window_handles(&self, handles: Vec<String>) {
        self.state.lock().unwrap().window_handles = handles;
    }

    pub fn schedule_new_window_after(&self, handle: String, after_calls: u32) {
        self.state.lock().unwrap().new_window_after = Some((handle, after_calls));
    }

    pub fn set_dialog(&self, present: bool, text: Option<&str>) {
        let mut state = self.state.lock().unwrap();
        state.dialog_present = present;
        state.dialog_text = text.map(str::to_string);
    }

    pub fn set_modal_selectors(&self, selectors: Vec<String>) {
        self.state.lock().unwrap().modal_selectors = selectors;
    }

    pub fn set_screenshot(&self, image: RgbaImage) {
        self.state.lock().unwrap().screenshot = image;
    }

    pub fn set_page_source(&self, source: &str) {
        self.state.lock().unwrap().page_source = source.to_string();
    }

    pub fn set_console_logs(&self, logs: Vec<ConsoleLogEntry>) {
        self.state.lock().unwrap().console_logs = logs;
    }

    pub fn set_xpath_match(&self, xpath: &str, handle: ElementHandle) {
        self.state.lock().unwrap().xpath_matches.insert(xpath.to_string(), handle);
    }

    pub fn fail_enter_frame(&self, token: &str) {
        self.state.lock().unwrap().fail_enter_frame = Some(token.to_string());
    }

    pub fn query_log(&self) -> Vec<(LocatorStrategy, String)> {
        self.state.lock().unwrap().query_log.clone()
    }

    pub fn action_log(&self) -> Vec<String> {
        self.state.lock().unwrap().action_log.clone()
    }

    pub fn frame_tokens(&self) -> Vec<String> {
        self.state.lock().unwrap().frame_tokens.clone()
    }

    fn log(&self, action: impl Into<String>) {
        self.state.lock().unwrap().action_log.push(action.into());
    }
}

#[async_trait]
impl Driver for FakeDriver {
    async fn navigate(&self, url: &str) -> Result<(), PlaybackError> {
        self.state.lock().unwrap().current_url = url.to_string();
        self.log(format!("navigate:{url}"));
        Ok(())
    }

    async fn current_url(&self) -> Result<String, PlaybackError> {
        Ok(self.state.lock().unwrap().current_url.clone())
    }

    async fn title(&self) -> Result<String, PlaybackError> {
        Ok(self.state.lock().unwrap().title.clone())
    }

    async fn page_ready_state(&self) -> Result<String, PlaybackError> {
        let mut state = self.state.lock().unwrap();
        state.ready_state_calls += 1;
        if let Some((target, after)) = state.ready_state_target.clone() {
            if state.ready_state_calls >= after {
                state.ready_state = target;
            }
        }
        Ok(state.ready_state.clone())
    }

    async fn query(
        &self,
        strategy: LocatorStrategy,
        value: &str,
    ) -> Result<Option<ElementHandle>, PlaybackError> {
        let mut state = self.state.lock().unwrap();
        state.query_log.push((strategy, value.to_string()));
        let count = state
            .call_counts
            .entry((strategy, value.to_string()))
            .or_insert(0);
        *count += 1;
        let count = *count;
        match state.rules.get(&(strategy, value.to_string())).cloned() {
            Some(QueryRule::Present(handle)) => Ok(Some(handle)),
            Some(QueryRule::Absent) => Ok(None),
            Some(QueryRule::AppearsAfter(handle, after)) => {
                Ok(if count >= after { Some(handle) } else { None })
            }
            None => Ok(None),
        }
    }

    async fn is_visible(&self, element: &ElementHandle) -> Result<bool, PlaybackError> {
        Ok(*self.state.lock().unwrap().visible.get(&element.0).unwrap_or(&true))
    }

    async fn is_enabled(&self, element: &ElementHandle) -> Result<bool, PlaybackError> {
        Ok(*self.state.lock().unwrap().enabled.get(&element.0).unwrap_or(&true))
    }

    async fn click(&self, element: &ElementHandle) -> Result<(), PlaybackError> {
        self.log(format!("click:{}", element.0));
        Ok(())
    }

    async fn double_click(&self, element: &ElementHandle) -> Result<(), PlaybackError> {
        self.log(format!("double_click:{}", element.0));
        Ok(())
    }

    async fn context_click(&self, element: &ElementHandle) -> Result<(), PlaybackError> {
        self.log(format!("context_click:{}", element.0));
        Ok(())
    }

    async fn click_at(&self, x: f64, y: f64) -> Result<(), PlaybackError> {
        self.log(format!("click_at:{x},{y}"));
        Ok(())
    }

    async fn clear(&self, element: &ElementHandle) -> Result<(), PlaybackError> {
        self.log(format!("clear:{}", element.0));
        Ok(())
    }

    async fn send_keys(&self, element: &ElementHandle, text: &str) -> Result<(), PlaybackError> {
        self.log(format!("send_keys:{}:{text}", element.0));
        Ok(())
    }

    async fn send_key_to_element(
        &self,
        element: &ElementHandle,
        key_code: &str,
    ) -> Result<(), PlaybackError> {
        self.log(format!("send_key_to_element:{}:{key_code}", element.0));
        Ok(())
    }

    async fn send_key_to_active(&self, key_code: &str) -> Result<(), PlaybackError> {
        self.log(format!("send_key_to_active:{key_code}"));
        Ok(())
    }

    async fn press_modifier(&self, modifier: Modifier, down: bool) -> Result<(), PlaybackError> {
        self.log(format!("press_modifier:{modifier:?}:{down}"));
        Ok(())
    }

    async fn hover(&self, element: &ElementHandle) -> Result<(), PlaybackError> {
        self.log(format!("hover:{}", element.0));
        Ok(())
    }

    async fn scroll_into_view(&self, element: &ElementHandle) -> Result<(), PlaybackError> {
        self.log(format!("scroll_into_view:{}", element.0));
        Ok(())
    }

    async fn scroll_to(&self, x: f64, y: f64) -> Result<(), PlaybackError> {
        self.log(format!("scroll_to:{x},{y}"));
        Ok(())
    }

    async fn text(&self, element: &ElementHandle) -> Result<String, PlaybackError> {
        Ok(self.state.lock().unwrap().text.get(&element.0).cloned().unwrap_or_default())
    }

    async fn attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, PlaybackError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .attributes
            .get(&(element.0.clone(), name.to_string()))
            .cloned())
    }

    async fn select_by_text(&self, element: &ElementHandle, text: &str) -> Result<bool, PlaybackError> {
        self.log(format!("select_by_text:{}:{text}", element.0));
        Ok(true)
    }

    async fn select_by_value(
        &self,
        element: &ElementHandle,
        value: &str,
    ) -> Result<bool, PlaybackError> {
        self.log(format!("select_by_value:{}:{value}", element.0));
        Ok(true)
    }

    async fn select_by_index(
        &self,
        element: &ElementHandle,
        index: u32,
    ) -> Result<bool, PlaybackError> {
        self.log(format!("select_by_index:{}:{index}", element.0));
        Ok(true)
    }

    async fn is_select_tag(&self, element: &ElementHandle) -> Result<bool, PlaybackError> {
        Ok(*self.state.lock().unwrap().select_tags.get(&element.0).unwrap_or(&false))
    }

    async fn find_by_xpath(
        &self,
        xpath: &str,
        _container: Option<&ElementHandle>,
    ) -> Result<Option<ElementHandle>, PlaybackError> {
        Ok(self.state.lock().unwrap().xpath_matches.get(xpath).cloned())
    }

    async fn dialog_present(&self) -> Result<bool, PlaybackError> {
        Ok(self.state.lock().unwrap().dialog_present)
    }

    async fn dialog_text(&self) -> Result<Option<String>, PlaybackError> {
        Ok(self.state.lock().unwrap().dialog_text.clone())
    }

    async fn accept_dialog(&self, send_keys: Option<&str>) -> Result<(), PlaybackError> {
        self.log(format!("accept_dialog:{send_keys:?}"));
        self.state.lock().unwrap().dialog_present = false;
        Ok(())
    }

    async fn dismiss_dialog(&self) -> Result<(), PlaybackError> {
        self.log("dismiss_dialog");
        self.state.lock().unwrap().dialog_present = false;
        Ok(())
    }

    async fn window_handles(&self) -> Result<Vec<String>, PlaybackError> {
        let mut state = self.state.lock().unwrap();
        state.window_handles_calls += 1;
        if let Some((handle, after)) = state.new_window_after.clone() {
            if state.window_handles_calls >= after && !state.window_handles.contains(&handle) {
                state.window_handles.push(handle);
            }
        }
        Ok(state.window_handles.clone())
    }

    async fn current_window_handle(&self) -> Result<String, PlaybackError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .window_handles
            .first()
            .cloned()
            .unwrap_or_default())
    }

    async fn switch_to_window(&self, handle: &str) -> Result<(), PlaybackError> {
        self.log(format!("switch_to_window:{handle}"));
        Ok(())
    }

    async fn enter_frame(&self, token: &str) -> Result<(), PlaybackError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_enter_frame.as_deref() == Some(token) {
            return Err(PlaybackError::FrameNavigation {
                chain: vec![token.to_string()],
                detail: "frame not found".to_string(),
            });
        }
        state.frame_tokens.push(token.to_string());
        Ok(())
    }

    async fn switch_to_top(&self) -> Result<(), PlaybackError> {
        self.state.lock().unwrap().frame_tokens.clear();
        Ok(())
    }

    async fn screenshot(&self) -> Result<RgbaImage, PlaybackError> {
        Ok(self.state.lock().unwrap().screenshot.clone())
    }

    async fn page_source(&self) -> Result<String, PlaybackError> {
        Ok(self.state.lock().unwrap().page_source.clone())
    }

    async fn console_logs(&self) -> Result<Vec<ConsoleLogEntry>, PlaybackError> {
        Ok(self.state.lock().unwrap().console_logs.clone())
    }

    async fn visible_modal_selectors(
        &self,
        candidates: &[&str],
    ) -> Result<Vec<String>, PlaybackError> {
        let state = self.state.lock().unwrap();
        Ok(candidates
            .iter()
            .filter(|candidate| state.modal_selectors.iter().any(|present| present == *candidate))
            .map(|candidate| candidate.to_string())
            .collect())
    }
}
