use async_trait::async_trait;

use autoqa_model::{LocatorStrategy, Modifier};

use crate::error::PlaybackError;

/// Opaque handle to a live DOM node, as returned by a successful
/// [`Driver::query`]. Valid only until the next navigation or a staleness
/// event; the playback engine never caches one across steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementHandle(pub String);

#[derive(Debug, Clone, PartialEq)]
pub struct ConsoleLogEntry {
    pub timestamp_utc: chrono::DateTime<chrono::Utc>,
    pub level: String,
    pub message: String,
}

/// A decoded viewport capture. Decoding PNG bytes into pixels is a driver
/// concern; the checkpoint evaluator only ever compares pixel buffers.
#[derive(Debug, Clone, PartialEq)]
pub struct RgbaImage {
    pub width: u32,
    pub height: u32,
    /// Tightly packed RGBA8, row-major, length `width * height * 4`.
    pub pixels: Vec<u8>,
}

/// Everything the playback engine needs from a live browser session.
/// One implementation wraps the debug-protocol connector and DOM
/// enricher; tests use an in-memory fake.
#[async_trait]
pub trait Driver: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), PlaybackError>;
    async fn current_url(&self) -> Result<String, PlaybackError>;
    async fn title(&self) -> Result<String, PlaybackError>;
    /// `document.readyState`-equivalent signal; success condition is `"complete"`.
    async fn page_ready_state(&self) -> Result<String, PlaybackError>;

    async fn query(
        &self,
        strategy: LocatorStrategy,
        value: &str,
    ) -> Result<Option<ElementHandle>, PlaybackError>;
    async fn is_visible(&self, element: &ElementHandle) -> Result<bool, PlaybackError>;
    async fn is_enabled(&self, element: &ElementHandle) -> Result<bool, PlaybackError>;

    async fn click(&self, element: &ElementHandle) -> Result<(), PlaybackError>;
    async fn double_click(&self, element: &ElementHandle) -> Result<(), PlaybackError>;
    async fn context_click(&self, element: &ElementHandle) -> Result<(), PlaybackError>;
    /// Scripted fallback click used when CLICK has coordinates but no
    /// resolvable locator.
    async fn click_at(&self, x: f64, y: f64) -> Result<(), PlaybackError>;

    async fn clear(&self, element: &ElementHandle) -> Result<(), PlaybackError>;
    async fn send_keys(&self, element: &ElementHandle, text: &str) -> Result<(), PlaybackError>;
    async fn send_key_to_element(
        &self,
        element: &ElementHandle,
        key_code: &str,
    ) -> Result<(), PlaybackError>;
    async fn send_key_to_active(&self, key_code: &str) -> Result<(), PlaybackError>;
    async fn press_modifier(&self, modifier: Modifier, down: bool) -> Result<(), PlaybackError>;

    async fn hover(&self, element: &ElementHandle) -> Result<(), PlaybackError>;
    async fn scroll_into_view(&self, element: &ElementHandle) -> Result<(), PlaybackError>;
    async fn scroll_to(&self, x: f64, y: f64) -> Result<(), PlaybackError>;

    async fn text(&self, element: &ElementHandle) -> Result<String, PlaybackError>;
    async fn attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, PlaybackError>;

    async fn select_by_text(
        &self,
        element: &ElementHandle,
        text: &str,
    ) -> Result<bool, PlaybackError>;
    async fn select_by_value(
        &self,
        element: &ElementHandle,
        value: &str,
    ) -> Result<bool, PlaybackError>;
    async fn select_by_index(
        &self,
        element: &ElementHandle,
        index: u32,
    ) -> Result<bool, PlaybackError>;
    async fn is_select_tag(&self, element: &ElementHandle) -> Result<bool, PlaybackError>;
    /// Finds the first displayed element matching an XPath expression,
    /// scoped to `container` when given.
    async fn find_by_xpath(
        &self,
        xpath: &str,
        container: Option<&ElementHandle>,
    ) -> Result<Option<ElementHandle>, PlaybackError>;

    async fn dialog_present(&self) -> Result<bool, PlaybackError>;
    async fn dialog_text(&self) -> Result<Option<String>, PlaybackError>;
    async fn accept_dialog(&self, send_keys: Option<&str>) -> Result<(), PlaybackError>;
    async fn dismiss_dialog(&self) -> Result<(), PlaybackError>;

    async fn window_handles(&self) -> Result<Vec<String>, PlaybackError>;
    async fn current_window_handle(&self) -> Result<String, PlaybackError>;
    async fn switch_to_window(&self, handle: &str) -> Result<(), PlaybackError>;

    /// `token` is a frame index (non-negative integer) or a css
    /// selector/name, per the recorded frame chain element.
    async fn enter_frame(&self, token: &str) -> Result<(), PlaybackError>;
    async fn switch_to_top(&self) -> Result<(), PlaybackError>;

    async fn screenshot(&self) -> Result<RgbaImage, PlaybackError>;
    async fn page_source(&self) -> Result<String, PlaybackError>;
    async fn console_logs(&self) -> Result<Vec<ConsoleLogEntry>, PlaybackError>;

    /// Returns the css selectors (of a fixed candidate list) that currently
    /// match a visible element, used by the popup sentinel's modal scan.
    async fn visible_modal_selectors(
        &self,
        candidates: &[&str],
    ) -> Result<Vec<String>, PlaybackError>;
}
