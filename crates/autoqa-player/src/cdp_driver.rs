use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use autoqa_dom::evaluator::ScriptEvaluator;
use autoqa_model::{LocatorStrategy, Modifier};
use autoqa_playback::driver::{ConsoleLogEntry, Driver, ElementHandle, RgbaImage};
use autoqa_playback::PlaybackError;
use autoqa_transport::DebugConnector;
use base64::Engine;
use serde_json::{json, Value};

#[derive(Debug, Clone, Default)]
struct DialogState {
    present: bool,
    message: Option<String>,
}

#[derive(Debug, Default)]
struct ModifierState {
    held: HashSet<Modifier>,
}

impl ModifierState {
    fn flags(&self) -> (bool, bool, bool, bool) {
        (
            self.held.contains(&Modifier::Ctrl),
            self.held.contains(&Modifier::Shift),
            self.held.contains(&Modifier::Alt),
            self.held.contains(&Modifier::Meta),
        )
    }
}

/// Live `Driver` implementation: DOM queries, reads, and actions are a
/// single `Runtime.evaluate` script per call (the same single-round-trip
/// pattern `autoqa-dom`'s enricher uses); navigation, dialogs, windows,
/// and console capture go through their own debug-protocol domains
/// directly on the connector.
///
/// Element handles are opaque ids into a page-side registry
/// (`window.__autoqaHandles`) rather than real CDP remote-object ids,
/// since the connector only exposes `Runtime.evaluate` with
/// `returnByValue: true` (see `autoqa-transport`), not a remote-object
/// protocol. Screenshot capture decodes `Page.captureScreenshot`'s
/// base64 PNG payload via the `image` crate into the same `RgbaImage`
/// shape `evidence.rs`/`checkpoint.rs` already operate on.
pub struct CdpDriver {
    connector: Arc<DebugConnector>,
    deadline: Duration,
    frame_chain: Mutex<Vec<String>>,
    modifiers: Mutex<ModifierState>,
    dialog: Arc<Mutex<DialogState>>,
    console_log: Arc<Mutex<Vec<ConsoleLogEntry>>>,
    next_handle: AtomicU64,
}

impl CdpDriver {
    pub async fn connect(
        ws_url: &str,
        deadline: Duration,
        max_connect_attempts: u32,
        connect_retry_delay: Duration,
    ) -> Result<Self, PlaybackError> {
        let connector = DebugConnector::connect(ws_url, max_connect_attempts, connect_retry_delay)
            .await
            .map_err(|error| PlaybackError::Transport(error.to_string()))?;
        let connector = Arc::new(connector);

        if let Err(error) = connector.enable("Page", deadline).await {
            tracing::warn!(%error, "failed to enable Page domain");
        }
        if let Err(error) = connector.enable("Log", deadline).await {
            tracing::warn!(%error, "failed to enable Log domain");
        }

        let dialog = Arc::new(Mutex::new(DialogState::default()));
        let console_log = Arc::new(Mutex::new(Vec::new()));
        spawn_event_listener(Arc::clone(&connector), Arc::clone(&dialog), Arc::clone(&console_log));

        Ok(Self {
            connector,
            deadline,
            frame_chain: Mutex::new(Vec::new()),
            modifiers: Mutex::new(ModifierState::default()),
            dialog,
            console_log,
            next_handle: AtomicU64::new(1),
        })
    }

    async fn eval(&self, script: &str) -> Result<Value, PlaybackError> {
        ScriptEvaluator::evaluate(self.connector.as_ref(), script, self.deadline)
            .await
            .map_err(|error| PlaybackError::ProtocolError {
                method: "Runtime.evaluate".to_string(),
                details: error.to_string(),
            })
    }

    /// A JS expression evaluating to the `Document` for the current frame
    /// chain, descending through nested `<iframe>` elements by index or
    /// name/selector token.
    fn document_expr(&self) -> String {
        let chain = self.frame_chain.lock().expect("frame_chain mutex poisoned");
        let mut expr = "document".to_string();
        for token in chain.iter() {
            let frame_expr = if let Ok(index) = token.parse::<usize>() {
                format!("{expr}.querySelectorAll('iframe')[{index}]")
            } else {
                let token_json = serde_json::to_string(token).unwrap_or_default();
                format!(
                    "({expr}.querySelector('iframe[name=' + JSON.stringify({token_json}) + ']') || {expr}.getElementById({token_json}))"
                )
            };
            expr = format!("{frame_expr}.contentDocument");
        }
        expr
    }

    fn handle_expr(handle: &ElementHandle) -> String {
        let handle_json = serde_json::to_string(&handle.0).unwrap_or_default();
        format!("window.__autoqaHandles[{handle_json}]")
    }

    fn find_expression(&self, strategy: LocatorStrategy, value: &str) -> Result<String, PlaybackError> {
        let value_json = serde_json::to_string(value).unwrap_or_default();
        let document = self.document_expr();
        Ok(match strategy {
            LocatorStrategy::Id => format!("{document}.getElementById({value_json})"),
            LocatorStrategy::Name => format!("{document}.getElementsByName({value_json})[0]"),
            LocatorStrategy::Css => format!("{document}.querySelector({value_json})"),
            LocatorStrategy::Xpath => format!(
                "document.evaluate({value_json}, {document}, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue"
            ),
            LocatorStrategy::Healed | LocatorStrategy::Text => {
                return Err(PlaybackError::Config(format!("{strategy:?} is not a live query strategy")));
            }
        })
    }

    async fn register_element(&self, find_expr: &str) -> Result<Option<ElementHandle>, PlaybackError> {
        let script = format!(
            "(function(){{ var el = {find_expr}; if (!el) {{ return null; }} \
             if (!window.__autoqaHandles) {{ window.__autoqaHandles = {{}}; }} \
             var id = String({next}); window.__autoqaHandles[id] = el; return id; }})()",
            next = self.next_handle.fetch_add(1, Ordering::SeqCst),
        );
        match self.eval(&script).await? {
            Value::String(id) => Ok(Some(ElementHandle(id))),
            _ => Ok(None),
        }
    }

    fn modifier_key_flags(&self) -> (bool, bool, bool, bool) {
        self.modifiers.lock().expect("modifiers mutex poisoned").flags()
    }
}

fn spawn_event_listener(
    connector: Arc<DebugConnector>,
    dialog: Arc<Mutex<DialogState>>,
    console_log: Arc<Mutex<Vec<ConsoleLogEntry>>>,
) {
    let mut events = connector.subscribe_events();
    tokio::spawn(async move {
        while let Ok(frame) = events.recv().await {
            let Some(method) = frame.get("method").and_then(Value::as_str) else {
                continue;
            };
            match method {
                "Page.javascriptDialogOpening" => {
                    let message = frame
                        .get("params")
                        .and_then(|params| params.get("message"))
                        .and_then(Value::as_str)
                        .map(str::to_string);
                    *dialog.lock().expect("dialog mutex poisoned") = DialogState { present: true, message };
                }
                "Page.javascriptDialogClosed" => {
                    *dialog.lock().expect("dialog mutex poisoned") = DialogState::default();
                }
                "Log.entryAdded" => {
                    let Some(entry) = frame.get("params").and_then(|params| params.get("entry")) else {
                        continue;
                    };
                    let level = entry.get("level").and_then(Value::as_str).unwrap_or("info").to_string();
                    let message = entry.get("text").and_then(Value::as_str).unwrap_or_default().to_string();
                    console_log
                        .lock()
                        .expect("console_log mutex poisoned")
                        .push(ConsoleLogEntry { timestamp_utc: chrono::Utc::now(), level, message });
                }
                _ => {}
            }
        }
    });
}

#[async_trait]
impl Driver for CdpDriver {
    async fn navigate(&self, url: &str) -> Result<(), PlaybackError> {
        self.connector
            .send("Page.navigate", json!({ "url": url }), self.deadline)
            .await
            .map(|_| ())
            .map_err(|error| PlaybackError::ProtocolError { method: "Page.navigate".to_string(), details: error.to_string() })
    }

    async fn current_url(&self) -> Result<String, PlaybackError> {
        Ok(self.eval("window.location.href").await?.as_str().unwrap_or_default().to_string())
    }

    async fn title(&self) -> Result<String, PlaybackError> {
        Ok(self.eval("document.title").await?.as_str().unwrap_or_default().to_string())
    }

    async fn page_ready_state(&self) -> Result<String, PlaybackError> {
        Ok(self.eval("document.readyState").await?.as_str().unwrap_or_default().to_string())
    }

    async fn query(&self, strategy: LocatorStrategy, value: &str) -> Result<Option<ElementHandle>, PlaybackError> {
        let find_expr = self.find_expression(strategy, value)?;
        self.register_element(&find_expr).await
    }

    async fn is_visible(&self, element: &ElementHandle) -> Result<bool, PlaybackError> {
        let handle = Self::handle_expr(element);
        let script = format!(
            "(function(){{ var el = {handle}; if (!el) return false; \
             var rects = el.getClientRects(); var style = window.getComputedStyle(el); \
             return rects.length > 0 && style.visibility !== 'hidden' && style.display !== 'none'; }})()"
        );
        Ok(self.eval(&script).await?.as_bool().unwrap_or(false))
    }

    async fn is_enabled(&self, element: &ElementHandle) -> Result<bool, PlaybackError> {
        let handle = Self::handle_expr(element);
        let script = format!("(function(){{ var el = {handle}; return !!el && !el.disabled; }})()");
        Ok(self.eval(&script).await?.as_bool().unwrap_or(false))
    }

    async fn click(&self, element: &ElementHandle) -> Result<(), PlaybackError> {
        self.dispatch_mouse_event(element, "click").await
    }

    async fn double_click(&self, element: &ElementHandle) -> Result<(), PlaybackError> {
        self.dispatch_mouse_event(element, "dblclick").await
    }

    async fn context_click(&self, element: &ElementHandle) -> Result<(), PlaybackError> {
        self.dispatch_mouse_event(element, "contextmenu").await
    }

    async fn click_at(&self, x: f64, y: f64) -> Result<(), PlaybackError> {
        let script = format!(
            "(function(){{ var el = document.elementFromPoint({x}, {y}); \
             if (!el) return false; el.click(); return true; }})()"
        );
        self.eval(&script).await.map(|_| ())
    }

    async fn clear(&self, element: &ElementHandle) -> Result<(), PlaybackError> {
        let handle = Self::handle_expr(element);
        let script = format!(
            "(function(){{ var el = {handle}; if (!el) return; el.value = ''; \
             el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
             el.dispatchEvent(new Event('change', {{ bubbles: true }})); }})()"
        );
        self.eval(&script).await.map(|_| ())
    }

    async fn send_keys(&self, element: &ElementHandle, text: &str) -> Result<(), PlaybackError> {
        let handle = Self::handle_expr(element);
        let text_json = serde_json::to_string(text).unwrap_or_default();
        let script = format!(
            "(function(){{ var el = {handle}; if (!el) return; el.focus(); \
             el.value = (el.value || '') + {text_json}; \
             el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
             el.dispatchEvent(new Event('change', {{ bubbles: true }})); }})()"
        );
        self.eval(&script).await.map(|_| ())
    }

    async fn send_key_to_element(&self, element: &ElementHandle, key_code: &str) -> Result<(), PlaybackError> {
        let handle = Self::handle_expr(element);
        self.dispatch_key_events(&handle, key_code).await
    }

    async fn send_key_to_active(&self, key_code: &str) -> Result<(), PlaybackError> {
        self.dispatch_key_events("document.activeElement", key_code).await
    }

    async fn press_modifier(&self, modifier: Modifier, down: bool) -> Result<(), PlaybackError> {
        let mut state = self.modifiers.lock().expect("modifiers mutex poisoned");
        if down {
            state.held.insert(modifier);
        } else {
            state.held.remove(&modifier);
        }
        Ok(())
    }

    async fn hover(&self, element: &ElementHandle) -> Result<(), PlaybackError> {
        self.dispatch_mouse_event(element, "mouseover").await
    }

    async fn scroll_into_view(&self, element: &ElementHandle) -> Result<(), PlaybackError> {
        let handle = Self::handle_expr(element);
        let script = format!(
            "(function(){{ var el = {handle}; if (el) el.scrollIntoView({{ behavior: 'smooth', block: 'center' }}); }})()"
        );
        self.eval(&script).await.map(|_| ())
    }

    async fn scroll_to(&self, x: f64, y: f64) -> Result<(), PlaybackError> {
        self.eval(&format!("window.scrollTo({x}, {y})")).await.map(|_| ())
    }

    async fn text(&self, element: &ElementHandle) -> Result<String, PlaybackError> {
        let handle = Self::handle_expr(element);
        let script = format!("(function(){{ var el = {handle}; return el ? (el.textContent || '').trim() : ''; }})()");
        Ok(self.eval(&script).await?.as_str().unwrap_or_default().to_string())
    }

    async fn attribute(&self, element: &ElementHandle, name: &str) -> Result<Option<String>, PlaybackError> {
        let handle = Self::handle_expr(element);
        let name_json = serde_json::to_string(name).unwrap_or_default();
        let script = format!("(function(){{ var el = {handle}; return el ? el.getAttribute({name_json}) : null; }})()");
        Ok(self.eval(&script).await?.as_str().map(str::to_string))
    }

    async fn select_by_text(&self, element: &ElementHandle, text: &str) -> Result<bool, PlaybackError> {
        let handle = Self::handle_expr(element);
        let text_json = serde_json::to_string(text).unwrap_or_default();
        let script = format!(
            "(function(){{ var el = {handle}; if (!el) return false; \
             for (var i = 0; i < el.options.length; i++) {{ \
               if (el.options[i].text.trim() === {text_json}) {{ el.selectedIndex = i; \
                 el.dispatchEvent(new Event('change', {{ bubbles: true }})); return true; }} }} \
             return false; }})()"
        );
        Ok(self.eval(&script).await?.as_bool().unwrap_or(false))
    }

    async fn select_by_value(&self, element: &ElementHandle, value: &str) -> Result<bool, PlaybackError> {
        let handle = Self::handle_expr(element);
        let value_json = serde_json::to_string(value).unwrap_or_default();
        let script = format!(
            "(function(){{ var el = {handle}; if (!el) return false; \
             for (var i = 0; i < el.options.length; i++) {{ \
               if (el.options[i].value === {value_json}) {{ el.selectedIndex = i; \
                 el.dispatchEvent(new Event('change', {{ bubbles: true }})); return true; }} }} \
             return false; }})()"
        );
        Ok(self.eval(&script).await?.as_bool().unwrap_or(false))
    }

    async fn select_by_index(&self, element: &ElementHandle, index: u32) -> Result<bool, PlaybackError> {
        let handle = Self::handle_expr(element);
        let script = format!(
            "(function(){{ var el = {handle}; if (!el || {index} >= el.options.length) return false; \
             el.selectedIndex = {index}; el.dispatchEvent(new Event('change', {{ bubbles: true }})); return true; }})()"
        );
        Ok(self.eval(&script).await?.as_bool().unwrap_or(false))
    }

    async fn is_select_tag(&self, element: &ElementHandle) -> Result<bool, PlaybackError> {
        let handle = Self::handle_expr(element);
        let script = format!("(function(){{ var el = {handle}; return !!el && el.tagName.toLowerCase() === 'select'; }})()");
        Ok(self.eval(&script).await?.as_bool().unwrap_or(false))
    }

    async fn find_by_xpath(&self, xpath: &str, container: Option<&ElementHandle>) -> Result<Option<ElementHandle>, PlaybackError> {
        let xpath_json = serde_json::to_string(xpath).unwrap_or_default();
        let scope = container.map(Self::handle_expr).unwrap_or_else(|| self.document_expr());
        let find_expr = format!(
            "document.evaluate({xpath_json}, {scope}, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue"
        );
        self.register_element(&find_expr).await
    }

    async fn dialog_present(&self) -> Result<bool, PlaybackError> {
        Ok(self.dialog.lock().expect("dialog mutex poisoned").present)
    }

    async fn dialog_text(&self) -> Result<Option<String>, PlaybackError> {
        Ok(self.dialog.lock().expect("dialog mutex poisoned").message.clone())
    }

    async fn accept_dialog(&self, send_keys: Option<&str>) -> Result<(), PlaybackError> {
        let mut params = json!({ "accept": true });
        if let Some(text) = send_keys {
            params["promptText"] = json!(text);
        }
        self.connector
            .send("Page.handleJavaScriptDialog", params, self.deadline)
            .await
            .map(|_| ())
            .map_err(|error| PlaybackError::ProtocolError { method: "Page.handleJavaScriptDialog".to_string(), details: error.to_string() })?;
        *self.dialog.lock().expect("dialog mutex poisoned") = DialogState::default();
        Ok(())
    }

    async fn dismiss_dialog(&self) -> Result<(), PlaybackError> {
        self.connector
            .send("Page.handleJavaScriptDialog", json!({ "accept": false }), self.deadline)
            .await
            .map(|_| ())
            .map_err(|error| PlaybackError::ProtocolError { method: "Page.handleJavaScriptDialog".to_string(), details: error.to_string() })?;
        *self.dialog.lock().expect("dialog mutex poisoned") = DialogState::default();
        Ok(())
    }

    async fn window_handles(&self) -> Result<Vec<String>, PlaybackError> {
        let response = self
            .connector
            .send("Target.getTargets", json!({}), self.deadline)
            .await
            .map_err(|error| PlaybackError::ProtocolError { method: "Target.getTargets".to_string(), details: error.to_string() })?;
        let handles = response
            .get("targetInfos")
            .and_then(Value::as_array)
            .map(|infos| {
                infos
                    .iter()
                    .filter(|info| info.get("type").and_then(Value::as_str) == Some("page"))
                    .filter_map(|info| info.get("targetId").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Ok(handles)
    }

    async fn current_window_handle(&self) -> Result<String, PlaybackError> {
        self.window_handles().await?.into_iter().next().ok_or_else(|| {
            PlaybackError::Config("no open browser windows".to_string())
        })
    }

    async fn switch_to_window(&self, handle: &str) -> Result<(), PlaybackError> {
        self.connector
            .send("Target.activateTarget", json!({ "targetId": handle }), self.deadline)
            .await
            .map(|_| ())
            .map_err(|error| PlaybackError::ProtocolError { method: "Target.activateTarget".to_string(), details: error.to_string() })
    }

    async fn enter_frame(&self, token: &str) -> Result<(), PlaybackError> {
        let mut chain = self.frame_chain.lock().expect("frame_chain mutex poisoned");
        chain.push(token.to_string());
        drop(chain);
        let exists = self.eval(&format!("!!({})", self.document_expr())).await?.as_bool().unwrap_or(false);
        if !exists {
            let mut chain = self.frame_chain.lock().expect("frame_chain mutex poisoned");
            chain.pop();
            return Err(PlaybackError::ProtocolError {
                method: "Runtime.evaluate".to_string(),
                details: format!("frame '{token}' has no contentDocument"),
            });
        }
        Ok(())
    }

    async fn switch_to_top(&self) -> Result<(), PlaybackError> {
        self.frame_chain.lock().expect("frame_chain mutex poisoned").clear();
        Ok(())
    }

    async fn screenshot(&self) -> Result<RgbaImage, PlaybackError> {
        let response = self
            .connector
            .send("Page.captureScreenshot", json!({ "format": "png" }), self.deadline)
            .await
            .map_err(|error| PlaybackError::ProtocolError { method: "Page.captureScreenshot".to_string(), details: error.to_string() })?;
        let encoded = response
            .get("data")
            .and_then(Value::as_str)
            .ok_or_else(|| PlaybackError::ProtocolError {
                method: "Page.captureScreenshot".to_string(),
                details: "response missing 'data' field".to_string(),
            })?;
        let png_bytes = base64::engine::general_purpose::STANDARD.decode(encoded).map_err(|error| {
            PlaybackError::ProtocolError { method: "Page.captureScreenshot".to_string(), details: format!("invalid base64: {error}") }
        })?;
        let decoded = image::load_from_memory(&png_bytes).map_err(|error| PlaybackError::ProtocolError {
            method: "Page.captureScreenshot".to_string(),
            details: format!("PNG decode failed: {error}"),
        })?;
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(RgbaImage { width, height, pixels: rgba.into_raw() })
    }

    async fn page_source(&self) -> Result<String, PlaybackError> {
        Ok(self.eval("document.documentElement.outerHTML").await?.as_str().unwrap_or_default().to_string())
    }

    async fn console_logs(&self) -> Result<Vec<ConsoleLogEntry>, PlaybackError> {
        Ok(self.console_log.lock().expect("console_log mutex poisoned").clone())
    }

    async fn visible_modal_selectors(&self, candidates: &[&str]) -> Result<Vec<String>, PlaybackError> {
        let mut matched = Vec::new();
        for candidate in candidates {
            let candidate_json = serde_json::to_string(candidate).unwrap_or_default();
            let script = format!(
                "(function(){{ var el = document.querySelector({candidate_json}); if (!el) return false; \
                 var rects = el.getClientRects(); var style = window.getComputedStyle(el); \
                 return rects.length > 0 && style.visibility !== 'hidden' && style.display !== 'none'; }})()"
            );
            if self.eval(&script).await?.as_bool().unwrap_or(false) {
                matched.push((*candidate).to_string());
            }
        }
        Ok(matched)
    }
}

impl CdpDriver {
    async fn dispatch_mouse_event(&self, element: &ElementHandle, event_type: &str) -> Result<(), PlaybackError> {
        let handle = Self::handle_expr(element);
        let (ctrl, shift, alt, meta) = self.modifier_key_flags();
        let script = format!(
            "(function(){{ var el = {handle}; if (!el) return; var rect = el.getBoundingClientRect(); \
             el.dispatchEvent(new MouseEvent({event_type_json}, {{ bubbles: true, cancelable: true, view: window, \
             clientX: rect.x + rect.width / 2, clientY: rect.y + rect.height / 2, \
             ctrlKey: {ctrl}, shiftKey: {shift}, altKey: {alt}, metaKey: {meta} }})); }})()",
            event_type_json = serde_json::to_string(event_type).unwrap_or_default(),
        );
        self.eval(&script).await.map(|_| ())
    }

    async fn dispatch_key_events(&self, target_expr: &str, key_code: &str) -> Result<(), PlaybackError> {
        let (ctrl, shift, alt, meta) = self.modifier_key_flags();
        let key_json = serde_json::to_string(key_code).unwrap_or_default();
        let script = format!(
            "(function(){{ var el = {target_expr}; if (!el) return; \
             var opts = {{ bubbles: true, cancelable: true, key: {key_json}, \
             ctrlKey: {ctrl}, shiftKey: {shift}, altKey: {alt}, metaKey: {meta} }}; \
             el.dispatchEvent(new KeyboardEvent('keydown', opts)); \
             el.dispatchEvent(new KeyboardEvent('keyup', opts)); }})()"
        );
        self.eval(&script).await.map(|_| ())
    }
}
