use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};

const DEFAULT_RECORDER_OUTPUT_DIR: &str = "recordings";
const DEFAULT_RECORDER_SESSION_PREFIX: &str = "recording";
const DEFAULT_RECORDER_REDACT_TYPES: &str = "password";
const DEFAULT_RECORDER_CDP_PORT: u16 = 9222;
const DEFAULT_RECORDER_CDP_WS_TIMEOUT_SEC: u64 = 10;
const DEFAULT_PLAYER_EXPLICIT_WAIT_SEC: u64 = 15;
const DEFAULT_PLAYER_PAGE_LOAD_TIMEOUT_SEC: u64 = 30;
const DEFAULT_PLAYER_STEP_DELAY_MS: u64 = 300;
const DEFAULT_PLAYER_EVIDENCE_DIR: &str = "evidence";
const DEFAULT_PLAYER_LOCATOR_FALLBACK_ATTEMPTS: u32 = 3;
const DEFAULT_AI_HEALER_DOM_SNIPPET_CHARS: usize = 3_000;

/// Frozen configuration snapshot, loaded once at process start.
///
/// Mirrors the recognized key table: unknown keys are tolerated and
/// ignored, malformed numeric/boolean values log a warning and fall back
/// to the documented default.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub recorder_output_dir: String,
    pub recorder_session_prefix: String,
    pub recorder_redact_types: Vec<String>,
    pub recorder_redact_selectors: Vec<String>,
    pub recorder_cdp_port: u16,
    pub recorder_cdp_ws_timeout_sec: u64,
    pub recorder_url_whitelist: Vec<String>,
    pub player_explicit_wait_sec: u64,
    pub player_page_load_timeout_sec: u64,
    pub player_step_delay_ms: u64,
    pub player_evidence_dir: String,
    pub player_locator_fallback_attempts: u32,
    pub player_screenshot_on_failure: bool,
    pub player_page_source_on_failure: bool,
    pub player_console_logs_on_failure: bool,
    pub player_healing_enabled: bool,
    pub ai_llm_base_url: Option<String>,
    pub ai_llm_model: Option<String>,
    pub ai_llm_temperature: Option<f64>,
    pub ai_llm_max_tokens: Option<u32>,
    pub ai_llm_timeout_sec: u64,
    pub ai_llm_retry_count: u32,
    pub ai_llm_retry_delay_ms: u64,
    pub ai_healer_dom_snippet_chars: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            recorder_output_dir: DEFAULT_RECORDER_OUTPUT_DIR.to_string(),
            recorder_session_prefix: DEFAULT_RECORDER_SESSION_PREFIX.to_string(),
            recorder_redact_types: vec![DEFAULT_RECORDER_REDACT_TYPES.to_string()],
            recorder_redact_selectors: Vec::new(),
            recorder_cdp_port: DEFAULT_RECORDER_CDP_PORT,
            recorder_cdp_ws_timeout_sec: DEFAULT_RECORDER_CDP_WS_TIMEOUT_SEC,
            recorder_url_whitelist: Vec::new(),
            player_explicit_wait_sec: DEFAULT_PLAYER_EXPLICIT_WAIT_SEC,
            player_page_load_timeout_sec: DEFAULT_PLAYER_PAGE_LOAD_TIMEOUT_SEC,
            player_step_delay_ms: DEFAULT_PLAYER_STEP_DELAY_MS,
            player_evidence_dir: DEFAULT_PLAYER_EVIDENCE_DIR.to_string(),
            player_locator_fallback_attempts: DEFAULT_PLAYER_LOCATOR_FALLBACK_ATTEMPTS,
            player_screenshot_on_failure: true,
            player_page_source_on_failure: true,
            player_console_logs_on_failure: true,
            player_healing_enabled: false,
            ai_llm_base_url: None,
            ai_llm_model: None,
            ai_llm_temperature: None,
            ai_llm_max_tokens: None,
            ai_llm_timeout_sec: 30,
            ai_llm_retry_count: 2,
            ai_llm_retry_delay_ms: 500,
            ai_healer_dom_snippet_chars: DEFAULT_AI_HEALER_DOM_SNIPPET_CHARS,
        }
    }
}

impl Config {
    /// Loads config from a TOML properties file, falling back to defaults
    /// for any key that is missing or malformed. Never fails: a missing or
    /// unreadable file simply yields `Config::default()`.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(error) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %error,
                    "config file unreadable, using defaults"
                );
                return Ok(Self::default());
            }
        };
        let table: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        Ok(Self::from_toml_table(&table))
    }

    fn from_toml_table(table: &toml::Value) -> Self {
        let defaults = Self::default();
        let get = |key: &str| -> Option<&toml::Value> { table.get(key) };

        let string_or =
            |key: &str, default: &str| -> String { get(key).and_then(toml::Value::as_str).map(str::to_string).unwrap_or_else(|| default.to_string()) };
        let csv_or =
            |key: &str, default: &[String]| -> Vec<String> {
                match get(key).and_then(toml::Value::as_str) {
                    Some(raw) if !raw.trim().is_empty() => raw
                        .split(',')
                        .map(|part| part.trim().to_string())
                        .filter(|part| !part.is_empty())
                        .collect(),
                    Some(_) => Vec::new(),
                    None => default.to_vec(),
                }
            };
        let warn_and_default = |key: &str, raw: &str| {
            tracing::warn!(key, raw, "malformed config value, using default");
        };
        let u64_or = |key: &str, default: u64| -> u64 {
            match get(key) {
                None => default,
                Some(value) => match value.as_integer() {
                    Some(parsed) if parsed >= 0 => parsed as u64,
                    _ => {
                        warn_and_default(key, &value.to_string());
                        default
                    }
                },
            }
        };
        let u32_or = |key: &str, default: u32| -> u32 {
            match get(key) {
                None => default,
                Some(value) => match value.as_integer() {
                    Some(parsed) if parsed >= 0 && parsed <= i64::from(u32::MAX) => parsed as u32,
                    _ => {
                        warn_and_default(key, &value.to_string());
                        default
                    }
                },
            }
        };
        let bool_or = |key: &str, default: bool| -> bool {
            match get(key) {
                None => default,
                Some(value) => match value.as_bool() {
                    Some(parsed) => parsed,
                    None => {
                        warn_and_default(key, &value.to_string());
                        default
                    }
                },
            }
        };
        let opt_string = |key: &str| -> Option<String> {
            get(key).and_then(toml::Value::as_str).map(str::to_string)
        };
        let opt_f64 = |key: &str| -> Option<f64> { get(key).and_then(toml::Value::as_float) };
        let opt_u32 = |key: &str| -> Option<u32> {
            get(key).and_then(toml::Value::as_integer).and_then(|value| u32::try_from(value).ok())
        };

        Self {
            recorder_output_dir: string_or("recorder.output.dir", &defaults.recorder_output_dir),
            recorder_session_prefix: string_or(
                "recorder.session.prefix",
                &defaults.recorder_session_prefix,
            ),
            recorder_redact_types: csv_or("recorder.redact.types", &defaults.recorder_redact_types),
            recorder_redact_selectors: csv_or(
                "recorder.redact.selectors",
                &defaults.recorder_redact_selectors,
            ),
            recorder_cdp_port: u32_or("recorder.cdp.port", u32::from(defaults.recorder_cdp_port))
                .try_into()
                .unwrap_or(defaults.recorder_cdp_port),
            recorder_cdp_ws_timeout_sec: u64_or(
                "recorder.cdp.ws.timeout.sec",
                defaults.recorder_cdp_ws_timeout_sec,
            ),
            recorder_url_whitelist: csv_or(
                "recorder.url.whitelist",
                &defaults.recorder_url_whitelist,
            ),
            player_explicit_wait_sec: u64_or(
                "player.explicit.wait.sec",
                defaults.player_explicit_wait_sec,
            ),
            player_page_load_timeout_sec: u64_or(
                "player.page.load.timeout.sec",
                defaults.player_page_load_timeout_sec,
            ),
            player_step_delay_ms: u64_or("player.step.delay.ms", defaults.player_step_delay_ms),
            player_evidence_dir: string_or("player.evidence.dir", &defaults.player_evidence_dir),
            player_locator_fallback_attempts: u32_or(
                "player.locator.fallback.attempts",
                defaults.player_locator_fallback_attempts,
            ),
            player_screenshot_on_failure: bool_or(
                "player.screenshot.on.failure",
                defaults.player_screenshot_on_failure,
            ),
            player_page_source_on_failure: bool_or(
                "player.page.source.on.failure",
                defaults.player_page_source_on_failure,
            ),
            player_console_logs_on_failure: bool_or(
                "player.console.logs.on.failure",
                defaults.player_console_logs_on_failure,
            ),
            player_healing_enabled: bool_or(
                "player.healing.enabled",
                defaults.player_healing_enabled,
            ),
            ai_llm_base_url: opt_string("ai.llm.base.url"),
            ai_llm_model: opt_string("ai.llm.model"),
            ai_llm_temperature: opt_f64("ai.llm.temperature"),
            ai_llm_max_tokens: opt_u32("ai.llm.max.tokens"),
            ai_llm_timeout_sec: u64_or("ai.llm.timeout.sec", defaults.ai_llm_timeout_sec),
            ai_llm_retry_count: u32_or("ai.llm.retry.count", defaults.ai_llm_retry_count),
            ai_llm_retry_delay_ms: u64_or(
                "ai.llm.retry.delay.ms",
                defaults.ai_llm_retry_delay_ms,
            ),
            ai_healer_dom_snippet_chars: u64_or(
                "ai.healer.dom.snippet.chars",
                defaults.ai_healer_dom_snippet_chars as u64,
            ) as usize,
        }
    }

    /// Applies environment-variable overrides on top of an already-loaded
    /// config. Mirrors `recorder.*`/`player.*`/`ai.*` keys as
    /// `AUTOQA_RECORDER_*`/`AUTOQA_PLAYER_*`/`AUTOQA_AI_*` env vars.
    pub fn apply_env_overrides(mut self, env: &HashMap<String, String>) -> Self {
        if let Some(raw) = env.get("AUTOQA_RECORDER_CDP_PORT") {
            match raw.trim().parse::<u16>() {
                Ok(parsed) if parsed > 0 => self.recorder_cdp_port = parsed,
                _ => tracing::warn!(raw, "malformed AUTOQA_RECORDER_CDP_PORT, keeping prior value"),
            }
        }
        if let Some(raw) = env.get("AUTOQA_PLAYER_HEALING_ENABLED") {
            match raw.trim().parse::<bool>() {
                Ok(parsed) => self.player_healing_enabled = parsed,
                Err(_) => tracing::warn!(
                    raw,
                    "malformed AUTOQA_PLAYER_HEALING_ENABLED, keeping prior value"
                ),
            }
        }
        if let Some(raw) = env.get("AUTOQA_AI_LLM_BASE_URL") {
            if !raw.trim().is_empty() {
                self.ai_llm_base_url = Some(raw.trim().to_string());
            }
        }
        self
    }
}
