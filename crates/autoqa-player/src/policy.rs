use std::path::PathBuf;
use std::time::Duration;

use autoqa_core::Config;

/// Frozen playback parameters for one run, derived from [`Config`].
/// Generalized from a single action timeout into the full set of
/// wait/evidence/healing deadlines and toggles a playback run needs.
#[derive(Debug, Clone)]
pub struct PlaybackPolicy {
    pub explicit_wait: Duration,
    pub page_load_timeout: Duration,
    pub step_delay: Duration,
    pub evidence_dir: PathBuf,
    pub locator_fallback_attempts: usize,
    pub screenshot_on_failure: bool,
    pub page_source_on_failure: bool,
    pub console_logs_on_failure: bool,
    pub healing_enabled: bool,
    pub ai_healer_dom_snippet_chars: usize,
}

impl From<&Config> for PlaybackPolicy {
    fn from(config: &Config) -> Self {
        Self {
            explicit_wait: Duration::from_secs(config.player_explicit_wait_sec),
            page_load_timeout: Duration::from_secs(config.player_page_load_timeout_sec),
            step_delay: Duration::from_millis(config.player_step_delay_ms),
            evidence_dir: PathBuf::from(&config.player_evidence_dir),
            locator_fallback_attempts: config.player_locator_fallback_attempts as usize,
            screenshot_on_failure: config.player_screenshot_on_failure,
            page_source_on_failure: config.player_page_source_on_failure,
            console_logs_on_failure: config.player_console_logs_on_failure,
            healing_enabled: config.player_healing_enabled,
            ai_healer_dom_snippet_chars: config.ai_healer_dom_snippet_chars,
        }
    }
}
