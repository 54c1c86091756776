use crate::driver::Driver;
use crate::error::PlaybackError;

/// CSS selectors scanned for a visible modal overlay. Matches are logged
/// only; the sentinel never clicks or closes them.
pub const MODAL_SELECTOR_CANDIDATES: &[&str] = &[
    "[role=dialog]:not([aria-hidden=true])",
    "[role=alertdialog]",
    ".modal.show",
    ".modal-open",
];

/// Result of one pre-step sentinel check.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SentinelReport {
    /// Whether a native dialog was found and auto-dismissed this call.
    pub dialog_handled: bool,
    /// Present if the window count grew relative to `known_window_count`.
    pub extra_windows_detected: bool,
    /// Selectors from [`MODAL_SELECTOR_CANDIDATES`] currently matching a
    /// visible element.
    pub visible_modal_selectors: Vec<String>,
}

/// Runs the three pre-step checks. `known_window_count` is the baseline
/// the caller maintained since the last intentional WINDOW_SWITCH.
pub async fn check(
    driver: &dyn Driver,
    known_window_count: usize,
) -> Result<SentinelReport, PlaybackError> {
    let mut report = SentinelReport::default();

    if driver.dialog_present().await? {
        let text = driver.dialog_text().await?;
        tracing::warn!(dialog_text = ?text, "sentinel auto-dismissing native dialog");
        driver.dismiss_dialog().await?;
        report.dialog_handled = true;
    }

    let current_window_count = driver.window_handles().await?.len();
    if current_window_count > known_window_count {
        tracing::warn!(
            known_window_count,
            current_window_count,
            "sentinel observed extra window handles, not switching"
        );
        report.extra_windows_detected = true;
    }

    let visible = driver
        .visible_modal_selectors(MODAL_SELECTOR_CANDIDATES)
        .await?;
    if !visible.is_empty() {
        tracing::warn!(selectors = ?visible, "sentinel observed visible modal overlay");
    }
    report.visible_modal_selectors = visible;

    Ok(report)
}
