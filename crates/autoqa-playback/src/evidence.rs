use std::path::{Path, PathBuf};

use base64::Engine;

use autoqa_core::sanitize_id;
use autoqa_model::{EventType, RecordedEvent};

use crate::driver::Driver;

/// `{evidenceDir}/{sanitize(sessionId)}/{stepIndex}` — write-once per
/// (sessionId, stepIndex).
pub fn evidence_dir(evidence_root: &Path, session_id: &str, step_index: usize) -> PathBuf {
    evidence_root.join(sanitize_id(session_id)).join(step_index.to_string())
}

/// Best-effort artifact bundle written on a failed step. Any individual
/// artifact failure is logged and skipped; the directory is returned
/// regardless.
pub async fn collect(
    driver: &dyn Driver,
    evidence_root: &Path,
    session_id: &str,
    step_index: usize,
    event: &RecordedEvent,
    recorded_url: Option<&str>,
    include_screenshot: bool,
    include_page_source: bool,
    include_console_logs: bool,
) -> std::io::Result<PathBuf> {
    let dir = evidence_dir(evidence_root, session_id, step_index);
    std::fs::create_dir_all(&dir)?;

    if include_screenshot {
        match driver.screenshot().await {
            Ok(image) => {
                let encoded = format!(
                    "{}x{}:{}",
                    image.width,
                    image.height,
                    base64::engine::general_purpose::STANDARD.encode(&image.pixels)
                );
                if let Err(error) = std::fs::write(dir.join("screenshot.png"), encoded) {
                    tracing::warn!(%error, "failed to write screenshot evidence artifact");
                }
            }
            Err(error) => tracing::warn!(%error, "failed to capture screenshot for evidence"),
        }
    }

    if include_page_source {
        match driver.page_source().await {
            Ok(source) => {
                if let Err(error) = std::fs::write(dir.join("page-source.html"), source) {
                    tracing::warn!(%error, "failed to write page-source evidence artifact");
                }
            }
            Err(error) => tracing::warn!(%error, "failed to capture page source for evidence"),
        }
    }

    if include_console_logs {
        match driver.console_logs().await {
            Ok(logs) => {
                let rendered = logs
                    .iter()
                    .map(|entry| {
                        format!(
                            "[{}] [{}] {}",
                            entry.timestamp_utc.to_rfc3339(),
                            entry.level,
                            entry.message
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n");
                if let Err(error) = std::fs::write(dir.join("console.log"), rendered) {
                    tracing::warn!(%error, "failed to write console log evidence artifact");
                }
            }
            Err(error) => tracing::warn!(%error, "failed to capture console logs for evidence"),
        }
    }

    let current_url = driver.current_url().await.unwrap_or_default();
    let context = render_context(step_index, event, recorded_url, &current_url);
    if let Err(error) = std::fs::write(dir.join("context.txt"), context) {
        tracing::warn!(%error, "failed to write context evidence artifact");
    }

    Ok(dir)
}

fn render_context(
    step_index: usize,
    event: &RecordedEvent,
    recorded_url: Option<&str>,
    current_url: &str,
) -> String {
    let element_identity = event
        .element
        .as_ref()
        .map(|element| {
            format!(
                "tag={} id={:?} name={:?} css={:?} xpath={:?}",
                element.tag_name, element.id, element.name, element.css, element.xpath
            )
        })
        .unwrap_or_else(|| "none".to_string());

    format!(
        "capturedAt={}\nstepIndex={}\neventType={:?}\nrecordedUrl={}\ncurrentUrl={}\nelement={}\n",
        autoqa_core::iso8601_now(),
        step_index,
        event.event_type,
        recorded_url.unwrap_or(""),
        current_url,
        element_identity,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::RgbaImage;
    use crate::tests_support::FakeDriver;
    use autoqa_model::Coordinates;
    use chrono::Utc;

    fn bare_event(event_type: EventType) -> RecordedEvent {
        RecordedEvent {
            timestamp: Utc::now(),
            event_type,
            url: None,
            element: None,
            input_data: None,
            coordinates: Some(Coordinates { x: 0.0, y: 0.0 }),
            frame_chain: Vec::new(),
            window_handle: None,
            object_name: None,
            checkpoint_data: None,
            comment: None,
        }
    }

    #[tokio::test]
    async fn writes_all_four_artifacts_for_a_failed_step() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let driver = FakeDriver::new();
        driver.set_screenshot(RgbaImage {
            width: 1,
            height: 1,
            pixels: vec![0, 0, 0, 255],
        });
        driver.set_page_source("<html></html>");
        driver.set_current_url("https://example.com");

        let dir = collect(
            &driver,
            tempdir.path(),
            "sess/weird id",
            3,
            &bare_event(EventType::Click),
            Some("https://example.com"),
            true,
            true,
            true,
        )
        .await
        .expect("collect should succeed");

        assert!(dir.join("screenshot.png").exists());
        assert!(dir.join("page-source.html").exists());
        assert!(dir.join("console.log").exists());
        assert!(dir.join("context.txt").exists());
    }

    #[test]
    fn evidence_dir_sanitizes_session_id() {
        let dir = evidence_dir(Path::new("evidence"), "sess/weird id", 2);
        assert_eq!(dir, PathBuf::from("evidence/sess_weird_id/2"));
    }

    #[tokio::test]
    async fn skips_disabled_artifact_kinds() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let driver = FakeDriver::new();
        let dir = collect(
            &driver,
            tempdir.path(),
            "sess",
            0,
            &bare_event(EventType::Navigate),
            None,
            false,
            false,
            false,
        )
        .await
        .expect("collect should succeed");
        assert!(!dir.join("screenshot.png").exists());
        assert!(!dir.join("page-source.html").exists());
        assert!(!dir.join("console.log").exists());
        assert!(dir.join("context.txt").exists());
    }
}
