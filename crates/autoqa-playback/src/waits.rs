use std::time::{Duration, Instant};

use autoqa_model::LocatorStrategy;

use crate::driver::Driver;
use crate::error::PlaybackError;

/// Cadence between success-condition polls inside a wait. Waits suspend
/// logically on this interval; production code never busy-spins.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

fn timeout_error(wait_kind: &str, timeout: Duration, query: impl Into<String>) -> PlaybackError {
    PlaybackError::Timeout {
        wait_kind: wait_kind.to_string(),
        timeout_sec: timeout.as_secs(),
        query: query.into(),
    }
}

/// Polls `condition` until it resolves to `Ok(Some(value))`, an error, or
/// `timeout` elapses. A resolved `Ok(None)` means "keep waiting".
async fn poll_until<F, Fut, T>(
    wait_kind: &str,
    timeout: Duration,
    query: &str,
    mut condition: F,
) -> Result<T, PlaybackError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<Option<T>, PlaybackError>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(value) = condition().await? {
            return Ok(value);
        }
        if Instant::now() >= deadline {
            return Err(timeout_error(wait_kind, timeout, query));
        }
        tokio::time::sleep(POLL_INTERVAL.min(deadline.saturating_duration_since(Instant::now())))
            .await;
    }
}

pub async fn wait_for_present(
    driver: &dyn Driver,
    strategy: LocatorStrategy,
    value: &str,
    timeout: Duration,
) -> Result<crate::driver::ElementHandle, PlaybackError> {
    poll_until("waitForPresent", timeout, value, || async {
        driver.query(strategy, value).await
    })
    .await
}

pub async fn wait_for_visible(
    driver: &dyn Driver,
    strategy: LocatorStrategy,
    value: &str,
    timeout: Duration,
) -> Result<crate::driver::ElementHandle, PlaybackError> {
    poll_until("waitForVisible", timeout, value, || async {
        match driver.query(strategy, value).await? {
            Some(element) if driver.is_visible(&element).await? => Ok(Some(element)),
            _ => Ok(None),
        }
    })
    .await
}

pub async fn wait_for_clickable(
    driver: &dyn Driver,
    strategy: LocatorStrategy,
    value: &str,
    timeout: Duration,
) -> Result<crate::driver::ElementHandle, PlaybackError> {
    poll_until("waitForClickable", timeout, value, || async {
        match driver.query(strategy, value).await? {
            Some(element)
                if driver.is_visible(&element).await? && driver.is_enabled(&element).await? =>
            {
                Ok(Some(element))
            }
            _ => Ok(None),
        }
    })
    .await
}

pub async fn wait_for_page_load(driver: &dyn Driver, timeout: Duration) -> Result<(), PlaybackError> {
    poll_until("waitForPageLoad", timeout, "document.readyState", || async {
        Ok(if driver.page_ready_state().await? == "complete" {
            Some(())
        } else {
            None
        })
    })
    .await
}

pub async fn wait_for_url_contains(
    driver: &dyn Driver,
    substring: &str,
    timeout: Duration,
) -> Result<(), PlaybackError> {
    poll_until("waitForUrlContains", timeout, substring, || async {
        Ok(if driver.current_url().await?.contains(substring) {
            Some(())
        } else {
            None
        })
    })
    .await
}

pub async fn wait_for_alert_present(driver: &dyn Driver, timeout: Duration) -> Result<(), PlaybackError> {
    poll_until("waitForAlertPresent", timeout, "alert", || async {
        Ok(if driver.dialog_present().await? { Some(()) } else { None })
    })
    .await
}

/// Waits for a window handle not present in `known` to appear; returns it.
pub async fn wait_for_new_window(
    driver: &dyn Driver,
    known: &[String],
    timeout: Duration,
) -> Result<String, PlaybackError> {
    poll_until("waitForNewWindow", timeout, "new window handle", || async {
        let handles = driver.window_handles().await?;
        Ok(handles.into_iter().find(|handle| !known.contains(handle)))
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::ElementHandle;
    use crate::tests_support::FakeDriver;

    #[tokio::test]
    async fn wait_for_present_succeeds_once_element_appears() {
        let driver = FakeDriver::new();
        driver.schedule_appear_after(LocatorStrategy::Id, "submit", ElementHandle("e1".into()), 2);
        let handle = wait_for_present(&driver, LocatorStrategy::Id, "submit", Duration::from_secs(2))
            .await
            .expect("should find element");
        assert_eq!(handle, ElementHandle("e1".into()));
    }

    #[tokio::test]
    async fn wait_for_present_times_out_when_never_satisfied() {
        let driver = FakeDriver::new();
        let error = wait_for_present(&driver, LocatorStrategy::Id, "missing", Duration::from_millis(150))
            .await
            .expect_err("should time out");
        assert!(matches!(error, PlaybackError::Timeout { wait_kind, .. } if wait_kind == "waitForPresent"));
    }

    #[tokio::test]
    async fn wait_for_page_load_waits_for_complete_ready_state() {
        let driver = FakeDriver::new();
        driver.schedule_ready_state_after("loading", "complete", 2);
        wait_for_page_load(&driver, Duration::from_secs(2))
            .await
            .expect("should observe complete");
    }

    #[tokio::test]
    async fn wait_for_new_window_returns_handle_not_in_known_set() {
        let driver = FakeDriver::new();
        driver.set_window_handles(vec!["a".to_string()]);
        driver.schedule_new_window_after("b".to_string(), 2);
        let handle = wait_for_new_window(&driver, &["a".to_string()], Duration::from_secs(2))
            .await
            .expect("should find new window");
        assert_eq!(handle, "b");
    }
}
