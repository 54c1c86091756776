use crate::driver::Driver;
use crate::error::PlaybackError;

/// Switches to the top document, then walks `chain` entering each frame.
/// A chain element that parses as a non-negative integer is a frame
/// index; otherwise it is a css selector/name. Fails with
/// `FrameNavigation` carrying the full chain on any entry failure.
pub async fn enter_frames(driver: &dyn Driver, chain: &[String]) -> Result<(), PlaybackError> {
    driver.switch_to_top().await?;
    for token in chain {
        if let Err(error) = driver.enter_frame(token).await {
            return Err(PlaybackError::FrameNavigation {
                chain: chain.to_vec(),
                detail: error.to_string(),
            });
        }
    }
    Ok(())
}

pub async fn exit_frames(driver: &dyn Driver) -> Result<(), PlaybackError> {
    driver.switch_to_top().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests_support::FakeDriver;

    #[tokio::test]
    async fn walks_the_full_chain_in_order() {
        let driver = FakeDriver::new();
        let chain = vec!["0".to_string(), "checkout-frame".to_string()];
        enter_frames(&driver, &chain).await.expect("should enter frames");
        assert_eq!(driver.frame_tokens(), chain);
    }

    #[tokio::test]
    async fn failure_mid_chain_raises_frame_navigation_with_full_chain() {
        let driver = FakeDriver::new();
        let chain = vec!["0".to_string(), "missing-frame".to_string()];
        driver.fail_enter_frame("missing-frame");
        let error = enter_frames(&driver, &chain).await.expect_err("should fail");
        match error {
            PlaybackError::FrameNavigation { chain: reported, .. } => assert_eq!(reported, chain),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn exit_frames_switches_to_top() {
        let driver = FakeDriver::new();
        enter_frames(&driver, &["0".to_string()]).await.expect("enter");
        exit_frames(&driver).await.expect("exit");
        assert!(driver.frame_tokens().is_empty());
    }
}
