use regex::RegexBuilder;

use autoqa_model::{CheckpointData, CheckpointType, MatchMode};

use crate::driver::{Driver, ElementHandle, RgbaImage};
use crate::error::PlaybackError;

/// Computes the differing-pixel ratio over the common intersection
/// rectangle of `baseline` and `current`, per an exact-RGBA comparison.
pub fn screenshot_diff_ratio(baseline: &RgbaImage, current: &RgbaImage) -> f64 {
    let width = baseline.width.min(current.width) as usize;
    let height = baseline.height.min(current.height) as usize;
    if width == 0 || height == 0 {
        return 0.0;
    }

    let mut differing = 0usize;
    for y in 0..height {
        for x in 0..width {
            let baseline_pixel = pixel_at(baseline, x, y);
            let current_pixel = pixel_at(current, x, y);
            if baseline_pixel != current_pixel {
                differing += 1;
            }
        }
    }
    differing as f64 / (width * height) as f64
}

fn pixel_at(image: &RgbaImage, x: usize, y: usize) -> [u8; 4] {
    let offset = (y * image.width as usize + x) * 4;
    [
        image.pixels[offset],
        image.pixels[offset + 1],
        image.pixels[offset + 2],
        image.pixels[offset + 3],
    ]
}

/// Applies `matchMode`/`caseSensitive` to compare `actual` against
/// `expected`. A missing `expected` passes trivially (with a warning).
pub fn assert_match(label: &str, actual: &str, checkpoint: &CheckpointData) -> Result<(), PlaybackError> {
    let Some(expected) = &checkpoint.expected_value else {
        tracing::warn!(label, "checkpoint has no expectedValue, passing trivially");
        return Ok(());
    };

    let matched = match checkpoint.match_mode {
        MatchMode::Equals => fold(actual, checkpoint.case_sensitive) == fold(expected, checkpoint.case_sensitive),
        MatchMode::Contains => {
            fold(actual, checkpoint.case_sensitive).contains(&fold(expected, checkpoint.case_sensitive))
        }
        MatchMode::StartsWith => {
            fold(actual, checkpoint.case_sensitive).starts_with(&fold(expected, checkpoint.case_sensitive))
        }
        MatchMode::Regex => {
            let regex = RegexBuilder::new(expected)
                .case_insensitive(!checkpoint.case_sensitive)
                .build()
                .map_err(|error| PlaybackError::Config(format!("invalid checkpoint regex: {error}")))?;
            regex.is_match(actual)
        }
    };

    if matched {
        Ok(())
    } else {
        Err(PlaybackError::CheckpointFailure {
            label: label.to_string(),
            expected: Some(expected.clone()),
            actual: actual.to_string(),
        })
    }
}

fn fold(value: &str, case_sensitive: bool) -> String {
    if case_sensitive {
        value.to_string()
    } else {
        value.to_lowercase()
    }
}

/// Evaluates a CHECKPOINT event. Never mutates browser state.
pub async fn evaluate(
    driver: &dyn Driver,
    checkpoint: &CheckpointData,
    element: Option<&ElementHandle>,
    baseline: Option<&RgbaImage>,
) -> Result<(), PlaybackError> {
    let label = checkpoint.checkpoint_name.clone().unwrap_or_else(|| "checkpoint".to_string());

    match checkpoint.checkpoint_type {
        CheckpointType::Text => {
            let element = element.ok_or_else(|| {
                PlaybackError::Config("TEXT checkpoint requires a resolved element".to_string())
            })?;
            let actual = driver.text(element).await?;
            assert_match(&label, &actual, checkpoint)
        }
        CheckpointType::Url => {
            let actual = driver.current_url().await?;
            assert_match(&label, &actual, checkpoint)
        }
        CheckpointType::Title => {
            let actual = driver.title().await?;
            assert_match(&label, &actual, checkpoint)
        }
        CheckpointType::Attribute => {
            let element = element.ok_or_else(|| {
                PlaybackError::Config("ATTRIBUTE checkpoint requires a resolved element".to_string())
            })?;
            let name = checkpoint.attribute_name.as_deref().ok_or_else(|| {
                PlaybackError::Config("ATTRIBUTE checkpoint is missing attributeName".to_string())
            })?;
            let actual = driver.attribute(element, name).await?.unwrap_or_default();
            assert_match(&label, &actual, checkpoint)
        }
        CheckpointType::ElementExists => Ok(()),
        CheckpointType::Screenshot => {
            let baseline = baseline.ok_or_else(|| {
                PlaybackError::Config("SCREENSHOT checkpoint is missing a baseline image".to_string())
            })?;
            let current = driver.screenshot().await?;
            let ratio = screenshot_diff_ratio(baseline, &current);
            if ratio > checkpoint.screenshot_threshold {
                Err(PlaybackError::CheckpointFailure {
                    label,
                    expected: Some(format!("ratio <= {}", checkpoint.screenshot_threshold)),
                    actual: format!("ratio = {ratio}"),
                })
            } else {
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests_support::FakeDriver;

    fn checkpoint(
        checkpoint_type: CheckpointType,
        expected: Option<&str>,
        match_mode: MatchMode,
        case_sensitive: bool,
    ) -> CheckpointData {
        CheckpointData {
            checkpoint_type,
            expected_value: expected.map(str::to_string),
            match_mode,
            case_sensitive,
            attribute_name: None,
            baseline_image_path: None,
            screenshot_threshold: 0.0,
            checkpoint_name: None,
        }
    }

    #[test]
    fn identical_images_have_zero_diff_ratio() {
        let image = RgbaImage {
            width: 100,
            height: 100,
            pixels: vec![1; 100 * 100 * 4],
        };
        assert_eq!(screenshot_diff_ratio(&image, &image), 0.0);
    }

    #[test]
    fn single_pixel_change_yields_expected_ratio() {
        let baseline = RgbaImage {
            width: 100,
            height: 100,
            pixels: vec![0; 100 * 100 * 4],
        };
        let mut pixels = baseline.pixels.clone();
        pixels[0] = 255;
        let current = RgbaImage {
            width: 100,
            height: 100,
            pixels,
        };
        let ratio = screenshot_diff_ratio(&baseline, &current);
        assert!((ratio - 1.0 / 10_000.0).abs() < 1e-12);
    }

    #[tokio::test]
    async fn url_contains_checkpoint_passes_case_insensitively() {
        let driver = FakeDriver::new();
        driver.set_current_url("https://app/Dashboard");
        let checkpoint = checkpoint(CheckpointType::Url, Some("dashboard"), MatchMode::Contains, false);
        evaluate(&driver, &checkpoint, None, None).await.expect("should pass");
    }

    #[test]
    fn missing_expected_value_passes_trivially() {
        let checkpoint = checkpoint(CheckpointType::Url, None, MatchMode::Equals, false);
        assert_match("cp", "anything", &checkpoint).expect("should pass trivially");
    }

    #[tokio::test]
    async fn screenshot_checkpoint_fails_above_threshold() {
        let driver = FakeDriver::new();
        let baseline = RgbaImage {
            width: 10,
            height: 10,
            pixels: vec![0; 10 * 10 * 4],
        };
        let mut current_pixels = baseline.pixels.clone();
        current_pixels[0] = 255;
        driver.set_screenshot(RgbaImage {
            width: 10,
            height: 10,
            pixels: current_pixels,
        });
        let mut checkpoint = checkpoint(CheckpointType::Screenshot, None, MatchMode::Equals, false);
        checkpoint.screenshot_threshold = 0.0;
        let error = evaluate(&driver, &checkpoint, None, Some(&baseline))
            .await
            .expect_err("should fail at zero threshold");
        assert!(matches!(error, PlaybackError::CheckpointFailure { .. }));
    }
}
