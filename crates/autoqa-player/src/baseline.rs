use std::path::Path;

use base64::Engine;

use autoqa_playback::driver::RgbaImage;

/// Reads back a baseline image previously written by
/// `autoqa_playback::evidence::collect`'s `{width}x{height}:{base64}`
/// encoding. `None` on any read or parse failure — a missing or
/// unreadable baseline fails the SCREENSHOT checkpoint downstream via
/// `PlaybackError::Config`, not here.
pub fn load(path: &Path) -> Option<RgbaImage> {
    let raw = std::fs::read_to_string(path).ok()?;
    let (dimensions, encoded) = raw.split_once(':')?;
    let (width, height) = dimensions.split_once('x')?;
    let width: u32 = width.parse().ok()?;
    let height: u32 = height.parse().ok()?;
    let pixels = base64::engine::general_purpose::STANDARD.decode(encoded).ok()?;
    Some(RgbaImage { width, height, pixels })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_the_evidence_collectors_encoding() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let path = tempdir.path().join("baseline.png");
        let encoded = format!(
            "2x1:{}",
            base64::engine::general_purpose::STANDARD.encode([1, 2, 3, 4, 5, 6, 7, 8])
        );
        std::fs::write(&path, encoded).expect("write baseline");

        let image = load(&path).expect("should parse");
        assert_eq!(image.width, 2);
        assert_eq!(image.height, 1);
        assert_eq!(image.pixels, vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn missing_file_yields_none() {
        assert!(load(Path::new("/nonexistent/baseline.png")).is_none());
    }
}
