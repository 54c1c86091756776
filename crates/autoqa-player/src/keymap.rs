/// Canonical named keys a recorded KEY_PRESS event may carry. The recorder
/// already normalizes to these names (see `autoqa-capture::classifier`);
/// this is the player-side allowlist that makes an unrecognized name a
/// hard failure rather than a silent no-op.
const CANONICAL_KEY_NAMES: &[&str] = &[
    "ENTER", "TAB", "ESCAPE", "BACKSPACE", "DELETE", "SPACE", "HOME", "END", "PAGE_UP",
    "PAGE_DOWN", "ARROW_UP", "ARROW_DOWN", "ARROW_LEFT", "ARROW_RIGHT", "F1", "F2", "F3", "F4",
    "F5", "F6", "F7", "F8", "F9", "F10", "F11", "F12",
];

/// Maps a recorded `keyCode` to its canonical name, case-insensitively.
/// `None` for anything not in the fixed allowlist.
pub fn canonicalize_key_code(raw: &str) -> Option<&'static str> {
    let upper = raw.trim().to_uppercase();
    CANONICAL_KEY_NAMES.iter().find(|&&name| name == upper).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_key_names_are_canonicalized_case_insensitively() {
        assert_eq!(canonicalize_key_code("enter"), Some("ENTER"));
        assert_eq!(canonicalize_key_code("Arrow_Down"), Some("ARROW_DOWN"));
    }

    #[test]
    fn unknown_key_names_return_none() {
        assert_eq!(canonicalize_key_code("SUPER_DUPER_KEY"), None);
    }
}
