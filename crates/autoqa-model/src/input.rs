use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Modifier {
    Ctrl,
    Shift,
    Alt,
    Meta,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertAction {
    Accept,
    Dismiss,
    SendKeys,
}

/// Carries exactly one of: typed keys, a key-press with modifiers, a
/// select-option choice, or an alert action. Internally tagged by `kind`
/// so the representation is unambiguous regardless of which optional
/// fields happen to be absent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum InputData {
    Keys {
        keys: String,
    },
    KeyPress {
        key_code: String,
        #[serde(default)]
        modifiers: Vec<Modifier>,
    },
    Select {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        index: Option<u32>,
    },
    Alert {
        action: AlertAction,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
}
