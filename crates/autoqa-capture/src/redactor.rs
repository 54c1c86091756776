use regex::Regex;
use std::sync::OnceLock;

use autoqa_model::{EventType, InputData, RecordedEvent};

/// Opaque placeholder substituted for any redacted keystroke payload.
pub const REDACTED_PLACEHOLDER: &str = "[REDACTED]";

fn sensitivity_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"(?i)pass|secret|token|credit|card|cvv|ssn|pin")
            .expect("sensitivity regex is valid")
    })
}

/// Field redaction rule set, configurable on top of the built-in
/// id/name sensitivity regex.
pub struct Redactor {
    sensitive_types: Vec<String>,
    sensitive_css_substrings: Vec<String>,
}

impl Redactor {
    pub fn new(sensitive_types: Vec<String>, sensitive_css_substrings: Vec<String>) -> Self {
        Self {
            sensitive_types,
            sensitive_css_substrings,
        }
    }

    /// `sensitive_types` defaults to `{password}`, matching the element's
    /// `type` attribute case-sensitively as recorded.
    pub fn with_defaults() -> Self {
        Self::new(vec!["password".to_string()], Vec::new())
    }

    /// Applies the ordered rule set to an INPUT event in place. Returns
    /// whether the event was redacted. Non-INPUT events are untouched.
    /// Idempotent: redacting an already-redacted event is a no-op.
    pub fn redact(&self, event: &mut RecordedEvent) -> bool {
        if event.event_type != EventType::Input {
            return false;
        }
        if !self.matches_sensitive(event) {
            return false;
        }
        match &mut event.input_data {
            Some(InputData::Keys { keys }) => {
                if keys == REDACTED_PLACEHOLDER {
                    return false;
                }
                *keys = REDACTED_PLACEHOLDER.to_string();
                true
            }
            _ => false,
        }
    }

    fn matches_sensitive(&self, event: &RecordedEvent) -> bool {
        let Some(element) = &event.element else {
            return false;
        };

        if let Some(element_type) = &element.element_type {
            if self
                .sensitive_types
                .iter()
                .any(|sensitive| sensitive == element_type)
            {
                return true;
            }
        }

        if let Some(css) = &element.css {
            if self
                .sensitive_css_substrings
                .iter()
                .any(|substring| css.contains(substring.as_str()))
            {
                return true;
            }
        }

        let id_and_name = format!(
            "{}{}",
            element.id.as_deref().unwrap_or(""),
            element.name.as_deref().unwrap_or("")
        );
        if !id_and_name.is_empty() && sensitivity_regex().is_match(&id_and_name) {
            return true;
        }

        false
    }
}
