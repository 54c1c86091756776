use autoqa_model::{AlertAction, Coordinates, EventType, InputData};

use crate::input_capture::{ModifierState, MouseButton, RawInputEvent};

/// Result of classifying one raw input event: the event type to emit plus
/// its input payload and originating coordinates, or `None` for raw
/// events that only update tracked state (modifier-only, mouse move).
pub struct ClassifiedEvent {
    pub event_type: EventType,
    pub input_data: Option<InputData>,
    pub coordinates: Option<Coordinates>,
}

/// Maps one raw input event to the recorded event it produces, updating
/// `modifiers` in place. Mouse movement updates last-known position only
/// and is handled by the caller, not here.
pub fn classify(event: &RawInputEvent, modifiers: &mut ModifierState) -> Option<ClassifiedEvent> {
    match event {
        RawInputEvent::MouseClick {
            x,
            y,
            button,
            click_count,
        } => {
            let event_type = match button {
                MouseButton::Right => EventType::ContextMenu,
                _ if *click_count >= 2 => EventType::DoubleClick,
                _ => EventType::Click,
            };
            Some(ClassifiedEvent {
                event_type,
                input_data: None,
                coordinates: Some(Coordinates { x: *x, y: *y }),
            })
        }
        RawInputEvent::SpecialKey { key_name, x, y } => Some(ClassifiedEvent {
            event_type: EventType::KeyPress,
            input_data: Some(InputData::KeyPress {
                key_code: key_name.clone(),
                modifiers: modifiers.held(),
            }),
            coordinates: coordinates_from(*x, *y),
        }),
        RawInputEvent::PrintableChar { ch, x, y } => Some(ClassifiedEvent {
            event_type: EventType::Input,
            input_data: Some(InputData::Keys {
                keys: ch.to_string(),
            }),
            coordinates: coordinates_from(*x, *y),
        }),
        RawInputEvent::ModifierChange { modifier, down } => {
            modifiers.apply(*modifier, *down);
            None
        }
        RawInputEvent::MouseMove { .. } => None,
    }
}

fn coordinates_from(x: Option<f64>, y: Option<f64>) -> Option<Coordinates> {
    match (x, y) {
        (Some(x), Some(y)) => Some(Coordinates { x, y }),
        _ => None,
    }
}

/// Builds the default alert-action input data used when a recorded ALERT
/// event carries no explicit action (player-side default, not emitted by
/// the classifier — kept here because it documents the same contract).
pub fn default_alert_input() -> InputData {
    InputData::Alert {
        action: AlertAction::Accept,
        text: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoqa_model::Modifier;

    #[test]
    fn left_click_with_count_one_emits_click() {
        let mut modifiers = ModifierState::default();
        let classified = classify(
            &RawInputEvent::MouseClick {
                x: 1.0,
                y: 2.0,
                button: MouseButton::Left,
                click_count: 1,
            },
            &mut modifiers,
        )
        .expect("should classify");
        assert_eq!(classified.event_type, EventType::Click);
    }

    #[test]
    fn double_click_count_emits_double_click() {
        let mut modifiers = ModifierState::default();
        let classified = classify(
            &RawInputEvent::MouseClick {
                x: 1.0,
                y: 2.0,
                button: MouseButton::Left,
                click_count: 2,
            },
            &mut modifiers,
        )
        .expect("should classify");
        assert_eq!(classified.event_type, EventType::DoubleClick);
    }

    #[test]
    fn right_button_emits_context_menu_regardless_of_click_count() {
        let mut modifiers = ModifierState::default();
        let classified = classify(
            &RawInputEvent::MouseClick {
                x: 1.0,
                y: 2.0,
                button: MouseButton::Right,
                click_count: 1,
            },
            &mut modifiers,
        )
        .expect("should classify");
        assert_eq!(classified.event_type, EventType::ContextMenu);
    }

    #[test]
    fn printable_char_emits_input_with_single_character() {
        let mut modifiers = ModifierState::default();
        let classified = classify(
            &RawInputEvent::PrintableChar {
                ch: 'a',
                x: None,
                y: None,
            },
            &mut modifiers,
        )
        .expect("should classify");
        assert_eq!(classified.event_type, EventType::Input);
        assert_eq!(
            classified.input_data,
            Some(InputData::Keys {
                keys: "a".to_string()
            })
        );
    }

    #[test]
    fn special_key_carries_currently_held_modifiers() {
        let mut modifiers = ModifierState::default();
        classify(
            &RawInputEvent::ModifierChange {
                modifier: Modifier::Ctrl,
                down: true,
            },
            &mut modifiers,
        );
        let classified = classify(
            &RawInputEvent::SpecialKey {
                key_name: "Enter".to_string(),
                x: None,
                y: None,
            },
            &mut modifiers,
        )
        .expect("should classify");
        assert_eq!(
            classified.input_data,
            Some(InputData::KeyPress {
                key_code: "Enter".to_string(),
                modifiers: vec![Modifier::Ctrl],
            })
        );
    }

    #[test]
    fn modifier_only_and_mouse_move_events_do_not_classify() {
        let mut modifiers = ModifierState::default();
        assert!(classify(
            &RawInputEvent::ModifierChange {
                modifier: Modifier::Shift,
                down: true
            },
            &mut modifiers
        )
        .is_none());
        assert!(classify(&RawInputEvent::MouseMove { x: 1.0, y: 1.0 }, &mut modifiers).is_none());
    }
}
