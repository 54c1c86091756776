use async_trait::async_trait;
use autoqa_model::Modifier;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Raw OS-level input event, as produced by the global mouse/keyboard hook.
#[derive(Debug, Clone, PartialEq)]
pub enum RawInputEvent {
    MouseClick {
        x: f64,
        y: f64,
        button: MouseButton,
        click_count: u32,
    },
    /// A special named key (Enter, Tab, Escape, arrows, F-keys,
    /// Home/End/PageUp/PageDown, Delete, Backspace).
    SpecialKey {
        key_name: String,
        x: Option<f64>,
        y: Option<f64>,
    },
    PrintableChar {
        ch: char,
        x: Option<f64>,
        y: Option<f64>,
    },
    ModifierChange {
        modifier: Modifier,
        down: bool,
    },
    MouseMove {
        x: f64,
        y: f64,
    },
}

/// Tracks last-known cursor position and held-modifier state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModifierState {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub meta: bool,
}

impl ModifierState {
    pub fn apply(&mut self, modifier: Modifier, down: bool) {
        match modifier {
            Modifier::Ctrl => self.ctrl = down,
            Modifier::Shift => self.shift = down,
            Modifier::Alt => self.alt = down,
            Modifier::Meta => self.meta = down,
        }
    }

    pub fn held(&self) -> Vec<Modifier> {
        let mut held = Vec::new();
        if self.ctrl {
            held.push(Modifier::Ctrl);
        }
        if self.shift {
            held.push(Modifier::Shift);
        }
        if self.alt {
            held.push(Modifier::Alt);
        }
        if self.meta {
            held.push(Modifier::Meta);
        }
        held
    }
}

/// OS-global mouse and keyboard event stream.
#[async_trait]
pub trait InputSource: Send {
    async fn next_event(&mut self) -> Option<RawInputEvent>;
}

/// Test double that replays a fixed event list; used by recording-session
/// tests and anywhere a live OS hook is unavailable.
pub struct ScriptedInputSource {
    events: VecDeque<RawInputEvent>,
}

impl ScriptedInputSource {
    pub fn new(events: Vec<RawInputEvent>) -> Self {
        Self {
            events: events.into(),
        }
    }
}

#[async_trait]
impl InputSource for ScriptedInputSource {
    async fn next_event(&mut self) -> Option<RawInputEvent> {
        self.events.pop_front()
    }
}

#[cfg(target_os = "linux")]
pub mod os_hook {
    //! Live OS-level global input hook.
    //!
    //! The core does not vendor a specific global-hook backend; wiring a
    //! concrete one (e.g. an evdev or X11 grab) is left to the process
    //! embedding this crate. This module only documents the seam.
    use super::{InputSource, RawInputEvent};
    use async_trait::async_trait;

    pub struct UnconfiguredOsInputSource;

    #[async_trait]
    impl InputSource for UnconfiguredOsInputSource {
        async fn next_event(&mut self) -> Option<RawInputEvent> {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_input_source_replays_events_in_order() {
        let mut source = ScriptedInputSource::new(vec![
            RawInputEvent::MouseMove { x: 1.0, y: 2.0 },
            RawInputEvent::MouseClick {
                x: 1.0,
                y: 2.0,
                button: MouseButton::Left,
                click_count: 1,
            },
        ]);
        assert_eq!(
            source.next_event().await,
            Some(RawInputEvent::MouseMove { x: 1.0, y: 2.0 })
        );
        assert!(matches!(
            source.next_event().await,
            Some(RawInputEvent::MouseClick { .. })
        ));
        assert_eq!(source.next_event().await, None);
    }

    #[test]
    fn modifier_state_tracks_held_modifiers_in_canonical_order() {
        let mut state = ModifierState::default();
        state.apply(Modifier::Shift, true);
        state.apply(Modifier::Ctrl, true);
        assert_eq!(state.held(), vec![Modifier::Ctrl, Modifier::Shift]);
        state.apply(Modifier::Ctrl, false);
        assert_eq!(state.held(), vec![Modifier::Shift]);
    }
}
