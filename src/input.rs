use iced::keyboard::{self, Key, Modifiers, key};
use iced::mouse;

/// Named keys the viewer reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NavKey {
    Previous,
    Next,
    Screenshot,
    DebugDump,
}

impl NavKey {
    pub(crate) fn from_key(key: &Key) -> Option<Self> {
        match key.as_ref() {
            Key::Named(key::Named::ArrowLeft) => Some(NavKey::Previous),
            Key::Named(key::Named::ArrowRight) => Some(NavKey::Next),
            Key::Character("p" | "P") => Some(NavKey::Screenshot),
            Key::Character("d" | "D") => Some(NavKey::DebugDump),
            _ => None,
        }
    }
}

/// Input device state the widget needs between events
#[derive(Debug, Default)]
pub(crate) struct InputState {
    pub(crate) modifiers: Modifiers,
}

impl InputState {
    pub(crate) fn update_modifiers(&mut self, event: &keyboard::Event) {
        if let keyboard::Event::ModifiersChanged(modifiers) = event {
            self.modifiers = *modifiers;
        }
    }

    /// Whether a press of `button` starts an orbit drag rather than a pick
    pub(crate) fn is_orbit_press(&self, button: mouse::Button) -> bool {
        button == mouse::Button::Right || (button == mouse::Button::Left && self.modifiers.shift())
    }
}
