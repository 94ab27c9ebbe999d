//! Key bindings for the overlay's control surface.

use bubbletea_rs::KeyMsg;
use crossterm::event::{KeyCode, KeyModifiers};

/// A set of keys that trigger one action.
#[derive(Debug, Clone)]
pub struct Binding {
    /// Keys that trigger this binding.
    pub keys: Vec<KeyCode>,
    /// Modifiers that must be held; empty means none are required.
    pub modifiers: KeyModifiers,
}

impl Binding {
    /// Creates a binding with no modifiers.
    pub fn new(keys: Vec<KeyCode>) -> Self {
        Self {
            keys,
            modifiers: KeyModifiers::NONE,
        }
    }

    /// Requires `modifiers` to be held.
    pub fn with_modifiers(mut self, modifiers: KeyModifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Whether `msg` triggers this binding.
    pub fn matches(&self, msg: &KeyMsg) -> bool {
        self.keys.contains(&msg.key) && msg.modifiers.contains(self.modifiers)
    }
}

/// Bindings of the overlay.
#[derive(Debug, Clone)]
pub struct OverlayKeyMap {
    /// Start the countdown if it is not running.
    pub start: Binding,
    /// Stop the countdown.
    pub stop: Binding,
    /// Restart from the full duration.
    pub restart: Binding,
    /// Fire the action now.
    pub trigger: Binding,
    /// Leave the program.
    pub quit: Binding,
    /// Leave the program with Ctrl+C.
    pub force_quit: Binding,
}

impl Default for OverlayKeyMap {
    fn default() -> Self {
        Self {
            start: Binding::new(vec![KeyCode::Char('s')]),
            stop: Binding::new(vec![KeyCode::Char('x'), KeyCode::Char(' ')]),
            restart: Binding::new(vec![KeyCode::Char('r')]),
            trigger: Binding::new(vec![KeyCode::Char('t')]),
            quit: Binding::new(vec![KeyCode::Char('q'), KeyCode::Esc]),
            force_quit: Binding::new(vec![KeyCode::Char('c')]).with_modifiers(KeyModifiers::CONTROL),
        }
    }
}
