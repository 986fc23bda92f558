use std::collections::HashSet;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::camera::Movement;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyCode {
    Named(NamedKey),
    Character(char),
    Function(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NamedKey {
    Space,
    Escape,
    LeftCtrl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Exit,
    ToggleOverlay,
    ToggleBloom,
}

/// Key bindings of the fly camera and the toggles.
pub fn movement_for(key: KeyCode) -> Option<Movement> {
    match key {
        KeyCode::Character('W') => Some(Movement::Forward),
        KeyCode::Character('S') => Some(Movement::Backward),
        KeyCode::Character('A') => Some(Movement::Left),
        KeyCode::Character('D') => Some(Movement::Right),
        KeyCode::Named(NamedKey::Space) => Some(Movement::Up),
        KeyCode::Named(NamedKey::LeftCtrl) => Some(Movement::Down),
        _ => None,
    }
}

pub fn action_for(key: KeyCode) -> Option<Action> {
    match key {
        KeyCode::Named(NamedKey::Escape) => Some(Action::Exit),
        KeyCode::Function(1) => Some(Action::ToggleOverlay),
        KeyCode::Character('B') => Some(Action::ToggleBloom),
        _ => None,
    }
}

/// Keys held down plus mouse motion accumulated since the last frame.
#[derive(Debug, Default)]
pub struct InputState {
    keys: HashSet<KeyCode>,
    mouse_delta: Vec2,
    scroll_delta: f32,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a press; returns `true` when the key was not already held,
    /// so auto-repeat does not retrigger toggles.
    pub fn set_key_down(&mut self, key: KeyCode) -> bool {
        self.keys.insert(key)
    }

    pub fn set_key_up(&mut self, key: KeyCode) {
        self.keys.remove(&key);
    }

    pub fn held_movements(&self) -> impl Iterator<Item = Movement> + '_ {
        self.keys.iter().copied().filter_map(movement_for)
    }

    pub fn add_mouse_delta(&mut self, delta: Vec2) {
        self.mouse_delta += delta;
    }

    pub fn add_scroll(&mut self, lines: f32) {
        self.scroll_delta += lines;
    }

    pub fn take_deltas(&mut self) -> (Vec2, f32) {
        let deltas = (self.mouse_delta, self.scroll_delta);
        self.mouse_delta = Vec2::ZERO;
        self.scroll_delta = 0.0;
        deltas
    }

    /// Forgets held keys, e.g. when the window loses focus.
    pub fn release_all(&mut self) {
        self.keys.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bindings_cover_movement_and_toggles() {
        assert_eq!(movement_for(KeyCode::Character('W')), Some(Movement::Forward));
        assert_eq!(
            movement_for(KeyCode::Named(NamedKey::LeftCtrl)),
            Some(Movement::Down)
        );
        assert_eq!(action_for(KeyCode::Function(1)), Some(Action::ToggleOverlay));
        assert_eq!(action_for(KeyCode::Character('B')), Some(Action::ToggleBloom));
        assert_eq!(action_for(KeyCode::Named(NamedKey::Escape)), Some(Action::Exit));
        assert_eq!(action_for(KeyCode::Character('W')), None);
    }

    #[test]
    fn input_state_tracks_keys() {
        let mut state = InputState::new();
        assert!(state.set_key_down(KeyCode::Named(NamedKey::Space)));
        assert!(!state.set_key_down(KeyCode::Named(NamedKey::Space)));
        assert_eq!(state.held_movements().collect::<Vec<_>>(), vec![Movement::Up]);
        state.set_key_up(KeyCode::Named(NamedKey::Space));
        assert_eq!(state.held_movements().count(), 0);
    }

    #[test]
    fn deltas_accumulate_until_taken() {
        let mut state = InputState::new();
        state.add_mouse_delta(Vec2::new(1.0, 2.0));
        state.add_mouse_delta(Vec2::new(3.0, -1.0));
        state.add_scroll(1.5);
        assert_eq!(state.take_deltas(), (Vec2::new(4.0, 1.0), 1.5));
        assert_eq!(state.take_deltas(), (Vec2::ZERO, 0.0));
    }
}
