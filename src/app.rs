use std::path::Path;

use anyhow::Result;
use glam::{Vec2, Vec3};
use log::info;

use crate::camera::Camera;
use crate::config::RenderConfig;
use crate::input::{action_for, Action, InputState, KeyCode};
use crate::lighting::Light;
use crate::postprocess::BloomSettings;
use crate::scene::Scene;
use crate::settings::SettingsRecord;

pub struct AppState {
    pub camera: Camera,
    pub scene: Scene,
    pub bloom: BloomSettings,
    pub clear_color: Vec3,
    pub shininess: f32,
    pub overlay_enabled: bool,
    /// Whether mouse motion steers the camera.
    pub camera_mouse_look: bool,
    pub input: InputState,
    exit_requested: bool,
}

impl AppState {
    pub fn new(config: &RenderConfig) -> Self {
        Self {
            camera: Camera::default(),
            scene: Scene::farm(),
            bloom: config.bloom,
            clear_color: config.clear_color,
            shininess: config.shininess,
            overlay_enabled: false,
            camera_mouse_look: true,
            input: InputState::new(),
            exit_requested: false,
        }
    }

    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }

    pub fn request_exit(&mut self) {
        self.exit_requested = true;
    }

    pub fn apply_settings(&mut self, record: &SettingsRecord) {
        self.clear_color = record.clear_color;
        self.set_overlay(record.overlay_enabled);
        self.camera.position = record.camera_position;
        self.camera.look_along(record.camera_front);
        if let Some(bloom) = record.bloom_enabled {
            self.bloom.enabled = bloom;
        }
    }

    pub fn settings_record(&self) -> SettingsRecord {
        SettingsRecord {
            clear_color: self.clear_color,
            overlay_enabled: self.overlay_enabled,
            camera_position: self.camera.position,
            camera_front: self.camera.front(),
            bloom_enabled: Some(self.bloom.enabled),
        }
    }

    /// Loads settings if a valid record exists; otherwise keeps defaults.
    pub fn load_settings(&mut self, path: impl AsRef<Path>) -> bool {
        match SettingsRecord::load(path) {
            Some(record) => {
                self.apply_settings(&record);
                true
            }
            None => false,
        }
    }

    pub fn save_settings(&self, path: impl AsRef<Path>) -> Result<()> {
        self.settings_record().save(path)
    }

    pub fn handle_key(&mut self, key: KeyCode, pressed: bool) -> Option<Action> {
        if !pressed {
            self.input.set_key_up(key);
            return None;
        }
        if !self.input.set_key_down(key) {
            return None;
        }
        let action = action_for(key)?;
        match action {
            Action::Exit => self.request_exit(),
            Action::ToggleOverlay => self.set_overlay(!self.overlay_enabled),
            Action::ToggleBloom => {
                self.bloom.enabled = !self.bloom.enabled;
                info!("bloom {}", if self.bloom.enabled { "on" } else { "off" });
            }
        }
        Some(action)
    }

    /// Opening the overlay hands the cursor to it; closing returns it to
    /// the camera.
    pub fn set_overlay(&mut self, enabled: bool) {
        self.overlay_enabled = enabled;
        self.camera_mouse_look = !enabled;
    }

    /// Raw pointer motion in pixels, y growing downwards.
    pub fn handle_mouse_motion(&mut self, delta: Vec2) {
        if self.camera_mouse_look {
            self.input.add_mouse_delta(delta);
        }
    }

    pub fn handle_scroll(&mut self, lines: f32) {
        self.input.add_scroll(lines);
    }

    pub fn update(&mut self, dt: f32, time: f32) {
        let movements: Vec<_> = self.input.held_movements().collect();
        for movement in movements {
            self.camera.process_movement(movement, dt);
        }
        let (mouse, scroll) = self.input.take_deltas();
        if mouse != Vec2::ZERO {
            self.camera.process_mouse_delta(mouse.x, -mouse.y);
        }
        if scroll != 0.0 {
            self.camera.process_scroll(scroll);
        }
        self.scene.animate(time);
    }

    pub fn lights(&self) -> Vec<Light> {
        self.scene.lights.lights()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::NamedKey;

    fn app() -> AppState {
        AppState::new(&RenderConfig::default())
    }

    #[test]
    fn missing_settings_keep_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app();
        assert!(!app.load_settings(dir.path().join("program_state.txt")));
        assert_eq!(app.camera.position, Vec3::new(0.0, 0.0, 3.0));
        assert!(!app.overlay_enabled);
    }

    #[test]
    fn settings_survive_a_save_load_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("program_state.txt");
        let mut first = app();
        first.clear_color = Vec3::new(0.2, 0.4, 0.6);
        first.camera.position = Vec3::new(10.0, 2.0, -4.0);
        first.camera.look_along(Vec3::new(1.0, 0.0, -1.0));
        first.bloom.enabled = false;
        first.save_settings(&path).unwrap();

        let mut second = app();
        assert!(second.load_settings(&path));
        assert_eq!(second.clear_color, first.clear_color);
        assert_eq!(second.camera.position, first.camera.position);
        assert!((second.camera.front() - first.camera.front()).length() < 1e-5);
        assert!(!second.bloom.enabled);
    }

    #[test]
    fn overlay_toggle_leaves_bloom_and_lights_alone() {
        let mut app = app();
        app.bloom.enabled = true;
        let lights = app.lights();
        assert_eq!(
            app.handle_key(KeyCode::Function(1), true),
            Some(Action::ToggleOverlay)
        );
        assert!(app.overlay_enabled);
        assert!(!app.camera_mouse_look);
        assert!(app.bloom.enabled);
        assert_eq!(app.lights(), lights);
        app.handle_key(KeyCode::Function(1), false);
        app.handle_key(KeyCode::Function(1), true);
        assert!(!app.overlay_enabled);
        assert!(app.camera_mouse_look);
        assert!(app.bloom.enabled);
    }

    #[test]
    fn bloom_key_toggles_once_per_press() {
        let mut app = app();
        let initial = app.bloom.enabled;
        app.handle_key(KeyCode::Character('B'), true);
        app.handle_key(KeyCode::Character('B'), true);
        assert_eq!(app.bloom.enabled, !initial);
        app.handle_key(KeyCode::Character('B'), false);
        app.handle_key(KeyCode::Character('B'), true);
        assert_eq!(app.bloom.enabled, initial);
    }

    #[test]
    fn escape_requests_exit() {
        let mut app = app();
        app.handle_key(KeyCode::Named(NamedKey::Escape), true);
        assert!(app.exit_requested());
    }

    #[test]
    fn mouse_is_ignored_while_overlay_owns_cursor() {
        let mut app = app();
        app.set_overlay(true);
        let front = app.camera.front();
        app.handle_mouse_motion(Vec2::new(300.0, 0.0));
        app.update(0.016, 0.0);
        assert_eq!(app.camera.front(), front);

        app.set_overlay(false);
        app.handle_mouse_motion(Vec2::new(300.0, 0.0));
        app.update(0.016, 0.0);
        assert_ne!(app.camera.front(), front);
    }

    #[test]
    fn held_keys_move_the_camera_each_frame() {
        let mut app = app();
        app.handle_key(KeyCode::Character('W'), true);
        app.update(1.0, 0.0);
        app.update(1.0, 0.0);
        assert!((app.camera.position.z - (3.0 - 5.0)).abs() < 1e-4);
    }
}
