//! Fixed-scene farm renderer.
//!
//! The scene, lighting model, camera, blur schedule and settings record are
//! plain data and pure functions so they can be tested headless; the
//! [`render`] module turns them into wgpu passes and [`overlay`] exposes
//! the tunable parameters through egui.

pub mod app;
pub mod camera;
pub mod config;
pub mod input;
pub mod lighting;
pub mod obj;
pub mod overlay;
pub mod postprocess;
pub mod render;
pub mod scene;
pub mod settings;

pub use app::AppState;
pub use camera::{Camera, Movement};
pub use config::RenderConfig;
pub use input::{Action, InputState, KeyCode, NamedKey};
pub use lighting::{shade, Attenuation, DirectionalLight, Light, LightColor, PointLight, SpotLight};
pub use obj::{load_obj, load_obj_from_str, MeshData};
pub use overlay::{Overlay, OverlayFrame};
pub use postprocess::{BloomSettings, BlurSchedule, BlurTarget};
pub use render::{RenderError, Renderer};
pub use scene::{ModelId, Scene, SceneInstance};
pub use settings::SettingsRecord;
