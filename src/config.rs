use std::path::{Path, PathBuf};

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::postprocess::BloomSettings;

pub const DEFAULT_WIDTH: u32 = 1920;
pub const DEFAULT_HEIGHT: u32 = 1080;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    pub clear_color: Vec3,
    pub shininess: f32,
    pub bloom: BloomSettings,
    /// Root of `objects/` and `textures/`.
    pub resources: PathBuf,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            clear_color: Vec3::ZERO,
            shininess: 32.0,
            bloom: BloomSettings::default(),
            resources: PathBuf::from("resources"),
        }
    }
}

impl RenderConfig {
    pub fn settings_path(&self) -> PathBuf {
        self.resources.join("program_state.txt")
    }

    pub fn object_dir(&self, asset_name: &str) -> PathBuf {
        self.resources.join("objects").join(asset_name)
    }

    pub fn texture_path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.resources.join("textures").join(relative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_paths_are_rooted() {
        let config = RenderConfig {
            resources: PathBuf::from("/data/farm"),
            ..RenderConfig::default()
        };
        assert_eq!(
            config.settings_path(),
            PathBuf::from("/data/farm/program_state.txt")
        );
        assert_eq!(
            config.object_dir("hay_bale"),
            PathBuf::from("/data/farm/objects/hay_bale")
        );
        assert_eq!(
            config.texture_path("skybox/top.jpg"),
            PathBuf::from("/data/farm/textures/skybox/top.jpg")
        );
    }

    #[test]
    fn defaults_match_demo() {
        let config = RenderConfig::default();
        assert_eq!((config.width, config.height), (1920, 1080));
        assert_eq!(config.bloom.iterations, 10);
        assert!(config.bloom.enabled);
    }
}
