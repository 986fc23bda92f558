use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use glam::Vec3;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

/// Persisted program state, one value per line in field order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SettingsRecord {
    pub clear_color: Vec3,
    pub overlay_enabled: bool,
    pub camera_position: Vec3,
    pub camera_front: Vec3,
    /// Absent in records written before bloom existed.
    pub bloom_enabled: Option<bool>,
}

impl SettingsRecord {
    /// Parses a complete record. The bloom line may be absent; any other
    /// missing value, or any malformed value, rejects the whole record.
    pub fn parse(text: &str) -> Result<Self> {
        let absent_tail = text.split_whitespace().nth(10).is_none();
        let mut values = text.split_whitespace();
        let mut next_f32 = |name: &str| -> Result<f32> {
            let raw = values
                .next()
                .ok_or_else(|| anyhow!("{name} is missing"))?;
            raw.parse::<f32>()
                .with_context(|| format!("{name} is not a number: {raw:?}"))
        };
        let clear_color = Vec3::new(
            next_f32("clearColor.r")?,
            next_f32("clearColor.g")?,
            next_f32("clearColor.b")?,
        );
        let overlay_enabled = parse_flag(next_f32("overlayEnabled")?, "overlayEnabled")?;
        let camera_position = Vec3::new(
            next_f32("camera.position.x")?,
            next_f32("camera.position.y")?,
            next_f32("camera.position.z")?,
        );
        let camera_front = Vec3::new(
            next_f32("camera.front.x")?,
            next_f32("camera.front.y")?,
            next_f32("camera.front.z")?,
        );
        let bloom_enabled = match next_f32("bloomEnabled") {
            Ok(value) => Some(parse_flag(value, "bloomEnabled")?),
            Err(_) if absent_tail => None,
            Err(err) => return Err(err),
        };
        Ok(Self {
            clear_color,
            overlay_enabled,
            camera_position,
            camera_front,
            bloom_enabled,
        })
    }

    pub fn to_record_string(&self) -> String {
        let mut out = String::new();
        let values = [
            self.clear_color.x,
            self.clear_color.y,
            self.clear_color.z,
            flag(self.overlay_enabled),
            self.camera_position.x,
            self.camera_position.y,
            self.camera_position.z,
            self.camera_front.x,
            self.camera_front.y,
            self.camera_front.z,
        ];
        for value in values {
            let _ = writeln!(out, "{value}");
        }
        if let Some(bloom) = self.bloom_enabled {
            let _ = writeln!(out, "{}", flag(bloom));
        }
        out
    }

    /// Best-effort load: an absent or malformed file yields `None` and the
    /// caller keeps its defaults.
    pub fn load(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) => {
                debug!("no settings at {}: {err}", path.display());
                return None;
            }
        };
        match Self::parse(&text) {
            Ok(record) => {
                info!("loaded settings from {}", path.display());
                Some(record)
            }
            Err(err) => {
                warn!("ignoring malformed settings {}: {err:#}", path.display());
                None
            }
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("unable to create {}", parent.display()))?;
        }
        fs::write(path, self.to_record_string())
            .with_context(|| format!("unable to write {}", path.display()))
    }
}

fn flag(value: bool) -> f32 {
    if value {
        1.0
    } else {
        0.0
    }
}

fn parse_flag(value: f32, name: &str) -> Result<bool> {
    if value == 0.0 {
        Ok(false)
    } else if value == 1.0 {
        Ok(true)
    } else {
        Err(anyhow!("{name} must be 0 or 1, got {value}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SettingsRecord {
        SettingsRecord {
            clear_color: Vec3::new(0.1, 0.2, 0.3),
            overlay_enabled: true,
            camera_position: Vec3::new(4.5, 1.25, -7.0),
            camera_front: Vec3::new(0.0, 0.0, -1.0),
            bloom_enabled: Some(false),
        }
    }

    #[test]
    fn record_has_one_value_per_line() {
        let text = sample().to_record_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 11);
        assert_eq!(lines[3], "1");
        assert_eq!(lines[4], "4.5");
        assert_eq!(lines[10], "0");
    }

    #[test]
    fn saved_record_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("program_state.txt");
        sample().save(&path).unwrap();
        assert_eq!(SettingsRecord::load(&path), Some(sample()));
    }

    #[test]
    fn older_record_without_bloom_line_loads() {
        let text = "0\n0\n0\n0\n0\n0\n3\n0\n0\n-1\n";
        let record = SettingsRecord::parse(text).unwrap();
        assert_eq!(record.bloom_enabled, None);
        assert_eq!(record.camera_position, Vec3::new(0.0, 0.0, 3.0));
    }

    #[test]
    fn truncated_or_garbled_records_are_rejected() {
        assert!(SettingsRecord::parse("0.5\n0.5\n").is_err());
        assert!(SettingsRecord::parse("0\n0\n0\nyes\n0\n0\n3\n0\n0\n-1\n").is_err());
        assert!(SettingsRecord::parse("0\n0\n0\n2\n0\n0\n3\n0\n0\n-1\n").is_err());
    }

    #[test]
    fn present_bloom_line_must_be_a_flag() {
        let prefix = "0\n0\n0\n0\n0\n0\n3\n0\n0\n-1\n";
        assert!(SettingsRecord::parse(&format!("{prefix}abc\n")).is_err());
        assert!(SettingsRecord::parse(&format!("{prefix}2\n")).is_err());
        let record = SettingsRecord::parse(&format!("{prefix}1\n")).unwrap();
        assert_eq!(record.bloom_enabled, Some(true));
    }

    #[test]
    fn missing_file_loads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(SettingsRecord::load(dir.path().join("absent.txt")), None);
    }
}
