use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Rotation handles always snap when set; otherwise only with shift held.
    pub snap_to_angle: bool,
    /// Degrees.
    pub snap_to_angle_step: f32,
    pub number_of_anchors: usize,
    pub fuzzy_size: f32,
    pub min_drag_length: f32,
    pub anchor_hit_radius: f32,
    pub handle_size: f32,
    pub hover_delay_ms: u64,
    pub move_step: f32,
    pub move_step_fast: f32,
    pub paste_offset: f32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            snap_to_angle: false,
            snap_to_angle_step: 15.0,
            number_of_anchors: 3,
            fuzzy_size: 8.0,
            min_drag_length: 3.0,
            anchor_hit_radius: 10.0,
            handle_size: 8.0,
            hover_delay_ms: 1000,
            move_step: 1.0,
            move_step_fast: 10.0,
            paste_offset: 10.0,
        }
    }
}

impl EngineSettings {
    /// Anchor counts are kept odd so a side always has a midpoint anchor.
    pub fn anchors_per_side(&self) -> usize {
        let n = self.number_of_anchors.max(1);
        if n % 2 == 0 { n + 1 } else { n }
    }

    pub fn snap_step_radians(&self) -> f32 {
        self.snap_to_angle_step.to_radians()
    }
}

pub fn load_settings(path: impl AsRef<Path>) -> crate::Result<EngineSettings> {
    let path = path.as_ref();
    let s = std::fs::read_to_string(path)?;
    let is_toml = path.extension().is_some_and(|e| e == "toml");
    let parsed = if is_toml {
        toml::from_str::<EngineSettings>(&s)
            .map_err(crate::Error::from)
            .or_else(|_| serde_json::from_str::<EngineSettings>(&s).map_err(crate::Error::from))
    } else {
        serde_json::from_str::<EngineSettings>(&s)
            .map_err(crate::Error::from)
            .or_else(|_| toml::from_str::<EngineSettings>(&s).map_err(crate::Error::from))
    };
    let settings = parsed?;
    tracing::debug!(path = %path.display(), "loaded engine settings");
    Ok(settings)
}

pub fn save_settings(path: impl AsRef<Path>, settings: &EngineSettings) -> crate::Result<()> {
    let path = path.as_ref();
    let text = if path.extension().is_some_and(|e| e == "toml") {
        toml::to_string_pretty(settings)?
    } else {
        serde_json::to_string_pretty(settings)?
    };
    std::fs::write(path, text)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_take_defaults() {
        let s: EngineSettings = toml::from_str("number_of_anchors = 5\n").unwrap();
        assert_eq!(s.number_of_anchors, 5);
        assert_eq!(s.fuzzy_size, 8.0);
        assert_eq!(s.hover_delay_ms, 1000);
    }

    #[test]
    fn even_anchor_counts_round_up() {
        let s = EngineSettings {
            number_of_anchors: 4,
            ..EngineSettings::default()
        };
        assert_eq!(s.anchors_per_side(), 5);
    }

    #[test]
    fn save_then_load_through_both_formats() {
        let dir = std::env::temp_dir().join(format!("pathcanvas-settings-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let settings = EngineSettings {
            snap_to_angle: true,
            anchor_hit_radius: 6.0,
            ..EngineSettings::default()
        };
        for name in ["engine.toml", "engine.json"] {
            let path = dir.join(name);
            save_settings(&path, &settings).unwrap();
            assert_eq!(load_settings(&path).unwrap(), settings);
        }
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn unreadable_file_is_an_error() {
        assert!(load_settings("/nonexistent/pathcanvas.toml").is_err());
    }
}
