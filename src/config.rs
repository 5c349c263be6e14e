//! Viewer configuration.
//!
//! Everything has a built-in default, so a config file only needs the fields
//! it changes. Native builds read `SWATCH_VIEWER_CONFIG` when it is set.

use std::path::Path;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::{data_structures::material::Tint, error::ViewerError};

pub const CONFIG_ENV_VAR: &str = "SWATCH_VIEWER_CONFIG";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbitSettings {
    pub auto_rotate: bool,
    /// Degrees per second.
    pub auto_rotate_speed: f32,
    pub damping: f32,
    pub rotate_speed: f32,
    pub pan_speed: f32,
    pub zoom_speed: f32,
    pub max_distance: f32,
}

impl Default for OrbitSettings {
    fn default() -> Self {
        Self {
            auto_rotate: true,
            auto_rotate_speed: 12.0,
            damping: 0.07,
            rotate_speed: 1.25,
            pan_speed: 1.25,
            zoom_speed: 1.0,
            max_distance: 50.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightSettings {
    pub sky_color: String,
    pub ground_color: String,
    pub intensity: f32,
}

impl Default for LightSettings {
    fn default() -> Self {
        Self {
            sky_color: "#ffffff".to_string(),
            ground_color: "#222222".to_string(),
            intensity: 1.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Directory (native) or URL path (web) that model and image references are relative to.
    pub asset_root: String,
    pub default_model: String,
    pub default_texture: String,
    pub default_color: String,
    /// Cycled with `M`.
    pub models: Vec<String>,
    /// Cycled with `T`.
    pub textures: Vec<String>,
    /// Cycled with `C`.
    pub palette: Vec<String>,
    pub clear_color: String,
    /// Vertical field of view in degrees.
    pub fov_y: f32,
    pub orbit: OrbitSettings,
    pub light: LightSettings,
    /// File that keeps the selection between runs on native builds. `null`
    /// keeps it in memory only.
    pub session_file: Option<String>,
    pub window_title: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            asset_root: "assets".to_string(),
            default_model: "model5.glb".to_string(),
            default_texture: "1.jpg".to_string(),
            default_color: "#ffffff".to_string(),
            models: vec!["model5.glb".to_string()],
            textures: vec!["1.jpg".to_string()],
            palette: ["#ffffff", "#ff0000", "#00ff00", "#0000ff", "#f4c430", "#222222"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            clear_color: "#ffffff".to_string(),
            fov_y: 20.0,
            orbit: OrbitSettings::default(),
            light: LightSettings::default(),
            session_file: default_session_file(),
            window_title: "Swatch Viewer".to_string(),
        }
    }
}

/// `swatch-viewer-session.json` in the system temp directory. Like the
/// browser's session storage it outlives restarts but not the machine session.
fn default_session_file() -> Option<String> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        Some(
            std::env::temp_dir()
                .join("swatch-viewer-session.json")
                .display()
                .to_string(),
        )
    }
    #[cfg(target_arch = "wasm32")]
    {
        None
    }
}

impl ViewerConfig {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults, overridden by the file named in `SWATCH_VIEWER_CONFIG` if any.
    pub fn from_env() -> anyhow::Result<Self> {
        match std::env::var(CONFIG_ENV_VAR) {
            Ok(path) if !path.is_empty() => Self::load(path),
            _ => Ok(Self::default()),
        }
    }

    /// Every color in the config must parse.
    pub fn validate(&self) -> Result<(), ViewerError> {
        self.default_tint()?;
        self.clear_tint()?;
        Tint::from_hex(&self.light.sky_color)?;
        Tint::from_hex(&self.light.ground_color)?;
        for color in &self.palette {
            Tint::from_hex(color)?;
        }
        Ok(())
    }

    pub fn default_tint(&self) -> Result<Tint, ViewerError> {
        Tint::from_hex(&self.default_color)
    }

    pub fn clear_tint(&self) -> Result<Tint, ViewerError> {
        Tint::from_hex(&self.clear_color)
    }
}
