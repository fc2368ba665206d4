// config.rs — viewer configuration
//
// Sources, later wins:
//   1. built-in defaults
//   2. JSON file: --config <path> | PANORAMA_CONFIG | <exe_dir>/assets/config.json | ./assets/config.json
//   3. CLI: --image <path>
//
// Every section is `#[serde(default)]`, so a config file only needs the keys it changes.

use crate::error::{AnnotatorError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub yaw_deg: f32,
    pub pitch_deg: f32,
    /// Vertical field of view.
    pub fov_deg: f32,
    pub fov_min_deg: f32,
    pub fov_max_deg: f32,
    pub near: f32,
    pub far: f32,
    /// 1.0 keeps the panorama glued to the cursor while dragging.
    pub sensitivity: f32,
    pub auto_rotate: bool,
    pub auto_rotate_deg_per_sec: f32,
    /// Fraction of drag velocity lost per 60 Hz tick after release.
    pub damping: f32,
    pub zoom_enabled: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            yaw_deg: 0.0,
            pitch_deg: 0.0,
            fov_deg: 75.0,
            fov_min_deg: 20.0,
            fov_max_deg: 120.0,
            near: 0.1,
            far: 2000.0,
            sensitivity: 1.0,
            auto_rotate: true,
            // 0.0006 rad per frame at 60 fps
            auto_rotate_deg_per_sec: 2.0626,
            damping: 0.05,
            zoom_enabled: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SphereConfig {
    pub radius: f32,
    pub width_segments: usize,
    pub height_segments: usize,
}

impl Default for SphereConfig {
    fn default() -> Self {
        Self {
            radius: 500.0,
            width_segments: 80,
            height_segments: 60,
        }
    }
}

/// Geometry and colour used for newly drawn paths and their meshes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathStyle {
    pub color: [u8; 4],
    /// Tube radius in world units (the sphere is `SphereConfig::radius`).
    pub tube_radius: f32,
    pub radial_segments: usize,
    pub samples_per_span: usize,
    /// Paths float just inside the panorama so they never z-fight with it.
    pub surface_scale: f32,
    pub marker_radius: f32,
}

impl Default for PathStyle {
    fn default() -> Self {
        Self {
            color: [255, 64, 32, 255],
            tube_radius: 2.0,
            radial_segments: 8,
            samples_per_span: 16,
            surface_scale: 0.98,
            marker_radius: 4.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub width: u32,
    pub height: u32,
    /// Stroke width in pixels of the exported image.
    pub stroke_width: f32,
    pub hotspot_radius: f32,
    pub hotspot_color: [u8; 4],
    /// Cube face size advertised in the Marzipano scene levels.
    pub face_size: u32,
    pub tile_size: u32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            width: 4096,
            height: 2048,
            stroke_width: 6.0,
            hotspot_radius: 10.0,
            hotspot_color: [255, 220, 0, 255],
            face_size: 2048,
            tile_size: 512,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Press/release travel below this counts as a click, not a drag.
    pub click_tolerance_px: f32,
    pub pick_max_angle_deg: f32,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            click_tolerance_px: 4.0,
            pick_max_angle_deg: 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub camera: CameraConfig,
    pub sphere: SphereConfig,
    pub path: PathStyle,
    pub export: ExportConfig,
    pub input: InputConfig,
    pub initial_image: Option<PathBuf>,
}

impl ViewerConfig {
    pub fn from_json_str(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| AnnotatorError::io(path, e))?;
        Self::from_json_str(&text).map_err(|e| AnnotatorError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Defaults when no file is found; a file that exists but fails to parse is an error.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    /// Resolve from the process arguments and environment.
    pub fn resolve() -> Result<Self> {
        let args: Vec<String> = std::env::args().collect();
        let env_path = std::env::var("PANORAMA_CONFIG").ok();
        let path = config_path_from(&args, env_path.as_deref()).or_else(find_default_config_file);
        if let Some(p) = &path {
            log::info!("loading config from {}", p.display());
        }
        let mut config = Self::load_or_default(path.as_deref())?;
        config.apply_args(&args);
        Ok(config)
    }

    pub fn apply_args(&mut self, args: &[String]) {
        if let Some(image) = flag_value(args, "--image") {
            self.initial_image = Some(PathBuf::from(image));
        }
    }
}

pub(crate) fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    let mut it = args.iter();
    while let Some(a) = it.next() {
        if a == flag {
            return it.next().map(String::as_str);
        }
    }
    None
}

/// CLI `--config <path>` first, then the env value.
pub fn config_path_from(args: &[String], env_value: Option<&str>) -> Option<PathBuf> {
    if let Some(v) = flag_value(args, "--config") {
        return Some(PathBuf::from(v));
    }
    env_value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// 1) <exe_dir>/assets/config.json
/// 2) ./assets/config.json
fn find_default_config_file() -> Option<PathBuf> {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let p = dir.join("assets").join("config.json");
            if p.exists() {
                return Some(p);
            }
        }
    }

    let p = PathBuf::from("assets").join("config.json");
    if p.exists() {
        return Some(p);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let cfg = ViewerConfig::from_json_str(r#"{ "camera": { "fov_deg": 60.0 }, "sphere": { "radius": 100.0 } }"#)
            .unwrap();
        assert_eq!(cfg.camera.fov_deg, 60.0);
        assert_eq!(cfg.camera.far, 2000.0);
        assert_eq!(cfg.sphere.radius, 100.0);
        assert_eq!(cfg.sphere.width_segments, 80);
        assert_eq!(cfg.path, PathStyle::default());
    }

    #[test]
    fn empty_object_is_default() {
        assert_eq!(ViewerConfig::from_json_str("{}").unwrap(), ViewerConfig::default());
    }

    #[test]
    fn cli_flag_beats_env() {
        let a = args(&["viewer", "--config", "cli.json"]);
        assert_eq!(config_path_from(&a, Some("env.json")), Some(PathBuf::from("cli.json")));
        assert_eq!(config_path_from(&args(&["viewer"]), Some("env.json")), Some(PathBuf::from("env.json")));
        assert_eq!(config_path_from(&args(&["viewer"]), Some("  ")), None);
    }

    #[test]
    fn image_flag_sets_initial_image() {
        let mut cfg = ViewerConfig::default();
        cfg.apply_args(&args(&["viewer", "--image", "pano.jpg"]));
        assert_eq!(cfg.initial_image, Some(PathBuf::from("pano.jpg")));
    }

    #[test]
    fn broken_file_is_a_config_error() {
        let path = std::env::temp_dir().join("panorama_annotator_broken_config.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = ViewerConfig::load(&path).unwrap_err();
        assert!(matches!(err, AnnotatorError::Config { .. }));
        let _ = std::fs::remove_file(&path);
    }
}
