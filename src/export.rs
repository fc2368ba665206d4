// export.rs — 导出: 等距柱状叠加图 (PNG) / 标注 JSON / Marzipano JSON
//
// Image export draws every path straight into equirectangular pixel space.
// A stroke that leaves the right edge re-enters on the left: segments are
// split at the seam and brushes wrap horizontally.

use crate::annotation::{AnnotationSet, HotspotKind};
use crate::config::{ExportConfig, PathStyle};
use crate::curve::PathKind;
use crate::error::{AnnotatorError, Result};
use crate::projection::{
    crosses_seam, direction_to_uv, direction_to_yaw_pitch, seam_delta, uv_to_pixel, YawPitch,
};
use glam::{Vec2, Vec3};
use image::{imageops, ImageFormat, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::path::Path;

const RASTER_SAMPLES_PER_SPAN: usize = 32;
const DOCUMENT_VERSION: u32 = 1;

// ====================
// Image
// ====================

/// Split a uv segment where it crosses the seam. Returns one segment, or two
/// that end/start on u = 1 and u = 0.
pub fn seam_segments(a: Vec2, b: Vec2) -> Vec<(Vec2, Vec2)> {
    if !crosses_seam(a.x, b.x) {
        return vec![(a, b)];
    }
    let du = seam_delta(a.x, b.x);
    if du.abs() < f32::EPSILON {
        return vec![(a, b)];
    }
    let (edge_out, edge_in) = if du > 0.0 { (1.0, 0.0) } else { (0.0, 1.0) };
    let t = ((edge_out - a.x) / du).clamp(0.0, 1.0);
    let v = a.y + (b.y - a.y) * t;
    vec![(a, Vec2::new(edge_out, v)), (Vec2::new(edge_in, v), b)]
}

struct Canvas {
    image: RgbaImage,
}

impl Canvas {
    fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0])),
        }
    }

    /// Filled disc; x wraps around the seam, y is clipped.
    fn stamp(&mut self, centre: Vec2, radius: f32, color: Rgba<u8>) {
        let (w, h) = self.image.dimensions();
        let r = radius.max(0.5);
        let y0 = (centre.y - r).floor().max(0.0) as i64;
        let y1 = (centre.y + r).ceil().min(h as f32 - 1.0) as i64;
        let x0 = (centre.x - r).floor() as i64;
        let x1 = (centre.x + r).ceil() as i64;
        for y in y0..=y1 {
            for x in x0..=x1 {
                let dx = x as f32 + 0.5 - centre.x;
                let dy = y as f32 + 0.5 - centre.y;
                if dx * dx + dy * dy > r * r {
                    continue;
                }
                let wx = x.rem_euclid(w as i64) as u32;
                self.image.put_pixel(wx, y as u32, color);
            }
        }
    }

    fn line(&mut self, a: Vec2, b: Vec2, radius: f32, color: Rgba<u8>) {
        let step = (radius * 0.5).max(0.5);
        let steps = (a.distance(b) / step).ceil().max(1.0) as usize;
        for i in 0..=steps {
            self.stamp(a.lerp(b, i as f32 / steps as f32), radius, color);
        }
    }
}

/// Transparent equirectangular overlay with every path (finished and in
/// progress) and hotspot of the set.
pub fn rasterize_paths(set: &AnnotationSet, width: u32, height: u32, cfg: &ExportConfig) -> Result<RgbaImage> {
    if width == 0 || height == 0 {
        return Err(AnnotatorError::InvalidDimensions { width, height });
    }
    let mut canvas = Canvas::new(width, height);
    let radius = cfg.stroke_width * 0.5;

    for path in set.all_paths() {
        let color = Rgba(path.color);
        let uvs: Vec<Vec2> = path
            .samples(RASTER_SAMPLES_PER_SPAN)
            .into_iter()
            .filter_map(direction_to_uv)
            .collect();
        if let [only] = uvs.as_slice() {
            canvas.stamp(uv_to_pixel(*only, width, height), radius, color);
        }
        for w in uvs.windows(2) {
            for (a, b) in seam_segments(w[0], w[1]) {
                canvas.line(uv_to_pixel(a, width, height), uv_to_pixel(b, width, height), radius, color);
            }
        }
    }

    for hotspot in set.hotspots() {
        let uv = hotspot.position.to_uv();
        canvas.stamp(uv_to_pixel(uv, width, height), cfg.hotspot_radius, Rgba(cfg.hotspot_color));
    }

    log::debug!(
        "rasterized {} path(s), {} hotspot(s) at {}x{}",
        set.all_paths().count(),
        set.hotspots().len(),
        width,
        height
    );
    Ok(canvas.image)
}

/// Alpha-blend `overlay` on top of `panorama`; the overlay is resized first if needed.
pub fn composite(panorama: &RgbaImage, overlay: &RgbaImage) -> RgbaImage {
    let mut out = panorama.clone();
    let (w, h) = panorama.dimensions();
    if overlay.dimensions() == (w, h) {
        imageops::overlay(&mut out, overlay, 0, 0);
    } else {
        let scaled = imageops::resize(overlay, w, h, imageops::FilterType::Triangle);
        imageops::overlay(&mut out, &scaled, 0, 0);
    }
    out
}

pub fn export_png(image: &RgbaImage, path: &Path) -> Result<()> {
    image.save_with_format(path, ImageFormat::Png)?;
    log::info!("wrote {}x{} PNG to {}", image.width(), image.height(), path.display());
    Ok(())
}

// ====================
// Annotation JSON
// ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointRecord {
    pub yaw: f32,
    pub pitch: f32,
    pub u: f32,
    pub v: f32,
}

impl PointRecord {
    fn from_direction(dir: Vec3) -> Option<Self> {
        let yp = direction_to_yaw_pitch(dir)?;
        let uv = yp.to_uv();
        Some(Self {
            yaw: yp.yaw,
            pitch: yp.pitch,
            u: uv.x,
            v: uv.y,
        })
    }

    fn direction(&self) -> Vec3 {
        YawPitch::new(self.yaw, self.pitch).to_direction()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathRecord {
    pub id: u32,
    pub name: String,
    pub kind: PathKind,
    pub color: [u8; 4],
    pub radius: f32,
    pub points: Vec<PointRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotspotRecord {
    pub id: u32,
    pub yaw: f32,
    pub pitch: f32,
    #[serde(flatten)]
    pub kind: HotspotKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneRecord {
    pub id: String,
    pub name: String,
}

/// Self-contained annotation export: angles in radians, uv in image space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationDocument {
    pub version: u32,
    pub scene: SceneRecord,
    pub paths: Vec<PathRecord>,
    pub hotspots: Vec<HotspotRecord>,
}

impl AnnotationDocument {
    /// Finished paths only; a path still being drawn is not part of the export.
    pub fn from_set(set: &AnnotationSet) -> Self {
        Self {
            version: DOCUMENT_VERSION,
            scene: SceneRecord {
                id: set.scene_id.clone(),
                name: set.scene_name.clone(),
            },
            paths: set
                .paths()
                .iter()
                .map(|p| PathRecord {
                    id: p.id,
                    name: p.name.clone(),
                    kind: p.kind,
                    color: p.color,
                    radius: p.radius,
                    points: p.points.iter().filter_map(|d| PointRecord::from_direction(*d)).collect(),
                })
                .collect(),
            hotspots: set
                .hotspots()
                .iter()
                .map(|h| HotspotRecord {
                    id: h.id,
                    yaw: h.position.yaw,
                    pitch: h.position.pitch,
                    kind: h.kind.clone(),
                })
                .collect(),
        }
    }

    /// Rebuild a set; ids are reassigned. Paths that are too short are skipped.
    pub fn to_set(&self, style: PathStyle) -> AnnotationSet {
        let mut set = AnnotationSet::new(self.scene.id.clone(), self.scene.name.clone(), style);
        for p in &self.paths {
            let points = p.points.iter().map(PointRecord::direction).collect();
            if let Err(e) = set.insert_path(p.name.clone(), p.kind, p.color, p.radius, points) {
                log::warn!("skipping path on import: {e}");
            }
        }
        for h in &self.hotspots {
            set.add_hotspot(YawPitch::new(h.yaw, h.pitch), h.kind.clone());
        }
        set
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| AnnotatorError::io(path, e))?;
        Self::from_json_str(&text)
    }
}

// ====================
// Marzipano JSON
// ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarzipanoLevel {
    pub tile_size: u32,
    pub size: u32,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub fallback_only: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewParameters {
    pub yaw: f32,
    /// Marzipano pitch: positive looks down.
    pub pitch: f32,
    pub fov: f32,
}

impl ViewParameters {
    /// From a look direction and vertical FOV, both in radians.
    pub fn from_look(look: YawPitch, fov: f32) -> Self {
        let look = look.normalized();
        Self {
            yaw: look.yaw,
            pitch: -look.pitch,
            fov,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkHotspot {
    pub yaw: f32,
    pub pitch: f32,
    pub rotation: f32,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfoHotspot {
    pub yaw: f32,
    pub pitch: f32,
    pub title: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarzipanoPoint {
    pub yaw: f32,
    pub pitch: f32,
}

/// Not part of the Marzipano schema; the viewer ignores unknown keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarzipanoPath {
    pub name: String,
    pub kind: PathKind,
    pub color: String,
    pub points: Vec<MarzipanoPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarzipanoScene {
    pub id: String,
    pub name: String,
    pub levels: Vec<MarzipanoLevel>,
    pub face_size: u32,
    pub initial_view_parameters: ViewParameters,
    pub link_hotspots: Vec<LinkHotspot>,
    pub info_hotspots: Vec<InfoHotspot>,
    #[serde(default)]
    pub paths: Vec<MarzipanoPath>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarzipanoSettings {
    pub mouse_view_mode: String,
    pub autorotate_enabled: bool,
    pub fullscreen_button: bool,
    pub view_control_buttons: bool,
}

/// The `APP_DATA` object of a Marzipano tool project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarzipanoData {
    pub scenes: Vec<MarzipanoScene>,
    pub name: String,
    pub settings: MarzipanoSettings,
}

/// 256 fallback level, then 512, 1024, ... up to the face size.
pub fn marzipano_levels(face_size: u32, tile_size: u32) -> Vec<MarzipanoLevel> {
    let mut levels = vec![MarzipanoLevel {
        tile_size: 256,
        size: 256,
        fallback_only: true,
    }];
    let mut size = 512;
    while size <= face_size.max(512) {
        levels.push(MarzipanoLevel {
            tile_size: tile_size.min(size),
            size,
            fallback_only: false,
        });
        size *= 2;
    }
    levels
}

fn hex_color(c: [u8; 4]) -> String {
    format!("#{:02x}{:02x}{:02x}", c[0], c[1], c[2])
}

fn marzipano_point(yp: YawPitch) -> MarzipanoPoint {
    let yp = yp.normalized();
    MarzipanoPoint {
        yaw: yp.yaw,
        pitch: -yp.pitch,
    }
}

pub fn to_marzipano(
    set: &AnnotationSet,
    tour_name: &str,
    initial_view: ViewParameters,
    auto_rotate: bool,
    cfg: &ExportConfig,
) -> MarzipanoData {
    let mut link_hotspots = Vec::new();
    let mut info_hotspots = Vec::new();
    for h in set.hotspots() {
        let p = marzipano_point(h.position);
        match &h.kind {
            HotspotKind::Link { target, rotation } => link_hotspots.push(LinkHotspot {
                yaw: p.yaw,
                pitch: p.pitch,
                rotation: *rotation,
                target: target.clone(),
            }),
            HotspotKind::Info { title, text } => info_hotspots.push(InfoHotspot {
                yaw: p.yaw,
                pitch: p.pitch,
                title: title.clone(),
                text: text.clone(),
            }),
        }
    }

    let paths = set
        .paths()
        .iter()
        .map(|p| MarzipanoPath {
            name: p.name.clone(),
            kind: p.kind,
            color: hex_color(p.color),
            points: p
                .points
                .iter()
                .filter_map(|d| direction_to_yaw_pitch(*d))
                .map(marzipano_point)
                .collect(),
        })
        .collect();

    MarzipanoData {
        scenes: vec![MarzipanoScene {
            id: set.scene_id.clone(),
            name: set.scene_name.clone(),
            levels: marzipano_levels(cfg.face_size, cfg.tile_size),
            face_size: cfg.face_size,
            initial_view_parameters: initial_view,
            link_hotspots,
            info_hotspots,
            paths,
        }],
        name: tour_name.to_string(),
        settings: MarzipanoSettings {
            mouse_view_mode: "drag".to_string(),
            autorotate_enabled: auto_rotate,
            fullscreen_button: true,
            view_control_buttons: true,
        },
    }
}

pub fn to_json_string<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

pub fn export_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let text = to_json_string(value)?;
    std::fs::write(path, text).map_err(|e| AnnotatorError::io(path, e))?;
    log::info!("wrote JSON to {}", path.display());
    Ok(())
}
