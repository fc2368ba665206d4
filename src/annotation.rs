// annotation.rs — 标注数据: 路径 + 热点
//
// Points are stored as unit directions from the panorama centre, so the same
// annotation works for any sphere radius and any export resolution.

use crate::config::PathStyle;
use crate::curve::{angular_length, arc_angle, sample_path, PathKind};
use crate::error::{AnnotatorError, Result};
use crate::mesh::{build_marker, build_segments, build_tube, Mesh};
use crate::projection::{direction_to_yaw_pitch, YawPitch};
use glam::Vec3;
use serde::{Deserialize, Serialize};

pub type AnnotationId = u32;

/// Clicks closer than this (radians) to the previous point are ignored.
const MIN_POINT_SEPARATION: f32 = 1e-4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HotspotKind {
    Info { title: String, text: String },
    Link { target: String, rotation: f32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Hotspot {
    pub id: AnnotationId,
    pub position: YawPitch,
    pub kind: HotspotKind,
}

impl Hotspot {
    pub fn direction(&self) -> Vec3 {
        self.position.to_direction()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationPath {
    pub id: AnnotationId,
    pub name: String,
    pub kind: PathKind,
    pub color: [u8; 4],
    /// Tube radius in world units.
    pub radius: f32,
    pub points: Vec<Vec3>,
}

impl AnnotationPath {
    pub fn samples(&self, samples_per_span: usize) -> Vec<Vec3> {
        sample_path(self.kind, &self.points, samples_per_span)
    }

    /// Angular length along the sphere, radians.
    pub fn length(&self) -> f32 {
        angular_length(&self.samples(8))
    }

    pub fn is_drawable(&self) -> bool {
        self.points
            .windows(2)
            .any(|w| arc_angle(w[0], w[1]) >= MIN_POINT_SEPARATION)
    }
}

/// Annotations of one panorama scene, plus the path currently being drawn.
#[derive(Debug, Clone)]
pub struct AnnotationSet {
    pub scene_id: String,
    pub scene_name: String,
    /// Kind and style used when a new path starts.
    pub kind: PathKind,
    pub style: PathStyle,
    paths: Vec<AnnotationPath>,
    hotspots: Vec<Hotspot>,
    active: Option<AnnotationPath>,
    next_id: AnnotationId,
    revision: u64,
}

impl AnnotationSet {
    pub fn new(scene_id: impl Into<String>, scene_name: impl Into<String>, style: PathStyle) -> Self {
        Self {
            scene_id: scene_id.into(),
            scene_name: scene_name.into(),
            kind: PathKind::Smooth,
            style,
            paths: Vec::new(),
            hotspots: Vec::new(),
            active: None,
            next_id: 1,
            revision: 0,
        }
    }

    /// Bumped on every mutation; renderers rebuild overlay meshes when it changes.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    fn alloc_id(&mut self) -> AnnotationId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn paths(&self) -> &[AnnotationPath] {
        &self.paths
    }

    pub fn hotspots(&self) -> &[Hotspot] {
        &self.hotspots
    }

    pub fn active(&self) -> Option<&AnnotationPath> {
        self.active.as_ref()
    }

    /// Finished paths followed by the one being drawn.
    pub fn all_paths(&self) -> impl Iterator<Item = &AnnotationPath> {
        self.paths.iter().chain(self.active.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty() && self.hotspots.is_empty() && self.active.is_none()
    }

    /// Start a new path, finishing any path in progress first.
    pub fn begin_path(&mut self, kind: PathKind) -> AnnotationId {
        if self.active.is_some() {
            match self.finish_path() {
                Ok(id) => log::debug!("finished path {id} before starting a new one"),
                Err(e) => log::info!("dropped the path in progress: {e}"),
            }
        }
        self.kind = kind;
        let id = self.alloc_id();
        let number = self.paths.len() + 1;
        self.active = Some(AnnotationPath {
            id,
            name: format!("Path {number}"),
            kind,
            color: self.style.color,
            radius: self.style.tube_radius,
            points: Vec::new(),
        });
        self.touch();
        id
    }

    /// Append a point to the active path, starting one if needed.
    /// Returns false for degenerate directions and near-duplicate clicks.
    pub fn push_point(&mut self, dir: Vec3) -> bool {
        let Some(dir) = dir.try_normalize() else {
            return false;
        };
        if self.active.is_none() {
            self.begin_path(self.kind);
        }
        let Some(path) = self.active.as_mut() else {
            return false;
        };
        if let Some(prev) = path.points.last() {
            if arc_angle(*prev, dir) < MIN_POINT_SEPARATION {
                return false;
            }
        }
        path.points.push(dir);
        self.touch();
        true
    }

    /// Remove the last point. With nothing in progress, reopens the last
    /// finished path and removes its last point.
    pub fn undo_point(&mut self) -> bool {
        if self.active.is_none() {
            match self.paths.pop() {
                Some(p) => self.active = Some(p),
                None => return false,
            }
        }
        let emptied = match self.active.as_mut() {
            Some(path) => {
                path.points.pop();
                path.points.is_empty()
            }
            None => return false,
        };
        if emptied {
            self.active = None;
        }
        self.touch();
        true
    }

    /// Move the active path into the finished list. A path with fewer than
    /// two distinct points is discarded.
    pub fn finish_path(&mut self) -> Result<AnnotationId> {
        let path = self.active.take().ok_or(AnnotatorError::NoActivePath)?;
        self.touch();
        if !path.is_drawable() {
            log::debug!("discarding path '{}' with {} point(s)", path.name, path.points.len());
            return Err(AnnotatorError::EmptyPath {
                name: path.name,
                count: path.points.len(),
            });
        }
        let id = path.id;
        log::info!("finished path '{}' ({:?}, {} points)", path.name, path.kind, path.points.len());
        self.paths.push(path);
        Ok(id)
    }

    /// Add an already finished path, e.g. one read back from an export.
    pub fn insert_path(
        &mut self,
        name: impl Into<String>,
        kind: PathKind,
        color: [u8; 4],
        radius: f32,
        points: Vec<Vec3>,
    ) -> Result<AnnotationId> {
        let id = self.alloc_id();
        let path = AnnotationPath {
            id,
            name: name.into(),
            kind,
            color,
            radius,
            points: points.into_iter().filter_map(|p| p.try_normalize()).collect(),
        };
        if !path.is_drawable() {
            return Err(AnnotatorError::EmptyPath {
                name: path.name,
                count: path.points.len(),
            });
        }
        self.paths.push(path);
        self.touch();
        Ok(id)
    }

    pub fn cancel_path(&mut self) -> bool {
        let cancelled = self.active.take().is_some();
        if cancelled {
            self.touch();
        }
        cancelled
    }

    pub fn remove_path(&mut self, id: AnnotationId) -> Result<AnnotationPath> {
        if self.active.as_ref().is_some_and(|p| p.id == id) {
            self.touch();
            return self.active.take().ok_or(AnnotatorError::UnknownId(id));
        }
        let pos = self
            .paths
            .iter()
            .position(|p| p.id == id)
            .ok_or(AnnotatorError::UnknownId(id))?;
        self.touch();
        Ok(self.paths.remove(pos))
    }

    pub fn path_mut(&mut self, id: AnnotationId) -> Option<&mut AnnotationPath> {
        if self.all_paths().any(|p| p.id == id) {
            self.touch();
        }
        self.paths
            .iter_mut()
            .chain(self.active.iter_mut())
            .find(|p| p.id == id)
    }

    pub fn add_hotspot(&mut self, position: YawPitch, kind: HotspotKind) -> AnnotationId {
        let id = self.alloc_id();
        self.hotspots.push(Hotspot {
            id,
            position: position.normalized(),
            kind,
        });
        self.touch();
        id
    }

    /// Info hotspot at a picked direction, titled by its number.
    pub fn add_info_hotspot_at(&mut self, dir: Vec3) -> Option<AnnotationId> {
        let position = direction_to_yaw_pitch(dir)?;
        let title = format!("Hotspot {}", self.hotspots.len() + 1);
        Some(self.add_hotspot(
            position,
            HotspotKind::Info {
                title,
                text: String::new(),
            },
        ))
    }

    pub fn remove_hotspot(&mut self, id: AnnotationId) -> Result<Hotspot> {
        let pos = self
            .hotspots
            .iter()
            .position(|h| h.id == id)
            .ok_or(AnnotatorError::UnknownId(id))?;
        self.touch();
        Ok(self.hotspots.remove(pos))
    }

    pub fn clear(&mut self) {
        self.paths.clear();
        self.hotspots.clear();
        self.active = None;
        self.touch();
    }
}

/// Render geometry of one path on a sphere of `sphere_radius`. Paths float
/// at `style.surface_scale` of the radius so they stay in front of the panorama.
pub fn path_mesh(path: &AnnotationPath, sphere_radius: f32, style: &PathStyle) -> Option<Mesh> {
    let scale = sphere_radius * style.surface_scale;
    match path.kind {
        PathKind::Straight => {
            let points: Vec<Vec3> = path.points.iter().map(|p| *p * scale).collect();
            build_segments(&points, path.radius, style.radial_segments)
        }
        PathKind::Smooth | PathKind::Geodesic => {
            let line: Vec<Vec3> = path
                .samples(style.samples_per_span)
                .into_iter()
                .map(|p| p * scale)
                .collect();
            build_tube(&line, path.radius, style.radial_segments, false)
        }
    }
}

#[derive(Debug, Clone)]
pub struct OverlayItem {
    pub mesh: Mesh,
    pub color: [u8; 4],
}

/// Everything the overlay pass draws: path tubes, control-point markers of the
/// path being drawn, and hotspot markers.
pub fn overlay_items(
    set: &AnnotationSet,
    sphere_radius: f32,
    style: &PathStyle,
    hotspot_color: [u8; 4],
) -> Vec<OverlayItem> {
    let scale = sphere_radius * style.surface_scale;
    let mut items = Vec::new();

    for path in set.all_paths() {
        if let Some(mesh) = path_mesh(path, sphere_radius, style) {
            items.push(OverlayItem {
                mesh,
                color: path.color,
            });
        }
    }

    if let Some(active) = set.active() {
        let markers: Vec<Mesh> = active
            .points
            .iter()
            .map(|p| build_marker(*p * scale, style.marker_radius))
            .collect();
        if !markers.is_empty() {
            items.push(OverlayItem {
                mesh: Mesh::merged(&markers),
                color: active.color,
            });
        }
    }

    let hotspot_markers: Vec<Mesh> = set
        .hotspots()
        .iter()
        .map(|h| build_marker(h.direction() * scale, style.marker_radius * 1.5))
        .collect();
    if !hotspot_markers.is_empty() {
        items.push(OverlayItem {
            mesh: Mesh::merged(&hotspot_markers),
            color: hotspot_color,
        });
    }

    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn set() -> AnnotationSet {
        AnnotationSet::new("scene-0", "Lobby", PathStyle::default())
    }

    fn dir(yaw_deg: f32, pitch_deg: f32) -> Vec3 {
        YawPitch::from_degrees(yaw_deg, pitch_deg).to_direction()
    }

    #[test]
    fn push_point_starts_a_path() {
        let mut s = set();
        assert!(s.push_point(dir(0.0, 0.0)));
        assert!(s.push_point(dir(10.0, 0.0)));
        let active = s.active().unwrap();
        assert_eq!(active.points.len(), 2);
        assert_eq!(active.kind, PathKind::Smooth);
        assert_eq!(active.name, "Path 1");
    }

    #[test]
    fn duplicate_and_zero_points_are_rejected() {
        let mut s = set();
        assert!(!s.push_point(Vec3::ZERO));
        assert!(s.push_point(dir(5.0, 5.0)));
        let rev = s.revision();
        assert!(!s.push_point(dir(5.0, 5.0) * 3.0));
        assert_eq!(s.revision(), rev);
    }

    #[test]
    fn finish_discards_short_paths() {
        let mut s = set();
        assert!(matches!(s.finish_path(), Err(AnnotatorError::NoActivePath)));
        s.push_point(dir(0.0, 0.0));
        assert!(matches!(s.finish_path(), Err(AnnotatorError::EmptyPath { count: 1, .. })));
        assert!(s.paths().is_empty());
        assert!(s.active().is_none());

        s.begin_path(PathKind::Geodesic);
        s.push_point(dir(0.0, 0.0));
        s.push_point(dir(90.0, 0.0));
        let id = s.finish_path().unwrap();
        assert_eq!(s.paths().len(), 1);
        assert_eq!(s.paths()[0].id, id);
        assert_abs_diff_eq!(s.paths()[0].length(), std::f32::consts::FRAC_PI_2, epsilon = 1e-3);
    }

    #[test]
    fn undo_reopens_the_last_finished_path() {
        let mut s = set();
        s.push_point(dir(0.0, 0.0));
        s.push_point(dir(10.0, 0.0));
        s.push_point(dir(20.0, 0.0));
        s.finish_path().unwrap();

        assert!(s.undo_point());
        assert!(s.paths().is_empty());
        assert_eq!(s.active().unwrap().points.len(), 2);
        assert!(s.undo_point());
        assert!(s.undo_point());
        assert!(s.active().is_none());
        assert!(!s.undo_point());
    }

    #[test]
    fn begin_path_finishes_the_previous_one() {
        let mut s = set();
        s.push_point(dir(0.0, 0.0));
        s.push_point(dir(0.0, 20.0));
        s.begin_path(PathKind::Straight);
        assert_eq!(s.paths().len(), 1);
        assert_eq!(s.active().unwrap().kind, PathKind::Straight);
        assert_eq!(s.active().unwrap().name, "Path 2");
    }

    #[test]
    fn begin_path_drops_a_single_point_path() {
        let mut s = set();
        s.push_point(dir(0.0, 0.0));
        let id = s.begin_path(PathKind::Smooth);
        assert!(s.paths().is_empty());
        let active = s.active().unwrap();
        assert_eq!(active.id, id);
        assert!(active.points.is_empty());
        assert_eq!(active.name, "Path 1");
    }

    #[test]
    fn nearby_but_distinct_points_are_kept() {
        let mut s = set();
        assert!(s.push_point(dir(0.0, 0.0)));
        // about 3.5e-4 rad apart: below what acos can resolve in f32
        assert!(s.push_point(dir(0.02, 0.0)));
        assert_eq!(s.active().unwrap().points.len(), 2);
    }

    #[test]
    fn paths_can_be_edited_and_removed() {
        let mut s = set();
        s.push_point(dir(0.0, 0.0));
        s.push_point(dir(30.0, 0.0));
        let id = s.finish_path().unwrap();

        let rev = s.revision();
        assert!(s.path_mut(id + 100).is_none());
        assert_eq!(s.revision(), rev);
        s.path_mut(id).unwrap().color = [0, 255, 0, 255];
        assert!(s.revision() > rev);
        assert_eq!(s.paths()[0].color, [0, 255, 0, 255]);

        let removed = s.remove_path(id).unwrap();
        assert_eq!(removed.points.len(), 2);
        assert!(s.paths().is_empty());
        assert!(matches!(s.remove_path(id), Err(AnnotatorError::UnknownId(_))));
    }

    #[test]
    fn hotspots_and_removal() {
        let mut s = set();
        let a = s.add_info_hotspot_at(dir(45.0, 10.0)).unwrap();
        let b = s.add_hotspot(
            YawPitch::from_degrees(400.0, 0.0),
            HotspotKind::Link {
                target: "scene-1".into(),
                rotation: 0.0,
            },
        );
        assert_ne!(a, b);
        assert_abs_diff_eq!(s.hotspots()[1].position.yaw, 40f32.to_radians(), epsilon = 1e-5);
        assert!(matches!(&s.hotspots()[0].kind, HotspotKind::Info { title, .. } if title == "Hotspot 1"));
        s.remove_hotspot(a).unwrap();
        assert!(matches!(s.remove_hotspot(a), Err(AnnotatorError::UnknownId(_))));
        assert_eq!(s.hotspots().len(), 1);
        s.clear();
        assert!(s.is_empty());
    }

    #[test]
    fn path_meshes_sit_inside_the_panorama() {
        let mut s = set();
        for yaw in [0.0, 15.0, 30.0, 45.0] {
            s.push_point(dir(yaw, yaw / 3.0));
        }
        let style = PathStyle::default();
        for kind in PathKind::ALL {
            let mut path = s.active().unwrap().clone();
            path.kind = kind;
            let mesh = path_mesh(&path, 500.0, &style).unwrap();
            assert!(mesh.is_valid());
            let max = mesh
                .positions
                .iter()
                .map(|p| Vec3::from(*p).length())
                .fold(0.0f32, f32::max);
            assert!(max < 500.0, "{kind:?}: {max}");
        }
    }

    #[test]
    fn overlay_has_paths_markers_and_hotspots() {
        let mut s = set();
        s.push_point(dir(0.0, 0.0));
        s.push_point(dir(20.0, 0.0));
        s.finish_path().unwrap();
        s.push_point(dir(-20.0, 0.0));
        s.add_info_hotspot_at(dir(90.0, 0.0));
        let items = overlay_items(&s, 500.0, &PathStyle::default(), [255, 255, 0, 255]);
        // finished tube, active control marker, hotspot marker (the one-point path has no tube)
        assert_eq!(items.len(), 3);
        assert_eq!(items[2].color, [255, 255, 0, 255]);
    }
}
