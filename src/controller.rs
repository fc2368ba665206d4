// controller.rs — 输入事件 -> 相机 / 拾取 / 标注
//
// Knows nothing about winit or wgpu: the window loop translates its events
// into `InputEvent`s and reads the camera and annotations back out.

use crate::annotation::{AnnotationId, AnnotationSet};
use crate::camera::OrbitCamera;
use crate::config::ViewerConfig;
use crate::curve::PathKind;
use crate::picking::{pick_direction, pick_nearest, screen_ray, Viewport};
use crate::projection::direction_to_uv;
use glam::{Vec2, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Navigate,
    DrawPath(PathKind),
    PlaceHotspot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ToggleAutoRotate,
    Undo,
    FinishPath,
    Cancel,
    /// Remove the hotspot under the cursor.
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    PointerDown { pos: Vec2, button: PointerButton },
    PointerMove { pos: Vec2 },
    PointerUp { pos: Vec2, button: PointerButton },
    Wheel { delta: f32 },
    Key(Key),
    Resize(Viewport),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerEvent {
    PointAdded { path: AnnotationId, count: usize },
    HotspotPlaced(AnnotationId),
    HotspotRemoved(AnnotationId),
    PathFinished(AnnotationId),
    PathCancelled,
    Undone,
    AutoRotateToggled(bool),
}

#[derive(Debug, Clone, Copy)]
struct Press {
    button: PointerButton,
    start: Vec2,
    last: Vec2,
    dragged: bool,
}

pub struct Controller {
    pub camera: OrbitCamera,
    pub annotations: AnnotationSet,
    tool: Tool,
    viewport: Viewport,
    sphere_radius: f32,
    click_tolerance: f32,
    pick_max_angle: f32,
    press: Option<Press>,
    cursor: Option<Vec2>,
}

impl Controller {
    pub fn new(config: &ViewerConfig, viewport: Viewport) -> Self {
        Self {
            camera: OrbitCamera::from_config(&config.camera),
            annotations: AnnotationSet::new("0-panorama", "Panorama", config.path.clone()),
            tool: Tool::Navigate,
            viewport,
            sphere_radius: config.sphere.radius,
            click_tolerance: config.input.click_tolerance_px.max(0.0),
            pick_max_angle: config.input.pick_max_angle_deg.to_radians(),
            press: None,
            cursor: None,
        }
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Switching away from a path tool, or to another path kind, finishes the
    /// path in progress.
    pub fn set_tool(&mut self, tool: Tool) -> Option<ControllerEvent> {
        if tool == self.tool {
            return None;
        }
        let finished = if self.annotations.active().is_some() {
            self.annotations.finish_path().ok().map(ControllerEvent::PathFinished)
        } else {
            None
        };
        if let Tool::DrawPath(kind) = tool {
            self.annotations.kind = kind;
        }
        log::debug!("tool {:?} -> {:?}", self.tool, tool);
        self.tool = tool;
        finished
    }

    pub fn update(&mut self, dt: f32) {
        self.camera.update(dt);
    }

    pub fn hovered_direction(&self) -> Option<Vec3> {
        let cursor = self.cursor?;
        pick_direction(&self.camera, self.viewport, cursor, self.sphere_radius)
    }

    pub fn hovered_uv(&self) -> Option<Vec2> {
        direction_to_uv(self.hovered_direction()?)
    }

    pub fn handle(&mut self, event: InputEvent) -> Option<ControllerEvent> {
        match event {
            InputEvent::PointerDown { pos, button } => {
                self.cursor = Some(pos);
                // a release we never saw (e.g. swallowed by the UI) must not leave the camera held
                if self.press.take().is_some_and(|p| p.dragged) {
                    self.camera.end_drag();
                }
                self.press = Some(Press {
                    button,
                    start: pos,
                    last: pos,
                    dragged: false,
                });
                None
            }
            InputEvent::PointerMove { pos } => {
                self.cursor = Some(pos);
                self.pointer_move(pos);
                None
            }
            InputEvent::PointerUp { pos, button } => {
                self.cursor = Some(pos);
                let press = self.press.take()?;
                if press.button != button {
                    return None;
                }
                if press.dragged {
                    self.camera.end_drag();
                    return None;
                }
                self.click(pos, button)
            }
            InputEvent::Wheel { delta } => {
                self.camera.zoom(delta);
                None
            }
            InputEvent::Key(key) => self.key(key),
            InputEvent::Resize(viewport) => {
                self.viewport = viewport;
                None
            }
        }
    }

    fn pointer_move(&mut self, pos: Vec2) {
        let Some(press) = self.press.as_mut() else {
            return;
        };
        if !press.dragged && press.start.distance(pos) > self.click_tolerance {
            press.dragged = true;
        }
        if press.dragged {
            let delta = pos - press.last;
            press.last = pos;
            self.camera.drag(delta.x, delta.y, self.viewport);
        }
    }

    fn click(&mut self, pos: Vec2, button: PointerButton) -> Option<ControllerEvent> {
        match (self.tool, button) {
            (Tool::DrawPath(kind), PointerButton::Primary) => {
                let dir = pick_direction(&self.camera, self.viewport, pos, self.sphere_radius)?;
                if self.annotations.active().map_or(true, |p| p.kind != kind) {
                    self.annotations.begin_path(kind);
                }
                if !self.annotations.push_point(dir) {
                    return None;
                }
                let active = self.annotations.active()?;
                Some(ControllerEvent::PointAdded {
                    path: active.id,
                    count: active.points.len(),
                })
            }
            (Tool::DrawPath(_), PointerButton::Secondary) => self.finish(),
            (Tool::PlaceHotspot, PointerButton::Primary) => {
                let dir = pick_direction(&self.camera, self.viewport, pos, self.sphere_radius)?;
                let id = self.annotations.add_info_hotspot_at(dir)?;
                log::info!("placed hotspot {id}");
                Some(ControllerEvent::HotspotPlaced(id))
            }
            _ => None,
        }
    }

    fn finish(&mut self) -> Option<ControllerEvent> {
        match self.annotations.finish_path() {
            Ok(id) => Some(ControllerEvent::PathFinished(id)),
            Err(e) => {
                log::debug!("finish path: {e}");
                None
            }
        }
    }

    fn key(&mut self, key: Key) -> Option<ControllerEvent> {
        match key {
            Key::ToggleAutoRotate => Some(ControllerEvent::AutoRotateToggled(self.camera.toggle_auto_rotate())),
            Key::Undo => self.annotations.undo_point().then_some(ControllerEvent::Undone),
            Key::FinishPath => self.finish(),
            Key::Cancel => self.annotations.cancel_path().then_some(ControllerEvent::PathCancelled),
            Key::Delete => {
                let ray = screen_ray(&self.camera, self.viewport, self.cursor?)?;
                let dirs: Vec<Vec3> = self.annotations.hotspots().iter().map(|h| h.direction()).collect();
                let index = pick_nearest(&dirs, &ray, self.pick_max_angle)?;
                let id = self.annotations.hotspots()[index].id;
                self.annotations.remove_hotspot(id).ok()?;
                Some(ControllerEvent::HotspotRemoved(id))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CameraConfig;

    const VP: Viewport = Viewport {
        width: 1000,
        height: 500,
    };
    const CENTRE: Vec2 = Vec2::new(500.0, 250.0);

    fn controller() -> Controller {
        let config = ViewerConfig {
            camera: CameraConfig {
                auto_rotate: false,
                ..CameraConfig::default()
            },
            ..ViewerConfig::default()
        };
        Controller::new(&config, VP)
    }

    fn click(c: &mut Controller, pos: Vec2, button: PointerButton) -> Option<ControllerEvent> {
        c.handle(InputEvent::PointerDown { pos, button });
        c.handle(InputEvent::PointerUp { pos, button })
    }

    #[test]
    fn clicks_in_navigate_do_nothing() {
        let mut c = controller();
        assert_eq!(click(&mut c, CENTRE, PointerButton::Primary), None);
        assert!(c.annotations.is_empty());
    }

    #[test]
    fn clicks_add_points_along_the_view() {
        let mut c = controller();
        c.set_tool(Tool::DrawPath(PathKind::Geodesic));
        let ev = click(&mut c, CENTRE, PointerButton::Primary);
        assert!(matches!(ev, Some(ControllerEvent::PointAdded { count: 1, .. })));
        let p = c.annotations.active().unwrap().points[0];
        assert!(p.abs_diff_eq(Vec3::NEG_Z, 1e-4), "{p:?}");

        click(&mut c, Vec2::new(900.0, 250.0), PointerButton::Primary);
        let active = c.annotations.active().unwrap();
        assert_eq!(active.kind, PathKind::Geodesic);
        assert!(active.points[1].x > 0.0);

        let ev = click(&mut c, CENTRE, PointerButton::Secondary);
        assert!(matches!(ev, Some(ControllerEvent::PathFinished(_))));
        assert_eq!(c.annotations.paths().len(), 1);
    }

    #[test]
    fn drags_rotate_instead_of_picking() {
        let mut c = controller();
        c.set_tool(Tool::DrawPath(PathKind::Smooth));
        c.handle(InputEvent::PointerDown { pos: CENTRE, button: PointerButton::Primary });
        c.handle(InputEvent::PointerMove { pos: CENTRE + Vec2::new(2.0, 0.0) });
        assert_eq!(c.camera.yaw, 0.0, "movement inside the click tolerance");
        c.handle(InputEvent::PointerMove { pos: CENTRE + Vec2::new(100.0, 0.0) });
        let ev = c.handle(InputEvent::PointerUp { pos: CENTRE + Vec2::new(100.0, 0.0), button: PointerButton::Primary });
        assert_eq!(ev, None);
        assert!(c.camera.yaw < 0.0);
        assert!(c.annotations.active().is_none());
    }

    fn drag(c: &mut Controller, button: PointerButton, by: Vec2) -> Option<ControllerEvent> {
        c.handle(InputEvent::PointerDown { pos: CENTRE, button });
        c.handle(InputEvent::PointerMove { pos: CENTRE + by });
        c.handle(InputEvent::PointerUp { pos: CENTRE + by, button })
    }

    #[test]
    fn any_button_drags_the_camera() {
        let mut c = controller();
        c.set_tool(Tool::DrawPath(PathKind::Straight));
        click(&mut c, CENTRE, PointerButton::Primary);
        click(&mut c, Vec2::new(700.0, 250.0), PointerButton::Primary);

        assert_eq!(drag(&mut c, PointerButton::Secondary, Vec2::new(200.0, 0.0)), None);
        let after_right = c.camera.yaw;
        assert!(after_right < 0.0);
        assert_eq!(c.annotations.active().unwrap().points.len(), 2, "a right drag must not finish the path");
        assert!(c.annotations.paths().is_empty());

        assert_eq!(drag(&mut c, PointerButton::Middle, Vec2::new(0.0, 100.0)), None);
        assert!(c.camera.pitch > 0.0);
        assert_eq!(c.camera.yaw, after_right);
        assert_eq!(c.annotations.active().unwrap().points.len(), 2);
    }

    #[test]
    fn lost_release_does_not_freeze_the_camera() {
        let mut c = controller();
        c.camera.auto_rotate = true;
        c.handle(InputEvent::PointerDown { pos: CENTRE, button: PointerButton::Primary });
        c.handle(InputEvent::PointerMove { pos: CENTRE + Vec2::new(100.0, 0.0) });
        // the release went to the UI; next comes a plain click
        click(&mut c, CENTRE, PointerButton::Primary);
        let before = c.camera.yaw;
        c.update(1.0);
        assert!(c.camera.yaw != before, "camera still held after a lost release");
    }

    #[test]
    fn delete_finds_the_hotspot_with_a_far_near_plane() {
        let config = ViewerConfig {
            camera: CameraConfig {
                auto_rotate: false,
                near: 2.0,
                ..CameraConfig::default()
            },
            ..ViewerConfig::default()
        };
        let mut c = Controller::new(&config, VP);
        c.set_tool(Tool::PlaceHotspot);
        let Some(ControllerEvent::HotspotPlaced(id)) = click(&mut c, CENTRE, PointerButton::Primary) else {
            panic!("no hotspot placed");
        };
        assert_eq!(c.handle(InputEvent::Key(Key::Delete)), Some(ControllerEvent::HotspotRemoved(id)));
    }

    #[test]
    fn hotspots_are_placed_and_deleted_under_the_cursor() {
        let mut c = controller();
        c.set_tool(Tool::PlaceHotspot);
        let ev = click(&mut c, CENTRE, PointerButton::Primary);
        let Some(ControllerEvent::HotspotPlaced(id)) = ev else {
            panic!("expected a hotspot, got {ev:?}");
        };
        c.handle(InputEvent::PointerMove { pos: Vec2::new(10.0, 10.0) });
        assert_eq!(c.handle(InputEvent::Key(Key::Delete)), None);
        c.handle(InputEvent::PointerMove { pos: CENTRE });
        assert_eq!(c.handle(InputEvent::Key(Key::Delete)), Some(ControllerEvent::HotspotRemoved(id)));
        assert!(c.annotations.hotspots().is_empty());
    }

    #[test]
    fn switching_tools_finishes_the_path() {
        let mut c = controller();
        c.set_tool(Tool::DrawPath(PathKind::Straight));
        click(&mut c, CENTRE, PointerButton::Primary);
        click(&mut c, Vec2::new(700.0, 100.0), PointerButton::Primary);
        let ev = c.set_tool(Tool::Navigate);
        assert!(matches!(ev, Some(ControllerEvent::PathFinished(_))));
        assert_eq!(c.annotations.paths()[0].kind, PathKind::Straight);
    }

    #[test]
    fn keys_undo_cancel_and_toggle() {
        let mut c = controller();
        c.set_tool(Tool::DrawPath(PathKind::Smooth));
        click(&mut c, CENTRE, PointerButton::Primary);
        click(&mut c, Vec2::new(600.0, 250.0), PointerButton::Primary);
        assert_eq!(c.handle(InputEvent::Key(Key::Undo)), Some(ControllerEvent::Undone));
        assert_eq!(c.annotations.active().unwrap().points.len(), 1);
        assert_eq!(c.handle(InputEvent::Key(Key::Cancel)), Some(ControllerEvent::PathCancelled));
        assert_eq!(c.handle(InputEvent::Key(Key::Cancel)), None);
        assert_eq!(
            c.handle(InputEvent::Key(Key::ToggleAutoRotate)),
            Some(ControllerEvent::AutoRotateToggled(true))
        );
    }

    #[test]
    fn hover_reports_uv() {
        let mut c = controller();
        assert!(c.hovered_uv().is_none());
        c.handle(InputEvent::PointerMove { pos: CENTRE });
        let uv = c.hovered_uv().unwrap();
        assert!((uv.x - 0.5).abs() < 1e-3 && (uv.y - 0.5).abs() < 1e-3);
    }
}
