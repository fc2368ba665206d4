// camera.rs — 视角参数 (yaw / pitch / fov) 与轨道相机
//
// The camera sits at the sphere centre and only rotates. Angles are stored in
// degrees, the way the UI shows them; matrices are built on demand.

use crate::config::CameraConfig;
use crate::picking::Viewport;
use crate::projection::{yaw_pitch_to_direction, YawPitch};
use glam::{Mat4, Vec2, Vec3};

/// Pitch used for rendering; ±90° makes the look-at basis degenerate.
const SAFE_PITCH_DEG: f32 = 89.9;
const TICK_HZ: f32 = 60.0;
const MIN_VELOCITY_DEG: f32 = 1e-3;

#[derive(Debug, Clone)]
pub struct OrbitCamera {
    pub yaw: f32,
    pub pitch: f32,
    pub fov: f32,
    pub sensitivity: f32,
    pub auto_rotate: bool,
    pub auto_rotate_speed: f32,
    pub zoom_enabled: bool,
    damping: f32,
    fov_range: (f32, f32),
    near: f32,
    far: f32,
    home: (f32, f32, f32),
    dragging: bool,
    last_drag: Vec2,
    velocity: Vec2,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::from_config(&CameraConfig::default())
    }
}

impl OrbitCamera {
    pub fn from_config(cfg: &CameraConfig) -> Self {
        let fov_min = cfg.fov_min_deg.clamp(1.0, 179.0);
        let fov_max = cfg.fov_max_deg.clamp(fov_min, 179.9);
        let fov = cfg.fov_deg.clamp(fov_min, fov_max);
        let pitch = cfg.pitch_deg.clamp(-90.0, 90.0);
        Self {
            yaw: cfg.yaw_deg,
            pitch,
            fov,
            sensitivity: cfg.sensitivity,
            auto_rotate: cfg.auto_rotate,
            auto_rotate_speed: cfg.auto_rotate_deg_per_sec,
            zoom_enabled: cfg.zoom_enabled,
            damping: cfg.damping.clamp(0.0, 1.0),
            fov_range: (fov_min, fov_max),
            near: cfg.near,
            far: cfg.far,
            home: (cfg.yaw_deg, pitch, fov),
            dragging: false,
            last_drag: Vec2::ZERO,
            velocity: Vec2::ZERO,
        }
    }

    pub fn reset(&mut self) {
        (self.yaw, self.pitch, self.fov) = self.home;
        self.velocity = Vec2::ZERO;
        self.last_drag = Vec2::ZERO;
    }

    pub fn toggle_auto_rotate(&mut self) -> bool {
        self.auto_rotate = !self.auto_rotate;
        self.auto_rotate
    }

    /// Rotate by a pointer drag. One pixel turns the view by the angular size
    /// of one pixel at the current FOV, so the panorama follows the cursor.
    pub fn drag(&mut self, dx: f32, dy: f32, viewport: Viewport) {
        if viewport.is_empty() {
            return;
        }
        let width = viewport.width as f32;
        let height = viewport.height as f32;

        let v_f = self.fov.to_radians();
        let h_f = 2.0 * ((v_f / 2.0).tan() * viewport.aspect()).atan();

        let yaw_per_px_deg = (h_f / width).to_degrees();
        let pitch_per_px_deg = (v_f / height).to_degrees();

        let delta = Vec2::new(
            -dx * yaw_per_px_deg * self.sensitivity,
            dy * pitch_per_px_deg * self.sensitivity,
        );
        self.dragging = true;
        self.velocity = Vec2::ZERO;
        self.last_drag = delta;
        self.rotate(delta);
    }

    /// Release: the last drag step keeps gliding and decays by `damping` per tick.
    pub fn end_drag(&mut self) {
        if self.dragging {
            self.velocity = self.last_drag * self.damping;
        }
        self.dragging = false;
        self.last_drag = Vec2::ZERO;
    }

    pub fn zoom(&mut self, scroll: f32) {
        if !self.zoom_enabled {
            return;
        }
        self.fov = (self.fov - scroll * 2.5).clamp(self.fov_range.0, self.fov_range.1);
    }

    pub fn update(&mut self, dt: f32) {
        if self.dragging || dt <= 0.0 {
            return;
        }
        if self.auto_rotate {
            self.rotate(Vec2::new(-self.auto_rotate_speed * dt, 0.0));
        }
        if self.velocity.length_squared() > 0.0 {
            let ticks = dt * TICK_HZ;
            let keep = (1.0 - self.damping).powf(ticks);
            // geometric series: v + v*k + v*k^2 ... over `ticks` steps
            let travelled = if self.damping > 0.0 {
                self.velocity * (1.0 - keep) / self.damping
            } else {
                self.velocity * ticks
            };
            self.rotate(travelled);
            self.velocity *= keep;
            if self.velocity.length() < MIN_VELOCITY_DEG {
                self.velocity = Vec2::ZERO;
            }
        }
    }

    fn rotate(&mut self, delta: Vec2) {
        self.yaw = (self.yaw + delta.x + 180.0).rem_euclid(360.0) - 180.0;
        self.pitch = (self.pitch + delta.y).clamp(-90.0, 90.0);
    }

    pub fn look_angles(&self) -> YawPitch {
        YawPitch::from_degrees(self.yaw, self.pitch.clamp(-SAFE_PITCH_DEG, SAFE_PITCH_DEG))
    }

    pub fn forward(&self) -> Vec3 {
        yaw_pitch_to_direction(self.look_angles())
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(Vec3::ZERO, self.forward(), Vec3::Y)
    }

    /// wgpu clip space (depth 0..1).
    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        let aspect = if aspect.is_finite() && aspect > 0.0 { aspect } else { 1.0 };
        Mat4::perspective_rh(self.fov.to_radians(), aspect, self.near, self.far)
    }

    pub fn view_projection(&self, aspect: f32) -> Mat4 {
        self.projection_matrix(aspect) * self.view_matrix()
    }

    pub fn far(&self) -> f32 {
        self.far
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn still_camera() -> OrbitCamera {
        OrbitCamera::from_config(&CameraConfig {
            auto_rotate: false,
            ..CameraConfig::default()
        })
    }

    #[test]
    fn default_looks_down_negative_z() {
        let cam = still_camera();
        assert!(cam.forward().abs_diff_eq(Vec3::NEG_Z, 1e-6));
        assert_eq!(cam.fov, 75.0);
    }

    #[test]
    fn dragging_across_the_screen_turns_by_the_horizontal_fov() {
        let mut cam = still_camera();
        let vp = Viewport::new(800, 600);
        cam.drag(800.0, 0.0, vp);
        let v_f = 75f32.to_radians();
        let h_f = 2.0 * ((v_f / 2.0).tan() * vp.aspect()).atan();
        assert_abs_diff_eq!(cam.yaw, -h_f.to_degrees(), epsilon = 1e-3);
    }

    #[test]
    fn drag_down_looks_up_and_pitch_clamps() {
        let mut cam = still_camera();
        let vp = Viewport::new(800, 600);
        cam.drag(0.0, 100.0, vp);
        assert!(cam.pitch > 0.0);
        cam.drag(0.0, 100_000.0, vp);
        assert_eq!(cam.pitch, 90.0);
        assert!(cam.forward().is_finite());
    }

    #[test]
    fn inertia_glides_by_the_last_drag_step() {
        let mut cam = still_camera();
        let vp = Viewport::new(800, 600);
        cam.drag(10.0, 0.0, vp);
        let after_drag = cam.yaw;
        let step = cam.last_drag.x;
        cam.end_drag();
        for _ in 0..600 {
            cam.update(1.0 / 60.0);
        }
        assert_abs_diff_eq!(cam.yaw - after_drag, step, epsilon = 5e-2);
        assert_eq!(cam.velocity, Vec2::ZERO);
    }

    #[test]
    fn auto_rotate_pauses_while_dragging() {
        let mut cam = OrbitCamera::default();
        cam.update(1.0);
        assert_abs_diff_eq!(cam.yaw, -2.0626, epsilon = 1e-4);

        let vp = Viewport::new(100, 100);
        cam.drag(0.0, 0.0, vp);
        let yaw = cam.yaw;
        cam.update(1.0);
        assert_eq!(cam.yaw, yaw);
    }

    #[test]
    fn zoom_respects_toggle_and_range() {
        let mut cam = still_camera();
        cam.zoom(10.0);
        assert_eq!(cam.fov, 75.0);
        cam.zoom_enabled = true;
        cam.zoom(100.0);
        assert_eq!(cam.fov, 20.0);
        cam.zoom(-100.0);
        assert_eq!(cam.fov, 120.0);
        cam.reset();
        assert_eq!(cam.fov, 75.0);
    }

    #[test]
    fn forward_projects_to_screen_centre() {
        let mut cam = still_camera();
        cam.yaw = 40.0;
        cam.pitch = -20.0;
        let clip = cam.view_projection(1.5) * (cam.forward() * 500.0).extend(1.0);
        let ndc = clip.truncate() / clip.w;
        assert_abs_diff_eq!(ndc.x, 0.0, epsilon = 1e-4);
        assert_abs_diff_eq!(ndc.y, 0.0, epsilon = 1e-4);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }
}
