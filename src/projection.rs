// projection.rs — 等距柱状投影 (equirectangular) <-> 球面方向
//
// World space: right-handed, Y up, camera at the origin looking down -Z.
// yaw   = longitude, positive to the right
// pitch = latitude, positive up
// uv    = image space, u left -> right in [0,1), v top -> bottom in [0,1]
//
// The image centre (0.5, 0.5) is straight ahead (-Z). u = 0 and u = 1 are the
// same column (the seam, directly behind the viewer).

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use std::f32::consts::{FRAC_PI_2, PI, TAU};

/// Viewing direction as spherical angles, in radians.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct YawPitch {
    pub yaw: f32,
    pub pitch: f32,
}

impl YawPitch {
    pub fn new(yaw: f32, pitch: f32) -> Self {
        Self { yaw, pitch }
    }

    pub fn from_degrees(yaw_deg: f32, pitch_deg: f32) -> Self {
        Self::new(yaw_deg.to_radians(), pitch_deg.to_radians())
    }

    pub fn to_degrees(self) -> (f32, f32) {
        (self.yaw.to_degrees(), self.pitch.to_degrees())
    }

    /// yaw in [-π, π), pitch in [-π/2, π/2].
    pub fn normalized(self) -> Self {
        let yaw = (self.yaw + PI).rem_euclid(TAU) - PI;
        Self::new(yaw, self.pitch.clamp(-FRAC_PI_2, FRAC_PI_2))
    }

    pub fn to_direction(self) -> Vec3 {
        yaw_pitch_to_direction(self)
    }

    pub fn to_uv(self) -> Vec2 {
        let n = self.normalized();
        Vec2::new(wrap_u(n.yaw / TAU + 0.5), 0.5 - n.pitch / PI)
    }

    pub fn from_uv(uv: Vec2) -> Self {
        let u = wrap_u(uv.x);
        let v = uv.y.clamp(0.0, 1.0);
        Self::new((u - 0.5) * TAU, (0.5 - v) * PI)
    }
}

pub fn yaw_pitch_to_direction(yp: YawPitch) -> Vec3 {
    let (sy, cy) = yp.yaw.sin_cos();
    let (sp, cp) = yp.pitch.sin_cos();
    Vec3::new(cp * sy, sp, -cp * cy)
}

/// `None` for zero-length or non-finite input.
pub fn direction_to_yaw_pitch(dir: Vec3) -> Option<YawPitch> {
    if !dir.is_finite() {
        return None;
    }
    let d = dir.try_normalize()?;
    let pitch = d.y.clamp(-1.0, 1.0).asin();
    // 极点处经度无定义，固定为 0 (u = 0.5)
    let horizontal = d.x * d.x + d.z * d.z;
    let yaw = if horizontal <= 1e-12 {
        0.0
    } else {
        d.x.atan2(-d.z)
    };
    Some(YawPitch::new(yaw, pitch).normalized())
}

pub fn direction_to_uv(dir: Vec3) -> Option<Vec2> {
    direction_to_yaw_pitch(dir).map(YawPitch::to_uv)
}

pub fn uv_to_direction(uv: Vec2) -> Vec3 {
    YawPitch::from_uv(uv).to_direction()
}

pub fn wrap_u(u: f32) -> f32 {
    let w = u.rem_euclid(1.0);
    // rem_euclid can round up to exactly 1.0 for tiny negative inputs
    if w >= 1.0 {
        0.0
    } else {
        w
    }
}

/// Shortest signed horizontal step from `u0` to `u1`, in (-0.5, 0.5].
pub fn seam_delta(u0: f32, u1: f32) -> f32 {
    let d = (u1 - u0).rem_euclid(1.0);
    if d > 0.5 {
        d - 1.0
    } else {
        d
    }
}

/// True when the direct segment between `u0` and `u1` would span more than
/// half the image, i.e. the short way round goes through the seam.
pub fn crosses_seam(u0: f32, u1: f32) -> bool {
    (u1 - u0).abs() > 0.5
}

pub fn uv_to_pixel(uv: Vec2, width: u32, height: u32) -> Vec2 {
    Vec2::new(uv.x * width as f32, uv.y * height as f32)
}

pub fn pixel_to_uv(px: Vec2, width: u32, height: u32) -> Vec2 {
    if width == 0 || height == 0 {
        return Vec2::new(0.5, 0.5);
    }
    Vec2::new(px.x / width as f32, px.y / height as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn image_centre_is_forward() {
        let d = uv_to_direction(Vec2::new(0.5, 0.5));
        assert_abs_diff_eq!(d.x, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(d.y, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(d.z, -1.0, epsilon = 1e-6);

        let uv = direction_to_uv(Vec3::NEG_Z).unwrap();
        assert_abs_diff_eq!(uv.x, 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(uv.y, 0.5, epsilon = 1e-6);
    }

    #[test]
    fn turning_right_increases_u() {
        let right = direction_to_uv(Vec3::X).unwrap();
        assert_abs_diff_eq!(right.x, 0.75, epsilon = 1e-6);
        let left = direction_to_uv(Vec3::NEG_X).unwrap();
        assert_abs_diff_eq!(left.x, 0.25, epsilon = 1e-6);
        let up = direction_to_uv(Vec3::Y).unwrap();
        assert_abs_diff_eq!(up.y, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(up.x, 0.5, epsilon = 1e-6);
    }

    #[test]
    fn behind_is_the_seam() {
        let uv = direction_to_uv(Vec3::Z).unwrap();
        assert!(uv.x < 1e-6 || uv.x > 1.0 - 1e-6, "u = {}", uv.x);
        assert!(uv.x < 1.0);
    }

    #[test]
    fn direction_survives_uv_round_trip() {
        let dirs = [
            Vec3::new(0.3, 0.4, -0.8),
            Vec3::new(-2.0, -1.0, 0.5),
            Vec3::new(0.01, 0.9, 0.2),
            Vec3::new(5.0, -0.2, 3.0),
        ];
        for dir in dirs {
            let back = uv_to_direction(direction_to_uv(dir).unwrap());
            let expected = dir.normalize();
            assert!(back.abs_diff_eq(expected, 1e-5), "{dir:?} -> {back:?}");
        }
    }

    #[test]
    fn degenerate_directions_are_rejected() {
        assert!(direction_to_uv(Vec3::ZERO).is_none());
        assert!(direction_to_uv(Vec3::new(f32::NAN, 0.0, 1.0)).is_none());
    }

    #[test]
    fn u_wraps_and_v_clamps() {
        let a = uv_to_direction(Vec2::new(1.25, 0.5));
        let b = uv_to_direction(Vec2::new(0.25, 0.5));
        assert!(a.abs_diff_eq(b, 1e-5));
        let top = uv_to_direction(Vec2::new(0.3, -0.2));
        assert_abs_diff_eq!(top.y, 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(wrap_u(-0.25), 0.75, epsilon = 1e-6);
    }

    #[test]
    fn seam_delta_takes_the_short_way() {
        assert_abs_diff_eq!(seam_delta(0.95, 0.05), 0.1, epsilon = 1e-6);
        assert_abs_diff_eq!(seam_delta(0.05, 0.95), -0.1, epsilon = 1e-6);
        assert_abs_diff_eq!(seam_delta(0.2, 0.4), 0.2, epsilon = 1e-6);
        assert!(crosses_seam(0.95, 0.05));
        assert!(!crosses_seam(0.2, 0.6));
    }

    #[test]
    fn yaw_is_normalized_into_range() {
        let yp = YawPitch::new(3.0 * PI / 2.0, 2.0).normalized();
        assert_abs_diff_eq!(yp.yaw, -FRAC_PI_2, epsilon = 1e-5);
        assert_abs_diff_eq!(yp.pitch, FRAC_PI_2, epsilon = 1e-6);
    }

    #[test]
    fn pixels_scale_with_image_size() {
        let px = uv_to_pixel(Vec2::new(0.5, 0.25), 4096, 2048);
        assert_eq!(px, Vec2::new(2048.0, 512.0));
        assert_eq!(pixel_to_uv(px, 4096, 2048), Vec2::new(0.5, 0.25));
    }
}
