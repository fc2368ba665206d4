// picking.rs — 屏幕坐标 -> 射线 -> 球面交点

use crate::camera::OrbitCamera;
use glam::{Vec2, Vec3, Vec4Swizzles};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn aspect(&self) -> f32 {
        if self.is_empty() {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }

    /// Cursor pixel (origin top-left, y down) -> NDC (y up).
    pub fn to_ndc(&self, cursor: Vec2) -> Vec2 {
        Vec2::new(
            2.0 * cursor.x / self.width.max(1) as f32 - 1.0,
            1.0 - 2.0 * cursor.y / self.height.max(1) as f32,
        )
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit length.
    pub dir: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, dir: Vec3) -> Option<Self> {
        Some(Self {
            origin,
            dir: dir.try_normalize()?,
        })
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.dir * t
    }
}

/// Unproject a cursor position through the camera.
pub fn screen_ray(camera: &OrbitCamera, viewport: Viewport, cursor: Vec2) -> Option<Ray> {
    if viewport.is_empty() {
        return None;
    }
    let ndc = viewport.to_ndc(cursor);
    let inv = camera.view_projection(viewport.aspect()).inverse();
    let near = inv * ndc.extend(0.0).extend(1.0);
    let far = inv * ndc.extend(1.0).extend(1.0);
    if near.w.abs() < f32::EPSILON || far.w.abs() < f32::EPSILON {
        return None;
    }
    let near = near.xyz() / near.w;
    let far = far.xyz() / far.w;
    Ray::new(near, far - near)
}

/// Nearest non-negative hit distance. A ray starting inside the sphere hits
/// the far wall.
pub fn intersect_sphere(ray: &Ray, centre: Vec3, radius: f32) -> Option<f32> {
    let oc = ray.origin - centre;
    let b = oc.dot(ray.dir);
    let c = oc.length_squared() - radius * radius;
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let sq = disc.sqrt();
    let t0 = -b - sq;
    let t1 = -b + sq;
    if t0 >= 0.0 {
        Some(t0)
    } else if t1 >= 0.0 {
        Some(t1)
    } else {
        None
    }
}

/// Unit direction of the panorama point under the cursor.
pub fn pick_direction(
    camera: &OrbitCamera,
    viewport: Viewport,
    cursor: Vec2,
    sphere_radius: f32,
) -> Option<Vec3> {
    let ray = screen_ray(camera, viewport, cursor)?;
    let t = intersect_sphere(&ray, Vec3::ZERO, sphere_radius)?;
    ray.at(t).try_normalize()
}

/// Index of the candidate direction angularly closest to the ray, within `max_angle` radians.
/// Candidates are directions from the sphere centre, so only `ray.dir` matters; the
/// origin of a `screen_ray` sits on the near plane.
pub fn pick_nearest(candidates: &[Vec3], ray: &Ray, max_angle: f32) -> Option<usize> {
    let min_cos = max_angle.cos();
    candidates
        .iter()
        .enumerate()
        .filter_map(|(i, c)| {
            let dir = c.try_normalize()?;
            let cos = dir.dot(ray.dir);
            (cos >= min_cos).then_some((i, cos))
        })
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
}
