// curve.rs — 控制点 -> 采样曲线
//
// All sampling helpers take directions on the unit sphere and return
// directions on the unit sphere; callers scale to the sphere radius.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// Upper bound on the angle between two samples of an arc.
const MAX_ARC_STEP: f32 = PI / 180.0;
const KNOT_EPSILON: f32 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathKind {
    /// Straight chords between the points, drawn as pipe segments.
    Straight,
    /// Centripetal Catmull-Rom through the points.
    Smooth,
    /// Great-circle arcs hugging the sphere.
    Geodesic,
}

impl PathKind {
    pub const ALL: [PathKind; 3] = [PathKind::Straight, PathKind::Smooth, PathKind::Geodesic];

    pub fn as_str(self) -> &'static str {
        match self {
            PathKind::Straight => "straight",
            PathKind::Smooth => "smooth",
            PathKind::Geodesic => "geodesic",
        }
    }
}

/// Centripetal Catmull-Rom spline (alpha = 0.5) through a list of points.
/// The end spans use mirrored phantom points so the curve starts and ends on
/// the first and last control point.
#[derive(Debug, Clone)]
pub struct CatmullRom {
    points: Vec<Vec3>,
}

impl CatmullRom {
    pub fn centripetal(points: &[Vec3]) -> Self {
        Self {
            points: points.to_vec(),
        }
    }

    pub fn span_count(&self) -> usize {
        self.points.len().saturating_sub(1)
    }

    fn control(&self, i: isize) -> Vec3 {
        let n = self.points.len() as isize;
        if i < 0 {
            2.0 * self.points[0] - self.points[1]
        } else if i >= n {
            2.0 * self.points[(n - 1) as usize] - self.points[(n - 2) as usize]
        } else {
            self.points[i as usize]
        }
    }

    /// Point on span `span` (between control points `span` and `span + 1`), `t` in [0, 1].
    /// A spline with fewer than two points has no spans and yields its only point.
    pub fn point_on_span(&self, span: usize, t: f32) -> Vec3 {
        if self.points.len() < 2 {
            return self.points.first().copied().unwrap_or(Vec3::ZERO);
        }
        let i = span as isize;
        let p0 = self.control(i - 1);
        let p1 = self.control(i);
        let p2 = self.control(i + 1);
        let p3 = self.control(i + 2);

        let mut dt0 = p0.distance_squared(p1).powf(0.25);
        let mut dt1 = p1.distance_squared(p2).powf(0.25);
        let mut dt2 = p2.distance_squared(p3).powf(0.25);

        // coincident points
        if dt1 < KNOT_EPSILON {
            dt1 = 1.0;
        }
        if dt0 < KNOT_EPSILON {
            dt0 = dt1;
        }
        if dt2 < KNOT_EPSILON {
            dt2 = dt1;
        }

        let mut m1 = (p1 - p0) / dt0 - (p2 - p0) / (dt0 + dt1) + (p2 - p1) / dt1;
        let mut m2 = (p2 - p1) / dt1 - (p3 - p1) / (dt1 + dt2) + (p3 - p2) / dt2;
        m1 *= dt1;
        m2 *= dt1;

        hermite(p1, p2, m1, m2, t)
    }

    /// `segments_per_span` samples per span plus the final point.
    pub fn sample(&self, segments_per_span: usize) -> Vec<Vec3> {
        match self.points.len() {
            0 => return Vec::new(),
            1 => return self.points.clone(),
            _ => {}
        }
        let segs = segments_per_span.max(1);
        let mut out = Vec::with_capacity(self.span_count() * segs + 1);
        for span in 0..self.span_count() {
            for s in 0..segs {
                out.push(self.point_on_span(span, s as f32 / segs as f32));
            }
        }
        if let Some(last) = self.points.last() {
            out.push(*last);
        }
        out
    }
}

fn hermite(p1: Vec3, p2: Vec3, m1: Vec3, m2: Vec3, t: f32) -> Vec3 {
    let c0 = p1;
    let c1 = m1;
    let c2 = -3.0 * p1 + 3.0 * p2 - 2.0 * m1 - m2;
    let c3 = 2.0 * p1 - 2.0 * p2 + m1 + m2;
    ((c3 * t + c2) * t + c1) * t + c0
}

/// Spherical interpolation between two unit vectors.
/// Antipodal inputs turn about an arbitrary perpendicular axis.
pub fn slerp(a: Vec3, b: Vec3, t: f32) -> Vec3 {
    let dot = a.dot(b).clamp(-1.0, 1.0);
    if dot > 0.9995 {
        return a.lerp(b, t).normalize_or(a);
    }
    if dot < -0.9999 {
        let axis = a.any_orthonormal_vector();
        return Quat::from_axis_angle(axis, PI * t) * a;
    }
    let theta = arc_angle(a, b);
    let sin_theta = theta.sin();
    let wa = ((1.0 - t) * theta).sin() / sin_theta;
    let wb = (t * theta).sin() / sin_theta;
    (a * wa + b * wb).normalize()
}

/// Drop consecutive points closer than `epsilon`.
pub fn dedup_points(points: &[Vec3], epsilon: f32) -> Vec<Vec3> {
    let mut out: Vec<Vec3> = Vec::with_capacity(points.len());
    for p in points {
        match out.last() {
            Some(prev) if prev.distance(*p) < epsilon => {}
            _ => out.push(*p),
        }
    }
    out
}

pub fn polyline_length(points: &[Vec3]) -> f32 {
    points.windows(2).map(|w| w[0].distance(w[1])).sum()
}

/// Angle between two vectors in radians. Stays accurate for nearly parallel
/// vectors, where `acos` of the dot product does not in f32.
pub fn arc_angle(a: Vec3, b: Vec3) -> f32 {
    a.cross(b).length().atan2(a.dot(b))
}

/// Length along the sphere in radians, treating each point as a direction.
pub fn angular_length(points: &[Vec3]) -> f32 {
    points.windows(2).map(|w| arc_angle(w[0], w[1])).sum()
}

fn arc_segments(a: Vec3, b: Vec3, min_segments: usize) -> usize {
    let angle = arc_angle(a, b);
    // the small bias keeps exact multiples of the step from rounding up
    ((angle / MAX_ARC_STEP - 1e-3).ceil().max(0.0) as usize)
        .max(min_segments)
        .max(1)
}

/// Dense unit-sphere samples of a path, first and last control point included.
pub fn sample_path(kind: PathKind, points: &[Vec3], samples_per_span: usize) -> Vec<Vec3> {
    let dirs: Vec<Vec3> = points.iter().filter_map(|p| p.try_normalize()).collect();
    let dirs = dedup_points(&dirs, 1e-6);
    if dirs.len() < 2 {
        return dirs;
    }

    match kind {
        PathKind::Smooth => CatmullRom::centripetal(&dirs)
            .sample(samples_per_span)
            .into_iter()
            .filter_map(|p| p.try_normalize())
            .collect(),
        PathKind::Geodesic | PathKind::Straight => {
            let mut out = Vec::new();
            for w in dirs.windows(2) {
                let (a, b) = (w[0], w[1]);
                let segs = arc_segments(a, b, samples_per_span);
                for s in 0..segs {
                    let t = s as f32 / segs as f32;
                    let p = if kind == PathKind::Geodesic {
                        slerp(a, b, t)
                    } else {
                        // a straight chord seen from the centre; may pass near the origin
                        a.lerp(b, t).try_normalize().unwrap_or_else(|| slerp(a, b, t))
                    };
                    out.push(p);
                }
            }
            if let Some(last) = dirs.last() {
                out.push(*last);
            }
            out
        }
    }
}
