// mesh.rs — 网格生成: 全景球 / 路径管道 / 标记点
//
// Meshes are plain triangle lists, counter-clockwise when seen from the side
// the normals point to. Nothing here touches the GPU.

use crate::curve::dedup_points;
use crate::projection::{yaw_pitch_to_direction, YawPitch};
use glam::{Quat, Vec3};
use std::f32::consts::{PI, TAU};

const MARKER_WIDTH_SEGMENTS: usize = 12;
const MARKER_HEIGHT_SEGMENTS: usize = 8;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn with_capacity(vertices: usize, indices: usize) -> Self {
        Self {
            positions: Vec::with_capacity(vertices),
            normals: Vec::with_capacity(vertices),
            uvs: Vec::with_capacity(vertices),
            indices: Vec::with_capacity(indices),
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    fn push_vertex(&mut self, position: Vec3, normal: Vec3, uv: [f32; 2]) -> u32 {
        let index = self.positions.len() as u32;
        self.positions.push(position.to_array());
        self.normals.push(normal.to_array());
        self.uvs.push(uv);
        index
    }

    pub fn append(&mut self, other: &Mesh) {
        let offset = self.positions.len() as u32;
        self.positions.extend_from_slice(&other.positions);
        self.normals.extend_from_slice(&other.normals);
        self.uvs.extend_from_slice(&other.uvs);
        self.indices.extend(other.indices.iter().map(|i| i + offset));
    }

    pub fn merged<'a>(meshes: impl IntoIterator<Item = &'a Mesh>) -> Mesh {
        let mut out = Mesh::default();
        for m in meshes {
            out.append(m);
        }
        out
    }

    pub fn triangle(&self, t: usize) -> [Vec3; 3] {
        let i = &self.indices[t * 3..t * 3 + 3];
        [
            Vec3::from(self.positions[i[0] as usize]),
            Vec3::from(self.positions[i[1] as usize]),
            Vec3::from(self.positions[i[2] as usize]),
        ]
    }

    /// Attribute arrays agree, every index is in range, and all data is finite.
    pub fn is_valid(&self) -> bool {
        let n = self.positions.len();
        n == self.normals.len()
            && n == self.uvs.len()
            && self.indices.len() % 3 == 0
            && self.indices.iter().all(|&i| (i as usize) < n)
            && self.positions.iter().flatten().all(|v| v.is_finite())
            && self.normals.iter().flatten().all(|v| v.is_finite())
            && self.uvs.iter().flatten().all(|v| v.is_finite())
    }
}

/// Latitude/longitude sphere. `inward` flips normals and winding for viewing
/// from the centre. UVs are the equirectangular coordinates of each vertex.
fn uv_sphere(centre: Vec3, radius: f32, lon: usize, lat: usize, inward: bool) -> Mesh {
    let lon = lon.max(3);
    let lat = lat.max(2);
    let mut mesh = Mesh::with_capacity((lat + 1) * (lon + 1), lat * lon * 6);

    for i in 0..=lat {
        let v = i as f32 / lat as f32;
        let pitch = 0.5 * PI - v * PI;
        for j in 0..=lon {
            let u = j as f32 / lon as f32;
            let dir = yaw_pitch_to_direction(YawPitch::new((u - 0.5) * TAU, pitch));
            let normal = if inward { -dir } else { dir };
            mesh.push_vertex(centre + dir * radius, normal, [u, v]);
        }
    }

    let stride = (lon + 1) as u32;
    for i in 0..lat {
        for j in 0..lon {
            let a = i as u32 * stride + j as u32;
            let b = a + stride;
            // the pole rows collapse to a point; skip the zero-area half
            let (first, second) = if inward {
                ([a, b, b + 1], [a, b + 1, a + 1])
            } else {
                ([a, b + 1, b], [a, a + 1, b + 1])
            };
            if i != lat - 1 {
                mesh.indices.extend_from_slice(&first);
            }
            if i != 0 {
                mesh.indices.extend_from_slice(&second);
            }
        }
    }

    mesh
}

/// The panorama sphere, seen from inside. Vertex UVs match
/// `projection::direction_to_uv` so an equirectangular image maps 1:1.
pub fn build_sphere(radius: f32, width_segments: usize, height_segments: usize) -> Mesh {
    uv_sphere(Vec3::ZERO, radius, width_segments, height_segments, true)
}

/// Small outward sphere for picked points, joints and hotspots.
pub fn build_marker(centre: Vec3, radius: f32) -> Mesh {
    uv_sphere(
        centre,
        radius,
        MARKER_WIDTH_SEGMENTS,
        MARKER_HEIGHT_SEGMENTS,
        false,
    )
}

/// Tangent / normal / binormal per centreline point, by parallel transport so
/// the tube does not twist at inflection points.
fn transport_frames(points: &[Vec3], closed: bool) -> Vec<(Vec3, Vec3, Vec3)> {
    let n = points.len();
    let tangents: Vec<Vec3> = (0..n)
        .map(|i| {
            let prev = if i == 0 {
                if closed { points[n - 2] } else { points[0] }
            } else {
                points[i - 1]
            };
            let next = if i == n - 1 {
                if closed { points[1] } else { points[n - 1] }
            } else {
                points[i + 1]
            };
            (next - prev)
                .try_normalize()
                .or_else(|| (points[n - 1] - points[0]).try_normalize())
                .unwrap_or(Vec3::X)
        })
        .collect();

    let mut frames = Vec::with_capacity(n);
    let mut normal = tangents[0].any_orthonormal_vector();
    for (i, &t) in tangents.iter().enumerate() {
        if i > 0 {
            let rot = Quat::from_rotation_arc(tangents[i - 1], t);
            normal = (rot * normal).reject_from_normalized(t).normalize_or(t.any_orthonormal_vector());
        }
        frames.push((t, normal, t.cross(normal)));
    }

    if closed && n > 2 {
        // spread the leftover twist so the last ring lines up with the first
        let (t0, n0, _) = frames[0];
        let (_, n_last, _) = frames[n - 1];
        let mut theta = n_last.dot(n0).clamp(-1.0, 1.0).acos();
        if t0.dot(n_last.cross(n0)) < 0.0 {
            theta = -theta;
        }
        for (i, frame) in frames.iter_mut().enumerate() {
            let step = theta * i as f32 / (n - 1) as f32;
            let rot = Quat::from_axis_angle(frame.0, step);
            frame.1 = (rot * frame.1).normalize();
            frame.2 = frame.0.cross(frame.1);
        }
    }
    frames
}

/// Sweep a circle along `centerline`. Open tubes get flat end caps; closed
/// tubes join the last ring back to the first.
///
/// `None` when the centerline has fewer than two distinct points.
pub fn build_tube(
    centerline: &[Vec3],
    radius: f32,
    radial_segments: usize,
    closed: bool,
) -> Option<Mesh> {
    let mut points = dedup_points(centerline, 1e-6);
    if points.len() > 2 && closed && points[0].distance(points[points.len() - 1]) < 1e-6 {
        points.pop();
    }
    if points.len() < 2 {
        return None;
    }
    let closed = closed && points.len() > 2;
    if closed {
        points.push(points[0]);
    }

    let radial = radial_segments.max(3);
    let rings = points.len();
    let frames = transport_frames(&points, closed);
    let mut mesh = Mesh::with_capacity(rings * (radial + 1) + 2 * (radial + 2), rings * radial * 6 + radial * 6);

    for (i, (p, (_, n, b))) in points.iter().zip(&frames).enumerate() {
        let along = i as f32 / (rings - 1) as f32;
        for j in 0..=radial {
            let around = j as f32 / radial as f32;
            let (s, c) = (around * TAU).sin_cos();
            let normal = (*n * c + *b * s).normalize();
            mesh.push_vertex(*p + normal * radius, normal, [along, around]);
        }
    }

    let stride = (radial + 1) as u32;
    for i in 0..(rings - 1) as u32 {
        for j in 0..radial as u32 {
            let a = i * stride + j;
            let b = a + stride;
            mesh.indices.extend_from_slice(&[a, a + 1, b, a + 1, b + 1, b]);
        }
    }

    if !closed {
        add_cap(&mut mesh, points[0], &frames[0], radius, radial, false);
        add_cap(&mut mesh, points[rings - 1], &frames[rings - 1], radius, radial, true);
    }

    Some(mesh)
}

fn add_cap(mesh: &mut Mesh, centre: Vec3, frame: &(Vec3, Vec3, Vec3), radius: f32, radial: usize, end: bool) {
    let (t, n, b) = *frame;
    let facing = if end { t } else { -t };
    let c = mesh.push_vertex(centre, facing, [0.5, 0.5]);
    for j in 0..=radial {
        let (s, co) = (j as f32 / radial as f32 * TAU).sin_cos();
        mesh.push_vertex(
            centre + (n * co + b * s) * radius,
            facing,
            [0.5 + 0.5 * co, 0.5 + 0.5 * s],
        );
    }
    for j in 0..radial as u32 {
        let r0 = c + 1 + j;
        if end {
            mesh.indices.extend_from_slice(&[c, r0, r0 + 1]);
        } else {
            mesh.indices.extend_from_slice(&[c, r0 + 1, r0]);
        }
    }
}

/// A single capped pipe from `a` to `b`.
pub fn build_cylinder(a: Vec3, b: Vec3, radius: f32, radial_segments: usize) -> Option<Mesh> {
    build_tube(&[a, b], radius, radial_segments, false)
}

/// One pipe per consecutive pair with a ball joint at every interior point.
pub fn build_segments(points: &[Vec3], radius: f32, radial_segments: usize) -> Option<Mesh> {
    let points = dedup_points(points, 1e-6);
    if points.len() < 2 {
        return None;
    }
    let mut mesh = Mesh::default();
    for w in points.windows(2) {
        if let Some(pipe) = build_cylinder(w[0], w[1], radius, radial_segments) {
            mesh.append(&pipe);
        }
    }
    for joint in &points[1..points.len() - 1] {
        mesh.append(&build_marker(*joint, radius));
    }
    Some(mesh)
}
