use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use std::f32::consts::PI;

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub(crate) struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    fn new(position: Vec3, normal: Vec3, uv: [f32; 2]) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
            uv,
        }
    }
}

/// Texture coordinates of a face's corners, in the corner order
/// bottom-left, bottom-right, top-right, top-left.
const FACE_UVS: [[f32; 2]; 4] = [[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]];

/// Unit cube (half extent 0.5) with per-face normals. Every face carries the
/// whole texture.
pub(crate) fn cube_mesh() -> (Vec<Vertex>, Vec<u32>) {
    let p = 0.5_f32;
    #[rustfmt::skip]
    let faces: [(Vec3, [[f32; 3]; 4]); 6] = [
        (Vec3::Z,     [[-p, -p,  p], [ p, -p,  p], [ p,  p,  p], [-p,  p,  p]]),
        (Vec3::NEG_Z, [[ p, -p, -p], [-p, -p, -p], [-p,  p, -p], [ p,  p, -p]]),
        (Vec3::X,     [[ p, -p,  p], [ p, -p, -p], [ p,  p, -p], [ p,  p,  p]]),
        (Vec3::NEG_X, [[-p, -p, -p], [-p, -p,  p], [-p,  p,  p], [-p,  p, -p]]),
        (Vec3::Y,     [[-p,  p,  p], [ p,  p,  p], [ p,  p, -p], [-p,  p, -p]]),
        (Vec3::NEG_Y, [[-p, -p, -p], [ p, -p, -p], [ p, -p,  p], [-p, -p,  p]]),
    ];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (normal, corners) in faces {
        let base = vertices.len() as u32;
        vertices.extend(
            corners
                .iter()
                .zip(FACE_UVS)
                .map(|(c, uv)| Vertex::new(Vec3::from_array(*c), normal, uv)),
        );
        indices.extend([base, base + 1, base + 2, base + 2, base + 3, base]);
    }
    (vertices, indices)
}

/// Unit sphere (radius 1) as a latitude/longitude grid.
pub(crate) fn sphere_mesh(segments: u32, rings: u32) -> (Vec<Vertex>, Vec<u32>) {
    let segments = segments.max(3);
    let rings = rings.max(2);

    let mut vertices = Vec::with_capacity(((segments + 1) * (rings + 1)) as usize);
    for ring in 0..=rings {
        let phi = PI * ring as f32 / rings as f32;
        for seg in 0..=segments {
            let theta = 2.0 * PI * seg as f32 / segments as f32;
            let n = Vec3::new(phi.sin() * theta.sin(), phi.cos(), phi.sin() * theta.cos());
            let uv = [seg as f32 / segments as f32, ring as f32 / rings as f32];
            vertices.push(Vertex::new(n, n, uv));
        }
    }

    let stride = segments + 1;
    let mut indices = Vec::with_capacity((segments * rings * 6) as usize);
    for ring in 0..rings {
        for seg in 0..segments {
            let a = ring * stride + seg;
            let b = a + stride;
            indices.extend([a, b, a + 1, a + 1, b, b + 1]);
        }
    }
    (vertices, indices)
}

/// Unit quad in the XY plane facing +Z.
pub(crate) fn quad_mesh() -> (Vec<Vertex>, Vec<u32>) {
    let p = 0.5_f32;
    let vertices = [[-p, -p], [p, -p], [p, p], [-p, p]]
        .iter()
        .zip(FACE_UVS)
        .map(|([x, y], uv)| Vertex::new(Vec3::new(*x, *y, 0.0), Vec3::Z, uv))
        .collect();
    (vertices, vec![0, 1, 2, 2, 3, 0])
}

/// Interleave model positions and normals into GPU vertices. Models are
/// untextured, so every uv is zero.
pub(crate) fn interleave(positions: &[Vec3], normals: &[Vec3]) -> Vec<Vertex> {
    positions
        .iter()
        .enumerate()
        .map(|(i, p)| Vertex::new(*p, normals.get(i).copied().unwrap_or(Vec3::Y), [0.0; 2]))
        .collect()
}

/// Mirror transform across the horizontal plane `y = height`.
pub(crate) fn reflection_matrix(height: f32) -> Mat4 {
    Mat4::from_translation(Vec3::new(0.0, height, 0.0))
        * Mat4::from_scale(Vec3::new(1.0, -1.0, 1.0))
        * Mat4::from_translation(Vec3::new(0.0, -height, 0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_has_six_faces() {
        let (vertices, indices) = cube_mesh();
        assert_eq!(vertices.len(), 24);
        assert_eq!(indices.len(), 36);
        assert!(indices.iter().all(|&i| (i as usize) < vertices.len()));
        for v in &vertices {
            assert!(v.position.iter().all(|c| c.abs() == 0.5));
        }
    }

    #[test]
    fn cube_faces_wind_counter_clockwise_outward() {
        let (vertices, indices) = cube_mesh();
        for tri in indices.chunks(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| Vec3::from_array(vertices[i as usize].position));
            let face = (b - a).cross(c - a);
            let normal = Vec3::from_array(vertices[tri[0] as usize].normal);
            assert!(face.dot(normal) > 0.0);
        }
    }

    #[test]
    fn every_cube_face_spans_the_whole_texture() {
        let (vertices, _) = cube_mesh();
        for face in vertices.chunks(4) {
            let mut uvs: Vec<[f32; 2]> = face.iter().map(|v| v.uv).collect();
            uvs.sort_by(|a, b| a.partial_cmp(b).unwrap());
            assert_eq!(uvs, vec![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]]);
        }
    }

    #[test]
    fn quad_uv_matches_corner_position() {
        let (vertices, _) = quad_mesh();
        for v in &vertices {
            assert_eq!(v.uv[0], v.position[0] + 0.5);
            assert_eq!(v.uv[1], 0.5 - v.position[1]);
        }
    }

    #[test]
    fn sphere_vertices_lie_on_unit_sphere() {
        let (vertices, indices) = sphere_mesh(16, 8);
        assert_eq!(vertices.len(), 17 * 9);
        assert_eq!(indices.len(), 16 * 8 * 6);
        for v in &vertices {
            assert!((Vec3::from_array(v.position).length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn interleave_fills_missing_normals() {
        let vertices = interleave(&[Vec3::ZERO, Vec3::X], &[Vec3::Z]);
        assert_eq!(vertices[0].normal, [0.0, 0.0, 1.0]);
        assert_eq!(vertices[1].normal, [0.0, 1.0, 0.0]);
    }

    #[test]
    fn reflection_mirrors_across_plane() {
        let r = reflection_matrix(1.0);
        assert!(r.transform_point3(Vec3::new(2.0, 3.0, -1.0)).abs_diff_eq(Vec3::new(2.0, -1.0, -1.0), 1e-6));
        // Points on the plane stay put.
        assert!(r.transform_point3(Vec3::new(5.0, 1.0, 5.0)).abs_diff_eq(Vec3::new(5.0, 1.0, 5.0), 1e-6));
        assert!(r.determinant() < 0.0);
    }
}
