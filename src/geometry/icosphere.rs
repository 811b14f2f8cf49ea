use std::f32::consts::PI;

use glam::{Vec2, Vec3};
use rustc_hash::FxHashMap;

use super::base::{BaseGeometry, VertexAttribute, NORMAL, POSITION, UV};

/// Generate a unit-radius icosphere with positions, normals, spherical UVs
/// and a triangle index buffer.
///
/// `subdivisions = 0` is the plain icosahedron (12 vertices, 20 faces); each
/// level quadruples the face count.
#[must_use]
pub fn icosphere(subdivisions: u32) -> BaseGeometry {
    let t = (1.0 + 5.0_f32.sqrt()) / 2.0;
    let mut positions: Vec<Vec3> = [
        [-1.0, t, 0.0],
        [1.0, t, 0.0],
        [-1.0, -t, 0.0],
        [1.0, -t, 0.0],
        [0.0, -1.0, t],
        [0.0, 1.0, t],
        [0.0, -1.0, -t],
        [0.0, 1.0, -t],
        [t, 0.0, -1.0],
        [t, 0.0, 1.0],
        [-t, 0.0, -1.0],
        [-t, 0.0, 1.0],
    ]
    .iter()
    .map(|p| Vec3::from_array(*p).normalize())
    .collect();

    let mut faces: Vec<[u32; 3]> = vec![
        [0, 11, 5],
        [0, 5, 1],
        [0, 1, 7],
        [0, 7, 10],
        [0, 10, 11],
        [1, 5, 9],
        [5, 11, 4],
        [11, 10, 2],
        [10, 7, 6],
        [7, 1, 8],
        [3, 9, 4],
        [3, 4, 2],
        [3, 2, 6],
        [3, 6, 8],
        [3, 8, 9],
        [4, 9, 5],
        [2, 4, 11],
        [6, 2, 10],
        [8, 6, 7],
        [9, 8, 1],
    ];

    for _ in 0..subdivisions {
        let mut midpoints: FxHashMap<(u32, u32), u32> = FxHashMap::default();
        let mut next = Vec::with_capacity(faces.len() * 4);
        for [a, b, c] in faces {
            let ab = midpoint(&mut positions, &mut midpoints, a, b);
            let bc = midpoint(&mut positions, &mut midpoints, b, c);
            let ca = midpoint(&mut positions, &mut midpoints, c, a);
            next.extend_from_slice(&[[a, ab, ca], [b, bc, ab], [c, ca, bc], [ab, bc, ca]]);
        }
        faces = next;
    }

    let uvs: Vec<Vec2> = positions
        .iter()
        .map(|p| {
            Vec2::new(
                0.5 + p.z.atan2(p.x) / (2.0 * PI),
                0.5 - p.y.clamp(-1.0, 1.0).asin() / PI,
            )
        })
        .collect();
    let indices: Vec<u32> = faces.into_iter().flatten().collect();

    BaseGeometry::new()
        .with_attribute(POSITION, VertexAttribute::from_vec3(&positions))
        // Unit sphere: normals equal positions.
        .with_attribute(NORMAL, VertexAttribute::from_vec3(&positions))
        .with_attribute(UV, VertexAttribute::from_vec2(&uvs))
        .with_indices(indices)
}

fn midpoint(
    positions: &mut Vec<Vec3>,
    cache: &mut FxHashMap<(u32, u32), u32>,
    a: u32,
    b: u32,
) -> u32 {
    let key = (a.min(b), a.max(b));
    *cache.entry(key).or_insert_with(|| {
        let mid = ((positions[a as usize] + positions[b as usize]) * 0.5).normalize();
        positions.push(mid);
        (positions.len() - 1) as u32
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn icosahedron_counts() {
        let g = icosphere(0);
        assert_eq!(g.vertex_count(), 12);
        assert_eq!(g.indices().unwrap().len(), 60);
    }

    #[test]
    fn subdivision_counts_and_unit_radius() {
        let g = icosphere(2);
        // V = 10 * 4^n + 2, F = 20 * 4^n
        assert_eq!(g.vertex_count(), 162);
        assert_eq!(g.indices().unwrap().len(), 320 * 3);

        let positions = g.attribute(POSITION).unwrap();
        for i in 0..positions.vertex_count() {
            assert!((positions.vec3(i).length() - 1.0).abs() < 1e-5);
        }
        let uv = g.attribute(UV).unwrap();
        assert!(uv.data().iter().all(|c| (0.0..=1.0).contains(c)));
    }
}
