//! # Primitive Shape Generation

use super::GeometryData;

fn dot(a: [f32; 3], b: [f32; 3]) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn scaled(a: [f32; 3], s: f32) -> [f32; 3] {
    [a[0] * s, a[1] * s, a[2] * s]
}

/// Generate an axis-aligned box centered at the origin
///
/// Vertices span `-half..half` on every axis. Each face has its own four
/// vertices so normals and UVs stay flat per face.
pub fn generate_box(half: f32) -> GeometryData {
    // (normal, u axis, v axis) with u x v == normal
    const FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
    ];
    const CORNERS: [(f32, f32, [f32; 2]); 4] = [
        (-1.0, -1.0, [0.0, 1.0]),
        (1.0, -1.0, [1.0, 1.0]),
        (1.0, 1.0, [1.0, 0.0]),
        (-1.0, 1.0, [0.0, 0.0]),
    ];

    let mut data = GeometryData::new();
    for (normal, u, v) in FACES {
        let base = data.vertices.len() as u32;
        for (su, sv, uv) in CORNERS {
            data.vertices.push([
                (normal[0] + u[0] * su + v[0] * sv) * half,
                (normal[1] + u[1] * su + v[1] * sv) * half,
                (normal[2] + u[2] * su + v[2] * sv) * half,
            ]);
            data.normals.push(normal);
            data.tex_coords.push(uv);
        }
        data.indices
            .extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
    }
    data
}

/// Generate an icosahedron that encloses the unit sphere
///
/// Every face plane lies at distance >= 1 from the origin, so scaling the
/// shape by a light's radius covers the whole lit region.
pub fn generate_icosahedron() -> GeometryData {
    let phi = (1.0 + 5.0f32.sqrt()) / 2.0;
    let raw = [
        [-1.0, phi, 0.0],
        [1.0, phi, 0.0],
        [-1.0, -phi, 0.0],
        [1.0, -phi, 0.0],
        [0.0, -1.0, phi],
        [0.0, 1.0, phi],
        [0.0, -1.0, -phi],
        [0.0, 1.0, -phi],
        [phi, 0.0, -1.0],
        [phi, 0.0, 1.0],
        [-phi, 0.0, -1.0],
        [-phi, 0.0, 1.0],
    ];
    const TRIANGLES: [[u32; 3]; 20] = [
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

    let mut data = GeometryData::new();
    data.vertices = raw
        .iter()
        .map(|v| scaled(*v, 1.0 / dot(*v, *v).sqrt()))
        .collect();
    data.normals = data.vertices.clone();
    data.tex_coords = vec![[0.0, 0.0]; data.vertices.len()];
    for [a, b, c] in TRIANGLES {
        data.indices.extend_from_slice(&[a, b, c]);
        let t = data.triangle_count() - 1;
        // Keep the winding facing outward
        if dot(data.face_normal(t), data.vertices[a as usize]) < 0.0 {
            data.indices.swap(t * 3 + 1, t * 3 + 2);
        }
    }

    let inradius = (0..data.triangle_count())
        .map(|t| {
            let n = data.face_normal(t);
            let a = data.vertices[data.indices[t * 3] as usize];
            dot(n, a) / dot(n, n).sqrt()
        })
        .fold(f32::INFINITY, f32::min);
    for v in &mut data.vertices {
        *v = scaled(*v, 1.0 / inradius);
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_generation() {
        let cube = generate_box(0.5);
        assert_eq!(cube.vertex_count(), 24);
        assert_eq!(cube.indices.len(), 36);
        assert_eq!(cube.triangle_count(), 12);
        for v in &cube.vertices {
            assert!(v.iter().all(|c| c.abs() == 0.5));
        }
    }

    #[test]
    fn test_box_winding_faces_outward() {
        let cube = generate_box(1.0);
        for t in 0..cube.triangle_count() {
            let normal = cube.normals[cube.indices[t * 3] as usize];
            assert!(dot(cube.face_normal(t), normal) > 0.0, "triangle {t}");
        }
    }

    #[test]
    fn test_icosahedron_encloses_unit_sphere() {
        let ico = generate_icosahedron();
        assert_eq!(ico.vertex_count(), 12);
        assert_eq!(ico.triangle_count(), 20);
        for t in 0..ico.triangle_count() {
            let n = ico.face_normal(t);
            let a = ico.vertices[ico.indices[t * 3] as usize];
            let distance = dot(n, a) / dot(n, n).sqrt();
            assert!(distance > 0.0, "triangle {t} faces inward");
            assert!(distance >= 1.0 - 1e-5, "triangle {t} cuts the sphere");
        }
    }
}
