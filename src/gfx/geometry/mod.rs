//! # Procedural Geometry Generation
//!
//! Shapes the renderer needs without loading model files:
//!
//! - **Box**: the skybox cube and a general-purpose textured cube
//! - **Icosahedron**: the bounding volume drawn for each point light
//!
//! ```rust
//! use floatspace::gfx::geometry::{generate_box, generate_icosahedron};
//!
//! let sky = generate_box(1.0);
//! let volume = generate_icosahedron();
//! assert_eq!(sky.triangle_count(), 12);
//! assert_eq!(volume.triangle_count(), 20);
//! ```

pub mod primitives;

pub use primitives::*;

/// Represents generated geometry data ready for GPU upload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeometryData {
    /// Vertex positions (x, y, z)
    pub vertices: Vec<[f32; 3]>,
    /// Texture coordinates (u, v)
    pub tex_coords: Vec<[f32; 2]>,
    /// Normal vectors (x, y, z)
    pub normals: Vec<[f32; 3]>,
    /// Triangle indices (counter-clockwise winding seen from outside)
    pub indices: Vec<u32>,
}

impl GeometryData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Geometric normal of a triangle, from its winding
    pub fn face_normal(&self, triangle: usize) -> [f32; 3] {
        let i = triangle * 3;
        let [a, b, c] = [
            self.vertices[self.indices[i] as usize],
            self.vertices[self.indices[i + 1] as usize],
            self.vertices[self.indices[i + 2] as usize],
        ];
        let e1 = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
        let e2 = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
        [
            e1[1] * e2[2] - e1[2] * e2[1],
            e1[2] * e2[0] - e1[0] * e2[2],
            e1[0] * e2[1] - e1[1] * e2[0],
        ]
    }
}
