use crate::gfx::geometry::{generate_box, generate_icosahedron, GeometryData};
use crate::gfx::resources::Mesh;

/// Shared meshes: skybox cube, point-light volume, fullscreen triangle
pub struct Shapes {
    pub cube: Mesh,
    pub icosahedron: Mesh,
    pub fullscreen: Mesh,
}

fn fullscreen_triangle() -> GeometryData {
    GeometryData {
        vertices: vec![[-1.0, -1.0, 0.0], [3.0, -1.0, 0.0], [-1.0, 3.0, 0.0]],
        tex_coords: vec![[0.0, 1.0], [2.0, 1.0], [0.0, -1.0]],
        normals: vec![[0.0, 0.0, 1.0]; 3],
        indices: vec![0, 1, 2],
    }
}

impl Shapes {
    pub fn build(device: &wgpu::Device) -> Self {
        let mut cube = Mesh::from_geometry(&generate_box(1.0));
        let mut icosahedron = Mesh::from_geometry(&generate_icosahedron());
        let mut fullscreen = Mesh::from_geometry(&fullscreen_triangle());
        cube.upload(device, "Box");
        icosahedron.upload(device, "Icosahedron");
        fullscreen.upload(device, "Fullscreen");
        Self {
            cube,
            icosahedron,
            fullscreen,
        }
    }
}
