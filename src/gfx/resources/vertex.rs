//! # Vertex Data Structures
//!
//! GPU-compatible vertex and instance formats shared by meshes, materials and
//! the light-volume passes.

use std::mem;

/// A 3D vertex with position, normal and texture coordinates.
///
/// # Memory Layout
///
/// `#[repr(C)]` keeps the field order the vertex buffer layout describes.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex3D {
    /// 3D position coordinates [x, y, z]
    pub position: [f32; 3],
    /// 3D normal vector [nx, ny, nz] for lighting calculations
    pub normal: [f32; 3],
    /// Texture coordinates [u, v]
    pub tex_coords: [f32; 2],
}

impl Vertex3D {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];

    /// Returns the vertex buffer layout for wgpu rendering.
    ///
    /// - Attribute 0: Position (Float32x3)
    /// - Attribute 1: Normal (Float32x3)
    /// - Attribute 2: Texture coordinates (Float32x2)
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<Vertex3D>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Per-light instance data for the lighting passes
///
/// Matrices are column-major, the layout cgmath produces.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightInstance {
    /// Light position relative to the camera (translation column is used)
    pub mv: [[f32; 4]; 4],
    /// Transform of the unit light volume
    pub mvp: [[f32; 4]; 4],
    /// RGB color and radius
    pub color_radius: [f32; 4],
}

impl LightInstance {
    const ATTRIBUTES: [wgpu::VertexAttribute; 9] = wgpu::vertex_attr_array![
        3 => Float32x4, 4 => Float32x4, 5 => Float32x4, 6 => Float32x4,
        7 => Float32x4, 8 => Float32x4, 9 => Float32x4, 10 => Float32x4,
        11 => Float32x4
    ];

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<LightInstance>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layouts_match_struct_sizes() {
        assert_eq!(Vertex3D::desc().array_stride, 32);
        assert_eq!(Vertex3D::desc().attributes[2].offset, 24);
        assert_eq!(LightInstance::desc().array_stride, 144);
        assert_eq!(LightInstance::desc().attributes[8].offset, 128);
    }
}
