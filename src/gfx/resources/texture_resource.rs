//! Texture resource management for wgpu
//!
//! Creates the viewport-sized render targets of the deferred pipeline and the
//! sampled textures (2D and cubemap) uploaded from decoded images.

use image::RgbaImage;

use crate::assets::CubeFaces;

/// GPU texture resource containing texture, view, and sampler
#[derive(Clone)]
pub struct TextureResource {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

/// Color format of every texture decoded from an image file
const IMAGE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

fn linear_sampler(device: &wgpu::Device, label: &str, address_mode: wgpu::AddressMode) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(&format!("{label} Sampler")),
        address_mode_u: address_mode,
        address_mode_v: address_mode,
        address_mode_w: address_mode,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    })
}

fn extent(width: u32, height: u32, layers: u32) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: width.max(1),
        height: height.max(1),
        depth_or_array_layers: layers,
    }
}

/// Single-mip 2D texture (or 2D array when `size` has several layers)
fn create_texture(
    device: &wgpu::Device,
    label: &str,
    size: wgpu::Extent3d,
    format: wgpu::TextureFormat,
    sample_count: u32,
    usage: wgpu::TextureUsages,
) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage,
        view_formats: &[],
    })
}

/// Copies a tightly packed RGBA8 image into one layer of `texture`
fn write_layer(queue: &wgpu::Queue, texture: &wgpu::Texture, image: &RgbaImage, layer: u32) {
    let (width, height) = image.dimensions();
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d { x: 0, y: 0, z: layer },
            aspect: wgpu::TextureAspect::All,
        },
        image.as_raw(),
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        extent(width, height, 1),
    );
}

impl TextureResource {
    /// Standard depth buffer format used throughout the engine
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Creates a viewport-sized color attachment that later passes can read
    ///
    /// # Arguments
    /// * `device` - WGPU device for creating resources
    /// * `label` - Debug label for the texture
    /// * `size` - Width and height in pixels; zero is clamped to one
    /// * `format` - Attachment format
    /// * `sample_count` - 1 for a plain target, higher for multisampling
    pub fn create_render_target(
        device: &wgpu::Device,
        label: &str,
        size: (u32, u32),
        format: wgpu::TextureFormat,
        sample_count: u32,
    ) -> Self {
        let texture = create_texture(
            device,
            label,
            extent(size.0, size.1, 1),
            format,
            sample_count,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        );
        Self {
            view: texture.create_view(&wgpu::TextureViewDescriptor::default()),
            sampler: linear_sampler(device, label, wgpu::AddressMode::ClampToEdge),
            texture,
        }
    }

    pub fn create_depth_texture(device: &wgpu::Device, label: &str, size: (u32, u32), sample_count: u32) -> Self {
        Self::create_render_target(device, label, size, Self::DEPTH_FORMAT, sample_count)
    }

    /// Uploads a decoded image as a repeating, linearly filtered 2D texture
    pub fn from_image(device: &wgpu::Device, queue: &wgpu::Queue, image: &RgbaImage, label: &str) -> Self {
        let (width, height) = image.dimensions();
        let texture = create_texture(
            device,
            label,
            extent(width, height, 1),
            IMAGE_FORMAT,
            1,
            wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        );
        write_layer(queue, &texture, image, 0);

        Self {
            view: texture.create_view(&wgpu::TextureViewDescriptor::default()),
            sampler: linear_sampler(device, label, wgpu::AddressMode::Repeat),
            texture,
        }
    }

    /// Uploads six square faces as a cubemap
    ///
    /// Faces map to layers in the order north, south, up, down, west, east,
    /// which is wgpu's +X, -X, +Y, -Y, +Z, -Z.
    pub fn cube_from_faces(device: &wgpu::Device, queue: &wgpu::Queue, faces: &CubeFaces, label: &str) -> Self {
        let edge = faces.edge();
        let texture = create_texture(
            device,
            label,
            extent(edge, edge, 6),
            IMAGE_FORMAT,
            1,
            wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        );
        for (layer, face) in faces.faces().iter().enumerate() {
            write_layer(queue, &texture, face, layer as u32);
        }

        Self {
            view: texture.create_view(&wgpu::TextureViewDescriptor {
                label: Some(label),
                dimension: Some(wgpu::TextureViewDimension::Cube),
                ..Default::default()
            }),
            sampler: linear_sampler(device, label, wgpu::AddressMode::ClampToEdge),
            texture,
        }
    }
}
