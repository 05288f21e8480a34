//! Viewport-sized render targets
//!
//! The geometry buffer holds four color attachments plus depth:
//!
//! | attachment | format        | contents                           |
//! |------------|---------------|------------------------------------|
//! | albedo     | `Rgba8Unorm`  | diffuse color                      |
//! | normal     | `Rgba16Float` | camera-centred world-space normal  |
//! | specular   | `Rgba8Unorm`  | refraction color (rgb), gloss (a)  |
//! | emission   | `Rgba8Unorm`  | emitted color                      |
//! | depth      | `Depth32Float`|                                    |
//!
//! The accumulation buffer collects lighting before tone mapping.

use wgpu::{ShaderStages, TextureFormat};

use crate::gfx::resources::TextureResource;
use crate::wgpu_utils::binding_types;

use super::pipeline::replace_target;

pub const ALBEDO_FORMAT: TextureFormat = TextureFormat::Rgba8Unorm;
pub const NORMAL_FORMAT: TextureFormat = TextureFormat::Rgba16Float;
pub const SPECULAR_FORMAT: TextureFormat = TextureFormat::Rgba8Unorm;
pub const EMISSION_FORMAT: TextureFormat = TextureFormat::Rgba8Unorm;
pub const DEPTH_FORMAT: TextureFormat = TextureResource::DEPTH_FORMAT;

/// Minimum color attachments the geometry pass needs
pub const REQUIRED_COLOR_ATTACHMENTS: u32 = 4;

/// Sum of the render-target byte costs of the geometry buffer formats
pub fn gbuffer_bytes_per_sample() -> u32 {
    [ALBEDO_FORMAT, NORMAL_FORMAT, SPECULAR_FORMAT, EMISSION_FORMAT]
        .iter()
        .map(|format| format.target_pixel_byte_cost().unwrap_or(16))
        .sum()
}

pub fn accum_format(hdr: bool) -> TextureFormat {
    if hdr {
        TextureFormat::Rgba16Float
    } else {
        TextureFormat::Rgba8Unorm
    }
}

/// Color target states written by materials and the skybox
pub fn gbuffer_color_targets() -> Vec<Option<wgpu::ColorTargetState>> {
    vec![
        replace_target(ALBEDO_FORMAT),
        replace_target(NORMAL_FORMAT),
        replace_target(SPECULAR_FORMAT),
        replace_target(EMISSION_FORMAT),
    ]
}

/// WGSL type names for reading the geometry buffer at a sample count
pub fn shader_substitutions(sample_count: u32) -> [(&'static str, &'static str); 2] {
    if sample_count > 1 {
        [
            ("GBUFFER", "texture_multisampled_2d<f32>"),
            ("DEPTH", "texture_depth_multisampled_2d"),
        ]
    } else {
        [("GBUFFER", "texture_2d<f32>"), ("DEPTH", "texture_depth_2d")]
    }
}

pub struct GBuffer {
    pub albedo: TextureResource,
    pub normal: TextureResource,
    pub specular: TextureResource,
    pub emission: TextureResource,
    pub depth: TextureResource,
    pub sample_count: u32,
}

impl GBuffer {
    pub fn new(device: &wgpu::Device, size: (u32, u32), sample_count: u32) -> Self {
        Self {
            albedo: TextureResource::create_render_target(device, "GBuffer Albedo", size, ALBEDO_FORMAT, sample_count),
            normal: TextureResource::create_render_target(device, "GBuffer Normal", size, NORMAL_FORMAT, sample_count),
            specular: TextureResource::create_render_target(device, "GBuffer Specular", size, SPECULAR_FORMAT, sample_count),
            emission: TextureResource::create_render_target(device, "GBuffer Emission", size, EMISSION_FORMAT, sample_count),
            depth: TextureResource::create_depth_texture(device, "GBuffer Depth", size, sample_count),
            sample_count,
        }
    }

    /// Color attachments in shader location order
    pub fn color_attachments(&self, clear: bool) -> [Option<wgpu::RenderPassColorAttachment<'_>>; 4] {
        let load = if clear {
            wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT)
        } else {
            wgpu::LoadOp::Load
        };
        [&self.albedo, &self.normal, &self.specular, &self.emission].map(|target| {
            Some(wgpu::RenderPassColorAttachment {
                view: &target.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                },
            })
        })
    }

    pub fn depth_attachment(&self, clear: bool) -> wgpu::RenderPassDepthStencilAttachment<'_> {
        wgpu::RenderPassDepthStencilAttachment {
            view: &self.depth.view,
            depth_ops: Some(wgpu::Operations {
                load: if clear {
                    wgpu::LoadOp::Clear(1.0)
                } else {
                    wgpu::LoadOp::Load
                },
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: None,
        }
    }

    /// Layout for reading all five attachments with `textureLoad`
    pub fn read_layout(device: &wgpu::Device, sample_count: u32) -> wgpu::BindGroupLayout {
        let ms = sample_count > 1;
        let stages = ShaderStages::FRAGMENT;
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("GBuffer Read Layout"),
            entries: &[
                binding_types::entry(0, stages, binding_types::texture_2d_load(ms)),
                binding_types::entry(1, stages, binding_types::texture_2d_load(ms)),
                binding_types::entry(2, stages, binding_types::texture_2d_load(ms)),
                binding_types::entry(3, stages, binding_types::texture_2d_load(ms)),
                binding_types::entry(4, stages, binding_types::depth_2d_load(ms)),
            ],
        })
    }

    pub fn read_group(&self, device: &wgpu::Device, layout: &wgpu::BindGroupLayout) -> wgpu::BindGroup {
        let views = [
            &self.albedo.view,
            &self.normal.view,
            &self.specular.view,
            &self.emission.view,
            &self.depth.view,
        ];
        let entries: Vec<wgpu::BindGroupEntry> = views
            .iter()
            .enumerate()
            .map(|(i, view)| wgpu::BindGroupEntry {
                binding: i as u32,
                resource: wgpu::BindingResource::TextureView(view),
            })
            .collect();
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("GBuffer Read Group"),
            layout,
            entries: &entries,
        })
    }
}

/// Everything whose size follows the viewport
pub struct Targets {
    pub gbuffer: GBuffer,
    pub accum: TextureResource,
    pub size: (u32, u32),
}

impl Targets {
    pub fn new(device: &wgpu::Device, size: (u32, u32), sample_count: u32, hdr: bool) -> Self {
        log::debug!(
            "allocating {}x{} targets, {} samples, {}",
            size.0,
            size.1,
            sample_count,
            if hdr { "HDR" } else { "LDR" }
        );
        Self {
            gbuffer: GBuffer::new(device, size, sample_count),
            accum: TextureResource::create_render_target(device, "Accumulation", size, accum_format(hdr), 1),
            size,
        }
    }

    pub fn accum_attachment(&self, clear: bool) -> wgpu::RenderPassColorAttachment<'_> {
        wgpu::RenderPassColorAttachment {
            view: &self.accum.view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: if clear {
                    wgpu::LoadOp::Clear(wgpu::Color::BLACK)
                } else {
                    wgpu::LoadOp::Load
                },
                store: wgpu::StoreOp::Store,
            },
        }
    }
}
