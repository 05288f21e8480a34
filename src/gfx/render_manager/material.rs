//! Material system
//!
//! A material is a WGSL program plus the textures it samples. Its pipeline
//! writes the four geometry buffer attachments. Shaders follow this interface:
//!
//! ```wgsl
//! struct Object { mvp: mat4x4<f32>, mv: mat4x4<f32>, normal: mat4x4<f32> }
//! @group(0) @binding(0) var<uniform> object: Object;
//! // one binding per texture, in MaterialDesc order, then the sampler
//! @group(1) @binding(0) var albedo: texture_2d<f32>;
//! @group(1) @binding(N) var material_sampler: sampler;
//!
//! @vertex fn vs_main(@location(0) position: vec3<f32>,
//!                    @location(1) normal: vec3<f32>,
//!                    @location(2) uv: vec2<f32>) -> ...
//! @fragment fn fs_main(...) -> GBuffer  // locations 0..3: albedo, normal, specular, emission
//! ```
//!
//! Materials live in a [`MaterialTable`] and are referenced by [`MaterialId`].

use cgmath::Matrix4;
use image::RgbaImage;
use wgpu::ShaderStages;

use crate::error::GraphicsError;
use crate::gfx::resources::{DrawMesh, Mesh, TextureResource};
use crate::wgpu_utils::binding_types;

use super::pipeline::{compile_shader, create_pipeline, PipelineConfig};
use super::targets::{gbuffer_color_targets, DEPTH_FORMAT};

/// Handle to a material in a [`MaterialTable`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialId(u32);

impl MaterialId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Everything needed to build a material
#[derive(Debug, Clone, Default)]
pub struct MaterialDesc {
    pub name: String,
    /// WGSL source with `vs_main` and `fs_main`
    pub source: String,
    pub textures: Vec<RgbaImage>,
}

impl MaterialDesc {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            ..Default::default()
        }
    }

    pub fn with_source(mut self, source: String) -> Self {
        self.source = source;
        self
    }

    pub fn with_texture(mut self, texture: RgbaImage) -> Self {
        self.textures.push(texture);
        self
    }
}

/// Per-draw transforms handed to a material's vertex stage
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ObjectUniform {
    pub mvp: [[f32; 4]; 4],
    /// Model to camera-centred world space (`MODEL | VIEW_T`)
    pub mv: [[f32; 4]; 4],
    /// Inverse-transpose of the model matrix
    pub normal: [[f32; 4]; 4],
}

impl ObjectUniform {
    pub fn new(mvp: Matrix4<f32>, mv: Matrix4<f32>, normal: Matrix4<f32>) -> Self {
        Self {
            mvp: mvp.into(),
            mv: mv.into(),
            normal: normal.into(),
        }
    }
}

/// Draws a single material can issue per frame
const OBJECTS_PER_FRAME: u32 = 256;

pub struct Material {
    desc: MaterialDesc,
    pipeline: wgpu::RenderPipeline,
    objects: wgpu::Buffer,
    object_group: wgpu::BindGroup,
    texture_group: wgpu::BindGroup,
    stride: u64,
    cursor: u32,
}

impl Material {
    /// Compiles the shader and creates the pipeline and bindings
    ///
    /// # Arguments
    /// * `device` - WGPU device for creating resources
    /// * `queue` - Queue used to upload the textures
    /// * `desc` - Shader source and textures
    /// * `sample_count` - Sample count of the geometry buffer
    pub fn build(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        desc: &MaterialDesc,
        sample_count: u32,
    ) -> Result<Self, GraphicsError> {
        let module = compile_shader(device, &desc.name, &desc.source)?;

        let element = std::mem::size_of::<ObjectUniform>() as u64;
        let align = device.limits().min_uniform_buffer_offset_alignment as u64;
        let stride = element.div_ceil(align) * align;

        let object_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&format!("{} Object Layout", desc.name)),
            entries: &[binding_types::entry(
                0,
                ShaderStages::VERTEX_FRAGMENT,
                binding_types::uniform_dynamic(element),
            )],
        });
        let objects = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{} Objects", desc.name)),
            size: stride * OBJECTS_PER_FRAME as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let object_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{} Object Group", desc.name)),
            layout: &object_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &objects,
                    offset: 0,
                    size: wgpu::BufferSize::new(element),
                }),
            }],
        });

        let textures: Vec<TextureResource> = desc
            .textures
            .iter()
            .enumerate()
            .map(|(i, image)| {
                TextureResource::from_image(device, queue, image, &format!("{} Texture {}", desc.name, i))
            })
            .collect();
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{} Sampler", desc.name)),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let sampler_binding = textures.len() as u32;
        let mut layout_entries: Vec<_> = (0..sampler_binding)
            .map(|i| binding_types::entry(i, ShaderStages::FRAGMENT, binding_types::texture_2d()))
            .collect();
        layout_entries.push(binding_types::entry(
            sampler_binding,
            ShaderStages::FRAGMENT,
            binding_types::sampler(wgpu::SamplerBindingType::Filtering),
        ));
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&format!("{} Texture Layout", desc.name)),
            entries: &layout_entries,
        });

        let mut group_entries: Vec<_> = textures
            .iter()
            .enumerate()
            .map(|(i, texture)| wgpu::BindGroupEntry {
                binding: i as u32,
                resource: wgpu::BindingResource::TextureView(&texture.view),
            })
            .collect();
        group_entries.push(wgpu::BindGroupEntry {
            binding: sampler_binding,
            resource: wgpu::BindingResource::Sampler(&sampler),
        });
        let texture_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{} Texture Group", desc.name)),
            layout: &texture_layout,
            entries: &group_entries,
        });

        let pipeline = create_pipeline(
            device,
            &module,
            &PipelineConfig::default()
                .with_label(&desc.name)
                .with_bind_group_layouts(vec![object_layout, texture_layout])
                .with_depth(DEPTH_FORMAT, true, wgpu::CompareFunction::Less)
                .with_sample_count(sample_count)
                .with_color_targets(gbuffer_color_targets()),
        )?;

        log::debug!("built material '{}' ({} textures)", desc.name, textures.len());

        Ok(Self {
            desc: desc.clone(),
            pipeline,
            objects,
            object_group,
            texture_group,
            stride,
            cursor: 0,
        })
    }

    pub fn name(&self) -> &str {
        &self.desc.name
    }

    pub fn desc(&self) -> &MaterialDesc {
        &self.desc
    }

    /// Makes every per-frame object slot available again
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Records one draw of `mesh` with this material
    ///
    /// Returns `false` when the per-frame object budget is used up.
    pub fn draw(
        &mut self,
        pass: &mut wgpu::RenderPass<'_>,
        queue: &wgpu::Queue,
        mesh: &Mesh,
        object: &ObjectUniform,
    ) -> bool {
        if self.cursor >= OBJECTS_PER_FRAME {
            return false;
        }
        let offset = self.cursor as u64 * self.stride;
        self.cursor += 1;

        queue.write_buffer(&self.objects, offset, bytemuck::bytes_of(object));
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.object_group, &[offset as u32]);
        pass.set_bind_group(1, &self.texture_group, &[]);
        pass.draw_mesh(mesh);
        true
    }
}

/// Slot table with free-list reuse, holding one entry per material
#[derive(Debug)]
pub struct MaterialTable<M> {
    slots: Vec<Option<M>>,
    free: Vec<u32>,
}

impl<M> Default for MaterialTable<M> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }
}

impl<M> MaterialTable<M> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, material: M) -> MaterialId {
        match self.free.pop() {
            Some(index) => {
                self.slots[index as usize] = Some(material);
                MaterialId(index)
            }
            None => {
                self.slots.push(Some(material));
                MaterialId((self.slots.len() - 1) as u32)
            }
        }
    }

    pub fn get(&self, id: MaterialId) -> Option<&M> {
        self.slots.get(id.index()).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: MaterialId) -> Option<&mut M> {
        self.slots.get_mut(id.index()).and_then(Option::as_mut)
    }

    /// Swaps in a new value for a live material, returning the old one
    pub fn replace(&mut self, id: MaterialId, material: M) -> Option<M> {
        self.get_mut(id).map(|slot| std::mem::replace(slot, material))
    }

    pub fn remove(&mut self, id: MaterialId) -> Option<M> {
        let removed = self.slots.get_mut(id.index()).and_then(Option::take);
        if removed.is_some() {
            self.free.push(id.0);
        }
        removed
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut M> {
        self.slots.iter_mut().flatten()
    }

    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
