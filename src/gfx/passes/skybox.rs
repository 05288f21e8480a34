use cgmath::Matrix4;
use wgpu::ShaderStages;

use super::{PassContext, Shapes};
use crate::assets::CubeFaces;
use crate::error::GraphicsError;
use crate::gfx::render_manager::pipeline::{compile_shader, create_pipeline, PipelineConfig};
use crate::gfx::render_manager::targets::{gbuffer_color_targets, Targets, DEPTH_FORMAT};
use crate::gfx::resources::{DrawMesh, TextureResource};
use crate::wgpu_utils::{binding_types, UniformBuffer};

/// Face files of the skybox, in cubemap layer order
pub const SKYBOX_FACES: [&str; 6] = [
    "north.png",
    "south.png",
    "up.png",
    "down.png",
    "west.png",
    "east.png",
];

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct SkyUniform {
    view_projection: [[f32; 4]; 4],
}

/// Draws the cubemap behind everything into the geometry buffer's emission
pub struct SkyboxPass {
    pipeline: wgpu::RenderPipeline,
    uniform: UniformBuffer<SkyUniform>,
    group: wgpu::BindGroup,
}

impl SkyboxPass {
    pub fn build(ctx: &PassContext<'_>, faces: &CubeFaces) -> Result<Self, GraphicsError> {
        let device = ctx.device;
        let module = compile_shader(device, "skybox", include_str!("../shaders/skybox.wgsl"))?;
        let cubemap = TextureResource::cube_from_faces(device, ctx.queue, faces, "Skybox");
        let uniform = UniformBuffer::<SkyUniform>::new(device);

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Skybox Layout"),
            entries: &[
                binding_types::entry(0, ShaderStages::VERTEX, binding_types::uniform()),
                binding_types::entry(1, ShaderStages::FRAGMENT, binding_types::texture_cube()),
                binding_types::entry(
                    2,
                    ShaderStages::FRAGMENT,
                    binding_types::sampler(wgpu::SamplerBindingType::Filtering),
                ),
            ],
        });
        let group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Skybox Group"),
            layout: &layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform.binding_resource(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&cubemap.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&cubemap.sampler),
                },
            ],
        });

        // Seen from inside, so the outward faces are the back faces
        let pipeline = create_pipeline(
            device,
            &module,
            &PipelineConfig::default()
                .with_label("Skybox")
                .with_bind_group_layouts(vec![layout])
                .with_cull_mode(Some(wgpu::Face::Front))
                .with_depth(DEPTH_FORMAT, false, wgpu::CompareFunction::LessEqual)
                .with_sample_count(ctx.sample_count())
                .with_color_targets(gbuffer_color_targets()),
        )?;

        Ok(Self {
            pipeline,
            uniform,
            group,
        })
    }

    pub fn draw(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        queue: &wgpu::Queue,
        targets: &Targets,
        shapes: &Shapes,
        view_projection: &Matrix4<f32>,
    ) {
        self.uniform.update_content(
            queue,
            SkyUniform {
                view_projection: (*view_projection).into(),
            },
        );

        let color_attachments = targets.gbuffer.color_attachments(false);
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Skybox"),
            color_attachments: &color_attachments,
            depth_stencil_attachment: Some(targets.gbuffer.depth_attachment(false)),
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.group, &[]);
        pass.draw_mesh(&shapes.cube);
    }
}
