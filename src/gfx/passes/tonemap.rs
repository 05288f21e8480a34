use wgpu::ShaderStages;

use super::PassContext;
use crate::error::GraphicsError;
use crate::gfx::render_manager::pipeline::{compile_shader, create_pipeline, replace_target, PipelineConfig};
use crate::gfx::render_manager::targets::Targets;
use crate::gfx::render_manager::TonemapParams;
use crate::wgpu_utils::{binding_types, UniformBuffer};

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct TonemapUniform {
    exposure: f32,
    inverse_gamma: f32,
    _padding: [f32; 2],
}

/// Maps the accumulation buffer onto the surface
pub struct TonemapPass {
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    group: wgpu::BindGroup,
    uniform: UniformBuffer<TonemapUniform>,
}

fn bind(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    targets: &Targets,
    uniform: &UniformBuffer<TonemapUniform>,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Tonemap Group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&targets.accum.view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: uniform.binding_resource(),
            },
        ],
    })
}

impl TonemapPass {
    pub fn build(ctx: &PassContext<'_>) -> Result<Self, GraphicsError> {
        let device = ctx.device;
        let module = compile_shader(device, "tonemap", include_str!("../shaders/tonemap.wgsl"))?;

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Tonemap Layout"),
            entries: &[
                binding_types::entry(0, ShaderStages::FRAGMENT, binding_types::texture_2d_load(false)),
                binding_types::entry(1, ShaderStages::FRAGMENT, binding_types::uniform()),
            ],
        });
        let uniform = UniformBuffer::<TonemapUniform>::new(device);
        let group = bind(device, &layout, ctx.targets, &uniform);

        let pipeline = create_pipeline(
            device,
            &module,
            &PipelineConfig::default()
                .with_label("Tonemap")
                .with_bind_group_layouts(vec![layout.clone()])
                .with_cull_mode(None)
                .with_no_vertex_buffers()
                .with_color_targets(vec![replace_target(ctx.surface_format)]),
        )?;

        Ok(Self {
            pipeline,
            layout,
            group,
            uniform,
        })
    }

    pub fn rebind(&mut self, device: &wgpu::Device, targets: &Targets) {
        self.group = bind(device, &self.layout, targets, &self.uniform);
    }

    pub fn draw(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        queue: &wgpu::Queue,
        output: &wgpu::TextureView,
        params: &TonemapParams,
    ) {
        let gamma = if params.gamma > 0.0 { params.gamma } else { 1.0 };
        self.uniform.update_content(
            queue,
            TonemapUniform {
                exposure: params.exposure,
                inverse_gamma: 1.0 / gamma,
                _padding: [0.0; 2],
            },
        );

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Tone Mapping"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: output,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.group, &[]);
        pass.draw(0..3, 0..1);
    }
}
