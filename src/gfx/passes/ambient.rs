use wgpu::ShaderStages;

use super::PassContext;
use crate::error::GraphicsError;
use crate::gfx::render_manager::pipeline::{compile_shader, create_pipeline, replace_target, PipelineConfig};
use crate::gfx::render_manager::targets::{GBuffer, Targets};
use crate::gfx::render_manager::AmbientParams;
use crate::wgpu_utils::{binding_types, UniformBuffer};

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct AmbientUniform {
    color: [f32; 4],
}

/// Starts the accumulation buffer at `albedo * ambient + emission`
pub struct AmbientPass {
    pipeline: wgpu::RenderPipeline,
    gbuffer_layout: wgpu::BindGroupLayout,
    gbuffer_group: wgpu::BindGroup,
    uniform: UniformBuffer<AmbientUniform>,
    uniform_group: wgpu::BindGroup,
}

impl AmbientPass {
    pub fn build(ctx: &PassContext<'_>) -> Result<Self, GraphicsError> {
        let device = ctx.device;
        let source = ctx.gbuffer_shader(include_str!("../shaders/ambient.wgsl"), &[]);
        let module = compile_shader(device, "ambient", &source)?;

        let gbuffer_layout = GBuffer::read_layout(device, ctx.sample_count());
        let gbuffer_group = ctx.targets.gbuffer.read_group(device, &gbuffer_layout);

        let uniform = UniformBuffer::<AmbientUniform>::new(device);
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Ambient Layout"),
            entries: &[binding_types::entry(0, ShaderStages::FRAGMENT, binding_types::uniform())],
        });
        let uniform_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Ambient Group"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform.binding_resource(),
            }],
        });

        let pipeline = create_pipeline(
            device,
            &module,
            &PipelineConfig::default()
                .with_label("Ambient")
                .with_bind_group_layouts(vec![gbuffer_layout.clone(), uniform_layout])
                .with_cull_mode(None)
                .with_no_vertex_buffers()
                .with_color_targets(vec![replace_target(ctx.accum_format)]),
        )?;

        Ok(Self {
            pipeline,
            gbuffer_layout,
            gbuffer_group,
            uniform,
            uniform_group,
        })
    }

    pub fn rebind(&mut self, device: &wgpu::Device, targets: &Targets) {
        self.gbuffer_group = targets.gbuffer.read_group(device, &self.gbuffer_layout);
    }

    pub fn draw(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        queue: &wgpu::Queue,
        targets: &Targets,
        params: &AmbientParams,
    ) {
        let c = params.color;
        self.uniform.update_content(
            queue,
            AmbientUniform {
                color: [c.x, c.y, c.z, 1.0],
            },
        );

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Ambient"),
            color_attachments: &[Some(targets.accum_attachment(true))],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.gbuffer_group, &[]);
        pass.set_bind_group(1, &self.uniform_group, &[]);
        pass.draw(0..3, 0..1);
    }
}
