use wgpu::ShaderStages;

use super::{PassContext, Shapes};
use crate::error::GraphicsError;
use crate::gfx::render_manager::pipeline::{additive_target, compile_shader, create_pipeline, PipelineConfig};
use crate::gfx::render_manager::targets::{GBuffer, Targets};
use crate::gfx::render_manager::{LightBatch, LightKind};
use crate::gfx::resources::{DrawMesh, LightInstance, Vertex3D};
use crate::wgpu_utils::{binding_types, InstanceBuffer, UniformBuffer};

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct CameraUniform {
    inverse_view_projection: [[f32; 4]; 4],
    viewport: [f32; 4],
}

/// Adds one light kind's contribution to the accumulation buffer
pub struct LightingPass {
    kind: LightKind,
    pipeline: wgpu::RenderPipeline,
    gbuffer_layout: wgpu::BindGroupLayout,
    gbuffer_group: wgpu::BindGroup,
    camera: UniformBuffer<CameraUniform>,
    camera_group: wgpu::BindGroup,
    instances: InstanceBuffer<LightInstance>,
    scratch: Vec<LightInstance>,
}

impl LightingPass {
    pub fn build(ctx: &PassContext<'_>, kind: LightKind) -> Result<Self, GraphicsError> {
        let device = ctx.device;
        let sun = if kind == LightKind::Sun { "true" } else { "false" };
        let source = ctx.gbuffer_shader(include_str!("../shaders/lighting.wgsl"), &[("SUN", sun)]);
        let label = match kind {
            LightKind::Sun => "Sun Lighting",
            LightKind::Point => "Point Lighting",
        };
        let module = compile_shader(device, label, &source)?;

        let gbuffer_layout = GBuffer::read_layout(device, ctx.sample_count());
        let gbuffer_group = ctx.targets.gbuffer.read_group(device, &gbuffer_layout);

        let camera = UniformBuffer::<CameraUniform>::new(device);
        let camera_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&format!("{label} Camera Layout")),
            entries: &[binding_types::entry(0, ShaderStages::FRAGMENT, binding_types::uniform())],
        });
        let camera_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{label} Camera Group")),
            layout: &camera_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera.binding_resource(),
            }],
        });

        // Point volumes draw their back faces so the camera may sit inside one
        let cull = match kind {
            LightKind::Sun => None,
            LightKind::Point => Some(wgpu::Face::Front),
        };
        let pipeline = create_pipeline(
            device,
            &module,
            &PipelineConfig::default()
                .with_label(label)
                .with_bind_group_layouts(vec![gbuffer_layout.clone(), camera_layout])
                .with_cull_mode(cull)
                .with_vertex_buffers(vec![Vertex3D::desc(), LightInstance::desc()])
                .with_color_targets(vec![additive_target(ctx.accum_format)]),
        )?;

        Ok(Self {
            kind,
            pipeline,
            gbuffer_layout,
            gbuffer_group,
            camera,
            camera_group,
            instances: InstanceBuffer::new(device, 16),
            scratch: Vec::new(),
        })
    }

    pub fn kind(&self) -> LightKind {
        self.kind
    }

    pub fn rebind(&mut self, device: &wgpu::Device, targets: &Targets) {
        self.gbuffer_group = targets.gbuffer.read_group(device, &self.gbuffer_layout);
    }

    pub fn draw(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        targets: &Targets,
        shapes: &Shapes,
        batch: &LightBatch<'_>,
    ) {
        if batch.is_empty() {
            return;
        }

        self.scratch.clear();
        self.scratch.extend((0..batch.len()).map(|i| {
            let light = &batch.lights[i];
            LightInstance {
                mv: batch.mv[i].into(),
                mvp: batch.mvp[i].into(),
                color_radius: [light.color.x, light.color.y, light.color.z, light.radius],
            }
        }));
        self.instances.update(device, queue, &self.scratch);

        let (width, height) = targets.size;
        self.camera.update_content(
            queue,
            CameraUniform {
                inverse_view_projection: batch.inverse_view_projection.into(),
                viewport: [width as f32, height as f32, 0.0, 0.0],
            },
        );

        let volume = match self.kind {
            LightKind::Sun => &shapes.fullscreen,
            LightKind::Point => &shapes.icosahedron,
        };

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Lighting"),
            color_attachments: &[Some(targets.accum_attachment(false))],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.gbuffer_group, &[]);
        pass.set_bind_group(1, &self.camera_group, &[]);
        pass.set_vertex_buffer(1, self.instances.buffer().slice(..));
        pass.draw_mesh_instanced(volume, 0..self.instances.len() as u32);
    }
}
