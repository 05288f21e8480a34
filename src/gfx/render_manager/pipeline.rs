//! Render pipeline construction
//!
//! Builder-style pipeline configuration shared by the fixed passes and the
//! material table, plus shader compilation with validation errors captured
//! into [`GraphicsError::Shader`].

use wgpu::*;

use crate::error::GraphicsError;
use crate::gfx::resources::vertex::Vertex3D;

/// Depth test settings for a pipeline
#[derive(Debug, Clone, Copy)]
pub struct DepthConfig {
    pub format: TextureFormat,
    pub write: bool,
    pub compare: CompareFunction,
}

/// Configuration for creating a render pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub label: String,
    pub bind_group_layouts: Vec<BindGroupLayout>,
    pub primitive_topology: PrimitiveTopology,
    pub cull_mode: Option<Face>,
    pub depth: Option<DepthConfig>,
    pub sample_count: u32,
    pub color_targets: Vec<Option<ColorTargetState>>,
    pub vertex_buffers: Vec<VertexBufferLayout<'static>>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            label: "Pipeline".to_string(),
            bind_group_layouts: Vec::new(),
            primitive_topology: PrimitiveTopology::TriangleList,
            cull_mode: Some(Face::Back),
            depth: None,
            sample_count: 1,
            color_targets: Vec::new(),
            vertex_buffers: vec![Vertex3D::desc()],
        }
    }
}

impl PipelineConfig {
    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_owned();
        self
    }

    pub fn with_cull_mode(mut self, face: Option<Face>) -> Self {
        self.cull_mode = face;
        self
    }

    pub fn with_bind_group_layouts(mut self, layouts: Vec<BindGroupLayout>) -> Self {
        self.bind_group_layouts = layouts;
        self
    }

    pub fn with_depth(mut self, format: TextureFormat, write: bool, compare: CompareFunction) -> Self {
        self.depth = Some(DepthConfig {
            format,
            write,
            compare,
        });
        self
    }

    pub fn with_sample_count(mut self, count: u32) -> Self {
        self.sample_count = count.max(1);
        self
    }

    pub fn with_color_targets(mut self, targets: Vec<Option<ColorTargetState>>) -> Self {
        self.color_targets = targets;
        self
    }

    pub fn with_vertex_buffers(mut self, buffers: Vec<VertexBufferLayout<'static>>) -> Self {
        self.vertex_buffers = buffers;
        self
    }

    /// Fullscreen passes generate their vertices from the vertex index
    pub fn with_no_vertex_buffers(mut self) -> Self {
        self.vertex_buffers.clear();
        self
    }
}

/// Color target that replaces whatever is in the attachment
pub fn replace_target(format: TextureFormat) -> Option<ColorTargetState> {
    Some(ColorTargetState {
        format,
        blend: None,
        write_mask: ColorWrites::ALL,
    })
}

/// Color target that adds its output onto the attachment
pub fn additive_target(format: TextureFormat) -> Option<ColorTargetState> {
    let add = BlendComponent {
        src_factor: BlendFactor::One,
        dst_factor: BlendFactor::One,
        operation: BlendOperation::Add,
    };
    Some(ColorTargetState {
        format,
        blend: Some(BlendState {
            color: add,
            alpha: add,
        }),
        write_mask: ColorWrites::ALL,
    })
}

/// Runs `f` inside a validation error scope
///
/// Any validation error raised while `f` runs is returned as a
/// [`GraphicsError::Shader`] tagged with `name`.
pub fn checked<T>(device: &Device, name: &str, f: impl FnOnce() -> T) -> Result<T, GraphicsError> {
    device.push_error_scope(ErrorFilter::Validation);
    let value = f();
    match pollster::block_on(device.pop_error_scope()) {
        Some(error) => Err(GraphicsError::Shader {
            name: name.to_owned(),
            message: error.to_string(),
        }),
        None => Ok(value),
    }
}

/// Compiles WGSL source, reporting parse and validation errors
pub fn compile_shader(device: &Device, name: &str, source: &str) -> Result<ShaderModule, GraphicsError> {
    checked(device, name, || {
        device.create_shader_module(ShaderModuleDescriptor {
            label: Some(name),
            source: ShaderSource::Wgsl(source.into()),
        })
    })
}

/// Replaces `{{KEY}}` placeholders in shader source
pub fn specialize(source: &str, substitutions: &[(&str, &str)]) -> String {
    substitutions
        .iter()
        .fold(source.to_owned(), |acc, (key, value)| {
            acc.replace(&format!("{{{{{key}}}}}"), value)
        })
}

/// Creates a render pipeline from `vs_main` and `fs_main` of `shader`
pub fn create_pipeline(
    device: &Device,
    shader: &ShaderModule,
    config: &PipelineConfig,
) -> Result<RenderPipeline, GraphicsError> {
    let bind_group_layout_refs: Vec<&BindGroupLayout> = config.bind_group_layouts.iter().collect();

    checked(device, &config.label, || {
        let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some(&format!("{} Layout", config.label)),
            bind_group_layouts: &bind_group_layout_refs,
            push_constant_ranges: &[],
        });

        let depth_stencil = config.depth.map(|depth| DepthStencilState {
            format: depth.format,
            depth_write_enabled: depth.write,
            depth_compare: depth.compare,
            stencil: StencilState::default(),
            bias: DepthBiasState::default(),
        });

        device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some(&config.label),
            layout: Some(&pipeline_layout),
            vertex: VertexState {
                module: shader,
                entry_point: Some("vs_main"),
                buffers: &config.vertex_buffers,
                compilation_options: PipelineCompilationOptions::default(),
            },
            fragment: Some(FragmentState {
                module: shader,
                entry_point: Some("fs_main"),
                targets: &config.color_targets,
                compilation_options: PipelineCompilationOptions::default(),
            }),
            primitive: PrimitiveState {
                topology: config.primitive_topology,
                strip_index_format: None,
                front_face: FrontFace::Ccw,
                cull_mode: config.cull_mode,
                polygon_mode: PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil,
            multisample: MultisampleState {
                count: config.sample_count,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
            cache: None,
        })
    })
}
