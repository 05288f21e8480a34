use std::{iter, sync::Arc};

use cgmath::Matrix4;
use winit::window::{CursorGrabMode, Window};

use super::material::{Material, MaterialDesc, MaterialId, MaterialTable, ObjectUniform};
use super::targets::{self, accum_format, Targets};
use super::{
    AmbientParams, FixedPass, LightBatch, LightKind, PassRequest, RenderManager, TonemapParams,
    WindowPolicy,
};
use crate::assets::AssetFs;
use crate::error::GraphicsError;
use crate::gfx::debug::DebugChannel;
use crate::gfx::graphics::GraphicsFlags;
use crate::gfx::passes::{
    AmbientPass, LightingPass, PassContext, Shapes, SkyboxPass, TonemapPass,
};
use crate::gfx::resources::Mesh;

struct Frame {
    surface_texture: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
    encoder: wgpu::CommandEncoder,
    /// Encoders closed at the end of each outermost debug group
    finished: Vec<wgpu::CommandBuffer>,
    /// Whether a validation error scope is open for the current group
    scoped: bool,
}

/// [`RenderManager`] backed by a wgpu device and a window surface
pub struct WgpuRenderManager {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    hdr: bool,
    targets: Targets,
    materials: MaterialTable<Material>,

    shapes: Option<Shapes>,
    skybox: Option<SkyboxPass>,
    ambient: Option<AmbientPass>,
    sun_lighting: Option<LightingPass>,
    point_lighting: Option<LightingPass>,
    tonemapper: Option<TonemapPass>,

    debug: DebugChannel,
    policy: Option<WindowPolicy>,
    frame: Option<Frame>,
}

fn frame_encoder(device: &wgpu::Device) -> wgpu::CommandEncoder {
    device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Frame Encoder"),
    })
}

/// Present mode to switch to when the vsync setting changed
fn present_mode_change(previous: Option<WindowPolicy>, policy: &WindowPolicy) -> Option<wgpu::PresentMode> {
    if previous.map(|p| p.vsync) == Some(policy.vsync) {
        return None;
    }
    Some(if policy.vsync {
        wgpu::PresentMode::AutoVsync
    } else {
        wgpu::PresentMode::AutoNoVsync
    })
}

fn choose_surface_format(formats: &[wgpu::TextureFormat], srgb: bool) -> Option<wgpu::TextureFormat> {
    formats
        .iter()
        .copied()
        .find(|format| format.is_srgb() == srgb)
        .or_else(|| formats.first().copied())
}

impl WgpuRenderManager {
    /// Creates the surface, picks an adapter able to hold the geometry buffer
    /// and allocates the initial targets
    pub async fn new(window: Arc<Window>) -> Result<Self, GraphicsError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(window.clone())
            .map_err(|e| GraphicsError::Window(e.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| GraphicsError::Adapter(e.to_string()))?;

        let info = adapter.get_info();
        log::info!("adapter: {} ({:?})", info.name, info.backend);

        let supported = adapter.limits();
        if supported.max_color_attachments < targets::REQUIRED_COLOR_ATTACHMENTS {
            return Err(GraphicsError::UnsupportedAdapter(format!(
                "{} color attachments, need {}",
                supported.max_color_attachments,
                targets::REQUIRED_COLOR_ATTACHMENTS
            )));
        }
        if supported.max_color_attachment_bytes_per_sample < targets::gbuffer_bytes_per_sample() {
            return Err(GraphicsError::UnsupportedAdapter(format!(
                "{} bytes of color attachment per sample, need {}",
                supported.max_color_attachment_bytes_per_sample,
                targets::gbuffer_bytes_per_sample()
            )));
        }

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("WGPU Device"),
                required_features: wgpu::Features::default(),
                required_limits: wgpu::Limits {
                    max_color_attachments: targets::REQUIRED_COLOR_ATTACHMENTS,
                    max_color_attachment_bytes_per_sample: targets::gbuffer_bytes_per_sample(),
                    ..wgpu::Limits::downlevel_defaults()
                }
                .using_resolution(supported),
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .map_err(|e| GraphicsError::Adapter(e.to_string()))?;

        let capabilities = surface.get_capabilities(&adapter);
        let format = choose_surface_format(&capabilities.formats, false)
            .ok_or_else(|| GraphicsError::UnsupportedAdapter("surface has no formats".into()))?;

        let size = window.inner_size();
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: capabilities
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let flags = GraphicsFlags::default();
        let targets = Targets::new(&device, (config.width, config.height), 1, flags.hdr);

        Ok(Self {
            window,
            surface,
            adapter,
            device,
            queue,
            config,
            hdr: flags.hdr,
            targets,
            materials: MaterialTable::new(),
            shapes: None,
            skybox: None,
            ambient: None,
            sun_lighting: None,
            point_lighting: None,
            tonemapper: None,
            debug: DebugChannel::default(),
            policy: None,
            frame: None,
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub fn sample_count(&self) -> u32 {
        self.targets.gbuffer.sample_count
    }

    /// Largest usable sample count not above `requested`
    fn supported_sample_count(&self, requested: u32) -> u32 {
        if requested <= 1 {
            return 1;
        }
        let adapter_specific = self
            .device
            .features()
            .contains(wgpu::Features::TEXTURE_ADAPTER_SPECIFIC_FORMAT_FEATURES);
        if requested != 4 && !adapter_specific {
            log::warn!("{requested}x MSAA needs adapter-specific format features, falling back to no MSAA");
            return 1;
        }
        let formats = [
            targets::ALBEDO_FORMAT,
            targets::NORMAL_FORMAT,
            targets::SPECULAR_FORMAT,
            targets::EMISSION_FORMAT,
            targets::DEPTH_FORMAT,
        ];
        let all_supported = formats.iter().all(|format| {
            self.adapter
                .get_texture_format_features(*format)
                .flags
                .sample_count_supported(requested)
        });
        if all_supported {
            requested
        } else {
            log::warn!("{requested}x MSAA unsupported for the geometry buffer, falling back to no MSAA");
            1
        }
    }

    fn rebind_passes(&mut self) {
        if let Some(ambient) = self.ambient.as_mut() {
            ambient.rebind(&self.device, &self.targets);
        }
        for lighting in [self.sun_lighting.as_mut(), self.point_lighting.as_mut()]
            .into_iter()
            .flatten()
        {
            lighting.rebind(&self.device, &self.targets);
        }
        if let Some(tonemapper) = self.tonemapper.as_mut() {
            tonemapper.rebind(&self.device, &self.targets);
        }
    }

    /// Opens a render pass on the geometry buffer for material draws
    ///
    /// Returns `None` outside of a frame.
    pub fn geometry_pass(&mut self, label: &str) -> Option<GeometryPass<'_>> {
        let frame = self.frame.as_mut()?;
        let pass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &self.targets.gbuffer.color_attachments(false),
            depth_stencil_attachment: Some(self.targets.gbuffer.depth_attachment(false)),
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        Some(GeometryPass {
            pass,
            materials: &mut self.materials,
            queue: &self.queue,
        })
    }
}

/// An open geometry render pass
pub struct GeometryPass<'a> {
    pass: wgpu::RenderPass<'a>,
    materials: &'a mut MaterialTable<Material>,
    queue: &'a wgpu::Queue,
}

impl GeometryPass<'_> {
    /// Draws `mesh` with a material
    pub fn draw(&mut self, id: MaterialId, mesh: &Mesh, object: &ObjectUniform) -> Result<(), GraphicsError> {
        let material = self
            .materials
            .get_mut(id)
            .ok_or(GraphicsError::MissingMaterial(id))?;
        if !material.draw(&mut self.pass, self.queue, mesh, object) {
            log::warn!("material '{}' is out of object slots this frame", material.name());
        }
        Ok(())
    }
}

impl RenderManager for WgpuRenderManager {
    type Material = Material;

    fn setup(&mut self, flags: &GraphicsFlags) -> Result<(), GraphicsError> {
        let capabilities = self.surface.get_capabilities(&self.adapter);
        self.config.format = choose_surface_format(&capabilities.formats, flags.srgb)
            .ok_or_else(|| GraphicsError::UnsupportedAdapter("surface has no formats".into()))?;
        if flags.srgb && !self.config.format.is_srgb() {
            log::warn!("no sRGB surface format available, using {:?}", self.config.format);
        }
        self.surface.configure(&self.device, &self.config);

        self.debug = DebugChannel::new(flags.debug);
        self.debug.install(&self.device);

        let sample_count = self.supported_sample_count(flags.msaa);
        let rebuild_materials = sample_count != self.targets.gbuffer.sample_count;
        self.hdr = flags.hdr;
        self.targets = Targets::new(&self.device, self.targets.size, sample_count, self.hdr);

        if rebuild_materials {
            for material in self.materials.iter_mut() {
                *material = Material::build(&self.device, &self.queue, material.desc(), sample_count)?;
            }
        }
        self.rebind_passes();
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.targets = Targets::new(
            &self.device,
            (width, height),
            self.targets.gbuffer.sample_count,
            self.hdr,
        );
        self.rebind_passes();
    }

    fn size(&self) -> (u32, u32) {
        self.targets.size
    }

    fn window_size(&self) -> (u32, u32) {
        self.window.inner_size().into()
    }

    fn set_window_policy(&mut self, policy: &WindowPolicy) {
        let previous = self.policy.replace(*policy);

        if let Some(mode) = present_mode_change(previous, policy) {
            self.config.present_mode = mode;
            self.surface.configure(&self.device, &self.config);
        }

        // Window systems drop the grab on focus loss
        let grabbed = if policy.mouse_grab {
            self.window
                .set_cursor_grab(CursorGrabMode::Confined)
                .or_else(|_| self.window.set_cursor_grab(CursorGrabMode::Locked))
        } else {
            self.window.set_cursor_grab(CursorGrabMode::None)
        };
        if let Err(e) = grabbed {
            if previous.map(|p| p.mouse_grab) != Some(policy.mouse_grab) {
                log::warn!("cursor grab: {e}");
            }
        }
        self.window.set_cursor_visible(!policy.mouse_grab);
    }

    fn add_material(&mut self, desc: &MaterialDesc) -> Result<MaterialId, GraphicsError> {
        let material = Material::build(&self.device, &self.queue, desc, self.targets.gbuffer.sample_count)?;
        Ok(self.materials.insert(material))
    }

    fn reload_material(&mut self, id: MaterialId, shaders: &AssetFs, file: &str) -> Result<(), GraphicsError> {
        let current = self
            .materials
            .get(id)
            .ok_or(GraphicsError::MissingMaterial(id))?;
        let desc = current.desc().clone().with_source(shaders.read_to_string(file)?);
        let material = Material::build(&self.device, &self.queue, &desc, self.targets.gbuffer.sample_count)?;
        self.materials.replace(id, material);
        log::info!("reloaded material '{}' from {}", desc.name, file);
        Ok(())
    }

    fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id)
    }

    fn remove_material(&mut self, id: MaterialId) {
        if self.materials.remove(id).is_none() {
            log::warn!("removing unknown material {id:?}");
        }
    }

    fn build_pass(&mut self, request: PassRequest<'_>) -> Result<(), GraphicsError> {
        let ctx = PassContext {
            device: &self.device,
            queue: &self.queue,
            targets: &self.targets,
            surface_format: self.config.format,
            accum_format: accum_format(self.hdr),
        };
        match request {
            PassRequest::Shapes => self.shapes = Some(Shapes::build(ctx.device)),
            PassRequest::Skybox(faces) => self.skybox = Some(SkyboxPass::build(&ctx, faces)?),
            PassRequest::Ambient => self.ambient = Some(AmbientPass::build(&ctx)?),
            PassRequest::Lighting(LightKind::Sun) => {
                self.sun_lighting = Some(LightingPass::build(&ctx, LightKind::Sun)?)
            }
            PassRequest::Lighting(LightKind::Point) => {
                self.point_lighting = Some(LightingPass::build(&ctx, LightKind::Point)?)
            }
            PassRequest::Tonemapper => self.tonemapper = Some(TonemapPass::build(&ctx)?),
        }
        log::debug!("built {} pass", request.pass());
        Ok(())
    }

    fn free_pass(&mut self, pass: FixedPass) {
        match pass {
            FixedPass::Shapes => self.shapes = None,
            FixedPass::Skybox => self.skybox = None,
            FixedPass::Ambient => self.ambient = None,
            FixedPass::SunLighting => self.sun_lighting = None,
            FixedPass::PointLighting => self.point_lighting = None,
            FixedPass::Tonemapper => self.tonemapper = None,
        }
        log::debug!("freed {pass} pass");
    }

    fn begin_frame(&mut self) -> Result<bool, GraphicsError> {
        let surface_texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.config);
                return Ok(false);
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("surface timed out, skipping frame");
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        };
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let encoder = frame_encoder(&self.device);

        for material in self.materials.iter_mut() {
            material.reset();
        }
        self.debug.clear();
        self.frame = Some(Frame {
            surface_texture,
            view,
            encoder,
            finished: Vec::new(),
            scoped: false,
        });
        Ok(true)
    }

    fn push_debug_group(&mut self, label: &str) {
        let outermost = self.debug.push(label);
        if let Some(frame) = self.frame.as_mut() {
            if outermost && self.debug.enabled() {
                self.device.push_error_scope(wgpu::ErrorFilter::Validation);
                frame.scoped = true;
            }
            frame.encoder.push_debug_group(label);
        }
    }

    fn pop_debug_group(&mut self) {
        let closed = self.debug.pop();
        let Some(frame) = self.frame.as_mut() else {
            return;
        };
        frame.encoder.pop_debug_group();
        if let Some(label) = closed {
            if frame.scoped {
                let encoder = std::mem::replace(&mut frame.encoder, frame_encoder(&self.device));
                frame.finished.push(encoder.finish());
                frame.scoped = false;
                if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
                    log::error!("{}", self.debug.describe_in(&label, &error.to_string()));
                }
            }
        }
    }

    fn bind_geometry(&mut self) {
        let Some(frame) = self.frame.as_mut() else {
            return;
        };
        // An empty pass is enough to run the clears
        drop(frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Clear Geometry"),
            color_attachments: &self.targets.gbuffer.color_attachments(true),
            depth_stencil_attachment: Some(self.targets.gbuffer.depth_attachment(true)),
            occlusion_query_set: None,
            timestamp_writes: None,
        }));
    }

    fn draw_skybox(&mut self, view_projection: &Matrix4<f32>) {
        if let (Some(frame), Some(skybox), Some(shapes)) =
            (self.frame.as_mut(), self.skybox.as_mut(), self.shapes.as_ref())
        {
            skybox.draw(&mut frame.encoder, &self.queue, &self.targets, shapes, view_projection);
        }
    }

    fn draw_ambient(&mut self, params: &AmbientParams) {
        if let (Some(frame), Some(ambient)) = (self.frame.as_mut(), self.ambient.as_mut()) {
            ambient.draw(&mut frame.encoder, &self.queue, &self.targets, params);
        }
    }

    fn draw_lighting(&mut self, kind: LightKind, batch: &LightBatch<'_>) {
        let lighting = match kind {
            LightKind::Sun => self.sun_lighting.as_mut(),
            LightKind::Point => self.point_lighting.as_mut(),
        };
        if let (Some(frame), Some(lighting), Some(shapes)) =
            (self.frame.as_mut(), lighting, self.shapes.as_ref())
        {
            lighting.draw(
                &mut frame.encoder,
                &self.device,
                &self.queue,
                &self.targets,
                shapes,
                batch,
            );
        }
    }

    fn draw_tonemap(&mut self, params: &TonemapParams) {
        if let (Some(frame), Some(tonemapper)) = (self.frame.as_mut(), self.tonemapper.as_mut()) {
            tonemapper.draw(&mut frame.encoder, &self.queue, &frame.view, params);
        }
    }

    fn present(&mut self) {
        let Some(frame) = self.frame.take() else {
            log::warn!("present called outside of a frame");
            return;
        };
        let last = frame.encoder.finish();
        if frame.scoped {
            if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
                log::error!("{}", self.debug.describe(&error.to_string()));
            }
        }
        self.debug.clear();
        self.queue.submit(frame.finished.into_iter().chain(iter::once(last)));
        frame.surface_texture.present();
    }
}
