//! Render manager
//!
//! [`RenderManager`] is the seam between the frame pipeline in
//! [`crate::gfx::graphics`] and the GPU. The pipeline only ever talks to this
//! trait, so it can run against [`WgpuRenderManager`] in the demo and against
//! a recording double in tests.

use std::fmt;

use cgmath::{Matrix4, Vector3};

use crate::assets::{AssetFs, CubeFaces};
use crate::error::GraphicsError;
use crate::gfx::graphics::GraphicsFlags;
use crate::gfx::light::Light;

pub mod material;
pub mod pipeline;
pub mod targets;
pub mod wgpu_manager;

#[cfg(test)]
pub mod testing;

pub use material::{Material, MaterialDesc, MaterialId, MaterialTable};
pub use wgpu_manager::{GeometryPass, WgpuRenderManager};

/// The fixed sub-passes built by [`crate::gfx::graphics::Graphics::init`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FixedPass {
    Shapes,
    Skybox,
    Ambient,
    SunLighting,
    PointLighting,
    Tonemapper,
}

impl fmt::Display for FixedPass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FixedPass::Shapes => "shapes",
            FixedPass::Skybox => "skybox",
            FixedPass::Ambient => "ambient",
            FixedPass::SunLighting => "sunlighting",
            FixedPass::PointLighting => "lighting",
            FixedPass::Tonemapper => "tonemapper",
        };
        f.write_str(name)
    }
}

/// Which light volume a lighting pass draws
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightKind {
    /// Directional light, drawn as a fullscreen triangle
    Sun,
    /// Radius-bounded light, drawn as an icosahedron around the light
    Point,
}

impl LightKind {
    pub fn pass(self) -> FixedPass {
        match self {
            LightKind::Sun => FixedPass::SunLighting,
            LightKind::Point => FixedPass::PointLighting,
        }
    }
}

/// Build request for one fixed sub-pass
#[derive(Debug, Clone, Copy)]
pub enum PassRequest<'a> {
    Shapes,
    Skybox(&'a CubeFaces),
    Ambient,
    Lighting(LightKind),
    Tonemapper,
}

impl PassRequest<'_> {
    pub fn pass(&self) -> FixedPass {
        match self {
            PassRequest::Shapes => FixedPass::Shapes,
            PassRequest::Skybox(_) => FixedPass::Skybox,
            PassRequest::Ambient => FixedPass::Ambient,
            PassRequest::Lighting(kind) => kind.pass(),
            PassRequest::Tonemapper => FixedPass::Tonemapper,
        }
    }
}

/// Per-frame window behaviour requested by the demo
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPolicy {
    pub mouse_grab: bool,
    pub vsync: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmbientParams {
    pub color: Vector3<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TonemapParams {
    pub exposure: f32,
    pub gamma: f32,
}

/// Matrices and colors for one lighting draw
///
/// `mv` and `mvp` hold one entry per light, in the same order as `lights`.
#[derive(Debug, Clone, Copy)]
pub struct LightBatch<'a> {
    /// Maps normalized device coordinates back to camera-centred world space
    pub inverse_view_projection: Matrix4<f32>,
    /// Light position relative to the camera
    pub mv: &'a [Matrix4<f32>],
    /// Light volume transform
    pub mvp: &'a [Matrix4<f32>],
    pub lights: &'a [Light],
}

impl LightBatch<'_> {
    pub fn len(&self) -> usize {
        self.lights.len().min(self.mv.len()).min(self.mvp.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// GPU-facing operations the frame pipeline relies on
pub trait RenderManager {
    /// Material type stored in the material table
    type Material;

    /// Applies the pipeline flags (sample count, HDR, sRGB output, debug channel)
    fn setup(&mut self, flags: &GraphicsFlags) -> Result<(), GraphicsError>;

    /// Reallocates every viewport-sized target and rebinds the passes reading them
    fn resize(&mut self, width: u32, height: u32);

    /// Size of the current viewport targets
    fn size(&self) -> (u32, u32);

    /// Current drawable size of the window
    fn window_size(&self) -> (u32, u32);

    fn set_window_policy(&mut self, policy: &WindowPolicy);

    fn add_material(&mut self, desc: &MaterialDesc) -> Result<MaterialId, GraphicsError>;

    /// Builds a material whose shader source is read from `file` on the shader path
    fn add_material_from_file(
        &mut self,
        shaders: &AssetFs,
        file: &str,
        desc: MaterialDesc,
    ) -> Result<MaterialId, GraphicsError> {
        let source = shaders.read_to_string(file)?;
        self.add_material(&desc.with_source(source))
    }

    /// Rebuilds a material from `file`; the old material survives a failed reload
    fn reload_material(
        &mut self,
        id: MaterialId,
        shaders: &AssetFs,
        file: &str,
    ) -> Result<(), GraphicsError>;

    fn material(&self, id: MaterialId) -> Option<&Self::Material>;

    fn remove_material(&mut self, id: MaterialId);

    fn build_pass(&mut self, request: PassRequest<'_>) -> Result<(), GraphicsError>;

    fn free_pass(&mut self, pass: FixedPass);

    /// Acquires the next frame; `Ok(false)` means this frame should be skipped
    fn begin_frame(&mut self) -> Result<bool, GraphicsError>;

    fn push_debug_group(&mut self, label: &str);

    fn pop_debug_group(&mut self);

    /// Clears the geometry buffer for a new frame
    fn bind_geometry(&mut self);

    fn draw_skybox(&mut self, view_projection: &Matrix4<f32>);

    fn draw_ambient(&mut self, params: &AmbientParams);

    fn draw_lighting(&mut self, kind: LightKind, batch: &LightBatch<'_>);

    fn draw_tonemap(&mut self, params: &TonemapParams);

    /// Submits the frame and presents it
    fn present(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::scratch_dir;
    use crate::error::AssetError;
    use testing::{Call, RecordingManager};

    fn shader_dir(test: &str) -> AssetFs {
        let dir = scratch_dir(test);
        std::fs::write(dir.join("box.wgsl"), "// first").unwrap();
        AssetFs::new([dir])
    }

    #[test]
    fn test_material_from_file_reads_shader_path() {
        let shaders = shader_dir("material-from-file");
        let mut rm = RecordingManager::new();
        let id = rm
            .add_material_from_file(&shaders, "box.wgsl", MaterialDesc::new("box"))
            .unwrap();
        assert_eq!(rm.material(id).unwrap().source, "// first");
        assert_eq!(rm.calls, [Call::AddMaterial("box".to_owned())]);

        let err = rm
            .add_material_from_file(&shaders, "nope.wgsl", MaterialDesc::new("nope"))
            .unwrap_err();
        assert!(matches!(err, GraphicsError::Asset(AssetError::NotFound { .. })));
        assert_eq!(rm.calls.len(), 1);
    }

    #[test]
    fn test_reload_swaps_source() {
        let shaders = shader_dir("reload-swaps");
        let mut rm = RecordingManager::new();
        let id = rm
            .add_material_from_file(&shaders, "box.wgsl", MaterialDesc::new("box"))
            .unwrap();

        std::fs::write(shaders.dirs()[0].join("box.wgsl"), "// second").unwrap();
        rm.reload_material(id, &shaders, "box.wgsl").unwrap();
        assert_eq!(rm.material(id).unwrap().source, "// second");
        assert_eq!(rm.count(&Call::ReloadMaterial(id)), 1);
    }

    #[test]
    fn test_failed_reload_keeps_material() {
        let shaders = shader_dir("reload-fails");
        let mut rm = RecordingManager::new();
        let id = rm
            .add_material_from_file(&shaders, "box.wgsl", MaterialDesc::new("box"))
            .unwrap();

        let err = rm.reload_material(id, &shaders, "missing.wgsl").unwrap_err();
        assert!(matches!(err, GraphicsError::Asset(AssetError::NotFound { .. })));
        assert_eq!(rm.material(id).unwrap().source, "// first");
        assert_eq!(rm.count(&Call::ReloadMaterial(id)), 0);
    }

    #[test]
    fn test_reload_of_unknown_material() {
        let shaders = shader_dir("reload-unknown");
        let mut rm = RecordingManager::new();
        let kept = rm
            .add_material_from_file(&shaders, "box.wgsl", MaterialDesc::new("kept"))
            .unwrap();
        let gone = rm
            .add_material_from_file(&shaders, "box.wgsl", MaterialDesc::new("gone"))
            .unwrap();
        rm.remove_material(gone);

        std::fs::write(shaders.dirs()[0].join("box.wgsl"), "// second").unwrap();
        let err = rm.reload_material(gone, &shaders, "box.wgsl").unwrap_err();
        assert!(matches!(err, GraphicsError::MissingMaterial(id) if id == gone));
        assert!(rm.material(gone).is_none());
        assert_eq!(rm.material(kept).unwrap().source, "// first");
    }

    #[test]
    fn test_pass_names() {
        assert_eq!(FixedPass::Skybox.to_string(), "skybox");
        assert_eq!(FixedPass::SunLighting.to_string(), "sunlighting");
        assert_eq!(
            PassRequest::Lighting(LightKind::Point).pass(),
            FixedPass::PointLighting
        );
    }

    #[test]
    fn test_light_batch_len_uses_shortest_slice() {
        let lights = [Light::default(); 3];
        let mats = [Matrix4::from_scale(1.0); 2];
        let batch = LightBatch {
            inverse_view_projection: Matrix4::from_scale(1.0),
            mv: &mats,
            mvp: &mats,
            lights: &lights,
        };
        assert_eq!(batch.len(), 2);
    }
}
