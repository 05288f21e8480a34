//! Fixed sub-passes of the deferred pipeline
//!
//! Each pass owns its pipeline and bindings. Passes that read the geometry
//! or accumulation buffer can be rebound after the targets are reallocated.

pub mod ambient;
pub mod lighting;
pub mod shapes;
pub mod skybox;
pub mod tonemap;

pub use ambient::AmbientPass;
pub use lighting::LightingPass;
pub use shapes::Shapes;
pub use skybox::{SkyboxPass, SKYBOX_FACES};
pub use tonemap::TonemapPass;

use crate::gfx::render_manager::targets::{shader_substitutions, Targets};
use crate::gfx::render_manager::pipeline::specialize;

pub(crate) const GBUFFER_WGSL: &str = include_str!("../shaders/gbuffer.wgsl");

/// Device state a pass needs while it is being built
pub struct PassContext<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub targets: &'a Targets,
    pub surface_format: wgpu::TextureFormat,
    pub accum_format: wgpu::TextureFormat,
}

impl PassContext<'_> {
    pub fn sample_count(&self) -> u32 {
        self.targets.gbuffer.sample_count
    }

    /// Prepends the geometry buffer bindings and fills in the sample-count types
    pub fn gbuffer_shader(&self, body: &str, extra: &[(&str, &str)]) -> String {
        let mut substitutions = shader_substitutions(self.sample_count()).to_vec();
        substitutions.extend_from_slice(extra);
        specialize(&format!("{GBUFFER_WGSL}\n{body}"), &substitutions)
    }
}
