//! Recording [`RenderManager`] for GPU-free tests

use std::collections::HashSet;

use cgmath::Matrix4;

use super::{
    AmbientParams, FixedPass, LightBatch, LightKind, MaterialDesc, MaterialId, MaterialTable,
    PassRequest, RenderManager, TonemapParams, WindowPolicy,
};
use crate::assets::AssetFs;
use crate::error::GraphicsError;
use crate::gfx::graphics::GraphicsFlags;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Setup(GraphicsFlags),
    Resize(u32, u32),
    WindowPolicy(WindowPolicy),
    AddMaterial(String),
    ReloadMaterial(MaterialId),
    RemoveMaterial(MaterialId),
    BuildPass(FixedPass),
    FreePass(FixedPass),
    BeginFrame,
    PushGroup(String),
    PopGroup,
    BindGeometry,
    Skybox,
    Ambient,
    Lighting(LightKind, usize),
    Tonemap,
    Present,
}

/// Records every call and tracks which passes are alive
///
/// Building a live pass or freeing a dead one panics.
#[derive(Debug)]
pub struct RecordingManager {
    pub calls: Vec<Call>,
    /// Size reported by `window_size`
    pub window: (u32, u32),
    /// Value returned by `begin_frame`
    pub frame_available: bool,
    /// Pass whose build fails with a shader error
    pub fail_on: Option<FixedPass>,
    size: (u32, u32),
    live: HashSet<FixedPass>,
    materials: MaterialTable<MaterialDesc>,
}

impl Default for RecordingManager {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            window: (800, 600),
            frame_available: true,
            fail_on: None,
            size: (0, 0),
            live: HashSet::new(),
            materials: MaterialTable::new(),
        }
    }
}

impl RecordingManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_live(&self, pass: FixedPass) -> bool {
        self.live.contains(&pass)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }

    pub fn resizes(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, Call::Resize(..)))
            .count()
    }

    /// Calls recorded since `start`, as owned values
    pub fn since(&self, start: usize) -> Vec<Call> {
        self.calls[start..].to_vec()
    }
}

impl RenderManager for RecordingManager {
    type Material = MaterialDesc;

    fn setup(&mut self, flags: &GraphicsFlags) -> Result<(), GraphicsError> {
        self.calls.push(Call::Setup(*flags));
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.calls.push(Call::Resize(width, height));
        self.size = (width, height);
    }

    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn window_size(&self) -> (u32, u32) {
        self.window
    }

    fn set_window_policy(&mut self, policy: &WindowPolicy) {
        self.calls.push(Call::WindowPolicy(*policy));
    }

    fn add_material(&mut self, desc: &MaterialDesc) -> Result<MaterialId, GraphicsError> {
        self.calls.push(Call::AddMaterial(desc.name.clone()));
        Ok(self.materials.insert(desc.clone()))
    }

    fn reload_material(&mut self, id: MaterialId, shaders: &AssetFs, file: &str) -> Result<(), GraphicsError> {
        if self.materials.get(id).is_none() {
            return Err(GraphicsError::MissingMaterial(id));
        }
        let source = shaders.read_to_string(file)?;
        let material = self
            .materials
            .get_mut(id)
            .ok_or(GraphicsError::MissingMaterial(id))?;
        material.source = source;
        self.calls.push(Call::ReloadMaterial(id));
        Ok(())
    }

    fn material(&self, id: MaterialId) -> Option<&MaterialDesc> {
        self.materials.get(id)
    }

    fn remove_material(&mut self, id: MaterialId) {
        self.calls.push(Call::RemoveMaterial(id));
        self.materials.remove(id);
    }

    fn build_pass(&mut self, request: PassRequest<'_>) -> Result<(), GraphicsError> {
        let pass = request.pass();
        if self.fail_on == Some(pass) {
            return Err(GraphicsError::Shader {
                name: pass.to_string(),
                message: "rejected by test".to_owned(),
            });
        }
        assert!(self.live.insert(pass), "{pass} built twice");
        self.calls.push(Call::BuildPass(pass));
        Ok(())
    }

    fn free_pass(&mut self, pass: FixedPass) {
        assert!(self.live.remove(&pass), "{pass} freed while not built");
        self.calls.push(Call::FreePass(pass));
    }

    fn begin_frame(&mut self) -> Result<bool, GraphicsError> {
        self.calls.push(Call::BeginFrame);
        Ok(self.frame_available)
    }

    fn push_debug_group(&mut self, label: &str) {
        self.calls.push(Call::PushGroup(label.to_owned()));
    }

    fn pop_debug_group(&mut self) {
        self.calls.push(Call::PopGroup);
    }

    fn bind_geometry(&mut self) {
        self.calls.push(Call::BindGeometry);
    }

    fn draw_skybox(&mut self, _view_projection: &Matrix4<f32>) {
        self.calls.push(Call::Skybox);
    }

    fn draw_ambient(&mut self, _params: &AmbientParams) {
        self.calls.push(Call::Ambient);
    }

    fn draw_lighting(&mut self, kind: LightKind, batch: &LightBatch<'_>) {
        self.calls.push(Call::Lighting(kind, batch.len()));
    }

    fn draw_tonemap(&mut self, _params: &TonemapParams) {
        self.calls.push(Call::Tonemap);
    }

    fn present(&mut self) {
        self.calls.push(Call::Present);
    }
}
