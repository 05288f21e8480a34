//! Deferred render pass pipeline
//!
//! [`Graphics`] owns the transform space and drives a [`RenderManager`]
//! through one frame:
//!
//! 1. Geometry: the geometry buffer is cleared, the skybox is drawn into its
//!    emission channel and every registered [`Drawable`] writes its materials.
//! 2. Ambient lighting starts the accumulation buffer from albedo and emission.
//! 3. Sun lights and point lights are added to the accumulation buffer.
//! 4. Tone mapping writes the accumulation buffer to the window surface.

use std::cell::RefCell;
use std::f32::consts::FRAC_PI_4;
use std::rc::Rc;

use cgmath::{Matrix4, Vector3};

use crate::assets::AssetFs;
use crate::error::GraphicsError;
use crate::gfx::drawable::{DrawContext, Drawable, DrawableId, DrawableList};
use crate::gfx::light::LightSet;
use crate::gfx::passes::SKYBOX_FACES;
use crate::gfx::render_manager::{
    AmbientParams, FixedPass, LightBatch, LightKind, PassRequest, RenderManager, TonemapParams,
    WindowPolicy,
};
use crate::gfx::space::{FloatSpace, MatrixRequest};

/// Viewport size used until the first frame reads the window
pub const INITIAL_SIZE: (u32, u32) = (800, 600);

/// Options fixed at `init` time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphicsFlags {
    /// Route GPU errors to the log with their debug group
    pub debug: bool,
    /// Present through an sRGB surface format
    pub srgb: bool,
    /// Accumulate lighting in a floating-point buffer
    pub hdr: bool,
    /// Geometry buffer sample count; 0 and 1 both disable multisampling
    pub msaa: u32,
}

impl Default for GraphicsFlags {
    fn default() -> Self {
        Self {
            debug: false,
            srgb: false,
            hdr: true,
            msaa: 0,
        }
    }
}

/// Per-frame inputs of [`Graphics::draw`]
#[derive(Debug, Clone)]
pub struct State {
    pub mouse_grab: bool,
    pub vsync: bool,
    /// Vertical field of view in radians
    pub fov: f32,
    pub zmin: f32,
    pub zfar: f32,
    pub ambient: Vector3<f32>,
    pub exposure: f32,
    pub gamma: f32,
    pub sun_lights: LightSet,
    pub point_lights: LightSet,
}

impl Default for State {
    fn default() -> Self {
        Self {
            mouse_grab: false,
            vsync: true,
            fov: FRAC_PI_4,
            zmin: 0.5,
            zfar: 1024.0,
            ambient: Vector3::new(0.2, 0.2, 0.2),
            exposure: 1.0,
            gamma: 1.0,
            sun_lights: LightSet::new(),
            point_lights: LightSet::new(),
        }
    }
}

#[derive(Default)]
struct LightMatrices {
    mv: Vec<Matrix4<f32>>,
    mvp: Vec<Matrix4<f32>>,
}

impl LightMatrices {
    fn compute(&mut self, space: &FloatSpace, lights: &LightSet) {
        space.object_matrices_into(
            &mut self.mv,
            lights.objects(),
            MatrixRequest::MODEL_T | MatrixRequest::VIEW_T,
        );
        space.object_matrices_into(
            &mut self.mvp,
            lights.objects(),
            MatrixRequest::MODEL_T | MatrixRequest::VP,
        );
    }
}

pub struct Graphics<R: RenderManager> {
    rm: R,
    space: FloatSpace,
    drawables: DrawableList<R>,
    /// Passes in build order
    built: Vec<FixedPass>,
    initialized: bool,
    sun: LightMatrices,
    point: LightMatrices,
}

impl<R: RenderManager> Graphics<R> {
    pub fn new(rm: R) -> Self {
        Self {
            rm,
            space: FloatSpace::new(),
            drawables: DrawableList::default(),
            built: Vec::new(),
            initialized: false,
            sun: LightMatrices::default(),
            point: LightMatrices::default(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn rm(&self) -> &R {
        &self.rm
    }

    pub fn rm_mut(&mut self) -> &mut R {
        &mut self.rm
    }

    pub fn space(&self) -> &FloatSpace {
        &self.space
    }

    pub fn space_mut(&mut self) -> &mut FloatSpace {
        &mut self.space
    }

    /// Passes currently built, in build order
    pub fn built_passes(&self) -> &[FixedPass] {
        &self.built
    }

    fn build(&mut self, request: PassRequest<'_>) -> Result<(), GraphicsError> {
        let pass = request.pass();
        self.rm.build_pass(request).map_err(|e| e.in_pass(pass))?;
        self.built.push(pass);
        Ok(())
    }

    /// Builds the pipeline, freeing any previous build first
    ///
    /// The first failing step aborts the rest; passes built before it stay
    /// alive until the next `init`, `free` or drop.
    pub fn init(&mut self, flags: &GraphicsFlags, data: &AssetFs) -> Result<(), GraphicsError> {
        self.free();
        log::info!("initializing graphics: {flags:?}");

        self.rm.setup(flags)?;
        let (width, height) = INITIAL_SIZE;
        self.rm.resize(width, height);

        let defaults = State::default();
        self.space
            .build(width, height, defaults.fov, defaults.zmin, defaults.zfar);

        self.build(PassRequest::Shapes)?;
        let faces = data
            .load_cube_faces(&SKYBOX_FACES)
            .map_err(|e| GraphicsError::from(e).in_pass(FixedPass::Skybox))?;
        self.build(PassRequest::Skybox(&faces))?;
        self.build(PassRequest::Ambient)?;
        self.build(PassRequest::Lighting(LightKind::Sun))?;
        self.build(PassRequest::Lighting(LightKind::Point))?;
        self.build(PassRequest::Tonemapper)?;

        self.initialized = true;
        Ok(())
    }

    /// Frees every built pass in reverse build order
    pub fn free(&mut self) {
        while let Some(pass) = self.built.pop() {
            self.rm.free_pass(pass);
        }
        if self.initialized {
            log::info!("graphics freed");
        }
        self.initialized = false;
    }

    pub fn add_drawable<D: Drawable<R> + 'static>(&mut self, drawable: &Rc<RefCell<D>>) -> DrawableId {
        self.drawables.add(drawable)
    }

    pub fn remove_drawable(&mut self, id: DrawableId) {
        if !self.drawables.remove(id) {
            log::warn!("removing unknown drawable {id:?}");
        }
    }

    pub fn drawable_count(&self) -> usize {
        self.drawables.len()
    }

    /// Renders and presents one frame
    pub fn draw(&mut self, state: &State) -> Result<(), GraphicsError> {
        if !self.initialized {
            log::warn!("draw called before init");
            return Ok(());
        }

        self.rm.set_window_policy(&WindowPolicy {
            mouse_grab: state.mouse_grab,
            vsync: state.vsync,
        });

        let (width, height) = self.rm.window_size();
        if width == 0 || height == 0 {
            return Ok(());
        }
        if (width, height) != self.rm.size() {
            log::debug!("viewport resized to {width}x{height}");
            self.rm.resize(width, height);
        }
        self.space
            .set_perspective(state.fov, width as f32 / height as f32, state.zmin, state.zfar);

        let sky = self
            .space
            .view_matrix(MatrixRequest::VIEW_R | MatrixRequest::PROJECTION);
        let inverse_view_projection = self.space.view_matrix(
            MatrixRequest::INVERSE | MatrixRequest::VIEW_R | MatrixRequest::PROJECTION,
        );
        self.sun.compute(&self.space, &state.sun_lights);
        self.point.compute(&self.space, &state.point_lights);

        if !self.rm.begin_frame()? {
            log::warn!("no surface texture available, skipping frame");
            return Ok(());
        }

        self.rm.push_debug_group("Geometry");
        self.rm.bind_geometry();
        self.rm.pop_debug_group();

        self.rm.push_debug_group("Skybox");
        self.rm.draw_skybox(&sky);
        self.rm.pop_debug_group();

        self.drawables.draw_all(&mut DrawContext {
            rm: &mut self.rm,
            space: &self.space,
        });

        self.rm.push_debug_group("Ambient Lighting");
        self.rm.draw_ambient(&AmbientParams {
            color: state.ambient,
        });
        self.rm.pop_debug_group();

        self.rm.push_debug_group("Sunlights");
        self.rm.draw_lighting(
            LightKind::Sun,
            &LightBatch {
                inverse_view_projection,
                mv: &self.sun.mv,
                mvp: &self.sun.mvp,
                lights: state.sun_lights.lights(),
            },
        );
        self.rm.pop_debug_group();

        self.rm.push_debug_group("Point Lights");
        self.rm.draw_lighting(
            LightKind::Point,
            &LightBatch {
                inverse_view_projection,
                mv: &self.point.mv,
                mvp: &self.point.mvp,
                lights: state.point_lights.lights(),
            },
        );
        self.rm.pop_debug_group();

        self.rm.push_debug_group("Tone Mapping");
        self.rm.draw_tonemap(&TonemapParams {
            exposure: state.exposure,
            gamma: state.gamma,
        });
        self.rm.pop_debug_group();

        self.rm.present();
        Ok(())
    }
}

impl<R: RenderManager> Drop for Graphics<R> {
    fn drop(&mut self) {
        self.free();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::scratch_dir;
    use crate::gfx::light::Light;
    use crate::gfx::render_manager::testing::{Call, RecordingManager};
    use image::{Rgba, RgbaImage};

    const BUILD_ORDER: [FixedPass; 6] = [
        FixedPass::Shapes,
        FixedPass::Skybox,
        FixedPass::Ambient,
        FixedPass::SunLighting,
        FixedPass::PointLighting,
        FixedPass::Tonemapper,
    ];

    fn sky_assets(test: &str) -> AssetFs {
        let dir = scratch_dir(test);
        for face in SKYBOX_FACES {
            RgbaImage::from_pixel(2, 2, Rgba([10, 20, 30, 255]))
                .save(dir.join(face))
                .unwrap();
        }
        AssetFs::new([dir])
    }

    fn initialized(test: &str) -> Graphics<RecordingManager> {
        let mut graphics = Graphics::new(RecordingManager::new());
        graphics
            .init(&GraphicsFlags::default(), &sky_assets(test))
            .unwrap();
        graphics
    }

    fn groups(calls: &[Call]) -> Vec<String> {
        calls
            .iter()
            .filter_map(|call| match call {
                Call::PushGroup(label) => Some(label.clone()),
                _ => None,
            })
            .collect()
    }

    struct Named {
        name: &'static str,
        draws: Rc<RefCell<Vec<&'static str>>>,
    }

    impl Drawable<RecordingManager> for Named {
        fn draw(&mut self, ctx: &mut DrawContext<'_, RecordingManager>) {
            assert_eq!(ctx.rm.calls.last(), Some(&Call::PushGroup(self.name.to_owned())));
            self.draws.borrow_mut().push(self.name);
        }

        fn name(&self) -> &str {
            self.name
        }
    }

    #[test]
    fn test_init_builds_passes_in_order() {
        let graphics = initialized("init-order");
        let rm = graphics.rm();
        assert_eq!(rm.calls[0], Call::Setup(GraphicsFlags::default()));
        assert_eq!(rm.calls[1], Call::Resize(800, 600));
        let built: Vec<_> = rm
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::BuildPass(pass) => Some(*pass),
                _ => None,
            })
            .collect();
        assert_eq!(built, BUILD_ORDER);
        assert_eq!(graphics.built_passes(), BUILD_ORDER);
        assert!(graphics.is_initialized());
    }

    #[test]
    fn test_reinit_frees_each_pass_once_in_reverse() {
        let assets = sky_assets("reinit");
        let mut graphics = Graphics::new(RecordingManager::new());
        graphics.init(&GraphicsFlags::default(), &assets).unwrap();
        let start = graphics.rm().calls.len();

        let flags = GraphicsFlags {
            msaa: 4,
            ..GraphicsFlags::default()
        };
        graphics.init(&flags, &assets).unwrap();

        let calls = graphics.rm().since(start);
        let freed: Vec<_> = calls
            .iter()
            .filter_map(|c| match c {
                Call::FreePass(pass) => Some(*pass),
                _ => None,
            })
            .collect();
        let mut reversed = BUILD_ORDER;
        reversed.reverse();
        assert_eq!(freed, reversed);
        assert_eq!(calls[freed.len()], Call::Setup(flags));
        assert_eq!(graphics.rm().live_count(), BUILD_ORDER.len());
    }

    #[test]
    fn test_missing_skybox_face_aborts_init() {
        let dir = scratch_dir("missing-face");
        for face in &SKYBOX_FACES[..5] {
            RgbaImage::new(2, 2).save(dir.join(face)).unwrap();
        }
        let mut graphics = Graphics::new(RecordingManager::new());
        let err = graphics
            .init(&GraphicsFlags::default(), &AssetFs::new([dir]))
            .unwrap_err();

        assert!(matches!(err, GraphicsError::Build { pass: FixedPass::Skybox, .. }));
        assert!(err.to_string().contains("east.png"));
        assert!(!graphics.is_initialized());
        assert!(graphics.rm().is_live(FixedPass::Shapes));
        assert!(!graphics.rm().is_live(FixedPass::Skybox));
        assert_eq!(graphics.rm().count(&Call::BuildPass(FixedPass::Skybox)), 0);

        graphics.free();
        assert_eq!(graphics.rm().live_count(), 0);
    }

    fn built(calls: &[Call]) -> Vec<FixedPass> {
        calls
            .iter()
            .filter_map(|c| match c {
                Call::BuildPass(pass) => Some(*pass),
                _ => None,
            })
            .collect()
    }

    fn freed(calls: &[Call]) -> Vec<FixedPass> {
        calls
            .iter()
            .filter_map(|c| match c {
                Call::FreePass(pass) => Some(*pass),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_failed_pass_build_stops_init() {
        let assets = sky_assets("ambient-fails");
        let mut rm = RecordingManager::new();
        rm.fail_on = Some(FixedPass::Ambient);
        let mut graphics = Graphics::new(rm);

        let err = graphics.init(&GraphicsFlags::default(), &assets).unwrap_err();
        assert!(matches!(err, GraphicsError::Build { pass: FixedPass::Ambient, .. }));
        assert!(err.to_string().starts_with("ambient: "));
        assert!(!graphics.is_initialized());
        assert_eq!(built(&graphics.rm().calls), [FixedPass::Shapes, FixedPass::Skybox]);
        assert_eq!(graphics.built_passes(), [FixedPass::Shapes, FixedPass::Skybox]);

        graphics.rm_mut().fail_on = None;
        let start = graphics.rm().calls.len();
        graphics.init(&GraphicsFlags::default(), &assets).unwrap();
        let calls = graphics.rm().since(start);
        assert_eq!(freed(&calls), [FixedPass::Skybox, FixedPass::Shapes]);
        assert_eq!(built(&calls), BUILD_ORDER);
        assert!(graphics.is_initialized());
    }

    #[test]
    fn test_failed_tonemapper_leaves_earlier_passes_for_free() {
        let mut rm = RecordingManager::new();
        rm.fail_on = Some(FixedPass::Tonemapper);
        let mut graphics = Graphics::new(rm);

        let err = graphics
            .init(&GraphicsFlags::default(), &sky_assets("tonemap-fails"))
            .unwrap_err();
        assert!(matches!(err, GraphicsError::Build { pass: FixedPass::Tonemapper, .. }));
        assert_eq!(graphics.rm().live_count(), BUILD_ORDER.len() - 1);
        assert!(!graphics.rm().is_live(FixedPass::Tonemapper));

        let start = graphics.rm().calls.len();
        graphics.free();
        let mut reversed = BUILD_ORDER[..5].to_vec();
        reversed.reverse();
        assert_eq!(freed(&graphics.rm().since(start)), reversed);
        assert_eq!(graphics.rm().live_count(), 0);
    }

    #[test]
    fn test_resize_only_when_window_changes() {
        let mut graphics = initialized("resize");
        let state = State::default();

        graphics.draw(&state).unwrap();
        assert_eq!(graphics.rm().resizes(), 1);

        graphics.rm_mut().window = (1024, 768);
        graphics.draw(&state).unwrap();
        graphics.draw(&state).unwrap();
        assert_eq!(graphics.rm().resizes(), 2);
        assert_eq!(graphics.rm().size(), (1024, 768));
    }

    #[test]
    fn test_zero_sized_window_skips_frame() {
        let mut graphics = initialized("minimized");
        graphics.rm_mut().window = (0, 0);
        let start = graphics.rm().calls.len();
        graphics.draw(&State::default()).unwrap();

        let calls = graphics.rm().since(start);
        assert_eq!(
            calls,
            vec![Call::WindowPolicy(WindowPolicy {
                mouse_grab: false,
                vsync: true
            })]
        );
    }

    #[test]
    fn test_unavailable_frame_is_not_presented() {
        let mut graphics = initialized("no-frame");
        graphics.rm_mut().frame_available = false;
        graphics.draw(&State::default()).unwrap();
        assert_eq!(graphics.rm().count(&Call::BeginFrame), 1);
        assert_eq!(graphics.rm().count(&Call::Present), 0);
    }

    #[test]
    fn test_frame_runs_passes_in_order_and_presents_once() {
        let mut graphics = initialized("frame-order");
        let draws = Rc::new(RefCell::new(Vec::new()));
        let computer = Rc::new(RefCell::new(Named {
            name: "computer",
            draws: draws.clone(),
        }));
        graphics.add_drawable(&computer);

        let mut state = State::default();
        let sun = graphics.space_mut().add();
        state.sun_lights.push(sun, Light::default());

        let start = graphics.rm().calls.len();
        graphics.draw(&state).unwrap();
        let calls = graphics.rm().since(start);

        assert_eq!(
            groups(&calls),
            [
                "Geometry",
                "Skybox",
                "computer",
                "Ambient Lighting",
                "Sunlights",
                "Point Lights",
                "Tone Mapping"
            ]
        );
        let pushes = calls.iter().filter(|c| matches!(c, Call::PushGroup(_))).count();
        assert_eq!(pushes, graphics.rm().count(&Call::PopGroup));

        let work: Vec<_> = calls
            .iter()
            .filter(|c| {
                matches!(
                    c,
                    Call::BeginFrame
                        | Call::BindGeometry
                        | Call::Skybox
                        | Call::Ambient
                        | Call::Lighting(..)
                        | Call::Tonemap
                        | Call::Present
                )
            })
            .cloned()
            .collect();
        assert_eq!(
            work,
            vec![
                Call::BeginFrame,
                Call::BindGeometry,
                Call::Skybox,
                Call::Ambient,
                Call::Lighting(LightKind::Sun, 1),
                Call::Lighting(LightKind::Point, 0),
                Call::Tonemap,
                Call::Present,
            ]
        );
        assert_eq!(calls.last(), Some(&Call::Present));
        assert_eq!(*draws.borrow(), ["computer"]);
    }

    #[test]
    fn test_empty_scene_frame() {
        let flags = GraphicsFlags::default();
        assert_eq!(flags.msaa, 0);
        assert!(flags.hdr);

        let mut graphics = initialized("empty-scene");
        assert_eq!(graphics.drawable_count(), 0);
        let start = graphics.rm().calls.len();
        graphics.draw(&State::default()).unwrap();
        let calls = graphics.rm().since(start);

        assert_eq!(
            groups(&calls),
            [
                "Geometry",
                "Skybox",
                "Ambient Lighting",
                "Sunlights",
                "Point Lights",
                "Tone Mapping"
            ]
        );
        assert_eq!(
            calls.iter().filter(|c| matches!(c, Call::PopGroup)).count(),
            6
        );
        assert_eq!(calls.iter().filter(|c| matches!(c, Call::Present)).count(), 1);
        assert_eq!(calls.last(), Some(&Call::Present));
        assert!(calls.contains(&Call::Lighting(LightKind::Sun, 0)));
        assert!(calls.contains(&Call::Lighting(LightKind::Point, 0)));
    }

    #[test]
    fn test_window_policy_is_applied_every_frame() {
        let mut graphics = initialized("policy");
        let state = State {
            mouse_grab: true,
            ..State::default()
        };
        let start = graphics.rm().calls.len();
        graphics.draw(&state).unwrap();
        graphics.draw(&state).unwrap();

        let policy = Call::WindowPolicy(WindowPolicy {
            mouse_grab: true,
            vsync: true,
        });
        let calls = graphics.rm().since(start);
        assert_eq!(calls.iter().filter(|c| **c == policy).count(), 2);
    }

    #[test]
    fn test_degenerate_camera_state_still_draws() {
        let mut graphics = initialized("degenerate-camera");

        graphics
            .draw(&State {
                fov: 0.0,
                ..State::default()
            })
            .unwrap();
        graphics
            .draw(&State {
                zmin: 1.0,
                zfar: 1.0,
                ..State::default()
            })
            .unwrap();
        assert_eq!(graphics.rm().count(&Call::Present), 2);
    }

    #[test]
    fn test_drawables_run_in_registration_order() {
        let mut graphics = initialized("drawables");
        let draws = Rc::new(RefCell::new(Vec::new()));
        let make = |name| {
            Rc::new(RefCell::new(Named {
                name,
                draws: draws.clone(),
            }))
        };
        let first = make("first");
        let second = make("second");
        let third = make("third");
        graphics.add_drawable(&first);
        let second_id = graphics.add_drawable(&second);
        graphics.add_drawable(&third);

        graphics.draw(&State::default()).unwrap();
        assert_eq!(*draws.borrow(), ["first", "second", "third"]);

        draws.borrow_mut().clear();
        graphics.remove_drawable(second_id);
        graphics.draw(&State::default()).unwrap();
        assert_eq!(*draws.borrow(), ["first", "third"]);
    }

    #[test]
    fn test_dropped_drawable_is_skipped_and_pruned() {
        let mut graphics = initialized("dropped-drawable");
        let draws = Rc::new(RefCell::new(Vec::new()));
        let kept = Rc::new(RefCell::new(Named {
            name: "kept",
            draws: draws.clone(),
        }));
        let dropped = Rc::new(RefCell::new(Named {
            name: "dropped",
            draws: draws.clone(),
        }));
        graphics.add_drawable(&dropped);
        graphics.add_drawable(&kept);
        drop(dropped);

        graphics.draw(&State::default()).unwrap();
        assert_eq!(*draws.borrow(), ["kept"]);
        assert_eq!(graphics.drawable_count(), 1);
    }

    #[test]
    fn test_free_then_drop_frees_once() {
        let mut graphics = initialized("free-drop");
        graphics.free();
        assert_eq!(graphics.rm().live_count(), 0);
        assert!(!graphics.is_initialized());
        // a second free would panic in the recording manager
        drop(graphics);
    }

    #[test]
    fn test_draw_before_init_does_nothing() {
        let mut graphics = Graphics::new(RecordingManager::new());
        graphics.draw(&State::default()).unwrap();
        assert!(graphics.rm().calls.is_empty());
    }
}
