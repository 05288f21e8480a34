//! The lighting demo: a textured computer lit by one sun while the camera
//! orbits it

mod computer;

use std::cell::RefCell;
use std::f32::consts::TAU;
use std::rc::Rc;

use cgmath::{Quaternion, Rad, Rotation3, Vector3};

pub use computer::Computer;

use crate::app::{Demo, DemoContext, DemoGraphics};
use crate::assets::AssetFs;
use crate::error::GraphicsError;
use crate::gfx::render_manager::{MaterialDesc, MaterialId};
use crate::gfx::{DrawableId, Light, RenderManager, State};

pub const COMPUTER_TEXTURES: [&str; 4] = ["comp1a.png", "comp1_n.png", "comp1_s.png", "comp1a_g.png"];

const ORBIT_DISTANCE: f64 = 10.0;
/// Seconds per revolution
const ORBIT_PERIOD: f32 = 10.0;

/// Camera pose on the orbit after `time` seconds
pub fn orbit(time: f32) -> (Vector3<f64>, Quaternion<f32>) {
    let angle = (time / ORBIT_PERIOD).fract() * TAU;
    let position = Vector3::new(
        f64::from(angle.sin()) * ORBIT_DISTANCE,
        0.0,
        f64::from(angle.cos()) * ORBIT_DISTANCE,
    );
    (position, Quaternion::from_angle_y(Rad(angle)))
}

/// Rebuilds `material` when the changed `file` is its `watched` shader
///
/// Returns whether the material was rebuilt. A failed rebuild is logged and
/// leaves the previous material in place.
pub fn reload_shader<R: RenderManager>(
    rm: &mut R,
    material: MaterialId,
    shaders: &AssetFs,
    watched: &str,
    file: &str,
) -> bool {
    if file != watched {
        return false;
    }
    match rm.reload_material(material, shaders, file) {
        Ok(()) => {
            log::info!("reloaded {file}");
            true
        }
        Err(e) => {
            log::error!("reload of {file} failed, keeping the old shader: {e}");
            false
        }
    }
}

pub struct LightingDemo {
    computer: Rc<RefCell<Computer>>,
    drawable: DrawableId,
    shader: String,
    time: f32,
}

impl Demo for LightingDemo {
    const TITLE: &'static str = "Lighting";

    fn build(ctx: DemoContext<'_>) -> Result<Self, GraphicsError> {
        let DemoContext {
            graphics,
            state,
            data,
            shaders,
            config,
        } = ctx;

        let mut desc = MaterialDesc::new("computer");
        for name in COMPUTER_TEXTURES {
            desc = desc.with_texture(data.load_image(name)?);
        }
        let material = graphics
            .rm_mut()
            .add_material_from_file(shaders, &config.shader, desc)?;

        let space = graphics.space_mut();
        space.set_camera_position(Vector3::new(0.0, 0.0, 20.0));
        let object = space.add();
        let sun = space.add();
        space.set_position(sun, Vector3::new(20.0, 3.0, 20.0));
        state
            .sun_lights
            .push(sun, Light::new(Vector3::new(1.6, 1.4, 0.4), 50.0));

        let computer = Rc::new(RefCell::new(Computer::new(graphics.rm(), material, object)));
        let drawable = graphics.add_drawable(&computer);

        Ok(Self {
            computer,
            drawable,
            shader: config.shader.clone(),
            time: 0.0,
        })
    }

    fn update(&mut self, graphics: &mut DemoGraphics, _state: &mut State, dt: f32) {
        self.time += dt;
        let (position, rotation) = orbit(self.time);
        let space = graphics.space_mut();
        space.set_camera_position(position);
        space.set_camera_rotation(rotation);
    }

    fn reload(&mut self, graphics: &mut DemoGraphics, shaders: &AssetFs, file: &str) {
        let material = self.computer.borrow().material();
        reload_shader(graphics.rm_mut(), material, shaders, &self.shader, file);
    }
}

impl LightingDemo {
    pub fn drawable(&self) -> DrawableId {
        self.drawable
    }
}
