use crate::error::GraphicsError;
use crate::gfx::geometry::primitives::generate_box;
use crate::gfx::render_manager::material::ObjectUniform;
use crate::gfx::render_manager::MaterialId;
use crate::gfx::resources::Mesh;
use crate::gfx::space::{MatrixRequest, ObjectId};
use crate::gfx::{DrawContext, Drawable, WgpuRenderManager};

/// A textured box drawn with one material
pub struct Computer {
    mesh: Mesh,
    material: MaterialId,
    object: ObjectId,
}

impl Computer {
    pub fn new(rm: &WgpuRenderManager, material: MaterialId, object: ObjectId) -> Self {
        let mut mesh = Mesh::from_geometry(&generate_box(1.0));
        mesh.upload(rm.device(), "Computer");
        Self {
            mesh,
            material,
            object,
        }
    }

    pub fn object(&self) -> ObjectId {
        self.object
    }

    pub fn material(&self) -> MaterialId {
        self.material
    }

    fn try_draw(&self, ctx: &mut DrawContext<'_, WgpuRenderManager>) -> Result<(), GraphicsError> {
        let space = ctx.space;
        let uniform = ObjectUniform::new(
            space.object_matrix(self.object, MatrixRequest::MVP),
            space.object_matrix(self.object, MatrixRequest::MODEL | MatrixRequest::VIEW_T),
            space.object_matrix(self.object, MatrixRequest::IMT),
        );
        let Some(mut pass) = ctx.rm.geometry_pass("Computer") else {
            return Ok(());
        };
        pass.draw(self.material, &self.mesh, &uniform)
    }
}

impl Drawable<WgpuRenderManager> for Computer {
    fn draw(&mut self, ctx: &mut DrawContext<'_, WgpuRenderManager>) {
        if let Err(e) = self.try_draw(ctx) {
            log::error!("computer: {e}");
        }
    }

    fn name(&self) -> &str {
        "Computer"
    }
}
