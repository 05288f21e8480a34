//! # Floatspace Prelude
//!
//! Commonly used types for writing a demo.
//!
//! ```no_run
//! use floatspace::prelude::*;
//! ```

pub use crate::app::{run, Demo, DemoContext, DemoGraphics};
pub use crate::assets::AssetFs;
pub use crate::config::DemoConfig;
pub use crate::error::{AssetError, GraphicsError};
pub use crate::gfx::{
    DrawContext, Drawable, DrawableId, FloatSpace, Graphics, GraphicsFlags, Light, LightSet,
    MatrixRequest, ObjectId, Pose, RenderManager, State, WgpuRenderManager,
};
pub use crate::gfx::render_manager::{MaterialDesc, MaterialId};
pub use crate::physics::{BodyDesc, BodyHandle, BodySpace, PhysicsWorld, Shape};

pub use cgmath::{Deg, Matrix4, Quaternion, Rad, Rotation3, Vector3};
