//! # Graphics Module
//!
//! Deferred-lighting renderer built around a floating-origin transform space.
//!
//! ## Architecture Overview
//!
//! - **Transform Space** ([`space`]) - Camera and object poses, matrix composition
//! - **Render Manager** ([`render_manager`]) - GPU seam: materials, targets, sub-passes
//! - **Pipeline** ([`graphics`]) - Builds the sub-passes and runs them each frame
//! - **Passes** ([`passes`]) - Skybox, ambient, lighting and tone mapping on the GPU
//! - **Drawables** ([`drawable`]) - Caller-owned objects drawn in the geometry pass
//! - **Resources** ([`resources`]) - Meshes, textures and vertex layouts
//!
//! ## Usage
//!
//! ```no_run
//! use floatspace::gfx::{Graphics, GraphicsFlags, State};
//! use floatspace::gfx::render_manager::WgpuRenderManager;
//!
//! // let rm = pollster::block_on(WgpuRenderManager::new(window))?;
//! // let mut graphics = Graphics::new(rm);
//! // graphics.init(&GraphicsFlags::default(), &data)?;
//! // graphics.draw(&State::default())?;
//! ```

pub mod debug;
pub mod drawable;
pub mod geometry;
pub mod graphics;
pub mod light;
pub mod passes;
pub mod render_manager;
pub mod resources;
pub mod space;

pub use drawable::{DrawContext, Drawable, DrawableId};
pub use graphics::{Graphics, GraphicsFlags, State};
pub use light::{Light, LightSet};
pub use render_manager::{RenderManager, WgpuRenderManager};
pub use space::{FloatSpace, MatrixRequest, ObjectId, Pose};
