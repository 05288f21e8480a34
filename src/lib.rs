//! Floatspace
//!
//! Deferred-lighting renderer with a floating-origin transform space, built
//! on wgpu and winit.

pub mod app;
pub mod assets;
pub mod config;
pub mod demo;
pub mod error;
pub mod gfx;
pub mod physics;
pub mod prelude;
pub mod watch;
pub mod wgpu_utils;

pub use app::{run, Demo};
pub use error::{AssetError, GraphicsError};
