//! WGPU utility functions and helpers

pub mod binding_types;
pub mod uniform_buffer;

pub use uniform_buffer::{InstanceBuffer, UniformBuffer};
