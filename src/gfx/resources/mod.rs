//! GPU resource management
//!
//! Textures, meshes and the vertex formats they use.

pub mod mesh;
pub mod texture_resource;
pub mod vertex;

pub use mesh::{DrawMesh, Mesh};
pub use texture_resource::TextureResource;
pub use vertex::{LightInstance, Vertex3D};
