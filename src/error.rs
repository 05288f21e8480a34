//! Error types shared by the asset loader and the render pipeline
//!
//! Every build step in the engine returns one of these instead of a status
//! flag, so a failure deep inside a sub-pass reaches `main` with its full
//! context attached.

use std::path::PathBuf;

use thiserror::Error;

use crate::gfx::render_manager::{FixedPass, MaterialId};

/// Failure to locate or decode a file through [`crate::assets::AssetFs`]
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("{name}: not found in any of {searched:?}")]
    NotFound { name: String, searched: Vec<PathBuf> },

    #[error("{name}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{name}: {source}")]
    Image {
        name: String,
        #[source]
        source: image::ImageError,
    },

    #[error("{name}: {source}")]
    Mesh {
        name: String,
        #[source]
        source: tobj::LoadError,
    },

    #[error("{name}: {reason}")]
    Invalid { name: String, reason: String },
}

/// Failure while building or driving the render pipeline
#[derive(Debug, Error)]
pub enum GraphicsError {
    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error("shader '{name}': {message}")]
    Shader { name: String, message: String },

    #[error("material {0:?} does not exist")]
    MissingMaterial(MaterialId),

    #[error("{pass}: {source}")]
    Build {
        pass: FixedPass,
        #[source]
        source: Box<GraphicsError>,
    },

    #[error("surface: {0}")]
    Surface(#[from] wgpu::SurfaceError),

    #[error("adapter: {0}")]
    Adapter(String),

    #[error("unsupported adapter: {0}")]
    UnsupportedAdapter(String),

    #[error("window: {0}")]
    Window(String),
}

impl GraphicsError {
    /// Wraps an error with the name of the sub-pass whose build failed
    pub fn in_pass(self, pass: FixedPass) -> Self {
        GraphicsError::Build {
            pass,
            source: Box::new(self),
        }
    }
}
