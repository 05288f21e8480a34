use image::RgbaImage;

use super::AssetFs;
use crate::error::AssetError;

/// Six square faces of a cubemap, all the same size
///
/// Order is north, south, up, down, west, east.
#[derive(Debug, Clone)]
pub struct CubeFaces {
    faces: [RgbaImage; 6],
}

impl CubeFaces {
    pub fn new(faces: [RgbaImage; 6]) -> Result<Self, AssetError> {
        let (width, height) = faces[0].dimensions();
        if width != height || width == 0 {
            return Err(AssetError::Invalid {
                name: "cubemap".to_owned(),
                reason: format!("faces must be square, got {width}x{height}"),
            });
        }
        if let Some((i, face)) = faces
            .iter()
            .enumerate()
            .find(|(_, face)| face.dimensions() != (width, height))
        {
            let (w, h) = face.dimensions();
            return Err(AssetError::Invalid {
                name: "cubemap".to_owned(),
                reason: format!("face {i} is {w}x{h}, expected {width}x{height}"),
            });
        }
        Ok(Self { faces })
    }

    /// Edge length of each face in pixels
    pub fn edge(&self) -> u32 {
        self.faces[0].width()
    }

    pub fn faces(&self) -> &[RgbaImage; 6] {
        &self.faces
    }
}

impl AssetFs {
    /// Decodes an image to 8-bit RGBA
    pub fn load_image(&self, name: &str) -> Result<RgbaImage, AssetError> {
        let bytes = self.read(name)?;
        let decoded = image::load_from_memory(&bytes).map_err(|source| AssetError::Image {
            name: name.to_owned(),
            source,
        })?;
        Ok(decoded.to_rgba8())
    }

    /// Loads every face before returning; the first failure aborts the load
    pub fn load_cube_faces(&self, names: &[&str; 6]) -> Result<CubeFaces, AssetError> {
        let mut faces: Vec<RgbaImage> = Vec::with_capacity(6);
        for name in names {
            faces.push(self.load_image(name)?);
        }
        let faces: [RgbaImage; 6] = faces.try_into().map_err(|_| AssetError::Invalid {
            name: "cubemap".to_owned(),
            reason: "expected six faces".to_owned(),
        })?;
        CubeFaces::new(faces)
    }
}
