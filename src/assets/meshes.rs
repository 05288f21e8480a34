use super::AssetFs;
use crate::error::AssetError;
use crate::gfx::geometry::GeometryData;
use crate::gfx::resources::mesh::smooth_normals;

impl AssetFs {
    /// Loads an OBJ file, merging all of its models into one triangle list
    ///
    /// Faces are triangulated and re-indexed so positions, normals and UVs
    /// share one index. Missing normals are generated; missing UVs are zero.
    /// Texture V is flipped to put the image origin at the top left.
    pub fn load_mesh(&self, name: &str) -> Result<GeometryData, AssetError> {
        let path = self.resolve(name)?;
        let (models, _materials) =
            tobj::load_obj(&path, &tobj::GPU_LOAD_OPTIONS).map_err(|source| AssetError::Mesh {
                name: name.to_owned(),
                source,
            })?;

        let mut data = GeometryData::new();
        for model in &models {
            let mesh = &model.mesh;
            let base = data.vertices.len() as u32;
            let count = mesh.positions.len() / 3;
            let has_normals = mesh.normals.len() == mesh.positions.len();
            let has_uvs = mesh.texcoords.len() / 2 == count;

            let positions: Vec<[f32; 3]> = mesh
                .positions
                .chunks_exact(3)
                .map(|p| [p[0], p[1], p[2]])
                .collect();
            let normals: Vec<[f32; 3]> = if has_normals {
                mesh.normals.chunks_exact(3).map(|n| [n[0], n[1], n[2]]).collect()
            } else {
                smooth_normals(&positions, &mesh.indices)
            };

            data.vertices.extend(positions);
            data.normals.extend(normals);
            if has_uvs {
                data.tex_coords
                    .extend(mesh.texcoords.chunks_exact(2).map(|t| [t[0], 1.0 - t[1]]));
            } else {
                data.tex_coords.extend(std::iter::repeat([0.0, 0.0]).take(count));
            }
            data.indices.extend(mesh.indices.iter().map(|i| i + base));
        }

        if data.indices.is_empty() {
            return Err(AssetError::Invalid {
                name: name.to_owned(),
                reason: "no faces".to_owned(),
            });
        }
        log::debug!(
            "{}: {} vertices, {} triangles",
            name,
            data.vertex_count(),
            data.triangle_count()
        );
        Ok(data)
    }
}
