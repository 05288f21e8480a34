//! Shader hot reload
//!
//! [`ShaderWatcher`] polls the modification time of a few files once per
//! frame. Polling never blocks; a file that is briefly missing while an
//! editor replaces it is simply checked again next frame.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::assets::AssetFs;
use crate::error::AssetError;

#[derive(Debug)]
struct Watched {
    name: String,
    path: PathBuf,
    modified: Option<SystemTime>,
}

#[derive(Debug, Default)]
pub struct ShaderWatcher {
    files: Vec<Watched>,
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|meta| meta.modified()).ok()
}

impl ShaderWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts watching `name` as resolved through `shaders`
    pub fn watch(&mut self, shaders: &AssetFs, name: &str) -> Result<(), AssetError> {
        let path = shaders.resolve(name)?;
        log::info!("watching {}", path.display());
        self.files.push(Watched {
            name: name.to_owned(),
            modified: modified(&path),
            path,
        });
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Names of watched files modified since the previous poll
    pub fn poll(&mut self) -> Vec<String> {
        let mut changed = Vec::new();
        for file in &mut self.files {
            let Some(now) = modified(&file.path) else {
                continue;
            };
            if file.modified != Some(now) {
                file.modified = Some(now);
                log::debug!("{} changed", file.name);
                changed.push(file.name.clone());
            }
        }
        changed
    }
}
