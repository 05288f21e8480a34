//! Asset filesystem
//!
//! [`AssetFs`] resolves file names against an ordered list of directories.
//! The demo builds one for data (textures, meshes, skybox faces) and one for
//! shaders, and passes them to whatever needs to load files.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::AssetError;

mod images;
mod meshes;

pub use images::CubeFaces;

/// Ordered set of search directories
#[derive(Debug, Clone, Default)]
pub struct AssetFs {
    dirs: Vec<PathBuf>,
}

impl AssetFs {
    pub fn new<I, P>(dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            dirs: dirs.into_iter().map(Into::into).collect(),
        }
    }

    /// Adds a directory searched after the existing ones
    pub fn push_dir(&mut self, dir: impl Into<PathBuf>) {
        self.dirs.push(dir.into());
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// Path of `name` in the first directory that contains it
    pub fn resolve(&self, name: &str) -> Result<PathBuf, AssetError> {
        self.dirs
            .iter()
            .map(|dir| dir.join(name))
            .find(|path| path.is_file())
            .ok_or_else(|| AssetError::NotFound {
                name: name.to_owned(),
                searched: self.dirs.clone(),
            })
    }

    pub fn read(&self, name: &str) -> Result<Vec<u8>, AssetError> {
        let path = self.resolve(name)?;
        read_path(name, &path)
    }

    pub fn read_to_string(&self, name: &str) -> Result<String, AssetError> {
        String::from_utf8(self.read(name)?).map_err(|e| AssetError::Invalid {
            name: name.to_owned(),
            reason: e.to_string(),
        })
    }
}

fn read_path(name: &str, path: &Path) -> Result<Vec<u8>, AssetError> {
    fs::read(path).map_err(|source| AssetError::Io {
        name: name.to_owned(),
        source,
    })
}

/// Per-test scratch directory under the system temp dir
#[cfg(test)]
pub(crate) fn scratch_dir(test: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "floatspace-{}-{}",
        test,
        std::process::id()
    ));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_prefers_earlier_directories() {
        let root = scratch_dir("resolve-order");
        let first = root.join("first");
        let second = root.join("second");
        fs::create_dir_all(&first).unwrap();
        fs::create_dir_all(&second).unwrap();
        fs::write(first.join("both.txt"), "first").unwrap();
        fs::write(second.join("both.txt"), "second").unwrap();
        fs::write(second.join("only.txt"), "second only").unwrap();

        let fs = AssetFs::new([&first, &second]);
        assert_eq!(fs.read_to_string("both.txt").unwrap(), "first");
        assert_eq!(fs.read_to_string("only.txt").unwrap(), "second only");
    }

    #[test]
    fn test_missing_file_lists_searched_dirs() {
        let root = scratch_dir("resolve-missing");
        let mut fs = AssetFs::default();
        fs.push_dir(&root);

        match fs.read("nope.png") {
            Err(AssetError::NotFound { name, searched }) => {
                assert_eq!(name, "nope.png");
                assert_eq!(searched, vec![root]);
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_directories_are_not_files() {
        let root = scratch_dir("resolve-dir");
        fs::create_dir_all(root.join("shaders")).unwrap();
        let fs = AssetFs::new([&root]);
        assert!(fs.resolve("shaders").is_err());
    }
}
