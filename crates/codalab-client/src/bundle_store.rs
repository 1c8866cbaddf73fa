//! On-disk layout for locally stored bundles.

use std::path::{Path, PathBuf};

use crate::error::Result;

/// Bundle store rooted at the CodaLab home directory.
#[derive(Debug, Clone)]
pub struct BundleStore {
    root: PathBuf,
    direct_upload_paths: Vec<PathBuf>,
}

impl BundleStore {
    /// Subdirectory holding finished bundle contents.
    pub const DATA_SUBDIRECTORY: &'static str = "bundles";

    /// Subdirectory for scratch space; the system temp dir is usually too small.
    pub const TEMP_SUBDIRECTORY: &'static str = "temp";

    /// Create the store, making its directories if needed.
    pub fn new(root: impl Into<PathBuf>, direct_upload_paths: &[String]) -> Result<Self> {
        let store = Self {
            root: root.into(),
            direct_upload_paths: direct_upload_paths.iter().map(PathBuf::from).collect(),
        };
        std::fs::create_dir_all(store.data_dir())?;
        std::fs::create_dir_all(store.temp_dir())?;
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join(Self::DATA_SUBDIRECTORY)
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.root.join(Self::TEMP_SUBDIRECTORY)
    }

    /// Whether `path` may be uploaded in place rather than copied.
    pub fn is_direct_upload_path(&self, path: &Path) -> bool {
        self.direct_upload_paths
            .iter()
            .any(|allowed| path.starts_with(allowed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_new_creates_directories() {
        let temp = tempdir().unwrap();
        let store = BundleStore::new(temp.path(), &[]).unwrap();
        assert!(store.data_dir().is_dir());
        assert!(store.temp_dir().is_dir());
        assert_eq!(store.root(), temp.path());
    }

    #[test]
    fn test_direct_upload_paths() {
        let temp = tempdir().unwrap();
        let store = BundleStore::new(temp.path(), &["/data/shared".to_string()]).unwrap();
        assert!(store.is_direct_upload_path(Path::new("/data/shared/corpus")));
        assert!(!store.is_direct_upload_path(Path::new("/home/alice/corpus")));
    }
}
