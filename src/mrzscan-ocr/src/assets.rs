use crate::error::{OcrError, Result};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

/// Subdirectory of the cache holding trained data
pub const TRAINED_DATA_DIR: &str = "tessdata";

/// Resolves named OCR resources to readable files
pub trait AssetProvider: Send + Sync {
    fn resolve(&self, name: &str) -> Result<PathBuf>;
}

/// Trained data shipped next to the application, copied into a cache
/// directory on first use and read from there afterwards
#[derive(Debug, Clone)]
pub struct BundledAssets {
    bundle_dir: PathBuf,
    cache_dir: PathBuf,
}

impl BundledAssets {
    pub fn new(bundle_dir: impl Into<PathBuf>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            bundle_dir: bundle_dir.into(),
            cache_dir: cache_dir.into(),
        }
    }

    /// Where `name` lives once cached
    pub fn cached_path(&self, name: &str) -> PathBuf {
        self.cache_dir.join(TRAINED_DATA_DIR).join(name)
    }
}

impl AssetProvider for BundledAssets {
    fn resolve(&self, name: &str) -> Result<PathBuf> {
        let target = self.cached_path(name);
        if target.is_file() {
            debug!("using cached asset {:?}", target);
            return Ok(target);
        }

        let source = self.bundle_dir.join(name);
        if !source.is_file() {
            return Err(OcrError::AssetUnavailable {
                name: name.to_string(),
                message: format!("not found in {}", self.bundle_dir.display()),
            });
        }

        let directory = self.cache_dir.join(TRAINED_DATA_DIR);
        fs::create_dir_all(&directory)?;

        // Copy under a temporary name so an interrupted copy is never mistaken
        // for a cached asset
        let partial = directory.join(format!("{}.partial", name));
        fs::copy(&source, &partial)?;
        fs::rename(&partial, &target)?;

        info!("cached asset {} at {:?}", name, target);
        Ok(target)
    }
}
