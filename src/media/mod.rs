//! Artwork storage.
//!
//! The vault is optional at runtime. Without one the server still serves the
//! whole catalog, it just refuses artwork uploads and downloads.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

pub trait MediaVault: Send + Sync {
    fn upload(&self, path: &str, bytes: &[u8]) -> Result<()>;
    fn download(&self, path: &str) -> Result<Vec<u8>>;
}

pub struct FsMediaVault {
    base_dir: PathBuf,
}

impl FsMediaVault {
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir)
            .with_context(|| format!("Could not create media dir {:?}", base_dir))?;
        Ok(Self { base_dir })
    }

    /// Relative paths only, no parent components. Everything the vault hands
    /// out stays inside the base directory.
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        for component in relative.components() {
            match component {
                Component::Normal(_) => {}
                _ => bail!("Invalid media path {:?}", path),
            }
        }
        Ok(self.base_dir.join(relative))
    }
}

impl MediaVault for FsMediaVault {
    fn upload(&self, path: &str, bytes: &[u8]) -> Result<()> {
        let full_path = self.resolve(path)?;
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&full_path, bytes)?;
        debug!("Stored {} bytes at {:?}", bytes.len(), full_path);
        Ok(())
    }

    fn download(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = self.resolve(path)?;
        fs::read(&full_path).with_context(|| format!("Could not read {:?}", full_path))
    }
}
