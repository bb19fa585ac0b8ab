//! Native filesystem tile store.
//!
//! Tiles live at `<root>/<dimension>/<zoom>/<x>_<z>.png`. Operations run
//! synchronously and resolve immediately; callers schedule them on the I/O
//! pool.

use std::fs;
use std::path::{Path, PathBuf};

use super::backend::{BackendError, BoxFuture, TileStore};
use crate::coords::TileKey;

/// Filesystem tile store scoped to a root directory.
pub struct NativeTileStore {
  root: PathBuf,
}

impl NativeTileStore {
  /// Creates a store rooted at `root`, creating the directory if needed.
  pub fn new(root: impl Into<PathBuf>) -> std::io::Result<Self> {
    let root = root.into();
    fs::create_dir_all(&root)?;
    Ok(Self { root })
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  /// Path of the file holding `key`.
  pub fn path(&self, key: &TileKey) -> PathBuf {
    self
      .root
      .join(key.dimension.as_str())
      .join(key.zoom.to_string())
      .join(format!("{}_{}.png", key.x, key.z))
  }
}

impl TileStore for NativeTileStore {
  fn exists(&self, key: &TileKey) -> BoxFuture<'_, Result<bool, BackendError>> {
    let result = self.path(key).try_exists().map_err(BackendError::from);
    Box::pin(std::future::ready(result))
  }

  fn read(&self, key: &TileKey) -> BoxFuture<'_, Result<Vec<u8>, BackendError>> {
    let result = fs::read(self.path(key)).map_err(BackendError::from);
    Box::pin(std::future::ready(result))
  }

  fn write(&self, key: &TileKey, bytes: Vec<u8>) -> BoxFuture<'_, Result<(), BackendError>> {
    let result = (|| -> Result<(), BackendError> {
      let path = self.path(key);
      if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
      }
      // Readers never see a partially written tile.
      let tmp = path.with_extension("png.tmp");
      fs::write(&tmp, &bytes)?;
      fs::rename(&tmp, &path)?;
      Ok(())
    })();
    Box::pin(std::future::ready(result))
  }

  fn delete_all(&self) -> BoxFuture<'_, Result<(), BackendError>> {
    let result = (|| -> Result<(), BackendError> {
      match fs::remove_dir_all(&self.root) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(BackendError::Io(e)),
      }
      fs::create_dir_all(&self.root)?;
      Ok(())
    })();
    Box::pin(std::future::ready(result))
  }
}
