//! Async tile store trait.
//!
//! [`TileStore`] is a byte-addressable key-value surface keyed by zoom-0
//! [`TileKey`]s. Implementations decide where bytes live; the orchestrator
//! only ever sees encoded PNGs.

use std::error::Error;
use std::future::Future;
use std::pin::Pin;
use std::{fmt, io};

use crate::coords::TileKey;

/// Boxed future type used by all trait methods for object safety.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Error type for store operations.
#[derive(Debug)]
pub enum BackendError {
  /// Standard I/O error.
  Io(io::Error),
  /// No tile stored under the key.
  NotFound,
  /// Other backend-specific error.
  Other(Box<dyn Error + Send + Sync>),
}

impl fmt::Display for BackendError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Io(e) => write!(f, "I/O error: {e}"),
      Self::NotFound => write!(f, "not found"),
      Self::Other(e) => write!(f, "{e}"),
    }
  }
}

impl Error for BackendError {
  fn source(&self) -> Option<&(dyn Error + 'static)> {
    match self {
      Self::Io(e) => Some(e),
      Self::Other(e) => Some(&**e),
      Self::NotFound => None,
    }
  }
}

impl From<io::Error> for BackendError {
  fn from(err: io::Error) -> Self {
    if err.kind() == io::ErrorKind::NotFound {
      Self::NotFound
    } else {
      Self::Io(err)
    }
  }
}

/// Persistent storage for encoded zoom-0 tiles.
///
/// Writes to one key never race each other: the orchestrator renders a key
/// at most once at a time.
pub trait TileStore: Send + Sync {
  /// Returns true if a tile is stored under `key`.
  fn exists(&self, key: &TileKey) -> BoxFuture<'_, Result<bool, BackendError>>;

  /// Reads the bytes stored under `key`.
  fn read(&self, key: &TileKey) -> BoxFuture<'_, Result<Vec<u8>, BackendError>>;

  /// Stores `bytes` under `key`, replacing any previous tile.
  fn write(&self, key: &TileKey, bytes: Vec<u8>) -> BoxFuture<'_, Result<(), BackendError>>;

  /// Deletes every stored tile and leaves an empty, usable store.
  fn delete_all(&self) -> BoxFuture<'_, Result<(), BackendError>>;
}
