//! Per-dimension tracking of chunks awaiting re-render.
//!
//! Marks land in a set keyed by [`ChunkPos::pack`]. Draining swaps the set
//! for an empty one under the same lock that guards insertion, so a mark
//! racing a drain is either in this drain's batch or left for the next one.

use std::collections::{HashMap, HashSet};
use std::mem;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use crate::coords::{ChunkPos, DimensionId};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
  mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
struct DimensionState {
  dirty: Mutex<HashSet<u64>>,
  /// Chunks rendered successfully since the dimension was (re)introduced.
  rendered: Mutex<HashSet<u64>>,
}

/// Chunks drained from one dimension.
#[derive(Debug)]
pub struct DirtyBatch {
  pub dimension: DimensionId,
  keys: HashSet<u64>,
}

impl DirtyBatch {
  pub fn len(&self) -> usize {
    self.keys.len()
  }

  pub fn is_empty(&self) -> bool {
    self.keys.is_empty()
  }

  pub fn contains(&self, pos: ChunkPos) -> bool {
    self.keys.contains(&pos.pack())
  }

  /// Drained positions, in no particular order.
  pub fn positions(&self) -> impl Iterator<Item = ChunkPos> + '_ {
    self.keys.iter().map(|&k| ChunkPos::unpack(k))
  }
}

impl IntoIterator for DirtyBatch {
  type Item = ChunkPos;
  type IntoIter = std::iter::Map<std::collections::hash_set::IntoIter<u64>, fn(u64) -> ChunkPos>;

  fn into_iter(self) -> Self::IntoIter {
    self.keys.into_iter().map(ChunkPos::unpack as fn(u64) -> ChunkPos)
  }
}

/// Deduplicating set of dirty chunks per dimension.
///
/// All methods take `&self` and are safe to call from any thread.
#[derive(Default)]
pub struct DirtyRegionTracker {
  dimensions: RwLock<HashMap<DimensionId, Arc<DimensionState>>>,
}

impl DirtyRegionTracker {
  pub fn new() -> Self {
    Self::default()
  }

  fn state(&self, dimension: &DimensionId) -> Option<Arc<DimensionState>> {
    self
      .dimensions
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .get(dimension)
      .cloned()
  }

  fn state_or_insert(&self, dimension: &DimensionId) -> Arc<DimensionState> {
    if let Some(state) = self.state(dimension) {
      return state;
    }
    self
      .dimensions
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .entry(dimension.clone())
      .or_default()
      .clone()
  }

  /// Flags a chunk for re-render. Returns `true` if it was not already
  /// flagged.
  pub fn mark_dirty(&self, dimension: &DimensionId, pos: ChunkPos) -> bool {
    let state = self.state_or_insert(dimension);
    lock(&state.dirty).insert(pos.pack())
  }

  /// Flags a chunk only if it has not been rendered since the dimension was
  /// last reset. Returns `true` if the chunk is now newly flagged.
  pub fn mark_dirty_if_new(&self, dimension: &DimensionId, pos: ChunkPos) -> bool {
    let state = self.state_or_insert(dimension);
    let rendered = lock(&state.rendered);
    if rendered.contains(&pos.pack()) {
      return false;
    }
    lock(&state.dirty).insert(pos.pack())
  }

  /// Records a successful render. Ignored for untracked dimensions.
  pub fn mark_rendered(&self, dimension: &DimensionId, pos: ChunkPos) {
    if let Some(state) = self.state(dimension) {
      lock(&state.rendered).insert(pos.pack());
    }
  }

  /// True if the chunk has been rendered since the dimension was last reset.
  pub fn is_rendered(&self, dimension: &DimensionId, pos: ChunkPos) -> bool {
    self
      .state(dimension)
      .is_some_and(|state| lock(&state.rendered).contains(&pos.pack()))
  }

  /// True if the chunk is currently flagged.
  pub fn is_dirty(&self, dimension: &DimensionId, pos: ChunkPos) -> bool {
    self
      .state(dimension)
      .is_some_and(|state| lock(&state.dirty).contains(&pos.pack()))
  }

  /// Takes every chunk currently flagged in a dimension.
  pub fn drain(&self, dimension: &DimensionId) -> DirtyBatch {
    let keys = self
      .state(dimension)
      .map(|state| mem::take(&mut *lock(&state.dirty)))
      .unwrap_or_default();
    DirtyBatch {
      dimension: dimension.clone(),
      keys,
    }
  }

  /// Forgets a dimension entirely. Later marks start from a fresh state.
  pub fn remove_dimension(&self, dimension: &DimensionId) {
    self
      .dimensions
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .remove(dimension);
  }

  /// Forgets every dimension.
  pub fn clear(&self) {
    self
      .dimensions
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .clear();
  }

  /// Number of dimensions with at least one flagged chunk.
  pub fn dirty_dimension_count(&self) -> usize {
    self
      .dimensions
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .values()
      .filter(|state| !lock(&state.dirty).is_empty())
      .count()
  }

  /// Total flagged chunks across dimensions.
  pub fn dirty_chunk_count(&self) -> usize {
    self
      .dimensions
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .values()
      .map(|state| lock(&state.dirty).len())
      .sum()
  }
}
