//! World change notifications feeding the dirty tracker.
//!
//! A chunk's first rendered row is shaded against the last row of the chunk
//! north of it (z - 1), so every change to chunk `(x, z)` also dirties
//! `(x, z + 1)`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::coords::{ChunkPos, DimensionId};
use crate::dirty::DirtyRegionTracker;

/// What to do when a chunk becomes resident again.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReloadPolicy {
  /// Always re-render; catches edits made while the chunk was unloaded.
  #[default]
  Always,
  /// Re-render only chunks not rendered since the dimension was last reset.
  IfNeverRendered,
}

/// A change notification from the world.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorldEvent {
  ChunkBecameResident {
    dimension: DimensionId,
    chunk_x: i32,
    chunk_z: i32,
  },
  BlockChanged {
    dimension: DimensionId,
    world_x: i32,
    world_z: i32,
  },
  DimensionUnloaded {
    dimension: DimensionId,
  },
}

/// Receiver of world change notifications.
pub trait WorldChangeListener: Send + Sync {
  fn chunk_became_resident(&self, dimension: &DimensionId, chunk_x: i32, chunk_z: i32);

  fn block_changed(&self, dimension: &DimensionId, world_x: i32, world_z: i32);

  fn dimension_unloaded(&self, dimension: &DimensionId);

  /// Routes an event to its handler.
  fn dispatch(&self, event: &WorldEvent) {
    match event {
      WorldEvent::ChunkBecameResident {
        dimension,
        chunk_x,
        chunk_z,
      } => self.chunk_became_resident(dimension, *chunk_x, *chunk_z),
      WorldEvent::BlockChanged {
        dimension,
        world_x,
        world_z,
      } => self.block_changed(dimension, *world_x, *world_z),
      WorldEvent::DimensionUnloaded { dimension } => self.dimension_unloaded(dimension),
    }
  }
}

/// Marks chunks dirty in response to world changes.
#[derive(Clone)]
pub struct MapEvents {
  tracker: Arc<DirtyRegionTracker>,
  policy: ReloadPolicy,
}

impl MapEvents {
  pub fn new(tracker: Arc<DirtyRegionTracker>, policy: ReloadPolicy) -> Self {
    Self { tracker, policy }
  }

  pub fn policy(&self) -> ReloadPolicy {
    self.policy
  }

  pub fn tracker(&self) -> &Arc<DirtyRegionTracker> {
    &self.tracker
  }

  fn mark_with_successor(&self, dimension: &DimensionId, pos: ChunkPos) {
    self.tracker.mark_dirty(dimension, pos);
    self.tracker.mark_dirty(dimension, pos.scan_successor());
  }
}

impl WorldChangeListener for MapEvents {
  fn chunk_became_resident(&self, dimension: &DimensionId, chunk_x: i32, chunk_z: i32) {
    let pos = ChunkPos::new(chunk_x, chunk_z);
    match self.policy {
      ReloadPolicy::Always => self.mark_with_successor(dimension, pos),
      // The successor's first row may still be shaded against a missing
      // neighbour, so it is marked regardless of policy.
      ReloadPolicy::IfNeverRendered => {
        self.tracker.mark_dirty_if_new(dimension, pos);
        self.tracker.mark_dirty(dimension, pos.scan_successor());
      }
    }
  }

  fn block_changed(&self, dimension: &DimensionId, world_x: i32, world_z: i32) {
    self.mark_with_successor(dimension, ChunkPos::from_block(world_x, world_z));
  }

  fn dimension_unloaded(&self, dimension: &DimensionId) {
    log::debug!("Dropping dirty state for unloaded dimension {dimension}");
    self.tracker.remove_dimension(dimension);
  }
}
