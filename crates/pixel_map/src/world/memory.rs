//! In-memory world for embedding and tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use super::{Biome, BlockState, WorldView};
use crate::coords::{CHUNK_SIZE, ChunkPos};

const COLUMNS: usize = (CHUNK_SIZE * CHUNK_SIZE) as usize;

/// Sparse block columns of one resident chunk.
struct MemoryChunk {
  columns: Vec<BTreeMap<i32, BlockState>>,
}

impl MemoryChunk {
  fn new() -> Self {
    Self {
      columns: vec![BTreeMap::new(); COLUMNS],
    }
  }

  fn column_index(x: i32, z: i32) -> usize {
    let lx = x.rem_euclid(CHUNK_SIZE as i32) as usize;
    let lz = z.rem_euclid(CHUNK_SIZE as i32) as usize;
    lz * CHUNK_SIZE as usize + lx
  }
}

/// A [`WorldView`] holding resident chunks in memory.
///
/// Unset blocks inside a resident chunk are air; blocks in chunks that were
/// never loaded are absent.
pub struct MemoryWorld {
  min_y: i32,
  max_y: i32,
  default_biome: Biome,
  chunks: RwLock<HashMap<ChunkPos, MemoryChunk>>,
  biomes: RwLock<HashMap<(i32, i32), Biome>>,
}

impl MemoryWorld {
  /// Creates an empty world spanning `min_y..=max_y`.
  pub fn new(min_y: i32, max_y: i32, default_biome: Biome) -> Self {
    Self {
      min_y,
      max_y,
      default_biome,
      chunks: RwLock::new(HashMap::new()),
      biomes: RwLock::new(HashMap::new()),
    }
  }

  /// Makes a chunk resident (all air) if it is not already.
  pub fn load_chunk(&self, pos: ChunkPos) {
    if let Ok(mut chunks) = self.chunks.write() {
      chunks.entry(pos).or_insert_with(MemoryChunk::new);
    }
  }

  /// Drops a chunk's data. Returns `true` if it was resident.
  pub fn unload_chunk(&self, pos: ChunkPos) -> bool {
    self
      .chunks
      .write()
      .map(|mut chunks| chunks.remove(&pos).is_some())
      .unwrap_or(false)
  }

  /// Sets a block, making its chunk resident. Out-of-range `y` is ignored.
  pub fn set_block(&self, x: i32, y: i32, z: i32, state: BlockState) {
    if y < self.min_y || y > self.max_y {
      return;
    }
    let Ok(mut chunks) = self.chunks.write() else {
      return;
    };
    let chunk = chunks
      .entry(ChunkPos::from_block(x, z))
      .or_insert_with(MemoryChunk::new);
    let column = &mut chunk.columns[MemoryChunk::column_index(x, z)];
    if state == BlockState::AIR {
      column.remove(&y);
    } else {
      column.insert(y, state);
    }
  }

  /// Fills `from_y..=to_y` of a column.
  pub fn fill_column(&self, x: i32, z: i32, from_y: i32, to_y: i32, state: BlockState) {
    for y in from_y..=to_y {
      self.set_block(x, y, z, state);
    }
  }

  /// Places `state` at height `y` across every column of a chunk.
  pub fn fill_chunk_layer(&self, pos: ChunkPos, y: i32, state: BlockState) {
    for dz in 0..CHUNK_SIZE as i32 {
      for dx in 0..CHUNK_SIZE as i32 {
        self.set_block(pos.min_block_x() + dx, y, pos.min_block_z() + dz, state);
      }
    }
  }

  /// Overrides the biome of a block column.
  pub fn set_biome(&self, x: i32, z: i32, biome: Biome) {
    if let Ok(mut biomes) = self.biomes.write() {
      biomes.insert((x, z), biome);
    }
  }
}

impl WorldView for MemoryWorld {
  fn height_range(&self) -> (i32, i32) {
    (self.min_y, self.max_y)
  }

  fn is_chunk_resident(&self, pos: ChunkPos) -> bool {
    self
      .chunks
      .read()
      .map(|chunks| chunks.contains_key(&pos))
      .unwrap_or(false)
  }

  fn block_at(&self, x: i32, y: i32, z: i32) -> Option<BlockState> {
    let chunks = self.chunks.read().ok()?;
    let chunk = chunks.get(&ChunkPos::from_block(x, z))?;
    let column = &chunk.columns[MemoryChunk::column_index(x, z)];
    Some(column.get(&y).copied().unwrap_or(BlockState::AIR))
  }

  fn biome_at(&self, x: i32, _y: i32, z: i32) -> Biome {
    self
      .biomes
      .read()
      .ok()
      .and_then(|biomes| biomes.get(&(x, z)).cloned())
      .unwrap_or_else(|| self.default_biome.clone())
  }

  fn height_map(&self, x: i32, z: i32) -> Option<i32> {
    let chunks = self.chunks.read().ok()?;
    let chunk = chunks.get(&ChunkPos::from_block(x, z))?;
    chunk.columns[MemoryChunk::column_index(x, z)]
      .keys()
      .next_back()
      .copied()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::render::Rgba;

  #[test]
  fn absent_outside_resident_chunks() {
    let world = MemoryWorld::new(-64, 320, Biome::plains());
    assert_eq!(world.block_at(0, 0, 0), None);
    world.load_chunk(ChunkPos::new(0, 0));
    assert_eq!(world.block_at(0, 0, 0), Some(BlockState::AIR));
    assert_eq!(world.block_at(16, 0, 0), None);
  }

  #[test]
  fn negative_coordinates_map_to_their_chunk() {
    let world = MemoryWorld::new(0, 255, Biome::plains());
    let stone = BlockState::solid(Rgba::hex(0x707070));
    world.set_block(-1, 10, -17, stone);
    assert!(world.is_chunk_resident(ChunkPos::new(-1, -2)));
    assert_eq!(world.block_at(-1, 10, -17), Some(stone));
    assert_eq!(world.height_map(-1, -17), Some(10));
  }

  #[test]
  fn water_above_is_detected() {
    let world = MemoryWorld::new(0, 255, Biome::plains());
    world.set_block(0, 5, 0, BlockState::solid(Rgba::hex(0x707070)));
    world.set_block(0, 6, 0, BlockState::water(Rgba::hex(0x4040ff)));
    assert!(world.is_water_above(0, 5, 0));
    assert!(!world.is_water_above(0, 6, 0));
  }
}
