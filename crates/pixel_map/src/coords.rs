//! Coordinate types and spatial constants.
//!
//! Defines the coordinate system for the map:
//! - [`DimensionId`]: Identity of an independent world space
//! - [`ChunkPos`]: Chunk grid position (i32), packable into a `u64` set key
//! - [`ChunkKey`]: Chunk position qualified by dimension
//! - [`TileKey`]: Zoom pyramid address; zoom 0 maps 1:1 to a chunk

use std::fmt;
use std::sync::Arc;

/// Size of a chunk in blocks along each horizontal axis.
pub const CHUNK_SIZE: u32 = 16;

/// Shift converting block coordinates to chunk coordinates.
pub const CHUNK_SHIFT: u32 = 4;

/// Deepest zoom level the query boundary should request.
///
/// Nothing in this crate enforces it; callers validate zoom before
/// [`TileOrchestrator::get_tile`](crate::orchestrator::TileOrchestrator::get_tile).
pub const MAX_ZOOM: u8 = 5;

/// Returns the pixel side length of a tile at `zoom`.
pub const fn tile_size(zoom: u8) -> u32 {
  CHUNK_SIZE << zoom
}

/// Identity of a dimension.
///
/// Rendered as `<world>_<dimension>`; the name doubles as the directory
/// under the tile store root, so path separators are replaced.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DimensionId(Arc<str>);

impl DimensionId {
  /// Creates an id from a world name and a dimension name.
  pub fn new(world: &str, dimension: &str) -> Self {
    Self::from_name(&format!("{world}_{dimension}"))
  }

  /// Creates an id from an already-joined name.
  pub fn from_name(name: &str) -> Self {
    let sanitized: String = name
      .chars()
      .map(|c| match c {
        '/' | '\\' | ':' => '_',
        c => c,
      })
      .collect();
    Self(sanitized.into())
  }

  /// Directory name used by the tile store.
  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for DimensionId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Position in the chunk grid.
///
/// Each chunk spans [`CHUNK_SIZE`] blocks along x and z.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkPos {
  pub x: i32,
  pub z: i32,
}

impl ChunkPos {
  /// Creates a new chunk position.
  pub const fn new(x: i32, z: i32) -> Self {
    Self { x, z }
  }

  /// Returns the chunk containing block column `(block_x, block_z)`.
  ///
  /// Arithmetic shift rounds toward negative infinity.
  pub const fn from_block(block_x: i32, block_z: i32) -> Self {
    Self::new(block_x >> CHUNK_SHIFT, block_z >> CHUNK_SHIFT)
  }

  /// Packs into a single key: x in the high half, z in the low half.
  pub const fn pack(self) -> u64 {
    ((self.x as u32 as u64) << 32) | (self.z as u32 as u64)
  }

  /// Inverse of [`pack`](Self::pack).
  pub const fn unpack(key: u64) -> Self {
    Self::new((key >> 32) as u32 as i32, key as u32 as i32)
  }

  /// World block x of this chunk's first column.
  pub const fn min_block_x(self) -> i32 {
    self.x << CHUNK_SHIFT
  }

  /// World block z of this chunk's first row.
  pub const fn min_block_z(self) -> i32 {
    self.z << CHUNK_SHIFT
  }

  /// The chunk following this one along the scan axis (z + 1).
  ///
  /// Its first row is shaded against this chunk's last row.
  pub const fn scan_successor(self) -> Self {
    Self::new(self.x, self.z.wrapping_add(1))
  }
}

impl fmt::Display for ChunkPos {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "({}, {})", self.x, self.z)
  }
}

/// Chunk position qualified by dimension.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ChunkKey {
  pub dimension: DimensionId,
  pub pos: ChunkPos,
}

impl ChunkKey {
  pub fn new(dimension: DimensionId, pos: ChunkPos) -> Self {
    Self { dimension, pos }
  }
}

/// Address of a tile in the zoom pyramid.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TileKey {
  pub dimension: DimensionId,
  pub zoom: u8,
  pub x: i32,
  pub z: i32,
}

impl TileKey {
  pub fn new(dimension: DimensionId, zoom: u8, x: i32, z: i32) -> Self {
    Self {
      dimension,
      zoom,
      x,
      z,
    }
  }

  /// The zoom-0 tile for a chunk.
  pub fn base(key: &ChunkKey) -> Self {
    Self::new(key.dimension.clone(), 0, key.pos.x, key.pos.z)
  }

  /// Pixel side length of this tile.
  pub fn size(&self) -> u32 {
    tile_size(self.zoom)
  }

  /// The four zoom-(n-1) children in quadrant order:
  /// top-left, top-right, bottom-left, bottom-right.
  ///
  /// Returns `None` at zoom 0.
  pub fn children(&self) -> Option<[TileKey; 4]> {
    let zoom = self.zoom.checked_sub(1)?;
    let x = self.x.wrapping_mul(2);
    let z = self.z.wrapping_mul(2);
    let child = |dx: i32, dz: i32| {
      TileKey::new(
        self.dimension.clone(),
        zoom,
        x.wrapping_add(dx),
        z.wrapping_add(dz),
      )
    };
    Some([child(0, 0), child(1, 0), child(0, 1), child(1, 1)])
  }
}

impl fmt::Display for TileKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}/{}_{}", self.dimension, self.zoom, self.x, self.z)
  }
}
