//! Read-only world access consumed by the renderer.
//!
//! The map never loads world data. A [`WorldView`] answers only from what is
//! already resident and reports everything else as absent.

mod memory;

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

pub use memory::MemoryWorld;

use crate::coords::{ChunkPos, DimensionId};
use crate::render::Rgba;

/// How a block's map colour is derived.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TintMethod {
  /// The block's own map colour.
  #[default]
  None,
  /// Same as `None` on the map.
  Stem,
  /// Constant red.
  RedstoneWire,
  DefaultFoliage,
  BirchFoliage,
  EvergreenFoliage,
  DryFoliage,
  Grass,
  /// Water; skipped by the surface scan.
  Water,
}

/// The parts of a block state the map needs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BlockState {
  pub map_color: Rgba,
  pub tint: TintMethod,
}

impl BlockState {
  /// Fully transparent, untinted.
  pub const AIR: Self = Self {
    map_color: Rgba::TRANSPARENT,
    tint: TintMethod::None,
  };

  pub const fn new(map_color: Rgba, tint: TintMethod) -> Self {
    Self { map_color, tint }
  }

  /// A plain block drawn with its own colour.
  pub const fn solid(map_color: Rgba) -> Self {
    Self::new(map_color, TintMethod::None)
  }

  /// A water block carrying `map_color`.
  pub const fn water(map_color: Rgba) -> Self {
    Self::new(map_color, TintMethod::Water)
  }

  pub const fn is_water(&self) -> bool {
    matches!(self.tint, TintMethod::Water)
  }

  /// False for water and for fully transparent untinted blocks.
  pub const fn is_renderable(&self) -> bool {
    !(self.is_water() || (self.map_color.a == 0 && matches!(self.tint, TintMethod::None)))
  }
}

/// Climate and colour data for a biome.
#[derive(Clone, Debug, PartialEq)]
pub struct Biome {
  /// Canonical lower-case identifier, e.g. `"plains"` or `"mangrove_swamp"`.
  pub name: Arc<str>,
  pub temperature: f32,
  pub downfall: f32,
  pub water_color: Rgba,
}

impl Biome {
  pub fn new(name: &str, temperature: f32, downfall: f32, water_color: Rgba) -> Self {
    Self {
      name: name.into(),
      temperature,
      downfall,
      water_color,
    }
  }

  /// Temperate grassland with the default water colour.
  pub fn plains() -> Self {
    Self::new("plains", 0.8, 0.4, Rgba::hex(0x3f76e4))
  }
}

/// A consistent, read-only view of one dimension.
///
/// Every query must answer from resident data only. Implementations are
/// shared across render tasks and must be cheap to call concurrently.
pub trait WorldView: Send + Sync {
  /// Inclusive `(min_y, max_y)` block range of the dimension.
  fn height_range(&self) -> (i32, i32);

  /// True if the chunk's data is resident. Never triggers a load.
  fn is_chunk_resident(&self, pos: ChunkPos) -> bool;

  /// Block at a world position, or `None` if its chunk is not resident.
  fn block_at(&self, x: i32, y: i32, z: i32) -> Option<BlockState>;

  /// Biome at a world position.
  fn biome_at(&self, x: i32, y: i32, z: i32) -> Biome;

  /// Highest interesting block of a resident column, if the world tracks one.
  fn height_map(&self, _x: i32, _z: i32) -> Option<i32> {
    None
  }

  /// True if the block directly above `(x, y, z)` is water.
  fn is_water_above(&self, x: i32, y: i32, z: i32) -> bool {
    y.checked_add(1)
      .and_then(|above| self.block_at(x, above, z))
      .is_some_and(|b| b.is_water())
  }
}

/// Enumerates dimensions and hands out their views.
pub trait WorldSource: Send + Sync {
  /// Dimensions currently loaded.
  fn dimensions(&self) -> Vec<DimensionId>;

  /// View of a loaded dimension.
  fn view(&self, dimension: &DimensionId) -> Option<Arc<dyn WorldView>>;
}

/// A [`WorldSource`] backed by registered views.
#[derive(Default)]
pub struct WorldRegistry {
  views: RwLock<HashMap<DimensionId, Arc<dyn WorldView>>>,
}

impl WorldRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Registers (or replaces) the view for a dimension.
  pub fn insert(&self, dimension: DimensionId, view: Arc<dyn WorldView>) {
    if let Ok(mut views) = self.views.write() {
      views.insert(dimension, view);
    }
  }

  /// Unregisters a dimension, returning its view.
  pub fn remove(&self, dimension: &DimensionId) -> Option<Arc<dyn WorldView>> {
    self.views.write().ok()?.remove(dimension)
  }
}

impl WorldSource for WorldRegistry {
  fn dimensions(&self) -> Vec<DimensionId> {
    let mut dims: Vec<_> = self
      .views
      .read()
      .map(|views| views.keys().cloned().collect())
      .unwrap_or_default();
    dims.sort();
    dims
  }

  fn view(&self, dimension: &DimensionId) -> Option<Arc<dyn WorldView>> {
    self.views.read().ok()?.get(dimension).cloned()
  }
}
