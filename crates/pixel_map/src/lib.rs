//! Live, zoomable raster map of a voxel world.
//!
//! World change notifications mark chunks dirty ([`dirty`], [`events`]). A
//! periodic sweep renders dirty chunks into 16×16 tiles in the vanilla map
//! style ([`render`]) and persists them as PNGs ([`persistence`]). Tile
//! queries are answered from in-flight work or storage, and higher zoom
//! levels are composed on demand ([`orchestrator`]).
//!
//! # Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use pixel_map::prelude::*;
//!
//! let world = Arc::new(WorldRegistry::new());
//! let context = MapContext::open(MapConfig::default(), world.clone()).unwrap();
//!
//! let dim = DimensionId::new("world", "overworld");
//! context.events().chunk_became_resident(&dim, 0, 0);
//! context.tick();
//! let tile = bevy::tasks::block_on(context.get_tile(&dim, 0, 0, 0));
//! assert_eq!(tile.size(), 16);
//! ```

pub mod config;
pub mod context;
pub mod coords;
pub mod diagnostics;
pub mod dirty;
pub mod events;
pub mod orchestrator;
pub mod persistence;
pub mod primitives;
pub mod render;
pub mod tasks;
pub mod world;

pub use config::{ConfigError, MapConfig};
pub use context::{MapContext, MapError};
pub use coords::{CHUNK_SIZE, ChunkKey, ChunkPos, DimensionId, MAX_ZOOM, TileKey, tile_size};
#[cfg(feature = "tracy")]
pub use diagnostics::init_tracy;
pub use diagnostics::MapStats;
pub use dirty::{DirtyBatch, DirtyRegionTracker};
pub use events::{MapEvents, ReloadPolicy, WorldChangeListener, WorldEvent};
pub use orchestrator::{TaskCounts, TileError, TileOrchestrator};
pub use persistence::{BackendError, NativeTileStore, TileStore};
pub use primitives::{RgbaSurface, Surface, Tile, UNLOADED_COLOR};
pub use render::{Colormaps, RenderOptions, Rgba, TileRenderer};
pub use world::{Biome, BlockState, MemoryWorld, TintMethod, WorldRegistry, WorldSource, WorldView};

pub mod prelude {
  pub use crate::{
    Biome, BlockState, ChunkPos, DimensionId, MapConfig, MapContext, MemoryWorld, Rgba, Tile,
    TileKey, TintMethod, WorldChangeListener, WorldRegistry, WorldSource, WorldView,
  };
}
