//! The map engine wired together.
//!
//! [`MapContext`] is built once at startup and owns the tracker,
//! renderer and orchestrator. The host drives it: world notifications go to
//! [`events`](MapContext::events), the scheduler calls
//! [`tick`](MapContext::tick) every [`update_interval`](MapContext::update_interval),
//! and the query boundary calls [`get_tile`](MapContext::get_tile).

use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use log::info;

use crate::config::{ConfigError, MapConfig};
use crate::coords::DimensionId;
use crate::diagnostics::MapStats;
use crate::dirty::DirtyRegionTracker;
use crate::events::MapEvents;
use crate::orchestrator::TileOrchestrator;
use crate::persistence::{
  BackendError, BoxFuture, CodecError, NativeTileStore, TileStore, encode_png,
};
use crate::primitives::Tile;
use crate::render::{AssetError, AssetProvider, Colormaps, DirAssetProvider, TileRenderer};
use crate::world::WorldSource;

/// Error type for building a [`MapContext`].
#[derive(Debug)]
pub enum MapError {
  Config(ConfigError),
  Asset(AssetError),
  Store(BackendError),
}

impl fmt::Display for MapError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Config(e) => write!(f, "config: {e}"),
      Self::Asset(e) => write!(f, "assets: {e}"),
      Self::Store(e) => write!(f, "tile store: {e}"),
    }
  }
}

impl Error for MapError {
  fn source(&self) -> Option<&(dyn Error + 'static)> {
    match self {
      Self::Config(e) => Some(e),
      Self::Asset(e) => Some(e),
      Self::Store(e) => Some(e),
    }
  }
}

impl From<ConfigError> for MapError {
  fn from(err: ConfigError) -> Self {
    Self::Config(err)
  }
}

impl From<AssetError> for MapError {
  fn from(err: AssetError) -> Self {
    Self::Asset(err)
  }
}

impl From<BackendError> for MapError {
  fn from(err: BackendError) -> Self {
    Self::Store(err)
  }
}

/// Explicit owner of all map state.
pub struct MapContext {
  config: MapConfig,
  colormaps: Colormaps,
  events: MapEvents,
  orchestrator: TileOrchestrator,
}

impl MapContext {
  /// Builds a context storing tiles under `config.tiles_dir` and reading
  /// colormaps from `config.assets_dir`.
  pub fn open(config: MapConfig, world: Arc<dyn WorldSource>) -> Result<Self, MapError> {
    let assets = DirAssetProvider::new(&config.assets_dir);
    let store = NativeTileStore::new(&config.tiles_dir).map_err(BackendError::from)?;
    Self::new(config, world, &assets, Arc::new(store))
  }

  /// Builds a context from explicit collaborators.
  pub fn new(
    config: MapConfig,
    world: Arc<dyn WorldSource>,
    assets: &dyn AssetProvider,
    store: Arc<dyn TileStore>,
  ) -> Result<Self, MapError> {
    config.validate()?;
    let colormaps = Colormaps::load(assets)?;
    info!("Colormaps loaded");
    Ok(Self::with_colormaps(config, world, colormaps, store))
  }

  /// Builds a context with colormaps already in hand.
  pub fn with_colormaps(
    config: MapConfig,
    world: Arc<dyn WorldSource>,
    colormaps: Colormaps,
    store: Arc<dyn TileStore>,
  ) -> Self {
    let tracker = Arc::new(DirtyRegionTracker::new());
    let renderer = TileRenderer::new(colormaps.clone(), config.render_options());
    let orchestrator = TileOrchestrator::new(world, store, Arc::clone(&tracker), renderer);
    let events = MapEvents::new(tracker, config.reload_policy);
    Self {
      config,
      colormaps,
      events,
      orchestrator,
    }
  }

  pub fn config(&self) -> &MapConfig {
    &self.config
  }

  /// Handler for world change notifications.
  pub fn events(&self) -> &MapEvents {
    &self.events
  }

  pub fn orchestrator(&self) -> &TileOrchestrator {
    &self.orchestrator
  }

  pub fn tracker(&self) -> &Arc<DirtyRegionTracker> {
    self.orchestrator.tracker()
  }

  /// How often the host should call [`tick`](Self::tick).
  pub fn update_interval(&self) -> Duration {
    self.config.update_interval()
  }

  /// Runs one dirty sweep. Returns the number of renders started.
  pub fn tick(&self) -> usize {
    self.orchestrator.process_dirty()
  }

  /// Fetches a tile; see [`TileOrchestrator::get_tile`].
  pub fn get_tile(
    &self,
    dimension: &DimensionId,
    x: i32,
    z: i32,
    zoom: u8,
  ) -> BoxFuture<'static, Tile> {
    self.orchestrator.get_tile(dimension, x, z, zoom)
  }

  /// Fetches a tile and encodes it as PNG for transport.
  pub async fn tile_png(
    &self,
    dimension: &DimensionId,
    x: i32,
    z: i32,
    zoom: u8,
  ) -> Result<Vec<u8>, CodecError> {
    let tile = self.get_tile(dimension, x, z, zoom).await;
    encode_png(&tile)
  }

  /// Applies a new configuration and clears the tile cache.
  ///
  /// The tile store and asset location are fixed at construction; the
  /// remaining settings take effect for renders started after this call.
  /// Must not overlap [`tick`](Self::tick) or tile queries.
  pub async fn reload(&mut self, config: MapConfig) -> Result<(), MapError> {
    config.validate()?;
    let renderer = TileRenderer::new(self.colormaps.clone(), config.render_options());
    self.orchestrator.clear_cache().await;
    self.orchestrator.set_renderer(renderer);
    self.events = MapEvents::new(Arc::clone(self.tracker()), config.reload_policy);
    self.config = config;
    info!("Map reloaded");
    Ok(())
  }

  pub fn stats(&self) -> MapStats {
    let counts = self.orchestrator.task_counts();
    let tracker = self.tracker();
    MapStats {
      rendering: counts.rendering,
      loading: counts.loading,
      dirty_dimensions: tracker.dirty_dimension_count(),
      dirty_chunks: tracker.dirty_chunk_count(),
      renders_started: counts.renders_started,
      renders_failed: counts.renders_failed,
    }
  }
}
