//! Tile cache and zoom pyramid.
//!
//! The orchestrator owns two single-flight tables keyed by zoom-0
//! [`TileKey`]: one for render-and-persist tasks started by
//! [`process_dirty`](TileOrchestrator::process_dirty), one for loads of
//! persisted tiles started by [`get_tile`](TileOrchestrator::get_tile).
//! Higher zoom levels are composed from their four children on demand and
//! never stored.
//!
//! Every failure degrades to an [`UNLOADED_COLOR`](crate::primitives::UNLOADED_COLOR)
//! sentinel tile plus a log record.

use std::any::Any;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use bevy::tasks::{AsyncComputeTaskPool, IoTaskPool};
use log::{debug, error, info, warn};
use web_time::Instant;

use crate::coords::{ChunkKey, ChunkPos, DimensionId, TileKey};
use crate::dirty::DirtyRegionTracker;
use crate::persistence::{BoxFuture, TileStore, decode_png, encode_png};
use crate::primitives::Tile;
use crate::render::TileRenderer;
use crate::tasks::{Abandoned, Entry, InFlight, SharedTask, init_task_pools, join_all};
use crate::world::{WorldSource, WorldView};

/// Why a zoom-0 task produced no tile.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TileError {
  /// The renderer panicked.
  Render(Arc<str>),
  /// The producing task went away without a result.
  Abandoned,
}

impl fmt::Display for TileError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Render(msg) => write!(f, "render failed: {msg}"),
      Self::Abandoned => write!(f, "{}", Abandoned),
    }
  }
}

impl std::error::Error for TileError {}

impl From<Abandoned> for TileError {
  fn from(_: Abandoned) -> Self {
    Self::Abandoned
  }
}

type TileResult = Result<Tile, TileError>;

/// Counters exposed for status reporting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TaskCounts {
  pub rendering: usize,
  pub loading: usize,
  /// Renders started since construction.
  pub renders_started: u64,
  /// Renders that ended in failure since construction.
  pub renders_failed: u64,
}

struct Inner {
  world: Arc<dyn WorldSource>,
  store: Arc<dyn TileStore>,
  tracker: Arc<DirtyRegionTracker>,
  renderer: RwLock<Arc<TileRenderer>>,
  rendering: InFlight<TileKey, TileResult>,
  loading: InFlight<TileKey, TileResult>,
  renders_started: AtomicU64,
  renders_failed: AtomicU64,
}

/// Drives re-rendering and answers tile queries.
///
/// Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct TileOrchestrator {
  inner: Arc<Inner>,
}

impl TileOrchestrator {
  pub fn new(
    world: Arc<dyn WorldSource>,
    store: Arc<dyn TileStore>,
    tracker: Arc<DirtyRegionTracker>,
    renderer: TileRenderer,
  ) -> Self {
    init_task_pools();
    Self {
      inner: Arc::new(Inner {
        world,
        store,
        tracker,
        renderer: RwLock::new(Arc::new(renderer)),
        rendering: InFlight::new(),
        loading: InFlight::new(),
        renders_started: AtomicU64::new(0),
        renders_failed: AtomicU64::new(0),
      }),
    }
  }

  pub fn tracker(&self) -> &Arc<DirtyRegionTracker> {
    &self.inner.tracker
  }

  /// Replaces the renderer used by renders started from now on.
  pub fn set_renderer(&self, renderer: TileRenderer) {
    *self
      .inner
      .renderer
      .write()
      .unwrap_or_else(PoisonError::into_inner) = Arc::new(renderer);
  }

  fn renderer(&self) -> Arc<TileRenderer> {
    Arc::clone(
      &self
        .inner
        .renderer
        .read()
        .unwrap_or_else(PoisonError::into_inner),
    )
  }

  /// Drains every dimension's dirty chunks and starts a render for each.
  ///
  /// Keys already being rendered are skipped; the running task covers them.
  /// Returns the number of renders started. Must not run concurrently with
  /// itself.
  #[cfg_attr(feature = "tracy", tracing::instrument(skip_all))]
  pub fn process_dirty(&self) -> usize {
    let start = Instant::now();
    let mut started = 0;
    for dimension in self.inner.world.dimensions() {
      let batch = self.inner.tracker.drain(&dimension);
      if batch.is_empty() {
        continue;
      }
      let Some(view) = self.inner.world.view(&dimension) else {
        debug!("Dropping {} dirty chunks of missing dimension {dimension}", batch.len());
        continue;
      };
      info!("Processing {} dirty chunks in {dimension}", batch.len());
      let renderer = self.renderer();
      for pos in batch {
        let key = ChunkKey::new(dimension.clone(), pos);
        if self.spawn_render(key, Arc::clone(&view), Arc::clone(&renderer)) {
          started += 1;
        }
      }
    }
    debug!(
      "Dirty sweep started {started} renders in {:.2?}",
      start.elapsed()
    );
    started
  }

  fn spawn_render(
    &self,
    key: ChunkKey,
    view: Arc<dyn WorldView>,
    renderer: Arc<TileRenderer>,
  ) -> bool {
    let tile_key = TileKey::base(&key);
    let Entry::Created(producer) = self.inner.rendering.join_or_create(tile_key) else {
      return false;
    };
    self.inner.renders_started.fetch_add(1, Ordering::Relaxed);
    let this = self.clone();
    AsyncComputeTaskPool::get()
      .spawn(async move {
        let result = this.render_and_persist(&key, &*view, &renderer).await;
        if result.is_err() {
          this.inner.renders_failed.fetch_add(1, Ordering::Relaxed);
        }
        producer.finish(result);
      })
      .detach();
    true
  }

  async fn render_and_persist(
    &self,
    key: &ChunkKey,
    view: &dyn WorldView,
    renderer: &TileRenderer,
  ) -> TileResult {
    let tile_key = TileKey::base(key);
    let rendered = catch_unwind(AssertUnwindSafe(|| {
      view
        .is_chunk_resident(key.pos)
        .then(|| renderer.render_chunk(view, key.pos))
    }));

    let tile = match rendered {
      Ok(Some(tile)) => tile,
      // Keep whatever is stored rather than overwrite it with a sentinel.
      Ok(None) => {
        debug!(
          "Chunk {} of {} is not resident, keeping stored tile",
          key.pos, key.dimension
        );
        let store = Arc::clone(&self.inner.store);
        let tile = IoTaskPool::get()
          .spawn(async move { load_stored(store.as_ref(), &tile_key).await })
          .await;
        return Ok(tile);
      }
      Err(panic) => {
        let msg = panic_message(panic.as_ref());
        error!("Failed to render chunk {} of {}: {msg}", key.pos, key.dimension);
        return Err(TileError::Render(msg.into()));
      }
    };

    let bytes = match encode_png(&tile) {
      Ok(bytes) => bytes,
      Err(e) => {
        error!("Failed to encode tile {tile_key}: {e}");
        return Ok(tile);
      }
    };
    let store = Arc::clone(&self.inner.store);
    let write_key = tile_key.clone();
    let written = IoTaskPool::get()
      .spawn(async move { store.write(&write_key, bytes).await })
      .await;
    match written {
      Ok(()) => self.inner.tracker.mark_rendered(&key.dimension, key.pos),
      Err(e) => error!("Failed to save tile {tile_key}: {e}"),
    }
    Ok(tile)
  }

  /// Fetches a tile.
  ///
  /// Zoom 0 reuses an in-flight render or load for the key, else loads the
  /// stored tile on the I/O pool; an absent tile resolves to the sentinel
  /// without a read. Higher zoom levels compose their four children and are
  /// never stored. The returned tile always has side `16 << zoom`.
  ///
  /// Zoom is not validated here. A zoom-`n` request builds `4^n` zoom-0
  /// fetches before its first await, so the query boundary must cap zoom at
  /// [`MAX_ZOOM`](crate::coords::MAX_ZOOM).
  pub fn get_tile(
    &self,
    dimension: &DimensionId,
    x: i32,
    z: i32,
    zoom: u8,
  ) -> BoxFuture<'static, Tile> {
    let key = TileKey::new(dimension.clone(), zoom, x, z);
    debug!("Tile request {key}");
    self.fetch(key)
  }

  fn fetch(&self, key: TileKey) -> BoxFuture<'static, Tile> {
    if key.zoom > 0 {
      return self.compose(key);
    }
    let zoom = key.zoom;
    let task = self.base_task(key.clone());
    Box::pin(async move {
      match task.wait().await.map_err(TileError::from).and_then(|r| r) {
        Ok(tile) => tile,
        Err(e) => {
          warn!("Tile {key} unavailable: {e}");
          Tile::unloaded(zoom)
        }
      }
    })
  }

  /// The render or load task answering a zoom-0 key, started if needed.
  fn base_task(&self, key: TileKey) -> SharedTask<TileResult> {
    if let Some(task) = self.inner.rendering.get(&key) {
      return task;
    }
    let producer = match self.inner.loading.join_or_create(key) {
      Entry::Joined(task) => return task,
      Entry::Created(producer) => producer,
    };
    let task = producer.task();
    let store = Arc::clone(&self.inner.store);
    IoTaskPool::get()
      .spawn(async move {
        let tile = load_stored(store.as_ref(), producer.key()).await;
        producer.finish(Ok(tile));
      })
      .detach();
    task
  }

  #[cfg_attr(feature = "tracy", tracing::instrument(skip_all))]
  fn compose(&self, key: TileKey) -> BoxFuture<'static, Tile> {
    let zoom = key.zoom;
    let Some(children) = key.children() else {
      return Box::pin(std::future::ready(Tile::unloaded(zoom)));
    };
    let pool = AsyncComputeTaskPool::get();
    let tasks = children
      .into_iter()
      .map(|child| pool.spawn(self.fetch(child)))
      .collect();
    Box::pin(async move {
      let tiles = join_all(tasks).await;
      match <[Tile; 4]>::try_from(tiles) {
        Ok(tiles) if tiles.iter().all(|t| t.zoom() + 1 == zoom) => Tile::compose(zoom, &tiles),
        _ => {
          error!("Failed to compose tile {key}");
          Tile::unloaded(zoom)
        }
      }
    })
  }

  /// Waits for every in-flight render and load, including ones started
  /// while waiting.
  pub async fn wait_idle(&self) {
    loop {
      let mut pending = self.inner.rendering.snapshot();
      pending.extend(self.inner.loading.snapshot());
      if pending.is_empty() {
        return;
      }
      for task in pending {
        let _ = task.wait().await;
      }
    }
  }

  /// Waits for in-flight work, then forgets all dirty state and deletes
  /// every stored tile.
  ///
  /// Callers must keep [`process_dirty`](Self::process_dirty) and
  /// [`get_tile`](Self::get_tile) from running concurrently.
  pub async fn clear_cache(&self) {
    let rendering = self.inner.rendering.len();
    let loading = self.inner.loading.len();
    if rendering > 0 || loading > 0 {
      info!("Waiting for {rendering} rendering and {loading} loading tasks before clearing cache");
    }
    self.wait_idle().await;
    self.inner.tracker.clear();
    let store = Arc::clone(&self.inner.store);
    let deleted = IoTaskPool::get()
      .spawn(async move { store.delete_all().await })
      .await;
    match deleted {
      Ok(()) => info!("Tile cache cleared"),
      Err(e) => error!("Failed to clear tile cache: {e}"),
    }
  }

  pub fn task_counts(&self) -> TaskCounts {
    TaskCounts {
      rendering: self.inner.rendering.len(),
      loading: self.inner.loading.len(),
      renders_started: self.inner.renders_started.load(Ordering::Relaxed),
      renders_failed: self.inner.renders_failed.load(Ordering::Relaxed),
    }
  }

  /// True if a render is in flight for the chunk.
  pub fn is_rendering(&self, dimension: &DimensionId, pos: ChunkPos) -> bool {
    let key = TileKey::new(dimension.clone(), 0, pos.x, pos.z);
    self.inner.rendering.get(&key).is_some()
  }
}

/// Reads and decodes a stored zoom-0 tile; anything short of success yields
/// the sentinel.
async fn load_stored(store: &dyn TileStore, key: &TileKey) -> Tile {
  match store.exists(key).await {
    Ok(true) => {}
    Ok(false) => return Tile::unloaded(key.zoom),
    Err(e) => {
      warn!("Failed to check tile {key}: {e}");
      return Tile::unloaded(key.zoom);
    }
  }
  let bytes = match store.read(key).await {
    Ok(bytes) => bytes,
    Err(e) => {
      warn!("Failed to read tile {key}: {e}");
      return Tile::unloaded(key.zoom);
    }
  };
  decode_png(&bytes, key.zoom).unwrap_or_else(|e| {
    warn!("Failed to decode tile {key}: {e}");
    Tile::unloaded(key.zoom)
  })
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
  if let Some(s) = panic.downcast_ref::<&str>() {
    (*s).to_string()
  } else if let Some(s) = panic.downcast_ref::<String>() {
    s.clone()
  } else {
    "unknown panic".to_string()
  }
}
