//! End-to-end tests for the tile orchestrator.
//!
//! Uses a real filesystem store in a temporary directory and an in-memory
//! world.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bevy::tasks::block_on;
use pixel_map::persistence::{BackendError, BoxFuture, TileStore};
use pixel_map::render::SEA_LEVEL;
use pixel_map::tasks::IO_THREAD_NAME;
use pixel_map::*;
use tempfile::TempDir;

const RED: Rgba = Rgba::rgb(200, 40, 40);
const GREEN: Rgba = Rgba::rgb(40, 200, 40);
const BLUE: Rgba = Rgba::rgb(40, 40, 200);
const WHITE: Rgba = Rgba::rgb(230, 230, 230);

fn dim() -> DimensionId {
  DimensionId::new("world", "overworld")
}

fn renderer() -> TileRenderer {
  let maps = Colormaps::uniform(Rgba::hex(0x00ff00), Rgba::hex(0x008000), Rgba::hex(0x808000));
  TileRenderer::new(maps, RenderOptions::default())
}

struct Harness {
  _dir: TempDir,
  root: std::path::PathBuf,
  world: Arc<MemoryWorld>,
  orchestrator: TileOrchestrator,
}

impl Harness {
  fn new() -> Self {
    Self::with_view(None)
  }

  /// Uses `view` for the dimension instead of the memory world.
  fn with_view(view: Option<Arc<dyn WorldView>>) -> Self {
    Self::build(view, |store| Arc::new(store))
  }

  /// Wraps the temp-dir store before handing it to the orchestrator.
  fn with_store(wrap: impl FnOnce(NativeTileStore) -> Arc<dyn TileStore>) -> Self {
    Self::build(None, wrap)
  }

  fn build(
    view: Option<Arc<dyn WorldView>>,
    wrap: impl FnOnce(NativeTileStore) -> Arc<dyn TileStore>,
  ) -> Self {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("tiles");
    let world = Arc::new(MemoryWorld::new(-64, 319, Biome::plains()));
    let registry = Arc::new(WorldRegistry::new());
    let world_view: Arc<dyn WorldView> = world.clone();
    registry.insert(dim(), view.unwrap_or(world_view));
    let store = wrap(NativeTileStore::new(&root).unwrap());
    let orchestrator = TileOrchestrator::new(
      registry,
      store,
      Arc::new(DirtyRegionTracker::new()),
      renderer(),
    );
    Self {
      _dir: dir,
      root,
      world,
      orchestrator,
    }
  }

  fn paint(&self, pos: ChunkPos, color: Rgba) {
    self
      .world
      .fill_chunk_layer(pos, SEA_LEVEL, BlockState::solid(color));
  }

  fn mark(&self, pos: ChunkPos) {
    self.orchestrator.tracker().mark_dirty(&dim(), pos);
  }

  fn sweep(&self) -> usize {
    let started = self.orchestrator.process_dirty();
    block_on(self.orchestrator.wait_idle());
    started
  }

  fn tile(&self, x: i32, z: i32, zoom: u8) -> Tile {
    block_on(self.orchestrator.get_tile(&dim(), x, z, zoom))
  }

  fn tile_path(&self, x: i32, z: i32) -> std::path::PathBuf {
    self.root.join("world_overworld").join("0").join(format!("{x}_{z}.png"))
  }
}

#[test]
fn rendered_tile_is_persisted_and_served() {
  let h = Harness::new();
  h.paint(ChunkPos::new(2, -3), RED);
  h.mark(ChunkPos::new(2, -3));

  assert_eq!(h.sweep(), 1);
  assert!(h.tile_path(2, -3).is_file());

  let tile = h.tile(2, -3, 0);
  assert_eq!(tile.size(), 16);
  assert!(tile.is_uniform(RED));
  assert!(h.orchestrator.tracker().is_rendered(&dim(), ChunkPos::new(2, -3)));
}

#[test]
fn uncached_tile_is_sentinel() {
  let h = Harness::new();
  let tile = h.tile(40, 40, 0);
  assert!(tile.is_uniform(UNLOADED_COLOR));
  assert!(!h.tile_path(40, 40).exists());
  assert_eq!(h.orchestrator.task_counts().loading, 0);
}

#[test]
fn sweep_with_nothing_dirty_does_nothing() {
  let h = Harness::new();
  assert_eq!(h.sweep(), 0);
  assert_eq!(h.orchestrator.task_counts(), TaskCounts::default());
}

/// Blocks the first residency check of chunk (0, 0) until released.
struct GatedView {
  inner: Arc<MemoryWorld>,
  gate: async_channel::Receiver<()>,
  entered: AtomicUsize,
}

impl WorldView for GatedView {
  fn height_range(&self) -> (i32, i32) {
    self.inner.height_range()
  }

  fn is_chunk_resident(&self, pos: ChunkPos) -> bool {
    if pos == ChunkPos::new(0, 0) {
      self.entered.fetch_add(1, Ordering::SeqCst);
      // Returns once the sender is dropped.
      let _ = self.gate.recv_blocking();
    }
    self.inner.is_chunk_resident(pos)
  }

  fn block_at(&self, x: i32, y: i32, z: i32) -> Option<BlockState> {
    self.inner.block_at(x, y, z)
  }

  fn biome_at(&self, x: i32, y: i32, z: i32) -> Biome {
    self.inner.biome_at(x, y, z)
  }
}

#[test]
fn concurrent_requests_share_one_render() {
  let (release, gate) = async_channel::bounded::<()>(1);
  let world = Arc::new(MemoryWorld::new(-64, 319, Biome::plains()));
  let view = Arc::new(GatedView {
    inner: world.clone(),
    gate,
    entered: AtomicUsize::new(0),
  });
  let h = Harness::with_view(Some(view.clone()));
  world.fill_chunk_layer(ChunkPos::new(0, 0), SEA_LEVEL, BlockState::solid(BLUE));

  h.mark(ChunkPos::new(0, 0));
  assert_eq!(h.orchestrator.process_dirty(), 1);
  assert!(h.orchestrator.is_rendering(&dim(), ChunkPos::new(0, 0)));

  // Re-marking while in flight does not start a second render.
  h.mark(ChunkPos::new(0, 0));
  assert_eq!(h.orchestrator.process_dirty(), 0);

  let requests: Vec<_> = (0..8)
    .map(|_| h.orchestrator.get_tile(&dim(), 0, 0, 0))
    .collect();
  assert_eq!(h.orchestrator.task_counts().loading, 0);

  drop(release);
  let waiters: Vec<_> = requests
    .into_iter()
    .map(|fut| std::thread::spawn(move || block_on(fut)))
    .collect();
  let tiles: Vec<Tile> = waiters.into_iter().map(|w| w.join().unwrap()).collect();

  assert_eq!(h.orchestrator.task_counts().renders_started, 1);
  assert!(tiles[0].is_uniform(BLUE));
  assert!(tiles.iter().all(|t| t.ptr_eq(&tiles[0])));

  block_on(h.orchestrator.wait_idle());
  assert_eq!(h.orchestrator.task_counts().rendering, 0);
  assert!(view.entered.load(Ordering::SeqCst) >= 1);
}

#[test]
fn zoom_quadrants_match_children() {
  let h = Harness::new();
  let colors = [
    (ChunkPos::new(0, 0), RED),
    (ChunkPos::new(1, 0), GREEN),
    (ChunkPos::new(0, 1), BLUE),
    (ChunkPos::new(1, 1), WHITE),
  ];
  for (pos, color) in colors {
    h.paint(pos, color);
    h.mark(pos);
  }
  assert_eq!(h.sweep(), 4);

  let z1 = h.tile(0, 0, 1);
  assert_eq!(z1.size(), 32);
  assert_eq!(z1.pixel(0, 0), Some(RED));
  assert_eq!(z1.pixel(16, 0), Some(GREEN));
  assert_eq!(z1.pixel(0, 16), Some(BLUE));
  assert_eq!(z1.pixel(31, 31), Some(WHITE));

  let z2 = h.tile(0, 0, 2);
  assert_eq!(z2.size(), 64);
  let children = [(0, 0), (1, 0), (0, 1), (1, 1)].map(|(x, z)| h.tile(x, z, 1));
  for (i, child) in children.iter().enumerate() {
    let (qx, qz) = ((i as u32 % 2) * 32, (i as u32 / 2) * 32);
    for z in 0..32 {
      for x in 0..32 {
        assert_eq!(z2.pixel(qx + x, qz + z), child.pixel(x, z));
      }
    }
  }
  // Zoomed tiles are never written.
  assert!(!h.root.join("world_overworld").join("1").exists());
}

#[test]
fn zoom_over_unrendered_area_is_sentinel() {
  let h = Harness::new();
  for zoom in 1..=3 {
    let tile = h.tile(-7, 9, zoom);
    assert_eq!(tile.size(), 16 << zoom);
    assert!(tile.is_uniform(UNLOADED_COLOR));
  }
}

#[test]
fn clear_cache_removes_everything() {
  let h = Harness::new();
  h.paint(ChunkPos::new(0, 0), RED);
  h.mark(ChunkPos::new(0, 0));
  h.sweep();
  h.mark(ChunkPos::new(5, 5));

  block_on(h.orchestrator.clear_cache());

  assert!(h.tile(0, 0, 0).is_uniform(UNLOADED_COLOR));
  assert!(h.root.is_dir());
  assert_eq!(std::fs::read_dir(&h.root).unwrap().count(), 0);
  assert_eq!(h.orchestrator.tracker().dirty_chunk_count(), 0);

  // Re-rendering repopulates.
  h.mark(ChunkPos::new(0, 0));
  h.sweep();
  assert!(h.tile(0, 0, 0).is_uniform(RED));
}

#[test]
fn corrupt_tile_degrades_to_sentinel() {
  let h = Harness::new();
  let path = h.tile_path(1, 1);
  std::fs::create_dir_all(path.parent().unwrap()).unwrap();
  std::fs::write(&path, b"definitely not a png").unwrap();

  assert!(h.tile(1, 1, 0).is_uniform(UNLOADED_COLOR));
}

#[test]
fn unloaded_chunk_keeps_stored_tile() {
  let h = Harness::new();
  h.paint(ChunkPos::new(3, 3), GREEN);
  h.mark(ChunkPos::new(3, 3));
  h.sweep();

  h.world.unload_chunk(ChunkPos::new(3, 3));
  h.mark(ChunkPos::new(3, 3));
  assert_eq!(h.sweep(), 1);

  assert!(h.tile(3, 3, 0).is_uniform(GREEN));
}

/// Panics when rendering chunk (0, 0).
struct PanickingView(Arc<MemoryWorld>);

impl WorldView for PanickingView {
  fn height_range(&self) -> (i32, i32) {
    self.0.height_range()
  }

  fn is_chunk_resident(&self, pos: ChunkPos) -> bool {
    self.0.is_chunk_resident(pos)
  }

  fn block_at(&self, x: i32, y: i32, z: i32) -> Option<BlockState> {
    if ChunkPos::from_block(x, z) == ChunkPos::new(0, 0) {
      panic!("corrupt section");
    }
    self.0.block_at(x, y, z)
  }

  fn biome_at(&self, x: i32, y: i32, z: i32) -> Biome {
    self.0.biome_at(x, y, z)
  }
}

#[test]
fn render_failure_is_contained() {
  let world = Arc::new(MemoryWorld::new(-64, 319, Biome::plains()));
  let h = Harness::with_view(Some(Arc::new(PanickingView(world.clone()))));
  world.fill_chunk_layer(ChunkPos::new(0, 0), SEA_LEVEL, BlockState::solid(RED));
  world.fill_chunk_layer(ChunkPos::new(4, 0), SEA_LEVEL, BlockState::solid(GREEN));
  h.mark(ChunkPos::new(0, 0));
  h.mark(ChunkPos::new(4, 0));

  assert_eq!(h.sweep(), 2);
  let counts = h.orchestrator.task_counts();
  assert_eq!(counts.renders_failed, 1);
  assert_eq!(counts.rendering, 0);
  assert!(!h.tile_path(0, 0).exists());
  assert!(h.tile(0, 0, 0).is_uniform(UNLOADED_COLOR));
  assert!(h.tile(4, 0, 0).is_uniform(GREEN));
}

/// Store whose writes always fail.
struct ReadOnlyStore;

impl TileStore for ReadOnlyStore {
  fn exists(&self, _key: &TileKey) -> BoxFuture<'_, Result<bool, BackendError>> {
    Box::pin(std::future::ready(Ok(false)))
  }

  fn read(&self, _key: &TileKey) -> BoxFuture<'_, Result<Vec<u8>, BackendError>> {
    Box::pin(std::future::ready(Err(BackendError::NotFound)))
  }

  fn write(&self, _key: &TileKey, _bytes: Vec<u8>) -> BoxFuture<'_, Result<(), BackendError>> {
    let err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
    Box::pin(std::future::ready(Err(BackendError::Io(err))))
  }

  fn delete_all(&self) -> BoxFuture<'_, Result<(), BackendError>> {
    Box::pin(std::future::ready(Ok(())))
  }
}

#[test]
fn failed_write_leaves_chunk_unrendered() {
  let world = Arc::new(MemoryWorld::new(-64, 319, Biome::plains()));
  world.fill_chunk_layer(ChunkPos::new(0, 0), SEA_LEVEL, BlockState::solid(RED));
  let registry = Arc::new(WorldRegistry::new());
  registry.insert(dim(), world);
  let tracker = Arc::new(DirtyRegionTracker::new());
  let orchestrator = TileOrchestrator::new(
    registry,
    Arc::new(ReadOnlyStore),
    tracker.clone(),
    renderer(),
  );

  tracker.mark_dirty(&dim(), ChunkPos::new(0, 0));
  assert_eq!(orchestrator.process_dirty(), 1);
  block_on(orchestrator.wait_idle());

  assert_eq!(orchestrator.task_counts().renders_failed, 0);
  assert!(!tracker.is_rendered(&dim(), ChunkPos::new(0, 0)));
  assert!(block_on(orchestrator.get_tile(&dim(), 0, 0, 0)).is_uniform(UNLOADED_COLOR));
}

/// Records which thread each store call runs on, and optionally holds reads
/// until released.
struct Observed {
  calls: Mutex<Vec<(&'static str, String)>>,
  reads: AtomicUsize,
  read_gate: Option<async_channel::Receiver<()>>,
}

impl Observed {
  fn new(read_gate: Option<async_channel::Receiver<()>>) -> Arc<Self> {
    Arc::new(Self {
      calls: Mutex::new(Vec::new()),
      reads: AtomicUsize::new(0),
      read_gate,
    })
  }

  fn record(&self, op: &'static str) {
    let thread = std::thread::current().name().unwrap_or_default().to_string();
    self.calls.lock().unwrap().push((op, thread));
  }

  fn ops(&self) -> Vec<&'static str> {
    self.calls.lock().unwrap().iter().map(|(op, _)| *op).collect()
  }
}

struct ObservedStore {
  inner: NativeTileStore,
  observed: Arc<Observed>,
}

impl TileStore for ObservedStore {
  fn exists(&self, key: &TileKey) -> BoxFuture<'_, Result<bool, BackendError>> {
    self.observed.record("exists");
    self.inner.exists(key)
  }

  fn read(&self, key: &TileKey) -> BoxFuture<'_, Result<Vec<u8>, BackendError>> {
    self.observed.record("read");
    self.observed.reads.fetch_add(1, Ordering::SeqCst);
    if let Some(gate) = &self.observed.read_gate {
      // Returns once the sender is dropped.
      let _ = gate.recv_blocking();
    }
    self.inner.read(key)
  }

  fn write(&self, key: &TileKey, bytes: Vec<u8>) -> BoxFuture<'_, Result<(), BackendError>> {
    self.observed.record("write");
    self.inner.write(key, bytes)
  }

  fn delete_all(&self) -> BoxFuture<'_, Result<(), BackendError>> {
    self.observed.record("delete_all");
    self.inner.delete_all()
  }
}

#[test]
fn store_calls_run_on_io_pool() {
  let observed = Observed::new(None);
  let h = Harness::with_store(|inner| {
    Arc::new(ObservedStore {
      inner,
      observed: observed.clone(),
    })
  });
  h.paint(ChunkPos::new(0, 0), RED);
  h.mark(ChunkPos::new(0, 0));
  // Not resident: the render falls back to the stored tile.
  h.mark(ChunkPos::new(9, 9));
  assert_eq!(h.sweep(), 2);
  assert!(h.tile(0, 0, 0).is_uniform(RED));
  block_on(h.orchestrator.clear_cache());

  let ops = observed.ops();
  for op in ["exists", "read", "write", "delete_all"] {
    assert!(ops.contains(&op), "{op} not called: {ops:?}");
  }
  for (op, thread) in observed.calls.lock().unwrap().iter() {
    assert!(
      thread.starts_with(IO_THREAD_NAME),
      "{op} ran on thread {thread:?}"
    );
  }
}

#[test]
fn concurrent_requests_share_one_load() {
  let (release, gate) = async_channel::bounded::<()>(1);
  let observed = Observed::new(Some(gate));
  let h = Harness::with_store(|inner| {
    Arc::new(ObservedStore {
      inner,
      observed: observed.clone(),
    })
  });
  h.paint(ChunkPos::new(0, 0), GREEN);
  h.mark(ChunkPos::new(0, 0));
  assert_eq!(h.sweep(), 1);
  assert_eq!(observed.reads.load(Ordering::SeqCst), 0);

  let requests: Vec<_> = (0..8)
    .map(|_| h.orchestrator.get_tile(&dim(), 0, 0, 0))
    .collect();
  let counts = h.orchestrator.task_counts();
  assert_eq!(counts.loading, 1);
  assert_eq!(counts.rendering, 0);

  drop(release);
  let waiters: Vec<_> = requests
    .into_iter()
    .map(|fut| std::thread::spawn(move || block_on(fut)))
    .collect();
  let tiles: Vec<Tile> = waiters.into_iter().map(|w| w.join().unwrap()).collect();

  assert_eq!(observed.reads.load(Ordering::SeqCst), 1);
  assert!(tiles[0].is_uniform(GREEN));
  assert!(tiles.iter().all(|t| t.ptr_eq(&tiles[0])));
  block_on(h.orchestrator.wait_idle());
  assert_eq!(h.orchestrator.task_counts().loading, 0);
}

#[test]
fn deepest_zoom_composes_to_full_size() {
  let h = Harness::new();
  h.paint(ChunkPos::new(0, 0), RED);
  h.mark(ChunkPos::new(0, 0));
  h.sweep();

  let tile = h.tile(0, 0, MAX_ZOOM);
  assert_eq!(tile.size(), tile_size(MAX_ZOOM));
  assert_eq!(tile.pixel(0, 0), Some(RED));
  assert_eq!(tile.pixel(tile.size() - 1, tile.size() - 1), Some(UNLOADED_COLOR));
}
