//! Status counters and optional Tracy profiling.

use std::fmt;

/// Snapshot of engine activity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MapStats {
  /// Render tasks in flight.
  pub rendering: usize,
  /// Tile loads in flight.
  pub loading: usize,
  /// Dimensions with chunks waiting for the next sweep.
  pub dirty_dimensions: usize,
  /// Chunks waiting for the next sweep.
  pub dirty_chunks: usize,
  pub renders_started: u64,
  pub renders_failed: u64,
}

impl MapStats {
  /// Render and load tasks in flight.
  pub fn tile_tasks(&self) -> usize {
    self.rendering + self.loading
  }
}

impl fmt::Display for MapStats {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{} tile tasks ({} rendering, {} loading), {} dirty chunks in {} dimensions",
      self.tile_tasks(),
      self.rendering,
      self.loading,
      self.dirty_chunks,
      self.dirty_dimensions
    )
  }
}

/// Installs a global `tracing` subscriber that streams spans to Tracy.
///
/// Call once at startup, before the first sweep.
#[cfg(feature = "tracy")]
pub fn init_tracy() {
  use tracing_subscriber::prelude::*;
  use tracing_tracy::TracyLayer;

  tracing_subscriber::registry()
    .with(TracyLayer::default())
    .init();
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn status_line() {
    let stats = MapStats {
      rendering: 2,
      loading: 1,
      dirty_dimensions: 1,
      dirty_chunks: 5,
      ..MapStats::default()
    };
    assert_eq!(
      stats.to_string(),
      "3 tile tasks (2 rendering, 1 loading), 5 dirty chunks in 1 dimensions"
    );
  }
}
