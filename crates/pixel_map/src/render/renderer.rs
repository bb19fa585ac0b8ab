//! Chunk-to-tile rendering in the vanilla map style.
//!
//! Each column is scanned top-down for its first renderable block. The block
//! is coloured (plant tints resolved per biome), blended toward the biome's
//! water colour when submerged, then shaded against the surface height of
//! the previous row in the same column. Row 0 is shaded against the last row
//! of the chunk to the north, so edits to a chunk also invalidate the chunk
//! south of it.

use super::Rgba;
use super::colormap::Colormaps;
use super::tint::{DEFAULT_TINT_RULES, TintRule, plant_color};
use crate::coords::{CHUNK_SIZE, ChunkPos};
use crate::primitives::{RgbaSurface, Tile, UNLOADED_COLOR};
use crate::world::{Biome, BlockState, TintMethod, WorldView};

/// Height used as the shading reference when the preceding row is absent.
pub const SEA_LEVEL: i32 = 62;

/// Water deeper than this many blocks shows only the water colour.
pub const MAX_WATER_BLEND_DEPTH: i32 = 15;

/// Renderer switches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderOptions {
  /// Look through water to the blocks beneath it. When off, the water
  /// surface itself is drawn in the biome water colour.
  pub render_underwater_blocks: bool,
  /// Start column scans at the world's height map when it provides one.
  pub use_height_map: bool,
}

impl Default for RenderOptions {
  fn default() -> Self {
    Self {
      render_underwater_blocks: true,
      use_height_map: true,
    }
  }
}

/// Top surface of a column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColumnSample {
  pub y: i32,
  pub block: BlockState,
}

/// Renders resident chunks into zoom-0 tiles.
#[derive(Clone, Debug)]
pub struct TileRenderer {
  options: RenderOptions,
  colormaps: Colormaps,
  rules: &'static [TintRule],
}

impl TileRenderer {
  pub fn new(colormaps: Colormaps, options: RenderOptions) -> Self {
    Self {
      options,
      colormaps,
      rules: DEFAULT_TINT_RULES,
    }
  }

  /// Replaces the biome override table.
  pub fn with_rules(mut self, rules: &'static [TintRule]) -> Self {
    self.rules = rules;
    self
  }

  pub fn options(&self) -> RenderOptions {
    self.options
  }

  /// Renders a 16×16 tile for a chunk.
  ///
  /// A chunk that is not resident yields a uniform [`UNLOADED_COLOR`] tile.
  /// Only resident data is read; neighbouring chunks that are absent fall
  /// back to [`SEA_LEVEL`] as the shading reference.
  #[cfg_attr(feature = "tracy", tracing::instrument(skip_all))]
  pub fn render_chunk(&self, view: &dyn WorldView, pos: ChunkPos) -> Tile {
    if !view.is_chunk_resident(pos) {
      return Tile::unloaded(0);
    }

    let start_x = pos.min_block_x();
    let start_z = pos.min_block_z();
    let mut last_y = [SEA_LEVEL; CHUNK_SIZE as usize];
    // The northernmost chunk row has no neighbour to shade against.
    if let Some(north_z) = start_z.checked_sub(1) {
      for (dx, y) in last_y.iter_mut().enumerate() {
        let x = start_x.wrapping_add(dx as i32);
        if let Some(sample) = self.surface_at(view, x, north_z) {
          *y = sample.y;
        }
      }
    }

    let mut pixels = RgbaSurface::filled(CHUNK_SIZE, CHUNK_SIZE, UNLOADED_COLOR);
    for dz in 0..CHUNK_SIZE {
      for dx in 0..CHUNK_SIZE {
        let x = start_x.wrapping_add(dx as i32);
        let z = start_z.wrapping_add(dz as i32);
        let Some(sample) = self.surface_at(view, x, z) else {
          continue;
        };
        let prev = &mut last_y[dx as usize];
        pixels[(dx, dz)] = self.shaded_color(view, x, z, sample, *prev);
        *prev = sample.y;
      }
    }

    Tile::new(0, pixels).unwrap_or_else(|| Tile::unloaded(0))
  }

  /// Finds the topmost renderable block of a column.
  ///
  /// Returns `None` if the column's chunk is not resident or the scan passes
  /// the bottom of the world.
  pub fn surface_at(&self, view: &dyn WorldView, x: i32, z: i32) -> Option<ColumnSample> {
    let (min_y, max_y) = view.height_range();
    let top = if self.options.use_height_map {
      view.height_map(x, z).map_or(max_y, |h| h.min(max_y))
    } else {
      max_y
    };

    let mut y = top;
    while y >= min_y {
      let block = view.block_at(x, y, z)?;
      if block.is_water() && !self.options.render_underwater_blocks {
        return Some(ColumnSample { y, block });
      }
      if block.is_renderable() {
        return Some(ColumnSample { y, block });
      }
      y -= 1;
    }
    None
  }

  /// Unshaded colour of a surface block.
  pub fn base_color(&self, block: BlockState, biome: &Biome) -> Rgba {
    match block.tint {
      TintMethod::None | TintMethod::Stem => block.map_color,
      TintMethod::RedstoneWire => Rgba::RED,
      TintMethod::Water if self.options.render_underwater_blocks => block.map_color,
      TintMethod::Water => biome.water_color,
      tint => plant_color(self.rules, &self.colormaps, tint, biome),
    }
  }

  fn shaded_color(
    &self,
    view: &dyn WorldView,
    x: i32,
    z: i32,
    sample: ColumnSample,
    prev_y: i32,
  ) -> Rgba {
    let biome = view.biome_at(x, sample.y, z);
    let mut color = self.base_color(sample.block, &biome);
    if !sample.block.is_water() && view.is_water_above(x, sample.y, z) {
      color = water_tint(color, sample.y, biome.water_color);
    }
    shade(color, sample.y, prev_y)
  }
}

/// Blends a submerged surface colour toward `water`.
///
/// Below sea level the ratio grows with depth (never under one half); past
/// [`MAX_WATER_BLEND_DEPTH`] the water colour replaces the surface entirely.
/// At or above sea level the ratio is one half.
pub fn water_tint(color: Rgba, y: i32, water: Rgba) -> Rgba {
  if y < SEA_LEVEL {
    let depth = SEA_LEVEL - y;
    if depth > MAX_WATER_BLEND_DEPTH {
      return water;
    }
    let ratio = (depth as f32 / MAX_WATER_BLEND_DEPTH as f32).max(0.5);
    color.blend_rg(water, ratio)
  } else {
    color.blend_rg(water, 0.5)
  }
}

/// Darkens a surface lower than its predecessor, brightens a higher one.
pub fn shade(color: Rgba, y: i32, prev_y: i32) -> Rgba {
  use std::cmp::Ordering;
  match y.cmp(&prev_y) {
    Ordering::Less => color.darker(),
    Ordering::Greater => color.brighter(),
    Ordering::Equal => color,
  }
}
