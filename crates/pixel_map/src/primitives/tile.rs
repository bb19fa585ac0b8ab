//! Immutable, shareable tile pixel buffers.

use std::sync::Arc;

use super::RgbaSurface;
use crate::coords::tile_size;
use crate::render::Rgba;

/// Colour of every pixel in a sentinel tile (`#1a1a2e`).
pub const UNLOADED_COLOR: Rgba = Rgba::rgb(0x1a, 0x1a, 0x2e);

/// A square RGBA tile of side `16 << zoom`.
///
/// Cloning is cheap; the pixels are shared and never mutated after
/// construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tile {
  zoom: u8,
  pixels: Arc<RgbaSurface>,
}

impl Tile {
  /// Wraps a rendered surface. Returns `None` if its size does not match
  /// `zoom`.
  pub fn new(zoom: u8, pixels: RgbaSurface) -> Option<Self> {
    let size = tile_size(zoom);
    (pixels.width() == size && pixels.height() == size).then(|| Self {
      zoom,
      pixels: Arc::new(pixels),
    })
  }

  /// A tile of a single colour.
  pub fn uniform(zoom: u8, color: Rgba) -> Self {
    let size = tile_size(zoom);
    Self {
      zoom,
      pixels: Arc::new(RgbaSurface::filled(size, size, color)),
    }
  }

  /// The placeholder returned for absent or failed tiles.
  pub fn unloaded(zoom: u8) -> Self {
    Self::uniform(zoom, UNLOADED_COLOR)
  }

  /// Composes four same-zoom children into their parent, scaling each into
  /// one quadrant. Order: top-left, top-right, bottom-left, bottom-right.
  pub fn compose(zoom: u8, children: &[Tile; 4]) -> Self {
    let size = tile_size(zoom);
    let half = size / 2;
    let mut out = RgbaSurface::filled(size, size, UNLOADED_COLOR);
    for (i, child) in children.iter().enumerate() {
      let qx = (i as u32 % 2) * half;
      let qz = (i as u32 / 2) * half;
      out.blit_scaled(&child.pixels, qx, qz, half, half);
    }
    Self {
      zoom,
      pixels: Arc::new(out),
    }
  }

  pub fn zoom(&self) -> u8 {
    self.zoom
  }

  pub fn size(&self) -> u32 {
    self.pixels.width()
  }

  pub fn pixel(&self, x: u32, z: u32) -> Option<Rgba> {
    self.pixels.get(x, z).copied()
  }

  pub fn surface(&self) -> &RgbaSurface {
    &self.pixels
  }

  /// True if every pixel equals `color`.
  pub fn is_uniform(&self, color: Rgba) -> bool {
    self.pixels.as_slice().iter().all(|p| *p == color)
  }

  /// True if both tiles share the same pixel allocation.
  pub fn ptr_eq(&self, other: &Tile) -> bool {
    Arc::ptr_eq(&self.pixels, &other.pixels)
  }
}
