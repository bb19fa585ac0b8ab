//! Row-major 2D buffer backing map tiles.
//!
//! # Coordinate System
//!
//! Surfaces follow the map's north-up layout:
//! - **X+** is to the right (east)
//! - **Z+** is downward (south)
//! - **(0, 0)** is the top-left corner
//!
//! Row 0 is the northernmost row, matching PNG scanline order.

use std::ops::{Index, IndexMut};

use crate::render::Rgba;

/// A 2D buffer of elements.
///
/// Data is stored in row-major order (z * width + x).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Surface<T> {
  data: Box<[T]>,
  width: u32,
  height: u32,
}

/// Surface of RGBA pixels.
pub type RgbaSurface = Surface<Rgba>;

impl<T: Clone + Default> Surface<T> {
  /// Creates a new surface filled with the default value.
  pub fn new(width: u32, height: u32) -> Self {
    Self::filled(width, height, T::default())
  }
}

impl<T: Clone> Surface<T> {
  /// Creates a new surface filled with the given value.
  pub fn filled(width: u32, height: u32, value: T) -> Self {
    let len = (width as usize) * (height as usize);
    Self {
      data: vec![value; len].into_boxed_slice(),
      width,
      height,
    }
  }

  /// Wraps existing row-major data, or `None` if the length does not match.
  pub fn from_vec(width: u32, height: u32, data: Vec<T>) -> Option<Self> {
    let len = (width as usize) * (height as usize);
    (data.len() == len).then(|| Self {
      data: data.into_boxed_slice(),
      width,
      height,
    })
  }

  /// Copies `src` into the `w`×`h` rectangle at `(dst_x, dst_z)`, sampling
  /// the source with nearest-neighbour scaling.
  ///
  /// Pixels falling outside this surface are skipped.
  pub fn blit_scaled(&mut self, src: &Surface<T>, dst_x: u32, dst_z: u32, w: u32, h: u32) {
    if w == 0 || h == 0 || src.width == 0 || src.height == 0 {
      return;
    }
    for dz in 0..h {
      let sz = (dz as u64 * src.height as u64 / h as u64) as u32;
      for dx in 0..w {
        let sx = (dx as u64 * src.width as u64 / w as u64) as u32;
        if let Some(i) = self.index_of(dst_x + dx, dst_z + dz) {
          self.data[i] = src[(sx, sz)].clone();
        }
      }
    }
  }
}

impl<T> Surface<T> {
  /// Returns the width of the surface.
  #[inline]
  pub fn width(&self) -> u32 {
    self.width
  }

  /// Returns the height of the surface.
  #[inline]
  pub fn height(&self) -> u32 {
    self.height
  }

  #[inline]
  fn index_of(&self, x: u32, z: u32) -> Option<usize> {
    if x < self.width && z < self.height {
      Some((z as usize) * (self.width as usize) + (x as usize))
    } else {
      None
    }
  }

  /// Returns a reference to the element at (x, z), or `None` if out of bounds.
  #[inline]
  pub fn get(&self, x: u32, z: u32) -> Option<&T> {
    self.index_of(x, z).map(|i| &self.data[i])
  }

  /// Sets the element at (x, z). Returns `false` if out of bounds.
  #[inline]
  pub fn set(&mut self, x: u32, z: u32, value: T) -> bool {
    if let Some(i) = self.index_of(x, z) {
      self.data[i] = value;
      true
    } else {
      false
    }
  }

  /// Returns a slice of the underlying data.
  #[inline]
  pub fn as_slice(&self) -> &[T] {
    &self.data
  }
}

impl RgbaSurface {
  /// Flattens into `[r, g, b, a, ...]` bytes in scanline order.
  pub fn to_rgba_bytes(&self) -> Vec<u8> {
    self
      .data
      .iter()
      .flat_map(|p| [p.r, p.g, p.b, p.a])
      .collect()
  }

  /// Builds a surface from `[r, g, b, a, ...]` bytes.
  pub fn from_rgba_bytes(width: u32, height: u32, bytes: &[u8]) -> Option<Self> {
    let pixels = bytes
      .chunks_exact(4)
      .map(|c| Rgba::new(c[0], c[1], c[2], c[3]))
      .collect();
    Self::from_vec(width, height, pixels)
  }
}

impl<T> Index<(u32, u32)> for Surface<T> {
  type Output = T;

  #[inline]
  fn index(&self, (x, z): (u32, u32)) -> &Self::Output {
    let i = (z as usize) * (self.width as usize) + (x as usize);
    &self.data[i]
  }
}

impl<T> IndexMut<(u32, u32)> for Surface<T> {
  #[inline]
  fn index_mut(&mut self, (x, z): (u32, u32)) -> &mut Self::Output {
    let i = (z as usize) * (self.width as usize) + (x as usize);
    &mut self.data[i]
  }
}
