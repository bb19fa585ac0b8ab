//! PNG encoding of tiles.

use std::error::Error;
use std::fmt;
use std::io::Cursor;

use image::{ImageFormat, RgbaImage};

use crate::coords::tile_size;
use crate::primitives::{RgbaSurface, Tile};

/// Error type for tile encoding and decoding.
#[derive(Debug)]
pub enum CodecError {
  /// The image library rejected the data.
  Image(image::ImageError),
  /// Decoded dimensions do not match the expected tile size.
  Size {
    expected: u32,
    actual: (u32, u32),
  },
}

impl fmt::Display for CodecError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Image(e) => write!(f, "image error: {e}"),
      Self::Size { expected, actual } => write!(
        f,
        "tile is {}x{}, expected {expected}x{expected}",
        actual.0, actual.1
      ),
    }
  }
}

impl Error for CodecError {
  fn source(&self) -> Option<&(dyn Error + 'static)> {
    match self {
      Self::Image(e) => Some(e),
      Self::Size { .. } => None,
    }
  }
}

impl From<image::ImageError> for CodecError {
  fn from(err: image::ImageError) -> Self {
    Self::Image(err)
  }
}

/// Encodes a tile as an RGBA PNG.
pub fn encode_png(tile: &Tile) -> Result<Vec<u8>, CodecError> {
  let size = tile.size();
  let image = RgbaImage::from_raw(size, size, tile.surface().to_rgba_bytes()).ok_or(
    CodecError::Size {
      expected: size,
      actual: (tile.surface().width(), tile.surface().height()),
    },
  )?;
  let mut out = Cursor::new(Vec::new());
  image.write_to(&mut out, ImageFormat::Png)?;
  Ok(out.into_inner())
}

/// Decodes a PNG into a tile of the given zoom level.
pub fn decode_png(bytes: &[u8], zoom: u8) -> Result<Tile, CodecError> {
  let image = image::load_from_memory_with_format(bytes, ImageFormat::Png)?.into_rgba8();
  let expected = tile_size(zoom);
  let size_error = CodecError::Size {
    expected,
    actual: image.dimensions(),
  };
  if image.dimensions() != (expected, expected) {
    return Err(size_error);
  }
  RgbaSurface::from_rgba_bytes(expected, expected, image.as_raw())
    .and_then(|surface| Tile::new(zoom, surface))
    .ok_or(size_error)
}
