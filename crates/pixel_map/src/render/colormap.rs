//! Biome colormaps and the asset provider they are loaded through.

use std::error::Error;
use std::path::{Path, PathBuf};
use std::{fmt, io};

use crate::primitives::RgbaSurface;
use crate::render::Rgba;

/// Asset names of the three colormaps.
pub const GRASS_COLORMAP: &str = "grass";
pub const FOLIAGE_COLORMAP: &str = "foliage";
pub const DRY_FOLIAGE_COLORMAP: &str = "dry_foliage";

/// Error type for asset loading.
#[derive(Debug)]
pub enum AssetError {
  /// No asset with this name.
  NotFound(String),
  /// Standard I/O error.
  Io(io::Error),
  /// The asset exists but is not a readable image.
  Decode(Box<dyn Error + Send + Sync>),
}

impl fmt::Display for AssetError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::NotFound(name) => write!(f, "asset not found: {name}"),
      Self::Io(e) => write!(f, "I/O error: {e}"),
      Self::Decode(e) => write!(f, "decode error: {e}"),
    }
  }
}

impl Error for AssetError {
  fn source(&self) -> Option<&(dyn Error + 'static)> {
    match self {
      Self::Io(e) => Some(e),
      Self::Decode(e) => Some(&**e),
      Self::NotFound(_) => None,
    }
  }
}

impl From<io::Error> for AssetError {
  fn from(err: io::Error) -> Self {
    Self::Io(err)
  }
}

/// Source of named pixel grids.
pub trait AssetProvider: Send + Sync {
  fn load_image(&self, name: &str) -> Result<RgbaSurface, AssetError>;
}

/// Loads `<root>/colormap/<name>.png` from disk.
pub struct DirAssetProvider {
  root: PathBuf,
}

impl DirAssetProvider {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  fn path_for(&self, name: &str) -> PathBuf {
    self.root.join("colormap").join(format!("{name}.png"))
  }

  pub fn root(&self) -> &Path {
    &self.root
  }
}

impl AssetProvider for DirAssetProvider {
  fn load_image(&self, name: &str) -> Result<RgbaSurface, AssetError> {
    let path = self.path_for(name);
    let bytes = match std::fs::read(&path) {
      Ok(bytes) => bytes,
      Err(e) if e.kind() == io::ErrorKind::NotFound => {
        return Err(AssetError::NotFound(path.display().to_string()));
      }
      Err(e) => return Err(e.into()),
    };
    let image = image::load_from_memory_with_format(&bytes, image::ImageFormat::Png)
      .map_err(|e| AssetError::Decode(Box::new(e)))?
      .into_rgba8();
    let (width, height) = image.dimensions();
    RgbaSurface::from_rgba_bytes(width, height, image.as_raw())
      .ok_or_else(|| AssetError::Decode(format!("{name}: truncated pixel data").into()))
  }
}

/// A temperature/downfall-indexed colour grid.
#[derive(Clone, Debug)]
pub struct Colormap {
  pixels: RgbaSurface,
}

impl Colormap {
  pub fn new(pixels: RgbaSurface) -> Self {
    Self { pixels }
  }

  /// A colormap returning `color` everywhere.
  pub fn uniform(color: Rgba) -> Self {
    Self::new(RgbaSurface::filled(1, 1, color))
  }

  /// Looks up the colour for a biome climate.
  ///
  /// Temperature is clamped to `[0, 1]`; downfall is clamped and then scaled
  /// by temperature. Coordinates address a 256×256 grid and are clamped to
  /// this map's bounds. The result is opaque.
  pub fn sample(&self, temperature: f32, downfall: f32) -> Rgba {
    let t = temperature.clamp(0.0, 1.0);
    let d = downfall.clamp(0.0, 1.0) * t;
    let px = (((1.0 - t) * 255.0) as u32).min(255);
    let py = (((1.0 - d) * 255.0) as u32).min(255);
    let x = px.min(self.pixels.width().saturating_sub(1));
    let z = py.min(self.pixels.height().saturating_sub(1));
    self
      .pixels
      .get(x, z)
      .copied()
      .unwrap_or(Rgba::TRANSPARENT)
      .opaque()
  }
}

/// The three colormaps used for plant tinting.
#[derive(Clone, Debug)]
pub struct Colormaps {
  pub grass: Colormap,
  pub foliage: Colormap,
  pub dry_foliage: Colormap,
}

impl Colormaps {
  /// Loads all three colormaps from a provider.
  pub fn load(provider: &dyn AssetProvider) -> Result<Self, AssetError> {
    Ok(Self {
      grass: Colormap::new(provider.load_image(GRASS_COLORMAP)?),
      foliage: Colormap::new(provider.load_image(FOLIAGE_COLORMAP)?),
      dry_foliage: Colormap::new(provider.load_image(DRY_FOLIAGE_COLORMAP)?),
    })
  }

  /// Uniform colormaps, for worlds without assets.
  pub fn uniform(grass: Rgba, foliage: Rgba, dry_foliage: Rgba) -> Self {
    Self {
      grass: Colormap::uniform(grass),
      foliage: Colormap::uniform(foliage),
      dry_foliage: Colormap::uniform(dry_foliage),
    }
  }
}
