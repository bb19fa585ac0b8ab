//! Pixel colours, colormaps and chunk rendering.

pub mod colormap;
mod renderer;
mod rgba;
pub mod tint;

pub use colormap::{AssetError, AssetProvider, Colormap, Colormaps, DirAssetProvider};
pub use renderer::{
  ColumnSample, MAX_WATER_BLEND_DEPTH, RenderOptions, SEA_LEVEL, TileRenderer, shade, water_tint,
};
pub use rgba::{Rgba, SHADE_FACTOR};
pub use tint::{DEFAULT_TINT_RULES, TintRule};
