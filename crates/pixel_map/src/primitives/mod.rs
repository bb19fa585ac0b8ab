mod surface;
mod tile;

pub use surface::{RgbaSurface, Surface};
pub use tile::{Tile, UNLOADED_COLOR};
