//! Tile persistence: the store abstraction, its filesystem backend and the
//! PNG codec.

pub mod backend;
pub mod codec;
pub mod native;

pub use backend::{BackendError, BoxFuture, TileStore};
pub use codec::{CodecError, decode_png, encode_png};
pub use native::NativeTileStore;
