//! RGBA pixel type and the map's colour arithmetic.

/// Shading factor applied per height step between neighbouring rows.
pub const SHADE_FACTOR: f64 = 0.85;

/// RGBA pixel with 8 bits per channel.
#[repr(C)]
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq, Hash)]
pub struct Rgba {
  pub r: u8,
  pub g: u8,
  pub b: u8,
  pub a: u8,
}

impl Rgba {
  /// Creates a new RGBA pixel.
  #[inline]
  pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
    Self { r, g, b, a }
  }

  /// Creates an opaque RGB pixel (alpha = 255).
  #[inline]
  pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
    Self { r, g, b, a: 255 }
  }

  /// Creates an opaque pixel from a `0xRRGGBB` literal.
  #[inline]
  pub const fn hex(rgb: u32) -> Self {
    Self::rgb((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
  }

  /// Same colour with alpha forced to 255.
  #[inline]
  pub const fn opaque(self) -> Self {
    Self { a: 255, ..self }
  }

  /// Transparent black.
  pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0);

  /// Opaque red, used for redstone wire.
  pub const RED: Self = Self::rgb(255, 0, 0);

  /// Scales each colour channel down by [`SHADE_FACTOR`], truncating.
  /// Alpha is kept.
  pub fn darker(self) -> Self {
    let scale = |c: u8| (c as f64 * SHADE_FACTOR) as u8;
    Self::new(scale(self.r), scale(self.g), scale(self.b), self.a)
  }

  /// Inverse of [`darker`](Self::darker).
  ///
  /// Non-zero channels below `1 / (1 - factor)` are raised to that floor
  /// first so that dark colours still brighten; pure black becomes a uniform
  /// grey at the floor. Results clamp at 255. Alpha is kept.
  pub fn brighter(self) -> Self {
    let floor = (1.0 / (1.0 - SHADE_FACTOR)) as u8;
    if self.r == 0 && self.g == 0 && self.b == 0 {
      return Self::new(floor, floor, floor, self.a);
    }
    let scale = |c: u8| {
      let c = if c > 0 && c < floor { floor } else { c };
      ((c as f64 / SHADE_FACTOR) as u32).min(255) as u8
    };
    Self::new(scale(self.r), scale(self.g), scale(self.b), self.a)
  }

  /// Moves red and green `ratio` of the way toward `target`, truncating the
  /// step. Blue is left as is; the result is opaque.
  pub fn blend_rg(self, target: Rgba, ratio: f32) -> Self {
    let step = |from: u8, to: u8| {
      let from = from as i32;
      (from + ((to as i32 - from) as f32 * ratio) as i32).clamp(0, 255) as u8
    };
    Self::rgb(step(self.r, target.r), step(self.g, target.g), self.b)
  }
}
