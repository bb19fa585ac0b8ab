//! Plant tint resolution.
//!
//! Biome-specific overrides are a flat, ordered table of [`TintRule`]s; the
//! first matching rule wins. Anything unmatched falls through to the
//! colormap for the tint class.

use super::Rgba;
use super::colormap::Colormaps;
use crate::world::{Biome, TintMethod};

pub mod biomes {
  pub const SWAMPLAND: &str = "swampland";
  pub const SWAMPLAND_MUTATED: &str = "swampland_mutated";
  pub const MANGROVE_SWAMP: &str = "mangrove_swamp";
  pub const ROOFED_FOREST: &str = "roofed_forest";
  pub const ROOFED_FOREST_MUTATED: &str = "roofed_forest_mutated";
  pub const MESA: &str = "mesa";
  pub const MESA_BRYCE: &str = "mesa_bryce";
  pub const MESA_PLATEAU: &str = "mesa_plateau";
  pub const MESA_PLATEAU_MUTATED: &str = "mesa_plateau_mutated";
  pub const MESA_PLATEAU_STONE: &str = "mesa_plateau_stone";
  pub const MESA_PLATEAU_STONE_MUTATED: &str = "mesa_plateau_stone_mutated";
  pub const CHERRY_GROVE: &str = "cherry_grove";
  pub const PALE_GARDEN: &str = "pale_garden";
}

pub const BIRCH_FOLIAGE: Rgba = Rgba::hex(0x80a755);
pub const EVERGREEN_FOLIAGE: Rgba = Rgba::hex(0x619961);
pub const DRY_FOLIAGE_A: Rgba = Rgba::hex(0x7b5334);
pub const DRY_FOLIAGE_B: Rgba = Rgba::hex(0xa0a69c);
pub const SWAMP_GRASS: Rgba = Rgba::hex(0x6a7039);
pub const SWAMP_FOLIAGE: Rgba = Rgba::hex(0x6a7039);
pub const MANGROVE_SWAMP_FOLIAGE: Rgba = Rgba::hex(0x8db127);
pub const ROOFED_FOREST_GRASS: Rgba = Rgba::hex(0x507a32);
pub const MESA_GRASS: Rgba = Rgba::hex(0x90814d);
pub const MESA_FOLIAGE: Rgba = Rgba::hex(0x9e814d);
pub const CHERRY_GROVE_PLANT: Rgba = Rgba::hex(0xb6db61);
pub const PALE_GARDEN_PLANT: Rgba = Rgba::hex(0x878d76);

/// A fixed colour for some `(tint, biome)` combinations.
///
/// Empty `biomes` or `tints` match anything.
#[derive(Clone, Copy, Debug)]
pub struct TintRule {
  pub biomes: &'static [&'static str],
  pub tints: &'static [TintMethod],
  pub color: Rgba,
}

impl TintRule {
  const fn new(
    biomes: &'static [&'static str],
    tints: &'static [TintMethod],
    color: Rgba,
  ) -> Self {
    Self {
      biomes,
      tints,
      color,
    }
  }

  pub fn matches(&self, tint: TintMethod, biome: &str) -> bool {
    (self.tints.is_empty() || self.tints.contains(&tint))
      && (self.biomes.is_empty() || self.biomes.iter().any(|b| *b == biome))
  }
}

use biomes::*;

const ANY: &[&str] = &[];
const ALL: &[TintMethod] = &[];
const SWAMPS: &[&str] = &[SWAMPLAND, SWAMPLAND_MUTATED, MANGROVE_SWAMP];
const ROOFED_FORESTS: &[&str] = &[ROOFED_FOREST, ROOFED_FOREST_MUTATED];
const MESAS: &[&str] = &[
  MESA,
  MESA_BRYCE,
  MESA_PLATEAU,
  MESA_PLATEAU_MUTATED,
  MESA_PLATEAU_STONE,
  MESA_PLATEAU_STONE_MUTATED,
];
const DRY: &[TintMethod] = &[TintMethod::DryFoliage];
const GRASS: &[TintMethod] = &[TintMethod::Grass];

/// Vanilla overrides, in precedence order.
pub const DEFAULT_TINT_RULES: &[TintRule] = &[
  TintRule::new(ANY, &[TintMethod::BirchFoliage], BIRCH_FOLIAGE),
  TintRule::new(ANY, &[TintMethod::EvergreenFoliage], EVERGREEN_FOLIAGE),
  TintRule::new(SWAMPS, DRY, DRY_FOLIAGE_A),
  TintRule::new(SWAMPS, GRASS, SWAMP_GRASS),
  TintRule::new(&[MANGROVE_SWAMP], ALL, MANGROVE_SWAMP_FOLIAGE),
  TintRule::new(&[SWAMPLAND, SWAMPLAND_MUTATED], ALL, SWAMP_FOLIAGE),
  TintRule::new(ROOFED_FORESTS, GRASS, ROOFED_FOREST_GRASS),
  TintRule::new(ROOFED_FORESTS, DRY, DRY_FOLIAGE_A),
  TintRule::new(MESAS, GRASS, MESA_GRASS),
  TintRule::new(MESAS, ALL, MESA_FOLIAGE),
  TintRule::new(&[CHERRY_GROVE], ALL, CHERRY_GROVE_PLANT),
  TintRule::new(&[PALE_GARDEN], DRY, DRY_FOLIAGE_B),
  TintRule::new(&[PALE_GARDEN], ALL, PALE_GARDEN_PLANT),
];

/// Resolves the colour of a plant-tinted block.
pub fn plant_color(
  rules: &[TintRule],
  colormaps: &Colormaps,
  tint: TintMethod,
  biome: &Biome,
) -> Rgba {
  if let Some(rule) = rules.iter().find(|r| r.matches(tint, &biome.name)) {
    return rule.color;
  }
  let colormap = match tint {
    TintMethod::DryFoliage => &colormaps.dry_foliage,
    TintMethod::Grass => &colormaps.grass,
    _ => &colormaps.foliage,
  };
  colormap.sample(biome.temperature, biome.downfall)
}
