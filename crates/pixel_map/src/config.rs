//! Map configuration, loaded from TOML.

use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{fmt, io};

use serde::{Deserialize, Serialize};

use crate::events::ReloadPolicy;
use crate::render::RenderOptions;

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
  /// Standard I/O error.
  Io(io::Error),
  /// The file is not valid TOML for [`MapConfig`].
  Parse(toml::de::Error),
  /// A value is out of range.
  Invalid(String),
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Io(e) => write!(f, "I/O error: {e}"),
      Self::Parse(e) => write!(f, "parse error: {e}"),
      Self::Invalid(msg) => write!(f, "invalid config: {msg}"),
    }
  }
}

impl Error for ConfigError {
  fn source(&self) -> Option<&(dyn Error + 'static)> {
    match self {
      Self::Io(e) => Some(e),
      Self::Parse(e) => Some(e),
      Self::Invalid(_) => None,
    }
  }
}

impl From<io::Error> for ConfigError {
  fn from(err: io::Error) -> Self {
    Self::Io(err)
  }
}

impl From<toml::de::Error> for ConfigError {
  fn from(err: toml::de::Error) -> Self {
    Self::Parse(err)
  }
}

/// Map settings. Every key is optional.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MapConfig {
  /// Root directory of persisted tiles.
  pub tiles_dir: PathBuf,
  /// Root directory holding `colormap/*.png`.
  pub assets_dir: PathBuf,
  /// Seconds between dirty sweeps.
  pub update_interval: u64,
  /// Draw blocks beneath water with a water tint instead of the water
  /// surface.
  pub render_underwater_blocks: bool,
  /// Always scan columns from the dimension's top instead of its height map.
  pub ignore_world_height_map: bool,
  /// Handling of chunks that become resident again.
  pub reload_policy: ReloadPolicy,
}

impl Default for MapConfig {
  fn default() -> Self {
    Self {
      tiles_dir: PathBuf::from("tiles"),
      assets_dir: PathBuf::from("assets"),
      update_interval: 10,
      render_underwater_blocks: true,
      ignore_world_height_map: false,
      reload_policy: ReloadPolicy::Always,
    }
  }
}

impl MapConfig {
  /// Reads and validates a config file.
  pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    Self::from_toml_str(&contents)
  }

  /// Parses and validates TOML.
  pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
    let config: Self = toml::from_str(contents)?;
    config.validate()?;
    Ok(config)
  }

  /// Serializes to TOML, e.g. to write out defaults.
  pub fn to_toml_string(&self) -> Result<String, ConfigError> {
    toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.update_interval == 0 {
      return Err(ConfigError::Invalid(
        "update_interval must be at least 1 second".into(),
      ));
    }
    Ok(())
  }

  pub fn update_interval(&self) -> Duration {
    Duration::from_secs(self.update_interval)
  }

  pub fn render_options(&self) -> RenderOptions {
    RenderOptions {
      render_underwater_blocks: self.render_underwater_blocks,
      use_height_map: !self.ignore_world_height_map,
    }
  }
}
