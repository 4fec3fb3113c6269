//! Configuration management for bitforest.
//!
//! [`Config`] carries every option of the engine and is validated once before
//! any building starts; [`DeviceConfig`] is the slice of it the backends see.

pub mod core;
pub mod device;

pub use self::core::{Config, ConfigBuilder};
pub use self::device::{DeviceCapabilities, DeviceConfig};

use crate::core::error::Result;
use std::path::Path;

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "bitforest.toml";

/// Load a configuration file and then apply `BITFOREST_*` environment overrides.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let mut config = Config::load_from_file(path)?;
    config.apply_environment_overrides()?;
    log::debug!("Loaded configuration: {:?}", config.as_parameter_map());
    Ok(config)
}
