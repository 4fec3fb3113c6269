//! Core infrastructure module for bitforest.
//!
//! - [`types`]: Fundamental data types and enumerations
//! - [`constants`]: Hard bounds and configuration defaults
//! - [`error`]: Error handling and error types
//! - [`bitrows`]: The packed row bitset every other component builds on
//!
//! ```rust
//! use bitforest::core::{
//!     bitrows::BitRows,
//!     constants::BITS_PER_BLOCK,
//!     error::{BitForestError, Result},
//! };
//!
//! let rows = BitRows::ones(100);
//! assert_eq!(rows.num_blocks(), 2);
//! assert_eq!(rows.num_blocks() * BITS_PER_BLOCK - rows.discard_bits(), 100);
//! # Ok::<(), BitForestError>(())
//! ```

pub mod bitrows;
pub mod constants;
pub mod error;
pub mod types;

pub use constants::*;
pub use error::{BitForestError, Result};
pub use types::*;

use std::sync::atomic::{AtomicBool, Ordering};

/// Host capabilities relevant to forest building.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreCapabilities {
    /// Logical CPU cores
    pub num_cpu_cores: usize,
    /// Accelerator devices reachable through the device queue
    pub num_accelerator_devices: usize,
    /// Width of one packed bit block
    pub bits_per_block: usize,
}

impl CoreCapabilities {
    /// Probe the current host.
    pub fn current() -> Self {
        CoreCapabilities {
            num_cpu_cores: num_cpus::get(),
            num_accelerator_devices: NUM_ACCELERATOR_DEVICES,
            bits_per_block: BITS_PER_BLOCK,
        }
    }

    /// Get a summary of available capabilities
    pub fn summary(&self) -> String {
        format!(
            "Core capabilities: {} CPU core(s), {} accelerator device(s), {}-bit blocks",
            self.num_cpu_cores, self.num_accelerator_devices, self.bits_per_block
        )
    }
}

static CORE_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initialize logging and record that the library is ready. Idempotent.
pub fn initialize_core() -> Result<()> {
    initialize(None);
    Ok(())
}

/// Initialize like [`initialize_core`], then cap logging at `verbosity`.
///
/// The `log` max level is set on every call; the installed logger keeps the
/// filter it was created with.
pub fn initialize_with_verbosity(verbosity: VerbosityLevel) -> Result<()> {
    let level = verbosity.as_level_filter();
    initialize(Some(level));
    log::set_max_level(level);
    Ok(())
}

/// Check if the core module is initialized
pub fn is_core_initialized() -> bool {
    CORE_INITIALIZED.load(Ordering::SeqCst)
}

fn initialize(level: Option<log::LevelFilter>) {
    if CORE_INITIALIZED.swap(true, Ordering::SeqCst) {
        return;
    }
    initialize_logging(level);
    log::info!("bitforest {} initialized", BITFOREST_VERSION);
    log::debug!("{}", CoreCapabilities::current().summary());
}

fn initialize_logging(level: Option<log::LevelFilter>) {
    let env = env_logger::Env::default().default_filter_or("info");
    let mut builder = env_logger::Builder::from_env(env);
    if let Some(level) = level {
        builder.filter_level(level);
    }
    // Another logger may already be installed by the embedding application.
    let _ = builder.try_init();
}
