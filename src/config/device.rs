//! Device-specific configuration for bitforest.
//!
//! [`DeviceConfig`] groups the backend settings the forest builder needs, and
//! [`DeviceCapabilities`] answers whether a requested accelerator exists.

use crate::core::constants::*;
use crate::core::error::{BitForestError, GPUError, Result};
use crate::core::types::DeviceType;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Backend settings for forest building.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Backend (CPU, GPU or hybrid)
    pub device_type: DeviceType,
    /// Number of worker threads
    pub num_threads: usize,
    /// Accelerator chunk size in rows
    pub gpu_block_size: usize,
    /// Nodes with more rows than this are routed to the accelerator (hybrid)
    pub hybrid_threshold: usize,
    /// Accelerator device to use
    pub gpu_device_id: i32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig {
            device_type: DeviceType::CPU,
            num_threads: num_cpus::get(),
            gpu_block_size: DEFAULT_GPU_BLOCK_SIZE,
            hybrid_threshold: DEFAULT_HYBRID_THRESHOLD,
            gpu_device_id: 0,
        }
    }
}

impl DeviceConfig {
    /// Create a CPU configuration with the given thread count
    pub fn cpu(num_threads: usize) -> Self {
        DeviceConfig {
            num_threads,
            ..Default::default()
        }
    }

    /// Validate device configuration
    pub fn validate(&self) -> Result<()> {
        if self.num_threads == 0 {
            return Err(BitForestError::invalid_parameter(
                "num_threads",
                "0",
                "must be at least 1",
            ));
        }

        if self.gpu_block_size == 0 || self.gpu_block_size % BITS_PER_BLOCK != 0 {
            return Err(BitForestError::invalid_parameter(
                "gpu_block_size",
                self.gpu_block_size.to_string(),
                format!("must be a positive multiple of {}", BITS_PER_BLOCK),
            ));
        }

        if self.device_type != DeviceType::CPU && self.gpu_device_id < 0 {
            return Err(BitForestError::invalid_parameter(
                "gpu_device_id",
                self.gpu_device_id.to_string(),
                "must be >= 0",
            ));
        }

        Ok(())
    }

    /// Whether the configured backend needs an accelerator at all
    pub fn uses_accelerator(&self) -> bool {
        self.device_type != DeviceType::CPU
    }

    /// Words per accelerator chunk
    pub fn words_per_chunk(&self) -> usize {
        self.gpu_block_size / BITS_PER_BLOCK
    }

    /// Get device configuration as parameter map
    pub fn as_parameter_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert("device_type".to_string(), self.device_type.to_string());
        map.insert("num_threads".to_string(), self.num_threads.to_string());
        map.insert("gpu_block_size".to_string(), self.gpu_block_size.to_string());
        map.insert(
            "hybrid_threshold".to_string(),
            self.hybrid_threshold.to_string(),
        );
        map.insert("gpu_device_id".to_string(), self.gpu_device_id.to_string());
        map
    }
}

/// What the host offers to the forest builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceCapabilities {
    /// Logical CPU cores
    pub num_cpu_cores: usize,
    /// Accelerator devices behind the device queue
    pub num_accelerator_devices: usize,
}

impl DeviceCapabilities {
    /// Probe the host.
    pub fn probe() -> Self {
        DeviceCapabilities {
            num_cpu_cores: num_cpus::get(),
            num_accelerator_devices: NUM_ACCELERATOR_DEVICES,
        }
    }

    /// Check that accelerator `device_id` can be opened.
    pub fn accelerator_available(&self, device_id: i32) -> std::result::Result<(), GPUError> {
        if device_id < 0 || device_id as usize >= self.num_accelerator_devices {
            return Err(GPUError::DeviceNotAvailable {
                device_id,
                available: self.num_accelerator_devices,
            });
        }
        Ok(())
    }

    /// Get a summary of available capabilities
    pub fn summary(&self) -> String {
        format!(
            "{} CPU core(s), {} accelerator device(s)",
            self.num_cpu_cores, self.num_accelerator_devices
        )
    }
}
