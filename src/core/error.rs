//! Error handling and error types for bitforest.
//!
//! Every component reports failure through [`BitForestError`]; expected
//! failure modes (bad configuration, mismatched data, missing devices) are
//! never signalled by panicking.

use std::collections::TryReserveError;
use std::io;
use thiserror::Error;

/// Main error type for the bitforest library.
#[derive(Error, Debug)]
pub enum BitForestError {
    /// Configuration and validation errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Dataset-related errors
    #[error("Dataset error: {message}")]
    Dataset { message: String },

    /// Column layout differs from the layout the cut tables were built for
    #[error("Data dimension mismatch: {message}")]
    DataDimensionMismatch { message: String },

    /// Training-related errors
    #[error("Training error: {message}")]
    Training { message: String },

    /// Tree construction errors
    #[error("Tree construction error: {message}")]
    TreeConstruction { message: String },

    /// Prediction errors
    #[error("Prediction error: {message}")]
    Prediction { message: String },

    /// Accelerator errors
    #[error("GPU computation error: {message}")]
    GPU { message: String },

    /// Memory allocation errors
    #[error("Memory error: {message}")]
    Memory { message: String },

    /// Model serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// File I/O errors
    #[error("I/O error: {source}")]
    IO {
        #[from]
        source: io::Error,
    },

    /// JSON serialization errors
    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    /// Bincode serialization errors
    #[error("Bincode error: {source}")]
    Bincode {
        #[from]
        source: bincode::Error,
    },

    /// Invalid input parameters
    #[error("Invalid parameter: {parameter} = {value}, {reason}")]
    InvalidParameter {
        parameter: String,
        value: String,
        reason: String,
    },

    /// Dimension mismatch errors
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: String, actual: String },

    /// Internal library errors (should not occur in normal usage)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Dataset-specific errors
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Empty dataset provided")]
    Empty,

    #[error("Column {index} has {actual} rows, expected {expected}")]
    RowCountMismatch {
        index: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Column {index} has type '{actual}', expected '{expected}'")]
    ColumnTypeMismatch {
        index: usize,
        expected: char,
        actual: char,
    },

    #[error("Response column has a missing value at row {row}")]
    MissingResponse { row: usize },
}

/// Accelerator errors
#[derive(Error, Debug)]
pub enum GPUError {
    #[error("GPU device {device_id} not available ({available} device(s) present)")]
    DeviceNotAvailable { device_id: i32, available: usize },

    #[error("GPU memory allocation failed: requested {size} bytes")]
    MemoryAllocation { size: usize },
}

/// Type alias for Results using BitForestError
pub type Result<T> = std::result::Result<T, BitForestError>;

impl BitForestError {
    /// Create a configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        BitForestError::Config {
            message: message.into(),
        }
    }

    /// Create a dataset error
    pub fn dataset<S: Into<String>>(message: S) -> Self {
        BitForestError::Dataset {
            message: message.into(),
        }
    }

    /// Create a data dimension mismatch error
    pub fn data_dimension_mismatch<S: Into<String>>(message: S) -> Self {
        BitForestError::DataDimensionMismatch {
            message: message.into(),
        }
    }

    /// Create a training error
    pub fn training<S: Into<String>>(message: S) -> Self {
        BitForestError::Training {
            message: message.into(),
        }
    }

    /// Create a tree construction error
    pub fn tree_construction<S: Into<String>>(message: S) -> Self {
        BitForestError::TreeConstruction {
            message: message.into(),
        }
    }

    /// Create a prediction error
    pub fn prediction<S: Into<String>>(message: S) -> Self {
        BitForestError::Prediction {
            message: message.into(),
        }
    }

    /// Create a GPU error
    pub fn gpu<S: Into<String>>(message: S) -> Self {
        BitForestError::GPU {
            message: message.into(),
        }
    }

    /// Create a memory error
    pub fn memory<S: Into<String>>(message: S) -> Self {
        BitForestError::Memory {
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization<S: Into<String>>(message: S) -> Self {
        BitForestError::Serialization {
            message: message.into(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter<P, V, R>(parameter: P, value: V, reason: R) -> Self
    where
        P: Into<String>,
        V: Into<String>,
        R: Into<String>,
    {
        BitForestError::InvalidParameter {
            parameter: parameter.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a dimension mismatch error
    pub fn dimension_mismatch<E, A>(expected: E, actual: A) -> Self
    where
        E: Into<String>,
        A: Into<String>,
    {
        BitForestError::DimensionMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create an internal error (should be used sparingly)
    pub fn internal<S: Into<String>>(message: S) -> Self {
        BitForestError::Internal {
            message: message.into(),
        }
    }

    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            BitForestError::Config { .. } => false,
            BitForestError::Dataset { .. } => false,
            BitForestError::DataDimensionMismatch { .. } => false,
            BitForestError::Training { .. } => true,
            BitForestError::TreeConstruction { .. } => true,
            BitForestError::Prediction { .. } => true,
            BitForestError::GPU { .. } => true,
            BitForestError::Memory { .. } => false,
            BitForestError::Serialization { .. } => false,
            BitForestError::IO { .. } => false,
            BitForestError::Json { .. } => false,
            BitForestError::Bincode { .. } => false,
            BitForestError::InvalidParameter { .. } => false,
            BitForestError::DimensionMismatch { .. } => false,
            BitForestError::Internal { .. } => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            BitForestError::Config { .. } => "config",
            BitForestError::Dataset { .. } => "dataset",
            BitForestError::DataDimensionMismatch { .. } => "data_dimension_mismatch",
            BitForestError::Training { .. } => "training",
            BitForestError::TreeConstruction { .. } => "tree_construction",
            BitForestError::Prediction { .. } => "prediction",
            BitForestError::GPU { .. } => "gpu",
            BitForestError::Memory { .. } => "memory",
            BitForestError::Serialization { .. } => "serialization",
            BitForestError::IO { .. } => "io",
            BitForestError::Json { .. } => "json",
            BitForestError::Bincode { .. } => "bincode",
            BitForestError::InvalidParameter { .. } => "invalid_parameter",
            BitForestError::DimensionMismatch { .. } => "dimension_mismatch",
            BitForestError::Internal { .. } => "internal",
        }
    }
}

impl From<DatasetError> for BitForestError {
    fn from(err: DatasetError) -> Self {
        match err {
            DatasetError::RowCountMismatch { .. } | DatasetError::ColumnTypeMismatch { .. } => {
                BitForestError::DataDimensionMismatch {
                    message: err.to_string(),
                }
            }
            _ => BitForestError::Dataset {
                message: err.to_string(),
            },
        }
    }
}

impl From<TryReserveError> for BitForestError {
    fn from(err: TryReserveError) -> Self {
        BitForestError::Memory {
            message: err.to_string(),
        }
    }
}

impl From<GPUError> for BitForestError {
    fn from(err: GPUError) -> Self {
        BitForestError::GPU {
            message: err.to_string(),
        }
    }
}

/// Convenience macros for error creation
#[macro_export]
macro_rules! config_error {
    ($msg:expr) => {
        $crate::core::error::BitForestError::config($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::core::error::BitForestError::config(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! dataset_error {
    ($msg:expr) => {
        $crate::core::error::BitForestError::dataset($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::core::error::BitForestError::dataset(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !($cond) {
            return Err($err.into());
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = BitForestError::config("test configuration error");
        assert_eq!(err.category(), "config");
        assert!(!err.is_recoverable());

        let err = BitForestError::tree_construction("node storage exhausted");
        assert_eq!(err.category(), "tree_construction");
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_error_macros() {
        let err = config_error!("test error");
        assert!(matches!(err, BitForestError::Config { .. }));

        let err = dataset_error!("test error with param: {}", 42);
        assert!(matches!(err, BitForestError::Dataset { .. }));
    }

    #[test]
    fn test_dataset_error_conversion() {
        let err: BitForestError = DatasetError::Empty.into();
        assert!(matches!(err, BitForestError::Dataset { .. }));

        let err: BitForestError = DatasetError::ColumnTypeMismatch {
            index: 2,
            expected: 'n',
            actual: 'f',
        }
        .into();
        assert!(matches!(err, BitForestError::DataDimensionMismatch { .. }));
        assert!(err.to_string().contains("'f'"));
    }

    #[test]
    fn test_gpu_error_conversion() {
        let err: BitForestError = GPUError::DeviceNotAvailable {
            device_id: 3,
            available: 1,
        }
        .into();
        assert_eq!(err.category(), "gpu");
        assert!(err.to_string().contains("device 3"));
    }

    #[test]
    fn test_parameter_errors() {
        let err = BitForestError::invalid_parameter("gpu_block_size", "100", "must be a multiple of 64");
        assert_eq!(err.category(), "invalid_parameter");
        assert!(!err.is_recoverable());
        assert!(err.to_string().contains("gpu_block_size = 100"));
    }

    #[test]
    fn test_allocation_failure_is_a_memory_error() {
        let mut nodes: Vec<u64> = Vec::new();
        let err: BitForestError = nodes.try_reserve(usize::MAX).unwrap_err().into();
        assert_eq!(err.category(), "memory");
        assert!(!err.is_recoverable());

        let err: BitForestError = GPUError::MemoryAllocation { size: 1 << 40 }.into();
        assert_eq!(err.category(), "gpu");
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: BitForestError = io_err.into();
        assert!(matches!(err, BitForestError::IO { .. }));
        assert_eq!(err.category(), "io");
    }
}
