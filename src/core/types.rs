//! Core data types shared by every bitforest component.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One packed word of row bits, equivalent to `bitblock_t`.
pub type BitBlock = u64;

/// Row index type.
pub type RowIndex = usize;

/// Index of a predictor variable (column of the data frame, response excluded).
pub type VarIndex = usize;

/// Index of a binary feature in the binarized design matrix.
pub type BinaryFeatureIndex = usize;

/// Tree node identifier type (position in a tree's node arena).
pub type NodeIndex = usize;

/// Class index of an encoded response (`0..nlevels`).
pub type ClassIndex = usize;

/// Column type of a data frame column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VarType {
    /// Continuous column (`'n'`)
    Numeric,
    /// Integer column (`'i'`)
    Integer,
    /// Categorical column (`'f'`)
    Factor,
}

impl VarType {
    /// Single character code used in `var_types` strings.
    pub fn code(&self) -> char {
        match self {
            VarType::Numeric => 'n',
            VarType::Integer => 'i',
            VarType::Factor => 'f',
        }
    }

    /// Parse a single character code.
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'n' => Some(VarType::Numeric),
            'i' => Some(VarType::Integer),
            'f' => Some(VarType::Factor),
            _ => None,
        }
    }

    /// Whether the variable's values are ordered (thresholded by cuts).
    pub fn is_ordered(&self) -> bool {
        !matches!(self, VarType::Factor)
    }
}

impl fmt::Display for VarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Learning task, selected by the caller's task hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskType {
    /// Continuous target
    Regression,
    /// Categorical or bucketed target
    Classification,
}

impl Default for TaskType {
    fn default() -> Self {
        TaskType::Classification
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskType::Regression => write!(f, "regression"),
            TaskType::Classification => write!(f, "classification"),
        }
    }
}

/// Execution backend for forest building.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceType {
    /// Tree-parallel CPU threads
    CPU,
    /// Split evaluation offloaded to the accelerator
    GPU,
    /// Per-node routing between CPU and GPU by row count
    Hybrid,
}

impl Default for DeviceType {
    fn default() -> Self {
        DeviceType::CPU
    }
}

impl DeviceType {
    /// Map the integer backend selector (`0` CPU, `1` GPU, `2` hybrid).
    pub fn from_selector(selector: i32) -> Option<Self> {
        match selector {
            0 => Some(DeviceType::CPU),
            1 => Some(DeviceType::GPU),
            2 => Some(DeviceType::Hybrid),
            _ => None,
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceType::CPU => write!(f, "cpu"),
            DeviceType::GPU => write!(f, "gpu"),
            DeviceType::Hybrid => write!(f, "hybrid"),
        }
    }
}

/// Impurity criterion used to rank candidate splits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SplitCriterion {
    /// Gini impurity decrease
    Gini,
    /// Entropy (information gain)
    Entropy,
    /// Variance reduction on bucket means
    Variance,
}

impl SplitCriterion {
    /// Default criterion for a task.
    pub fn default_for(task: TaskType) -> Self {
        match task {
            TaskType::Regression => SplitCriterion::Variance,
            TaskType::Classification => SplitCriterion::Gini,
        }
    }
}

impl fmt::Display for SplitCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SplitCriterion::Gini => write!(f, "gini"),
            SplitCriterion::Entropy => write!(f, "entropy"),
            SplitCriterion::Variance => write!(f, "variance"),
        }
    }
}

/// Rule for aggregating leaf outputs across trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteMethod {
    /// Plurality class of each leaf gets weight 1
    Hard,
    /// Leaf class frequencies are averaged
    Soft,
}

impl Default for VoteMethod {
    fn default() -> Self {
        VoteMethod::Soft
    }
}

impl fmt::Display for VoteMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoteMethod::Hard => write!(f, "hard"),
            VoteMethod::Soft => write!(f, "soft"),
        }
    }
}

/// Verbosity levels for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VerbosityLevel {
    /// Only errors
    Fatal,
    /// Warnings and errors
    Warning,
    /// General progress
    Info,
    /// Detailed tracing
    Debug,
}

impl Default for VerbosityLevel {
    fn default() -> Self {
        VerbosityLevel::Info
    }
}

impl VerbosityLevel {
    /// Matching `log` level filter.
    pub fn as_level_filter(&self) -> log::LevelFilter {
        match self {
            VerbosityLevel::Fatal => log::LevelFilter::Error,
            VerbosityLevel::Warning => log::LevelFilter::Warn,
            VerbosityLevel::Info => log::LevelFilter::Info,
            VerbosityLevel::Debug => log::LevelFilter::Debug,
        }
    }
}
