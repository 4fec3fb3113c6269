//! Level dictionaries for categorical columns.
//!
//! A [`FactorTable`] assigns dense integer codes to level names in order of
//! first appearance, starting at a configurable `start_index`. Tables built
//! on training data are cloned and used frozen for any later data sharing the
//! column, so unseen levels map to [`UNKNOWN_FACTOR_CODE`] instead of being
//! renumbered.

use crate::core::constants::UNKNOWN_FACTOR_CODE;
use crate::core::error::{BitForestError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ordered level dictionary of one categorical column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactorTable {
    start_index: u32,
    lookup: BTreeMap<String, u32>,
    names: Vec<String>,
    counts: Vec<u64>,
}

impl Default for FactorTable {
    fn default() -> Self {
        Self::new()
    }
}

impl FactorTable {
    /// Empty table with codes starting at 0.
    pub fn new() -> Self {
        FactorTable {
            start_index: 0,
            lookup: BTreeMap::new(),
            names: Vec::new(),
            counts: Vec::new(),
        }
    }

    /// Empty table with codes starting at `start_index` (0 or 1).
    pub fn with_start_index(start_index: u32) -> Result<Self> {
        if start_index > 1 {
            return Err(BitForestError::invalid_parameter(
                "factor_start_index",
                start_index.to_string(),
                "must be 0 or 1",
            ));
        }
        Ok(FactorTable {
            start_index,
            ..Self::new()
        })
    }

    /// First code handed out.
    pub fn start_index(&self) -> u32 {
        self.start_index
    }

    /// Number of distinct levels.
    pub fn num_levels(&self) -> usize {
        self.names.len()
    }

    /// Level names in code order.
    pub fn levels(&self) -> &[String] {
        &self.names
    }

    /// Occurrences per level, in code order.
    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    /// Code of `name`, or the next free code if it is new. Counts the occurrence.
    pub fn find_or_add(&mut self, name: &str) -> u32 {
        if let Some(&code) = self.lookup.get(name) {
            self.counts[(code - self.start_index) as usize] += 1;
            return code;
        }
        let code = self.start_index + self.names.len() as u32;
        self.lookup.insert(name.to_string(), code);
        self.names.push(name.to_string());
        self.counts.push(1);
        code
    }

    /// Code of `name` without inserting it.
    pub fn code_of(&self, name: &str) -> Option<u32> {
        self.lookup.get(name).copied()
    }

    /// Name of the level with code `code`.
    pub fn level_name(&self, code: u32) -> Option<&str> {
        self.position(code).map(|i| self.names[i].as_str())
    }

    /// Zero-based position of `code` in [`levels`](Self::levels).
    pub fn position(&self, code: u32) -> Option<usize> {
        if code == UNKNOWN_FACTOR_CODE || code < self.start_index {
            return None;
        }
        let pos = (code - self.start_index) as usize;
        (pos < self.names.len()).then_some(pos)
    }

    /// Row codes of a training column, growing the table.
    pub fn encode_training(&mut self, values: &[Option<String>]) -> Vec<u32> {
        values
            .iter()
            .map(|v| match v {
                Some(name) => self.find_or_add(name),
                None => UNKNOWN_FACTOR_CODE,
            })
            .collect()
    }

    /// Row codes of a column scored against the frozen table. Unseen and
    /// missing values get [`UNKNOWN_FACTOR_CODE`].
    pub fn encode_frozen(&self, values: &[Option<String>]) -> Vec<u32> {
        values
            .iter()
            .map(|v| {
                v.as_deref()
                    .and_then(|name| self.code_of(name))
                    .unwrap_or(UNKNOWN_FACTOR_CODE)
            })
            .collect()
    }
}
