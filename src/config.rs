//! Run configuration, loadable from TOML.
//!
//! ```toml
//! [greedy]
//! k = 15
//! threshold = 0.2
//!
//! [merge]
//! alpha = 0.185
//! threshold = 0.185
//!
//! [overlap]
//! alpha = 0.0
//! threshold = 0.185
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::greedy::GreedyOptions;
use crate::refine::{MergeOptions, OverlapOptions};

pub mod defaults {
    pub const DEFAULT_K: u32 = 1;
    pub const DEFAULT_THRESHOLD: f64 = 0.0;
    pub const DEFAULT_STOP_ON_TRAILING_SINGLETON: bool = false;
    pub const DEFAULT_RESIDUAL_BOUND: usize = 0;
    pub const DEFAULT_RESTRICT_TO_NETWORK: bool = false;
    pub const DEFAULT_PARALLEL_SCAN: bool = false;

    pub const DEFAULT_MERGE_ALPHA: f64 = 0.0;
    pub const DEFAULT_OVERLAP_ALPHA: f64 = 0.0;
}

/// Full pipeline configuration. A missing `merge` or `overlap` table
/// disables that stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverConfig {
    pub greedy: GreedyOptions,
    pub merge: Option<MergeOptions>,
    pub overlap: Option<OverlapOptions>,
}

impl CoverConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}
