//! Post-processing passes over a finished module list.
//!
//! Both passes take and return plain `Vec<Vec<String>>` module lists so they
//! chain directly after the greedy stage: greedy → merge → overlap.

pub mod merge;
pub mod overlap;

pub use merge::{merge_modules, MergeOptions, MergeReport, MergeStep};
pub use overlap::{overlap_modules, Addition, OverlapOptions, OverlapReport};

use crate::error::{CoverError, Result};

pub(crate) fn validate(modules: &[Vec<String>], alpha: f64, threshold: f64) -> Result<()> {
    if !alpha.is_finite() || !threshold.is_finite() {
        return Err(CoverError::invalid(format!(
            "alpha {alpha} and threshold {threshold} must be finite"
        )));
    }
    if let Some(i) = modules.iter().position(Vec::is_empty) {
        return Err(CoverError::invalid(format!("module {i} is empty")));
    }
    Ok(())
}

/// Append `extra` to `members`, skipping ids already present.
pub(crate) fn union(members: &[String], extra: &[String]) -> Vec<String> {
    let mut out = members.to_vec();
    for id in extra {
        if !out.contains(id) {
            out.push(id.clone());
        }
    }
    out
}
