//! Greedy module cover for weighted multi-cover with clustering.
//!
//! - Input: a coverage matrix (item → element weights) and an interaction
//!   graph over items.
//! - Goal: cover every element `k` times with a few modules of items that
//!   interact strongly with each other.
//! - Greedy stage: repeatedly commit the item with the best benefit / cost
//!   ratio, either to an existing module or as a new one.
//! - Refinement: merge adjacent modules, then grant overlapping memberships.
//!
//! Every stage is deterministic: ties are broken by a fixed total order and all
//! iteration runs over ordered collections.

pub mod config;
pub mod cost;
pub mod error;
pub mod graph;
pub mod greedy;
pub mod ledger;
pub mod logging;
pub mod matrix;
pub mod pipeline;
pub mod priority;
pub mod progress;
pub mod refine;

pub use config::CoverConfig;
pub use cost::{cohesion_cost, marginal_cost, MarginalCost, ModuleStats, Placement};
pub use error::{CoverError, Result};
pub use graph::{InteractionGraph, Network};
pub use greedy::{CoverResult, GreedyOptions, GreedySelector, GreedyStep, StopReason};
pub use ledger::CoverageLedger;
pub use matrix::CoverageMatrix;
pub use pipeline::{ModuleCover, PipelineOutcome};
pub use priority::{ModuleCandidate, PriorityIndex};
pub use progress::{ProgressRecord, ProgressSink, TsvProgressSink};
pub use refine::{
    merge_modules, overlap_modules, MergeOptions, MergeReport, MergeStep, OverlapOptions,
    OverlapReport,
};
