//! Greedy → merge → overlap, driven by a [`CoverConfig`].

use serde::Serialize;
use tracing::info_span;

use crate::config::CoverConfig;
use crate::error::Result;
use crate::graph::InteractionGraph;
use crate::greedy::{CoverResult, GreedySelector};
use crate::matrix::CoverageMatrix;
use crate::progress::ProgressSink;
use crate::refine::{merge_modules, overlap_modules, MergeReport, OverlapReport};

#[derive(Clone, Debug, Serialize)]
pub struct PipelineOutcome {
    pub greedy: CoverResult,
    pub merge: Option<MergeReport>,
    pub overlap: Option<OverlapReport>,
}

impl PipelineOutcome {
    /// Modules produced by the last stage that ran.
    pub fn modules(&self) -> &[Vec<String>] {
        if let Some(overlap) = &self.overlap {
            &overlap.modules
        } else if let Some(merge) = &self.merge {
            &merge.modules
        } else {
            &self.greedy.modules
        }
    }
}

pub struct ModuleCover<'a> {
    pub matrix: &'a CoverageMatrix,
    pub graph: &'a InteractionGraph,
    pub config: CoverConfig,
}

impl<'a> ModuleCover<'a> {
    pub fn new(
        matrix: &'a CoverageMatrix,
        graph: &'a InteractionGraph,
        config: CoverConfig,
    ) -> Self {
        Self {
            matrix,
            graph,
            config,
        }
    }

    pub fn run(&self) -> Result<PipelineOutcome> {
        self.run_stages(None)
    }

    pub fn run_with_progress(&self, sink: &mut dyn ProgressSink) -> Result<PipelineOutcome> {
        self.run_stages(Some(sink))
    }

    fn run_stages(&self, sink: Option<&mut dyn ProgressSink>) -> Result<PipelineOutcome> {
        let selector = GreedySelector::new(self.matrix, self.graph, self.config.greedy.clone());
        let greedy = {
            let _span = info_span!("greedy").entered();
            match sink {
                Some(sink) => selector.run_with_progress(sink)?,
                None => selector.run()?,
            }
        };

        let merge = match &self.config.merge {
            Some(opts) => {
                let _span = info_span!("merge").entered();
                Some(merge_modules(&greedy.modules, self.graph, opts)?)
            }
            None => None,
        };

        let overlap = match &self.config.overlap {
            Some(opts) => {
                let _span = info_span!("overlap").entered();
                let input = merge.as_ref().map_or(&greedy.modules, |m| &m.modules);
                Some(overlap_modules(input, self.graph, opts)?)
            }
            None => None,
        };

        Ok(PipelineOutcome {
            greedy,
            merge,
            overlap,
        })
    }
}
