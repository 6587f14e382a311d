use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::defaults;
use crate::cost::{self, ModuleStats, Placement};
use crate::error::{CoverError, Result};
use crate::graph::{InteractionGraph, Network};
use crate::ledger::CoverageLedger;
use crate::matrix::CoverageMatrix;
use crate::priority::PriorityIndex;
use crate::progress::{ProgressRecord, ProgressSink};

/// Options controlling the greedy module cover.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GreedyOptions {
    /// Number of times every element must be covered.
    pub k: u32,

    /// Edge-weight threshold of the cost model. Items whose average
    /// interaction with a module falls below it never join that module.
    pub threshold: f64,

    /// Stop as soon as the best move is a new singleton module with
    /// benefit and cost both exactly 1.
    pub stop_on_trailing_singleton: bool,

    /// Number of elements allowed to stay unsatisfied (outliers).
    pub residual_bound: usize,

    /// Only items present in the interaction graph are candidates.
    pub restrict_to_network: bool,

    /// If enabled (feature `parallel`), score candidates in parallel.
    pub parallel_scan: bool,
}

impl Default for GreedyOptions {
    fn default() -> Self {
        Self {
            k: defaults::DEFAULT_K,
            threshold: defaults::DEFAULT_THRESHOLD,
            stop_on_trailing_singleton: defaults::DEFAULT_STOP_ON_TRAILING_SINGLETON,
            residual_bound: defaults::DEFAULT_RESIDUAL_BOUND,
            restrict_to_network: defaults::DEFAULT_RESTRICT_TO_NETWORK,
            parallel_scan: defaults::DEFAULT_PARALLEL_SCAN,
        }
    }
}

/// Why the greedy loop terminated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    AllSatisfied,
    ResidualBound,
    NoBenefit,
    TrailingSingleton,
    PoolExhausted,
}

/// One committed greedy step.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GreedyStep {
    pub iteration: usize,
    pub item: String,
    pub module: usize,
    /// True when the item opened a new module.
    pub opened: bool,
    pub benefit: f64,
    pub cost: f64,
    pub score: f64,
    pub newly_satisfied: usize,
}

/// Result of the greedy stage.
#[derive(Clone, Debug, Serialize)]
pub struct CoverResult {
    /// Modules as item ids, members in commit order.
    pub modules: Vec<Vec<String>>,
    pub total_cost: f64,
    pub steps: Vec<GreedyStep>,
    /// Final remaining demand per element.
    pub remaining: Vec<f64>,
    /// Elements still unsatisfied at termination.
    pub unsatisfied: Vec<usize>,
    /// Scans performed, including a final one that committed nothing.
    pub iterations: usize,
    pub stop_reason: StopReason,
}

/// Greedy module-cover engine.
///
/// Assumptions:
/// - `matrix` is validated at construction (nonnegative finite weights).
/// - `graph` may mention items absent from `matrix`; they are ignored.
/// - Neither input is mutated; the ledger works on its own copy.
pub struct GreedySelector<'a> {
    pub matrix: &'a CoverageMatrix,
    pub graph: &'a InteractionGraph,
    pub options: GreedyOptions,
}

#[derive(Clone, Copy, Debug)]
struct Candidate {
    item: usize,
    placement: Placement,
    benefit: f64,
    cost: f64,
    score: f64,
    original_total: f64,
    rank: usize,
}

impl Candidate {
    /// Total order: score, then original coverage, then smaller identifier.
    fn compare(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| self.original_total.total_cmp(&other.original_total))
            .then_with(|| other.rank.cmp(&self.rank))
    }
}

/// State frozen for the duration of one candidate scan.
struct ScanContext<'s> {
    matrix: &'s CoverageMatrix,
    ledger: &'s CoverageLedger,
    index: &'s PriorityIndex,
    modules: &'s [Vec<usize>],
    avg_cost: &'s [f64],
    ranks: &'s [usize],
    threshold: f64,
    iteration: usize,
}

impl ScanContext<'_> {
    fn evaluate(&self, item: usize) -> Result<Candidate> {
        let benefit = self
            .ledger
            .benefit(item)
            .ok_or_else(|| CoverError::InconsistentState {
                iteration: self.iteration,
                details: format!(
                    "candidate `{}` has no coverage row",
                    self.matrix.item_id(item)
                ),
            })?;

        let proposal = match self.index.best(item) {
            Some(top) => {
                let members = self.modules.get(top.module).ok_or_else(|| {
                    CoverError::InconsistentState {
                        iteration: self.iteration,
                        details: format!(
                            "item `{}` points at module {} but only {} exist",
                            self.matrix.item_id(item),
                            top.module,
                            self.modules.len()
                        ),
                    }
                })?;
                let stats = ModuleStats {
                    size: members.len(),
                    avg_cost: self.avg_cost[top.module],
                };
                let sum = self.index.interaction_sum(item, top.module).unwrap_or(0.0);
                Some((top.module, stats, sum))
            }
            None => None,
        };

        let mc = cost::marginal_cost(proposal, self.threshold);
        if !(mc.cost.is_finite() && mc.cost > 0.0) {
            return Err(CoverError::NonPositiveCost {
                iteration: self.iteration,
                item: self.matrix.item_id(item).to_string(),
                module: match mc.placement {
                    Placement::Existing(m) => m,
                    Placement::New => self.modules.len(),
                },
                cost: mc.cost,
            });
        }

        Ok(Candidate {
            item,
            placement: mc.placement,
            benefit,
            cost: mc.cost,
            score: benefit / mc.cost,
            original_total: self.matrix.total(item),
            rank: self.ranks[item],
        })
    }
}

impl<'a> GreedySelector<'a> {
    pub fn new(
        matrix: &'a CoverageMatrix,
        graph: &'a InteractionGraph,
        options: GreedyOptions,
    ) -> Self {
        Self {
            matrix,
            graph,
            options,
        }
    }

    /// Run the greedy cover and return the modules found.
    ///
    /// Algorithm, per iteration:
    /// 1) For each candidate read its cheapest module (or a new one) and its
    ///    residual benefit; score = benefit / cost.
    /// 2) Pick the best score (ties: original coverage, then identifier).
    /// 3) Stop if the score is 0 or the optional trailing-singleton rule fires.
    /// 4) Otherwise commit: grow or open the module, update the ledger, then
    ///    refresh the priority index for the module's neighborhood.
    pub fn run(&self) -> Result<CoverResult> {
        self.execute(None)
    }

    /// Same as [`run`](Self::run), reporting every committed step to `sink`.
    pub fn run_with_progress(&self, sink: &mut dyn ProgressSink) -> Result<CoverResult> {
        self.execute(Some(sink))
    }

    fn execute(&self, mut sink: Option<&mut dyn ProgressSink>) -> Result<CoverResult> {
        self.validate_inputs()?;

        let n_items = self.matrix.item_count();
        let threshold = self.options.threshold;
        let network = Network::new(self.graph, self.matrix);
        let ranks = identifier_ranks(self.matrix);
        let mut pool = self.candidate_pool(&network)?;

        let mut ledger = CoverageLedger::new(self.matrix, self.options.k)?;
        let mut index = PriorityIndex::new(n_items, threshold);
        let mut selected = vec![false; n_items];
        let mut modules: Vec<Vec<usize>> = Vec::new();
        let mut avg_cost: Vec<f64> = Vec::new();
        let mut steps = Vec::new();
        let mut total_cost = 0.0;
        let mut iteration = 0;

        info!(
            items = n_items,
            candidates = pool.len(),
            elements = self.matrix.element_count(),
            k = self.options.k,
            threshold,
            "starting greedy module cover"
        );

        let stop_reason = loop {
            if ledger.unsatisfied_count() == 0 {
                break StopReason::AllSatisfied;
            }
            if ledger.unsatisfied_count() <= self.options.residual_bound {
                break StopReason::ResidualBound;
            }
            iteration += 1;

            let ctx = ScanContext {
                matrix: self.matrix,
                ledger: &ledger,
                index: &index,
                modules: &modules,
                avg_cost: &avg_cost,
                ranks: &ranks,
                threshold,
                iteration,
            };
            let Some(best) = self.scan(&pool, &ctx)? else {
                break StopReason::PoolExhausted;
            };
            let item_id = self.matrix.item_id(best.item);

            if selected[best.item] || !ledger.is_available(best.item) {
                return Err(CoverError::InconsistentState {
                    iteration,
                    details: format!("item `{item_id}` selected twice"),
                });
            }
            if best.score == 0.0 {
                break StopReason::NoBenefit;
            }
            if self.options.stop_on_trailing_singleton
                && best.placement == Placement::New
                && best.benefit == 1.0
                && best.cost == 1.0
            {
                break StopReason::TrailingSingleton;
            }

            let module = match best.placement {
                Placement::Existing(m) => {
                    let members = modules.get_mut(m).ok_or_else(|| CoverError::InconsistentState {
                        iteration,
                        details: format!("item `{item_id}` assigned to missing module {m}"),
                    })?;
                    members.push(best.item);
                    avg_cost[m] += 1.0 - best.cost + threshold;
                    m
                }
                Placement::New => {
                    modules.push(vec![best.item]);
                    avg_cost.push(threshold);
                    modules.len() - 1
                }
            };

            selected[best.item] = true;
            pool.remove(&best.item);
            index.retire(best.item);
            let newly = ledger
                .commit(best.item)
                .map_err(|err| CoverError::InconsistentState {
                    iteration,
                    details: format!("item `{item_id}` (index {}): {err}", best.item),
                })?;
            total_cost += best.cost;

            let members = &modules[module];
            let neighbors = network.neighborhood(members, &selected);
            let stats = ModuleStats {
                size: members.len(),
                avg_cost: avg_cost[module],
            };
            index.module_grew(module, stats, best.item, members, &neighbors, &network);

            debug!(
                iteration,
                item = item_id,
                module,
                benefit = best.benefit,
                cost = best.cost,
                score = best.score,
                newly_satisfied = newly.len(),
                unsatisfied = ledger.unsatisfied_count(),
                "committed"
            );

            if let Some(sink) = sink.as_deref_mut() {
                let (max_covered, min_covered, avg_covered) = ledger.coverage_stats();
                sink.record(&ProgressRecord {
                    iteration,
                    module,
                    item: item_id.to_string(),
                    max_covered,
                    min_covered,
                    avg_covered,
                    benefit: best.benefit,
                    cost: best.cost,
                })?;
            }

            steps.push(GreedyStep {
                iteration,
                item: item_id.to_string(),
                module,
                opened: best.placement == Placement::New,
                benefit: best.benefit,
                cost: best.cost,
                score: best.score,
                newly_satisfied: newly.len(),
            });
        };

        if let Some(sink) = sink {
            sink.finish()?;
        }

        info!(
            ?stop_reason,
            modules = modules.len(),
            selected = steps.len(),
            total_cost,
            unsatisfied = ledger.unsatisfied_count(),
            "greedy module cover finished"
        );

        Ok(CoverResult {
            modules: modules
                .iter()
                .map(|m| m.iter().map(|&i| self.matrix.item_id(i).to_string()).collect())
                .collect(),
            total_cost,
            steps,
            remaining: ledger.remaining().to_vec(),
            unsatisfied: ledger.unsatisfied().iter().copied().collect(),
            iterations: iteration,
            stop_reason,
        })
    }

    fn scan(&self, pool: &BTreeSet<usize>, ctx: &ScanContext<'_>) -> Result<Option<Candidate>> {
        if self.options.parallel_scan {
            #[cfg(feature = "parallel")]
            {
                use rayon::prelude::*;
                let scored = pool
                    .par_iter()
                    .map(|&item| ctx.evaluate(item))
                    .collect::<Result<Vec<_>>>()?;
                return Ok(scored.into_iter().max_by(Candidate::compare));
            }
        }

        let mut best: Option<Candidate> = None;
        for &item in pool {
            let candidate = ctx.evaluate(item)?;
            best = match best {
                Some(b) if b.compare(&candidate) != Ordering::Less => Some(b),
                _ => Some(candidate),
            };
        }
        Ok(best)
    }

    fn validate_inputs(&self) -> Result<()> {
        if self.options.k == 0 {
            return Err(CoverError::invalid("cover multiplicity k must be positive"));
        }
        if !self.options.threshold.is_finite() {
            return Err(CoverError::invalid(format!(
                "threshold {} is not finite",
                self.options.threshold
            )));
        }
        if self.options.residual_bound >= self.matrix.element_count() {
            warn!(
                residual_bound = self.options.residual_bound,
                elements = self.matrix.element_count(),
                "residual bound admits every element; nothing will be selected"
            );
        }
        if self.options.parallel_scan && cfg!(not(feature = "parallel")) {
            debug!("parallel_scan requested without the `parallel` feature; scanning sequentially");
        }
        Ok(())
    }

    fn candidate_pool(&self, network: &Network) -> Result<BTreeSet<usize>> {
        let pool: BTreeSet<usize> = (0..self.matrix.item_count())
            .filter(|&i| !self.options.restrict_to_network || network.in_graph(i))
            .collect();
        if pool.is_empty() {
            return Err(CoverError::invalid(
                "no candidate items: none of the coverage items appear in the interaction graph",
            ));
        }
        Ok(pool)
    }
}

/// Position of each item in lexicographic identifier order.
fn identifier_ranks(matrix: &CoverageMatrix) -> Vec<usize> {
    let mut order: Vec<usize> = (0..matrix.item_count()).collect();
    order.sort_by(|&a, &b| matrix.item_id(a).cmp(matrix.item_id(b)));
    let mut ranks = vec![0; order.len()];
    for (rank, item) in order.into_iter().enumerate() {
        ranks[item] = rank;
    }
    ranks
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng, rngs::StdRng};

    fn abc() -> CoverageMatrix {
        CoverageMatrix::from_sets(
            4,
            [("A", vec![0, 1]), ("B", vec![1, 2]), ("C", vec![3])],
        )
        .unwrap()
    }

    #[test]
    fn test_identifier_ranks() {
        let m = CoverageMatrix::from_sets(1, [("b", vec![0]), ("a", vec![0]), ("c", vec![0])])
            .unwrap();
        assert_eq!(identifier_ranks(&m), vec![1, 0, 2]);
    }

    #[test]
    fn test_candidate_compare_is_total() {
        let base = Candidate {
            item: 0,
            placement: Placement::New,
            benefit: 2.0,
            cost: 1.0,
            score: 2.0,
            original_total: 2.0,
            rank: 0,
        };
        let other = Candidate {
            item: 1,
            rank: 1,
            ..base
        };
        assert_eq!(base.compare(&other), Ordering::Greater);
        let richer = Candidate {
            original_total: 3.0,
            ..other
        };
        assert_eq!(base.compare(&richer), Ordering::Less);
    }

    #[test]
    fn test_empty_graph_gives_singletons() {
        let m = abc();
        let g = InteractionGraph::new();
        let res = GreedySelector::new(&m, &g, GreedyOptions::default()).run().unwrap();
        assert_eq!(res.modules, vec![vec!["A"], vec!["B"], vec!["C"]]);
        assert_eq!(res.total_cost, 3.0);
        assert_eq!(res.stop_reason, StopReason::AllSatisfied);
    }

    #[test]
    fn test_trailing_singleton_stop() {
        let m = abc();
        let g = InteractionGraph::new();
        let opts = GreedyOptions {
            stop_on_trailing_singleton: true,
            ..GreedyOptions::default()
        };
        let res = GreedySelector::new(&m, &g, opts).run().unwrap();
        assert_eq!(res.modules, vec![vec!["A"]]);
        assert_eq!(res.stop_reason, StopReason::TrailingSingleton);
        assert_eq!(res.unsatisfied, vec![2, 3]);
    }

    #[test]
    fn test_residual_bound() {
        let m = abc();
        let g = InteractionGraph::new();
        let opts = GreedyOptions {
            residual_bound: 2,
            ..GreedyOptions::default()
        };
        let res = GreedySelector::new(&m, &g, opts).run().unwrap();
        assert_eq!(res.steps.len(), 1);
        assert_eq!(res.stop_reason, StopReason::ResidualBound);
        assert!(res.unsatisfied.len() <= 2);
        assert_eq!(res.unsatisfied, vec![2, 3]);
        assert!(res.remaining[2] > 0.0 && res.remaining[3] > 0.0);
    }

    #[test]
    fn test_restrict_to_network() {
        let m = abc();
        let g = InteractionGraph::from_edges([("B", "C", 0.0)]).unwrap();
        let opts = GreedyOptions {
            restrict_to_network: true,
            ..GreedyOptions::default()
        };
        let res = GreedySelector::new(&m, &g, opts).run().unwrap();
        assert!(res.modules.iter().flatten().all(|id| id != "A"));
        assert_eq!(res.modules, vec![vec!["B"], vec!["C"]]);
        assert_eq!(res.unsatisfied, vec![0]);
        assert_eq!(res.stop_reason, StopReason::PoolExhausted);
    }

    #[test]
    fn test_random_instances_cover_everything() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let n_elements = rng.gen_range(3..12);
            let rows: Vec<(String, Vec<f64>)> = (0..rng.gen_range(4..10))
                .map(|i| {
                    let row = (0..n_elements)
                        .map(|_| if rng.gen_bool(0.4) { 1.0 } else { 0.0 })
                        .collect();
                    (format!("g{i}"), row)
                })
                .collect();
            let m = CoverageMatrix::new(rows).unwrap();
            let g = InteractionGraph::new();
            let res = GreedySelector::new(&m, &g, GreedyOptions::default()).run().unwrap();
            for (e, rem) in res.remaining.iter().enumerate() {
                let coverable = (0..m.item_count()).any(|i| m.row(i)[e] > 0.0);
                assert_eq!(*rem <= 0.0, coverable);
            }
        }
    }
}
