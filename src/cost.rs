//! Module cost model.
//!
//! Two quantities drive every decision:
//! - the marginal cost of placing an item, either into an existing module or
//!   as a brand-new singleton (always [`NEW_MODULE_COST`]);
//! - the cohesion cost of a whole member set, used by the refiners.

use crate::graph::InteractionGraph;

/// Cost of opening a new singleton module.
pub const NEW_MODULE_COST: f64 = 1.0;

/// Cohesion cost of a single-member module.
pub const SINGLETON_COHESION_COST: f64 = 1.0;

/// Average interaction an existing module must exceed to win a tie against
/// opening a new module.
pub const TIE_INTERACTION_FLOOR: f64 = 100.0;

/// Where an item would be placed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placement {
    Existing(usize),
    New,
}

/// Cheapest placement found for an item and its cost.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MarginalCost {
    pub placement: Placement,
    pub cost: f64,
}

/// Size and running average cost of a module, as the greedy stage tracks it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ModuleStats {
    pub size: usize,
    pub avg_cost: f64,
}

/// Cost of adding an item to an existing module:
/// `1 + (avg_cost / |m| − 2 · interaction_sum / |m| + threshold)`.
#[inline]
pub fn join_cost(stats: ModuleStats, interaction_sum: f64, threshold: f64) -> f64 {
    let size = stats.size as f64;
    let avg_interaction = interaction_sum / size;
    1.0 + (stats.avg_cost / size - 2.0 * avg_interaction + threshold)
}

/// Compare joining `candidate` (module index, stats, interaction sum) with
/// opening a new module, and return the cheaper one.
///
/// On an exact tie the existing module wins only when its average interaction
/// is above [`TIE_INTERACTION_FLOOR`].
pub fn marginal_cost(
    candidate: Option<(usize, ModuleStats, f64)>,
    threshold: f64,
) -> MarginalCost {
    let mut best = MarginalCost {
        placement: Placement::New,
        cost: NEW_MODULE_COST,
    };
    if let Some((module, stats, interaction_sum)) = candidate {
        let cost = join_cost(stats, interaction_sum, threshold);
        let avg_interaction = interaction_sum / stats.size as f64;
        if cost < best.cost || (cost == best.cost && avg_interaction > TIE_INTERACTION_FLOOR) {
            best = MarginalCost {
                placement: Placement::Existing(module),
                cost,
            };
        }
    }
    best
}

/// Cohesion cost of a member set.
///
/// `1` for a singleton; otherwise
/// `|m| · (1 + threshold) − coherence / (|m| − 1)` where `coherence` sums the
/// interaction weight over all ordered pairs of distinct members.
/// Duplicated members are counted once.
pub fn cohesion_cost<S: AsRef<str>>(
    members: &[S],
    graph: &InteractionGraph,
    threshold: f64,
) -> f64 {
    let mut ids: Vec<&str> = members.iter().map(AsRef::as_ref).collect();
    ids.sort_unstable();
    ids.dedup();

    let m = ids.len();
    if m <= 1 {
        return SINGLETON_COHESION_COST;
    }

    let mut coherence = 0.0;
    for (i, a) in ids.iter().enumerate() {
        for (j, b) in ids.iter().enumerate() {
            if i != j {
                coherence += graph.weight(a, b);
            }
        }
    }
    m as f64 * (1.0 + threshold) - coherence / (m - 1) as f64
}
