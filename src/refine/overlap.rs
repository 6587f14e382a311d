//! Overlap pass: let items join further modules they interact strongly with,
//! on top of the membership they already have.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::validate;
use crate::config::defaults;
use crate::cost::cohesion_cost;
use crate::error::Result;
use crate::graph::InteractionGraph;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlapOptions {
    /// An item joins a module only when its benefit is strictly above this.
    pub alpha: f64,
    /// Threshold used inside the cohesion cost.
    pub threshold: f64,
}

impl Default for OverlapOptions {
    fn default() -> Self {
        Self {
            alpha: defaults::DEFAULT_OVERLAP_ALPHA,
            threshold: defaults::DEFAULT_THRESHOLD,
        }
    }
}

/// One granted extra membership.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Addition {
    pub item: String,
    pub module: usize,
    pub benefit: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct OverlapReport {
    pub modules: Vec<Vec<String>>,
    pub additions: Vec<Addition>,
}

/// `cohesion(members ∪ {item})` for every item of `universe` adjacent to
/// `members` and not already one of them.
fn candidate_costs(
    members: &[String],
    universe: &BTreeSet<String>,
    graph: &InteractionGraph,
    threshold: f64,
) -> BTreeMap<String, f64> {
    graph
        .neighborhood(members)
        .into_iter()
        .filter(|n| universe.contains(*n) && !members.iter().any(|m| m == n))
        .map(|n| {
            let mut grown: Vec<&str> = members.iter().map(String::as_str).collect();
            grown.push(n);
            (n.to_string(), cohesion_cost(&grown, graph, threshold))
        })
        .collect()
}

/// Repeatedly add the `(item, module)` pair with the largest benefit
/// `1 + cohesion(module) − cohesion(module ∪ {item})` while it exceeds `alpha`.
///
/// Only items that already belong to some module are considered, and no
/// membership is ever removed. An empty module list is returned unchanged.
pub fn overlap_modules(
    modules: &[Vec<String>],
    graph: &InteractionGraph,
    options: &OverlapOptions,
) -> Result<OverlapReport> {
    if modules.is_empty() {
        return Ok(OverlapReport {
            modules: Vec::new(),
            additions: Vec::new(),
        });
    }
    validate(modules, options.alpha, options.threshold)?;
    let th = options.threshold;
    let mut modules = modules.to_vec();

    let universe: BTreeSet<String> = modules.iter().flatten().cloned().collect();
    let mut own: Vec<f64> = modules.iter().map(|m| cohesion_cost(m, graph, th)).collect();
    let mut table: Vec<BTreeMap<String, f64>> = modules
        .iter()
        .map(|m| candidate_costs(m, &universe, graph, th))
        .collect();

    info!(
        modules = modules.len(),
        items = universe.len(),
        alpha = options.alpha,
        "computing overlapping modules"
    );

    let mut additions = Vec::new();
    loop {
        let mut best: Option<(usize, &str, f64)> = None;
        for (i, row) in table.iter().enumerate() {
            for (item, &cost) in row {
                let benefit = 1.0 + own[i] - cost;
                if best.map_or(true, |(_, _, b)| benefit > b) {
                    best = Some((i, item.as_str(), benefit));
                }
            }
        }
        let Some((i, item, benefit)) = best else { break };
        if benefit <= options.alpha {
            break;
        }
        let item = item.to_string();

        if let Some(cost) = table[i].remove(&item) {
            own[i] = cost;
        }
        modules[i].push(item.clone());
        table[i] = candidate_costs(&modules[i], &universe, graph, th);

        debug!(item = item.as_str(), module = i, benefit, size = modules[i].len(), "item added");
        additions.push(Addition {
            item,
            module: i,
            benefit,
        });
    }

    info!(additions = additions.len(), "overlap finished");
    Ok(OverlapReport { modules, additions })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn modules(groups: &[&[&str]]) -> Vec<Vec<String>> {
        groups
            .iter()
            .map(|g| g.iter().map(|id| id.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_empty_input_is_noop() {
        let g = InteractionGraph::new();
        let report = overlap_modules(&[], &g, &OverlapOptions::default()).unwrap();
        assert!(report.modules.is_empty());
    }

    fn triangle() -> InteractionGraph {
        InteractionGraph::from_edges([("A", "B", 0.9), ("A", "C", 0.8), ("B", "C", 0.8)]).unwrap()
    }

    #[test]
    fn test_best_additions_first() {
        let g = triangle();
        let input = modules(&[&["A", "B"], &["C"]]);
        let report = overlap_modules(&input, &g, &OverlapOptions::default()).unwrap();

        let order: Vec<(&str, usize)> = report
            .additions
            .iter()
            .map(|a| (a.item.as_str(), a.module))
            .collect();
        assert_eq!(order, vec![("A", 1), ("B", 1), ("C", 0)]);
        assert!((report.additions[0].benefit - 1.6).abs() < 1e-12);
        assert!((report.additions[1].benefit - 0.9).abs() < 1e-12);
        assert!((report.additions[2].benefit - 0.7).abs() < 1e-12);
        assert_eq!(report.modules, modules(&[&["A", "B", "C"], &["C", "A", "B"]]));
    }

    #[test]
    fn test_alpha_gates_and_keeps_memberships() {
        let g = triangle();
        let input = modules(&[&["A", "B"], &["C"]]);
        let opts = OverlapOptions {
            alpha: 1.0,
            threshold: 0.0,
        };
        let report = overlap_modules(&input, &g, &opts).unwrap();
        assert_eq!(report.modules, modules(&[&["A", "B"], &["C", "A"]]));
        for (before, after) in input.iter().zip(&report.modules) {
            assert!(before.iter().all(|id| after.contains(id)));
        }
    }

    #[test]
    fn test_weak_links_not_added() {
        let g = InteractionGraph::from_edges([("A", "C", 0.01)]).unwrap();
        let input = modules(&[&["A"], &["C"]]);
        let opts = OverlapOptions {
            alpha: 0.5,
            threshold: 0.0,
        };
        let report = overlap_modules(&input, &g, &opts).unwrap();
        assert_eq!(report.modules, input);
        assert!(report.additions.is_empty());
    }
}
