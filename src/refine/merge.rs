//! Merge pass: fuse pairs of adjacent modules whose combined cohesion cost
//! is sufficiently lower than the sum of their separate costs.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{union, validate};
use crate::config::defaults;
use crate::cost::cohesion_cost;
use crate::error::Result;
use crate::graph::InteractionGraph;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeOptions {
    /// A pair merges only when its merge score is strictly above this.
    pub alpha: f64,
    /// Threshold used inside the cohesion cost.
    pub threshold: f64,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            alpha: defaults::DEFAULT_MERGE_ALPHA,
            threshold: defaults::DEFAULT_THRESHOLD,
        }
    }
}

/// One executed merge, in input module numbering.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MergeStep {
    pub kept: usize,
    pub absorbed: usize,
    pub score: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct MergeReport {
    /// Surviving modules in their original order.
    pub modules: Vec<Vec<String>>,
    pub merges: Vec<MergeStep>,
}

/// `cohesion(a) + cohesion(b) - cohesion(a ∪ b)`.
pub fn merge_score<S: AsRef<str>>(
    a: &[S],
    b: &[S],
    graph: &InteractionGraph,
    threshold: f64,
) -> f64 {
    let mut both: Vec<&str> = a.iter().map(AsRef::as_ref).collect();
    both.extend(b.iter().map(AsRef::as_ref));
    cohesion_cost(a, graph, threshold) + cohesion_cost(b, graph, threshold)
        - cohesion_cost(&both, graph, threshold)
}

/// Repeatedly merge the best-scoring adjacent pair while its score exceeds
/// `alpha`. Pairs with no edge between them are never considered.
///
/// The lower-indexed module of a pair absorbs the other; absorbed modules are
/// dropped from the output.
pub fn merge_modules(
    modules: &[Vec<String>],
    graph: &InteractionGraph,
    options: &MergeOptions,
) -> Result<MergeReport> {
    validate(modules, options.alpha, options.threshold)?;
    let th = options.threshold;
    let mut modules = modules.to_vec();

    let mut own: Vec<f64> = modules.iter().map(|m| cohesion_cost(m, graph, th)).collect();

    // merged[(i, j)] = cohesion(mi ∪ mj) for adjacent i < j.
    let mut merged: BTreeMap<(usize, usize), f64> = BTreeMap::new();
    let mut owners: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (i, m) in modules.iter().enumerate() {
        for id in m {
            owners.entry(id.as_str()).or_default().push(i);
        }
    }
    for (i, m) in modules.iter().enumerate() {
        let partners: BTreeSet<usize> = graph
            .neighborhood(m)
            .into_iter()
            .filter_map(|n| owners.get(n))
            .flatten()
            .copied()
            .filter(|&j| j > i)
            .collect();
        for j in partners {
            merged.insert((i, j), cohesion_cost(&union(m, &modules[j]), graph, th));
        }
    }

    info!(
        modules = modules.len(),
        adjacent_pairs = merged.len(),
        alpha = options.alpha,
        "merging modules"
    );

    let mut merges = Vec::new();
    loop {
        let mut best: Option<(usize, usize, f64)> = None;
        for (&(i, j), &cost) in &merged {
            let score = own[i] + own[j] - cost;
            if best.map_or(true, |(_, _, s)| score > s) {
                best = Some((i, j, score));
            }
        }
        let Some((i, j, score)) = best else { break };
        if score <= options.alpha {
            break;
        }

        own[i] = merged.remove(&(i, j)).unwrap_or(own[i]);
        let absorbed = std::mem::take(&mut modules[j]);
        modules[i] = union(&modules[i], &absorbed);

        let touched: BTreeSet<usize> = merged
            .keys()
            .filter(|&&(a, b)| a == i || b == i || a == j || b == j)
            .map(|&(a, b)| if a == i || a == j { b } else { a })
            .filter(|&k| k != i && k != j)
            .collect();
        merged.retain(|&(a, b), _| a != i && b != i && a != j && b != j);
        for k in touched {
            let cost = cohesion_cost(&union(&modules[k], &modules[i]), graph, th);
            merged.insert((k.min(i), k.max(i)), cost);
        }

        debug!(kept = i, absorbed = j, score, size = modules[i].len(), "merged modules");
        merges.push(MergeStep {
            kept: i,
            absorbed: j,
            score,
        });
    }

    let modules: Vec<Vec<String>> = modules.into_iter().filter(|m| !m.is_empty()).collect();
    info!(merges = merges.len(), modules = modules.len(), "merge finished");
    Ok(MergeReport { modules, merges })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn singletons(ids: &[&str]) -> Vec<Vec<String>> {
        ids.iter().map(|id| vec![id.to_string()]).collect()
    }

    #[test]
    fn test_strong_pair_merges() {
        let g = InteractionGraph::from_edges([("A", "B", 0.9)]).unwrap();
        let opts = MergeOptions {
            alpha: 0.1,
            threshold: 0.0,
        };
        let report = merge_modules(&singletons(&["A", "B"]), &g, &opts).unwrap();
        assert_eq!(report.modules, vec![vec!["A", "B"]]);
        assert_eq!(report.merges.len(), 1);
        assert!((report.merges[0].score - 1.8).abs() < 1e-12);
    }

    #[test]
    fn test_zero_weight_pair_stays_apart() {
        let g = InteractionGraph::from_edges([("A", "B", 0.0)]).unwrap();
        let opts = MergeOptions {
            alpha: 0.1,
            threshold: 0.0,
        };
        assert_eq!(merge_score(&["A"], &["B"], &g, 0.0), 0.0);
        let report = merge_modules(&singletons(&["A", "B"]), &g, &opts).unwrap();
        assert_eq!(report.modules, singletons(&["A", "B"]));
        assert!(report.merges.is_empty());
    }

    #[test]
    fn test_non_adjacent_never_merge() {
        let g = InteractionGraph::new();
        let opts = MergeOptions {
            alpha: -10.0,
            threshold: 0.0,
        };
        let report = merge_modules(&singletons(&["A", "B"]), &g, &opts).unwrap();
        assert_eq!(report.modules.len(), 2);
    }

    #[test]
    fn test_chain_merges_best_pair_first() {
        let g = InteractionGraph::from_edges([("A", "B", 0.3), ("B", "C", 0.8), ("C", "D", 0.1)])
            .unwrap();
        let opts = MergeOptions {
            alpha: 0.5,
            threshold: 0.0,
        };
        let report = merge_modules(&singletons(&["A", "B", "C", "D"]), &g, &opts).unwrap();
        assert_eq!((report.merges[0].kept, report.merges[0].absorbed), (1, 2));
        assert!((report.merges[0].score - 1.6).abs() < 1e-12);
        assert_eq!(report.modules, vec![vec!["A"], vec!["B", "C"], vec!["D"]]);
        for step in &report.merges {
            assert!(step.score > opts.alpha);
        }
    }

    #[test]
    fn test_empty_module_rejected() {
        let g = InteractionGraph::new();
        let modules = vec![vec!["A".to_string()], vec![]];
        assert!(merge_modules(&modules, &g, &MergeOptions::default()).is_err());
    }
}
