//! Per-item cache of the cheapest module to join.
//!
//! Every candidate item keeps the running interaction sum towards each module
//! it neighbors, the join cost of each module that passes the threshold, and
//! a min-heap over those costs. Only the graph neighborhood of a grown module
//! is touched on each commit, so per-commit work is proportional to local
//! degree. Invalidating an entry rebuilds the item's heap in `O(d)` where `d`
//! is the number of modules tracked for it; on dense graphs `d` approaches the
//! module count and the update cost grows with it.

use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, BinaryHeap};

use crate::cost::{self, ModuleStats};
use crate::graph::Network;

/// Heap entry: join cost, then module index as tie-break.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ModuleCandidate {
    pub cost: f64,
    pub module: usize,
}

impl Eq for ModuleCandidate {}

impl Ord for ModuleCandidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cost
            .total_cmp(&other.cost)
            .then_with(|| self.module.cmp(&other.module))
    }
}

impl PartialOrd for ModuleCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Clone, Debug, Default)]
struct Slot {
    sums: BTreeMap<usize, f64>,
    costs: BTreeMap<usize, f64>,
    heap: BinaryHeap<Reverse<ModuleCandidate>>,
}

impl Slot {
    fn rebuild(&mut self) {
        self.heap = self
            .costs
            .iter()
            .map(|(&module, &cost)| Reverse(ModuleCandidate { cost, module }))
            .collect();
    }
}

#[derive(Clone, Debug)]
pub struct PriorityIndex {
    threshold: f64,
    slots: Vec<Option<Slot>>,
}

impl PriorityIndex {
    pub fn new(n_items: usize, threshold: f64) -> Self {
        Self {
            threshold,
            slots: vec![Some(Slot::default()); n_items],
        }
    }

    /// Cheapest known module for `item`, if any.
    pub fn best(&self, item: usize) -> Option<ModuleCandidate> {
        self.slot(item)?.heap.peek().map(|top| top.0)
    }

    /// Interaction sum between `item` and the members of `module`.
    pub fn interaction_sum(&self, item: usize, module: usize) -> Option<f64> {
        self.slot(item)?.sums.get(&module).copied()
    }

    /// Stored join cost of `item` into `module`.
    pub fn cost(&self, item: usize, module: usize) -> Option<f64> {
        self.slot(item)?.costs.get(&module).copied()
    }

    /// Number of modules with a live cost entry for `item`.
    pub fn tracked(&self, item: usize) -> usize {
        self.slot(item).map_or(0, |s| s.costs.len())
    }

    /// Forget everything about a selected item.
    pub fn retire(&mut self, item: usize) {
        if let Some(slot) = self.slots.get_mut(item) {
            *slot = None;
        }
    }

    /// Refresh entries after `module` gained member `added`.
    ///
    /// `members` is the module after the addition, `stats` its updated size and
    /// average cost, and `neighbors` the still-available items adjacent to it.
    pub fn module_grew(
        &mut self,
        module: usize,
        stats: ModuleStats,
        added: usize,
        members: &[usize],
        neighbors: &[usize],
        network: &Network,
    ) {
        let floor = self.threshold * stats.size as f64;

        for &n in neighbors {
            let Some(slot) = self.slots.get_mut(n).and_then(Option::as_mut) else {
                continue;
            };

            let sum = match slot.sums.get_mut(&module) {
                Some(sum) => {
                    *sum += network.weight(n, added);
                    *sum
                }
                None => {
                    let sum: f64 = members.iter().map(|&x| network.weight(n, x)).sum();
                    slot.sums.insert(module, sum);
                    sum
                }
            };

            if sum < floor {
                if slot.costs.remove(&module).is_some() {
                    slot.rebuild();
                }
                continue;
            }

            let cost = cost::join_cost(stats, sum, self.threshold);
            slot.costs.insert(module, cost);

            let top_is_module = slot.heap.peek().is_some_and(|top| top.0.module == module);
            if top_is_module {
                if let Some(mut top) = slot.heap.peek_mut() {
                    *top = Reverse(ModuleCandidate { cost, module });
                }
            } else {
                slot.rebuild();
            }
        }
    }

    fn slot(&self, item: usize) -> Option<&Slot> {
        self.slots.get(item)?.as_ref()
    }
}
