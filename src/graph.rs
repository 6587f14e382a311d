//! Undirected weighted interaction graph over items.
//!
//! Lookups are symmetric and an absent edge reads as weight 0. Iteration is
//! always in sorted identifier order so that every consumer is deterministic.

use std::collections::{BTreeMap, BTreeSet};

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;

use crate::error::{CoverError, Result};
use crate::matrix::CoverageMatrix;

#[derive(Clone, Debug)]
pub struct InteractionGraph {
    graph: UnGraph<String, f64>,
    nodes: BTreeMap<String, NodeIndex>,
}

impl Default for InteractionGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl InteractionGraph {
    pub fn new() -> Self {
        Self {
            graph: UnGraph::new_undirected(),
            nodes: BTreeMap::new(),
        }
    }

    /// Build from `(a, b, weight)` triples.
    pub fn from_edges<I, S>(edges: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, S, f64)>,
        S: Into<String>,
    {
        let mut graph = Self::new();
        for (a, b, w) in edges {
            graph.add_edge(a, b, w)?;
        }
        Ok(graph)
    }

    /// Combine several score layers into one graph:
    /// `w(x, y) = Σ coef_i · score_i(x, y)`, missing scores counting as 0.
    ///
    /// An edge exists in the result wherever it exists in any layer.
    pub fn combine(layers: &[(&InteractionGraph, f64)]) -> Result<Self> {
        let mut pairs: BTreeSet<(&str, &str)> = BTreeSet::new();
        for (layer, coef) in layers {
            if !coef.is_finite() {
                return Err(CoverError::invalid(format!("layer coefficient {coef} is not finite")));
            }
            for edge in layer.graph.edge_references() {
                let a = layer.graph[edge.source()].as_str();
                let b = layer.graph[edge.target()].as_str();
                pairs.insert(if a < b { (a, b) } else { (b, a) });
            }
        }

        let mut combined = Self::new();
        for (a, b) in pairs {
            let w: f64 = layers
                .iter()
                .map(|(layer, coef)| coef * layer.weight(a, b))
                .sum();
            combined.add_edge(a, b, w)?;
        }
        Ok(combined)
    }

    /// Insert or overwrite an undirected edge. Self loops are ignored.
    pub fn add_edge(
        &mut self,
        a: impl Into<String>,
        b: impl Into<String>,
        weight: f64,
    ) -> Result<()> {
        let (a, b) = (a.into(), b.into());
        if !weight.is_finite() {
            return Err(CoverError::invalid(format!(
                "edge ({a}, {b}) has non-finite weight {weight}"
            )));
        }
        if a == b {
            return Ok(());
        }
        let ia = self.node(a);
        let ib = self.node(b);
        self.graph.update_edge(ia, ib, weight);
        Ok(())
    }

    fn node(&mut self, id: String) -> NodeIndex {
        if let Some(&idx) = self.nodes.get(&id) {
            return idx;
        }
        let idx = self.graph.add_node(id.clone());
        self.nodes.insert(id, idx);
        idx
    }

    /// Edge weight in either orientation; 0 when absent.
    pub fn weight(&self, a: &str, b: &str) -> f64 {
        match (self.nodes.get(a), self.nodes.get(b)) {
            (Some(&ia), Some(&ib)) => self
                .graph
                .find_edge(ia, ib)
                .and_then(|e| self.graph.edge_weight(e))
                .copied()
                .unwrap_or(0.0),
            _ => 0.0,
        }
    }

    pub fn contains(&self, node: &str) -> bool {
        self.nodes.contains_key(node)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Neighbors of `node` in identifier order.
    pub fn neighbors<'a>(&'a self, node: &str) -> impl Iterator<Item = &'a str> + 'a {
        let mut out: Vec<&'a str> = match self.nodes.get(node) {
            Some(&idx) => self
                .graph
                .neighbors(idx)
                .map(|n| self.graph[n].as_str())
                .collect(),
            None => Vec::new(),
        };
        out.sort_unstable();
        out.into_iter()
    }

    /// Union of the neighbors of every node in `nodes`, sorted.
    ///
    /// Members of `nodes` that neighbor each other are included.
    pub fn neighborhood<'a, I, S>(&'a self, nodes: I) -> BTreeSet<&'a str>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out = BTreeSet::new();
        for node in nodes {
            out.extend(self.neighbors(node.as_ref()));
        }
        out
    }

    /// True when some node of `a` has an edge to some node of `b`.
    pub fn touches<S: AsRef<str>>(&self, a: &[S], b: &[S]) -> bool {
        a.iter().any(|x| {
            b.iter().any(|y| {
                matches!(
                    (self.nodes.get(x.as_ref()), self.nodes.get(y.as_ref())),
                    (Some(&ix), Some(&iy)) if self.graph.find_edge(ix, iy).is_some()
                )
            })
        })
    }
}

/// Item-indexed view of the graph for the greedy loop: node `i` is item `i`
/// of the coverage matrix.
///
/// Graph nodes without a matrix row can never be selected and are dropped.
#[derive(Clone, Debug)]
pub struct Network {
    graph: UnGraph<usize, f64>,
    in_graph: Vec<bool>,
}

impl Network {
    pub fn new(graph: &InteractionGraph, matrix: &CoverageMatrix) -> Self {
        let n = matrix.item_count();
        let mut net: UnGraph<usize, f64> = UnGraph::with_capacity(n, graph.edge_count());
        for item in 0..n {
            net.add_node(item);
        }
        for edge in graph.graph.edge_references() {
            let a = matrix.index_of(&graph.graph[edge.source()]);
            let b = matrix.index_of(&graph.graph[edge.target()]);
            if let (Some(a), Some(b)) = (a, b) {
                net.add_edge(NodeIndex::new(a), NodeIndex::new(b), *edge.weight());
            }
        }
        let in_graph = matrix.items().iter().map(|id| graph.contains(id)).collect();
        Self {
            graph: net,
            in_graph,
        }
    }

    pub fn weight(&self, a: usize, b: usize) -> f64 {
        self.graph
            .find_edge(NodeIndex::new(a), NodeIndex::new(b))
            .and_then(|e| self.graph.edge_weight(e))
            .copied()
            .unwrap_or(0.0)
    }

    /// Neighbors of `item`, unordered.
    pub fn neighbors(&self, item: usize) -> impl Iterator<Item = usize> + '_ {
        self.graph.neighbors(NodeIndex::new(item)).map(|n| n.index())
    }

    pub fn in_graph(&self, item: usize) -> bool {
        self.in_graph[item]
    }

    /// Sorted union of the neighbors of `members`, minus items `excluded` flags.
    pub fn neighborhood(&self, members: &[usize], excluded: &[bool]) -> Vec<usize> {
        let set: BTreeSet<usize> = members
            .iter()
            .flat_map(|&m| self.neighbors(m))
            .filter(|&n| !excluded[n])
            .collect();
        set.into_iter().collect()
    }
}
