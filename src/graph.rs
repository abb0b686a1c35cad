//! # Dependency Graph
//!
//! The project graph is an index-addressed arena: nodes live in a flat
//! `Vec`, edges are `(referencer, referenced)` index pairs, and adjacency is
//! precomputed in both directions. The graph is immutable once built, so it
//! can be shared freely across build workers.
//!
//! ## Levels
//!
//! [`DependencyGraph::levels`] partitions the nodes into antichains such that
//! every dependency of a node lies in a strictly earlier level. Nodes are
//! placed as late as possible: a node sits exactly one level before its
//! earliest dependent. The last level therefore holds precisely the nodes
//! nothing depends on, which are the requested roots.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::project::ProjectNode;

/// Index of a node in a [`DependencyGraph`].
pub type NodeIndex = usize;

/// Acyclic graph of projects with `referencer -> referenced` edges.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    nodes: Vec<ProjectNode>,
    edges: Vec<(NodeIndex, NodeIndex)>,
    dependencies: Vec<Vec<NodeIndex>>,
    dependents: Vec<Vec<NodeIndex>>,
    roots: Vec<NodeIndex>,
    index: HashMap<PathBuf, NodeIndex>,
}

impl DependencyGraph {
    /// Build a graph, rejecting cycles and out-of-range indices.
    ///
    /// Duplicate edges are collapsed; the first occurrence keeps its
    /// position in the referencer's dependency list.
    pub fn new(
        nodes: Vec<ProjectNode>,
        edges: Vec<(NodeIndex, NodeIndex)>,
        roots: Vec<NodeIndex>,
    ) -> Result<Self> {
        let len = nodes.len();
        let mut dependencies = vec![Vec::new(); len];
        let mut dependents = vec![Vec::new(); len];
        let mut unique_edges = Vec::with_capacity(edges.len());

        for (from, to) in edges {
            let out_of_range = [from, to].into_iter().find(|&i| i >= len);
            if let Some(i) = out_of_range {
                return Err(Error::config(
                    PathBuf::new(),
                    format!("edge refers to unknown project index {i}"),
                ));
            }
            if dependencies[from].contains(&to) {
                continue;
            }
            dependencies[from].push(to);
            dependents[to].push(from);
            unique_edges.push((from, to));
        }

        let mut unique_roots = Vec::with_capacity(roots.len());
        for root in roots {
            if root >= len {
                return Err(Error::config(
                    PathBuf::new(),
                    format!("root refers to unknown project index {root}"),
                ));
            }
            if !unique_roots.contains(&root) {
                unique_roots.push(root);
            }
        }

        let index = nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (node.config_path.clone(), i))
            .collect();

        let graph = Self {
            nodes,
            edges: unique_edges,
            dependencies,
            dependents,
            roots: unique_roots,
            index,
        };

        if graph.topological_indices().len() != len {
            let cycle = graph.find_cycle().unwrap_or_default();
            return Err(Error::CircularReference {
                cycle: cycle
                    .into_iter()
                    .map(|i| graph.nodes[i].config_path.clone())
                    .collect(),
            });
        }

        Ok(graph)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, index: NodeIndex) -> &ProjectNode {
        &self.nodes[index]
    }

    pub fn nodes(&self) -> &[ProjectNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[(NodeIndex, NodeIndex)] {
        &self.edges
    }

    /// The requested root projects, in request order.
    pub fn roots(&self) -> &[NodeIndex] {
        &self.roots
    }

    /// Look up a project by its configuration path.
    pub fn index_of(&self, config_path: &Path) -> Option<NodeIndex> {
        self.index.get(config_path).copied()
    }

    /// Direct references of a node, in declaration order.
    pub fn dependencies(&self, index: NodeIndex) -> &[NodeIndex] {
        &self.dependencies[index]
    }

    /// Nodes that directly reference this one.
    pub fn dependents(&self, index: NodeIndex) -> &[NodeIndex] {
        &self.dependents[index]
    }

    /// Every node that depends on `index`, directly or indirectly, sorted.
    pub fn transitive_dependents(&self, index: NodeIndex) -> Vec<NodeIndex> {
        let mut seen = BTreeSet::new();
        let mut stack = vec![index];
        while let Some(current) = stack.pop() {
            for &dependent in &self.dependents[current] {
                if seen.insert(dependent) {
                    stack.push(dependent);
                }
            }
        }
        seen.into_iter().collect()
    }

    /// Node indices with every dependency before its dependents. Ties are
    /// broken by index, so the order is deterministic.
    pub fn topological_indices(&self) -> Vec<NodeIndex> {
        let mut remaining: Vec<usize> = self.dependencies.iter().map(Vec::len).collect();
        let mut ready: BTreeSet<NodeIndex> = remaining
            .iter()
            .enumerate()
            .filter(|(_, count)| **count == 0)
            .map(|(i, _)| i)
            .collect();
        let mut order = Vec::with_capacity(self.nodes.len());

        while let Some(next) = ready.pop_first() {
            order.push(next);
            for &dependent in &self.dependents[next] {
                remaining[dependent] -= 1;
                if remaining[dependent] == 0 {
                    ready.insert(dependent);
                }
            }
        }
        order
    }

    /// Projects with every referenced project before its referencers.
    pub fn topological_order(&self) -> Vec<&ProjectNode> {
        self.topological_indices()
            .into_iter()
            .map(|i| &self.nodes[i])
            .collect()
    }

    /// Level partition, earliest first; indices within a level are sorted.
    pub fn levels(&self) -> Vec<Vec<NodeIndex>> {
        if self.nodes.is_empty() {
            return Vec::new();
        }

        // Longest distance from a node to anything that depends on nothing.
        let mut depth = vec![0usize; self.nodes.len()];
        for &i in self.topological_indices().iter().rev() {
            depth[i] = self.dependents[i]
                .iter()
                .map(|&dependent| depth[dependent] + 1)
                .max()
                .unwrap_or(0);
        }

        let last = depth.iter().copied().max().unwrap_or(0);
        let mut levels = vec![Vec::new(); last + 1];
        for (i, d) in depth.into_iter().enumerate() {
            levels[last - d].push(i);
        }
        levels
    }

    /// Depth-first search for one cycle, returned as a closed path of
    /// indices that starts and ends at the same node.
    fn find_cycle(&self) -> Option<Vec<NodeIndex>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            New,
            OnStack,
            Done,
        }

        fn visit(
            graph: &DependencyGraph,
            node: NodeIndex,
            marks: &mut [Mark],
            stack: &mut Vec<NodeIndex>,
        ) -> Option<Vec<NodeIndex>> {
            marks[node] = Mark::OnStack;
            stack.push(node);
            for &next in &graph.dependencies[node] {
                match marks[next] {
                    Mark::OnStack => {
                        let start = stack.iter().position(|&n| n == next)?;
                        let mut cycle = stack[start..].to_vec();
                        cycle.push(next);
                        return Some(cycle);
                    }
                    Mark::New => {
                        if let Some(cycle) = visit(graph, next, marks, stack) {
                            return Some(cycle);
                        }
                    }
                    Mark::Done => {}
                }
            }
            stack.pop();
            marks[node] = Mark::Done;
            None
        }

        let mut marks = vec![Mark::New; self.nodes.len()];
        for start in 0..self.nodes.len() {
            if marks[start] == Mark::New {
                let mut stack = Vec::new();
                if let Some(cycle) = visit(self, start, &mut marks, &mut stack) {
                    return Some(cycle);
                }
            }
        }
        None
    }
}
