//! Fetch graphs: named fetch-shape overrides applied per load.

/// How an applied graph combines with statically mapped fetch settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphSemantic {
    /// The graph is the complete fetch shape; everything else loads lazily.
    Fetch,
    /// The graph adds to the mapped fetch shape; mapped eager stays eager.
    Load,
}

/// A named fetch shape: dotted attribute paths to fetch eagerly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchGraph {
    name: String,
    paths: Vec<String>,
}

impl FetchGraph {
    /// Create an empty graph.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            paths: Vec::new(),
        }
    }

    /// Add one dotted attribute path.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.paths.push(path.into());
        self
    }

    /// Graph name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The dotted attribute paths this graph fetches.
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// Does this graph name the given path?
    pub fn includes(&self, path: &str) -> bool {
        self.paths.iter().any(|p| p == path)
    }
}

/// A graph together with the semantic it was applied under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedGraph {
    /// The fetch shape in effect.
    pub graph: FetchGraph,
    /// How it combines with mapped fetch settings.
    pub semantic: GraphSemantic,
}

impl AppliedGraph {
    /// Pair a graph with its semantic.
    pub fn new(graph: FetchGraph, semantic: GraphSemantic) -> Self {
        Self { graph, semantic }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_paths() {
        let graph = FetchGraph::new("order-summary")
            .with_path("lines")
            .with_path("lines.product");
        assert_eq!(graph.name(), "order-summary");
        assert!(graph.includes("lines.product"));
        assert!(!graph.includes("customer"));
    }

    #[test]
    fn applied_graph_carries_semantic() {
        let applied = AppliedGraph::new(FetchGraph::new("g"), GraphSemantic::Fetch);
        assert_eq!(applied.semantic, GraphSemantic::Fetch);
    }
}
