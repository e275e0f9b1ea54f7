//! Depth-first traversal of the host tree.
//!
//! The walk runs in slices: [`TreeWalker::resume`] visits at most
//! `yield_every` nodes and then hands control back to its caller, so a huge
//! selection never blocks the host for long. [`walk`] drives a walker to
//! completion, yielding to the runtime between slices. Slicing never changes
//! the order or number of collected records.

use crate::extractor::extract_node;
use crate::host::{HostNode, NodeKind};
use crate::types::TextAttributeRecord;
use tracing::{debug, trace};

/// Default number of node visits between checkpoints
pub const DEFAULT_YIELD_EVERY: usize = 10;

/// Traversal settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkOptions {
    /// Node visits between checkpoints (at least 1)
    pub yield_every: usize,
    /// Skip hidden nodes together with their subtrees
    pub skip_invisible: bool,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            yield_every: DEFAULT_YIELD_EVERY,
            skip_invisible: true,
        }
    }
}

/// Outcome of one call to [`TreeWalker::resume`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkStep {
    /// Budget spent, nodes remain
    Yielded,
    /// Every node has been visited
    Done,
}

/// Everything a finished walk produced
#[derive(Debug, Clone, PartialEq)]
pub struct WalkResult {
    /// Records in pre-order
    pub records: Vec<TextAttributeRecord>,
    /// Nodes visited, including containers and skipped nodes
    pub visited: usize,
    /// Times control was handed back before completion
    pub checkpoints: usize,
}

/// Resumable pre-order walk over a forest
pub struct TreeWalker<'a, N: HostNode> {
    /// Pending nodes; the next one to visit is on top
    stack: Vec<&'a N>,
    records: Vec<TextAttributeRecord>,
    visited: usize,
    checkpoints: usize,
    options: WalkOptions,
}

impl<'a, N: HostNode> TreeWalker<'a, N> {
    pub fn new(roots: &[&'a N], options: WalkOptions) -> Self {
        Self {
            stack: roots.iter().rev().copied().collect(),
            records: Vec::new(),
            visited: 0,
            checkpoints: 0,
            options: WalkOptions {
                yield_every: options.yield_every.max(1),
                ..options
            },
        }
    }

    /// Visit up to `yield_every` nodes
    pub fn resume(&mut self) -> WalkStep {
        let mut budget = self.options.yield_every;

        while let Some(node) = self.stack.pop() {
            self.visit(node);
            budget -= 1;

            if budget == 0 && !self.stack.is_empty() {
                self.checkpoints += 1;
                return WalkStep::Yielded;
            }
        }

        WalkStep::Done
    }

    pub fn is_done(&self) -> bool {
        self.stack.is_empty()
    }

    /// Records collected so far
    pub fn records(&self) -> &[TextAttributeRecord] {
        &self.records
    }

    pub fn finish(self) -> WalkResult {
        WalkResult {
            records: self.records,
            visited: self.visited,
            checkpoints: self.checkpoints,
        }
    }

    fn visit(&mut self, node: &'a N) {
        self.visited += 1;

        if self.options.skip_invisible && !node.visible() {
            trace!("Skipping hidden node {}", node.id());
            return;
        }

        match node.kind() {
            NodeKind::Text => match extract_node(node) {
                Some(record) => self.records.push(record),
                None => trace!("Text node {} reported no attributes", node.id()),
            },
            NodeKind::Container => {
                self.stack.extend(node.children().iter().rev());
            }
            NodeKind::Other => {}
        }
    }
}

/// Walk a forest to completion, yielding to the runtime at each checkpoint
pub async fn walk<N: HostNode>(roots: &[&N], options: WalkOptions) -> WalkResult {
    let mut walker = TreeWalker::new(roots, options);

    while walker.resume() == WalkStep::Yielded {
        tokio::task::yield_now().await;
    }

    let result = walker.finish();
    debug!(
        "Walked {} nodes in {} slices, {} text layers",
        result.visited,
        result.checkpoints + 1,
        result.records.len()
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::memory::MemoryNode;
    use crate::host::TextProperties;

    fn text(id: &str) -> MemoryNode {
        MemoryNode::text(id, TextProperties::new("Inter", "Regular", 12.0))
    }

    fn ids(records: &[TextAttributeRecord]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    fn nested_forest() -> Vec<MemoryNode> {
        vec![
            MemoryNode::container(
                "a",
                vec![
                    text("a1"),
                    MemoryNode::container("a2", vec![text("a2x"), text("a2y")]),
                    MemoryNode::other("a3"),
                    text("a4"),
                ],
            ),
            text("b"),
            MemoryNode::other("c"),
        ]
    }

    #[test]
    fn test_pre_order_native_child_order() {
        let forest = nested_forest();
        let roots: Vec<&MemoryNode> = forest.iter().collect();
        let mut walker = TreeWalker::new(&roots, WalkOptions::default());

        assert_eq!(walker.resume(), WalkStep::Done);
        let result = walker.finish();

        assert_eq!(ids(&result.records), vec!["a1", "a2x", "a2y", "a4", "b"]);
        assert_eq!(result.visited, 9);
        assert_eq!(result.checkpoints, 0);
    }

    #[test]
    fn test_slicing_preserves_order() {
        let forest = nested_forest();
        let roots: Vec<&MemoryNode> = forest.iter().collect();

        for yield_every in 1..=10 {
            let mut walker = TreeWalker::new(
                &roots,
                WalkOptions {
                    yield_every,
                    skip_invisible: true,
                },
            );
            let mut slices = 1;
            while walker.resume() == WalkStep::Yielded {
                slices += 1;
                assert!(!walker.is_done());
            }
            let result = walker.finish();

            assert_eq!(ids(&result.records), vec!["a1", "a2x", "a2y", "a4", "b"]);
            assert_eq!(slices, (9 + yield_every - 1) / yield_every);
        }
    }

    #[test]
    fn test_checkpoint_every_ten_visits() {
        let forest: Vec<MemoryNode> = (0..25).map(|i| text(&format!("t{}", i))).collect();
        let roots: Vec<&MemoryNode> = forest.iter().collect();
        let mut walker = TreeWalker::new(&roots, WalkOptions::default());

        assert_eq!(walker.resume(), WalkStep::Yielded);
        assert_eq!(walker.records().len(), 10);
        assert_eq!(walker.resume(), WalkStep::Yielded);
        assert_eq!(walker.records().len(), 20);
        assert_eq!(walker.resume(), WalkStep::Done);
        assert_eq!(walker.finish().records.len(), 25);
    }

    #[test]
    fn test_hidden_subtrees_skipped() {
        let forest = vec![
            MemoryNode::container("hidden", vec![text("h1")]).hidden(),
            text("shown"),
        ];
        let roots: Vec<&MemoryNode> = forest.iter().collect();

        let mut walker = TreeWalker::new(&roots, WalkOptions::default());
        walker.resume();
        assert_eq!(ids(walker.records()), vec!["shown"]);

        let mut walker = TreeWalker::new(
            &roots,
            WalkOptions {
                skip_invisible: false,
                ..Default::default()
            },
        );
        walker.resume();
        assert_eq!(ids(walker.records()), vec!["h1", "shown"]);
    }

    #[test]
    fn test_zero_budget_clamped() {
        let forest = vec![text("x"), text("y")];
        let roots: Vec<&MemoryNode> = forest.iter().collect();
        let mut walker = TreeWalker::new(
            &roots,
            WalkOptions {
                yield_every: 0,
                skip_invisible: true,
            },
        );

        assert_eq!(walker.resume(), WalkStep::Yielded);
        assert_eq!(walker.resume(), WalkStep::Done);
    }

    #[tokio::test]
    async fn test_walk_collects_everything() {
        let forest: Vec<MemoryNode> = (0..35).map(|i| text(&format!("t{}", i))).collect();
        let roots: Vec<&MemoryNode> = forest.iter().collect();

        let result = walk(&roots, WalkOptions::default()).await;

        assert_eq!(result.records.len(), 35);
        assert_eq!(result.checkpoints, 3);
        assert_eq!(result.records[34].id, "t34");
    }

    #[tokio::test]
    async fn test_walk_empty_forest() {
        let roots: Vec<&MemoryNode> = Vec::new();
        let result = walk(&roots, WalkOptions::default()).await;
        assert!(result.records.is_empty());
        assert_eq!(result.visited, 0);
    }
}
