//! Node Selection
//!
//! Lists the storage controller's nodes for interface placement and enforces
//! the redundancy floor. Nothing is cached; every provisioning run sees the
//! controller's current node list.

use crate::domain::ports::{Node, StorageControllerRef};
use crate::error::{Error, Result};
use std::collections::HashSet;
use tracing::debug;

/// Fewest distinct nodes interfaces may be spread across
pub const MIN_NODES: usize = 2;

/// Selects candidate nodes for interface placement
pub struct NodeSelector {
    controller: StorageControllerRef,
}

impl NodeSelector {
    pub fn new(controller: StorageControllerRef) -> Self {
        Self { controller }
    }

    /// Nodes in controller order, duplicates removed
    pub async fn select_nodes(&self) -> Result<Vec<Node>> {
        let listed = self.controller.list_nodes().await?;
        let nodes = dedup_nodes(listed);

        if nodes.len() < MIN_NODES {
            return Err(Error::InsufficientNodes {
                found: nodes.len(),
                required: MIN_NODES,
            });
        }

        debug!(
            count = nodes.len(),
            nodes = ?nodes.iter().map(|n| n.name.as_str()).collect::<Vec<_>>(),
            "Selected storage nodes"
        );
        Ok(nodes)
    }
}

fn dedup_nodes(nodes: Vec<Node>) -> Vec<Node> {
    let mut seen = HashSet::new();
    nodes
        .into_iter()
        .filter(|node| seen.insert(node.uuid.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::memory::MemoryController;
    use assert_matches::assert_matches;
    use std::sync::Arc;

    fn node(uuid: &str, name: &str) -> Node {
        Node {
            uuid: uuid.into(),
            name: name.into(),
        }
    }

    #[tokio::test]
    async fn test_too_few_nodes_rejected() {
        for nodes in [vec![], vec![node("u1", "n1")]] {
            let expected = nodes.len();
            let controller = Arc::new(MemoryController::new().with_nodes(nodes));
            let selector = NodeSelector::new(controller);

            assert_matches!(
                selector.select_nodes().await,
                Err(Error::InsufficientNodes { found, required: MIN_NODES }) if found == expected
            );
        }
    }

    #[tokio::test]
    async fn test_duplicate_nodes_count_once() {
        let controller = Arc::new(
            MemoryController::new().with_nodes(vec![node("u1", "n1"), node("u1", "n1")]),
        );
        let selector = NodeSelector::new(controller);

        assert_matches!(
            selector.select_nodes().await,
            Err(Error::InsufficientNodes { found: 1, .. })
        );
    }

    #[tokio::test]
    async fn test_order_preserved() {
        let controller = Arc::new(MemoryController::new().with_nodes(vec![
            node("u2", "n2"),
            node("u1", "n1"),
            node("u3", "n3"),
        ]));
        let selector = NodeSelector::new(controller.clone());

        let nodes = selector.select_nodes().await.unwrap();
        let names: Vec<_> = nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["n2", "n1", "n3"]);

        // Fresh listing every call
        selector.select_nodes().await.unwrap();
        assert_eq!(controller.calls().node_lists, 2);
    }
}
