//! Bounded neighborhood expansion over the undirected graph.
//!
//! Provides BFS-based traversal from seed nodes with configurable depth limits,
//! edge-type filters and a node cap.

use std::collections::{HashSet, VecDeque};

use serde::Serialize;

use crate::error::GraphError;

use super::index::{GraphResult, KnowledgeGraph};
use super::{EdgeType, GraphEdge, GraphNode, NodeId};

/// Configuration for a graph traversal.
#[derive(Debug, Clone)]
pub struct TraversalConfig {
    /// Maximum hop depth from seed nodes.
    pub max_depth: usize,
    /// Only follow edges of these types (empty = follow all).
    pub edge_filter: HashSet<EdgeType>,
    /// Maximum number of nodes to visit, seeds included.
    pub max_nodes: usize,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            max_depth: 1,
            edge_filter: HashSet::new(),
            max_nodes: 10_000,
        }
    }
}

/// Result of a traversal: nodes in visit order and the edges that were followed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraversalResult {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    /// Maximum depth actually reached.
    pub depth_reached: usize,
}

/// Perform a BFS traversal from seed nodes.
///
/// Every edge incident to an expanded node (one closer than `max_depth`) is
/// collected once; a visited set keeps cycles from being re-entered.
pub fn traverse_bfs(
    kg: &KnowledgeGraph,
    seeds: &[NodeId],
    config: &TraversalConfig,
) -> GraphResult<TraversalResult> {
    let mut visited: HashSet<usize> = HashSet::new();
    let mut order: Vec<usize> = Vec::new();
    let mut followed: HashSet<usize> = HashSet::new();
    let mut edge_order: Vec<usize> = Vec::new();
    let mut depth_reached = 0;

    // BFS queue: (node position, current depth)
    let mut queue: VecDeque<(usize, usize)> = VecDeque::new();

    for seed in seeds {
        let position = kg.position(seed).ok_or_else(|| GraphError::NodeNotFound {
            node_id: seed.to_string(),
        })?;
        if visited.insert(position) {
            order.push(position);
            queue.push_back((position, 0));
        }
    }

    'bfs: while let Some((current, depth)) = queue.pop_front() {
        if depth >= config.max_depth {
            continue;
        }

        for (edge, neighbor) in kg.incident_at(current) {
            let edge_type = kg.edges()[edge].edge_type();
            if !config.edge_filter.is_empty() && !config.edge_filter.contains(&edge_type) {
                continue;
            }
            if !visited.contains(&neighbor) && order.len() >= config.max_nodes {
                break 'bfs;
            }

            if followed.insert(edge) {
                edge_order.push(edge);
            }
            if visited.insert(neighbor) {
                order.push(neighbor);
                depth_reached = depth_reached.max(depth + 1);
                queue.push_back((neighbor, depth + 1));
            }
        }
    }

    Ok(TraversalResult {
        nodes: order.into_iter().map(|p| kg.nodes()[p].clone()).collect(),
        edges: edge_order.into_iter().map(|e| kg.edges()[e].clone()).collect(),
        depth_reached,
    })
}

/// Nodes within `depth` hops of `id`, with the edges used to reach them.
pub fn related_nodes(
    kg: &KnowledgeGraph,
    id: &NodeId,
    depth: usize,
) -> GraphResult<TraversalResult> {
    traverse_bfs(
        kg,
        std::slice::from_ref(id),
        &TraversalConfig {
            max_depth: depth,
            ..Default::default()
        },
    )
}
