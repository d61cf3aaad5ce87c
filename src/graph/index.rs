//! The finished, read-only deal knowledge graph.
//!
//! Nodes and edges are kept in build order. A `petgraph` undirected graph
//! mirrors them one-to-one (node index `i` is `nodes[i]`, each edge weight is
//! the position in `edges`) and backs every degree, neighbor and traversal
//! query.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};

use crate::error::GraphError;

use super::analytics::GraphStatistics;
use super::cluster::DealCluster;
use super::{GraphEdge, GraphNode, NodeId};

/// Result type for graph operations.
pub type GraphResult<T> = std::result::Result<T, GraphError>;

/// Derived data computed once the node and edge sets are final.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphMetadata {
    pub built_at: Option<DateTime<Utc>>,
    pub corpus_size: usize,
    pub clusters: Vec<DealCluster>,
    pub statistics: GraphStatistics,
}

/// Immutable deal knowledge graph.
///
/// Safe to share across threads; nothing mutates it after assembly.
pub struct KnowledgeGraph {
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
    metadata: GraphMetadata,
    /// NodeId → position in `nodes` (and petgraph index).
    node_index: HashMap<NodeId, usize>,
    topology: UnGraph<(), usize>,
}

impl KnowledgeGraph {
    /// Assemble a graph, validating unique node ids and edge endpoints.
    pub fn from_parts(nodes: Vec<GraphNode>, edges: Vec<GraphEdge>) -> GraphResult<Self> {
        let mut node_index = HashMap::with_capacity(nodes.len());
        let mut topology: UnGraph<(), usize> = UnGraph::with_capacity(nodes.len(), edges.len());

        for (i, node) in nodes.iter().enumerate() {
            if node_index.insert(node.id.clone(), i).is_some() {
                return Err(GraphError::DuplicateNode {
                    node_id: node.id.to_string(),
                });
            }
            topology.add_node(());
        }

        for (i, edge) in edges.iter().enumerate() {
            let endpoint = |id: &NodeId| {
                node_index
                    .get(id)
                    .copied()
                    .ok_or_else(|| GraphError::DanglingEdge {
                        edge_id: edge.id.to_string(),
                        node_id: id.to_string(),
                    })
            };
            let source = endpoint(&edge.source)?;
            let target = endpoint(&edge.target)?;
            topology.add_edge(NodeIndex::new(source), NodeIndex::new(target), i);
        }

        Ok(Self {
            nodes,
            edges,
            metadata: GraphMetadata::default(),
            node_index,
            topology,
        })
    }

    /// Attach derived metadata. Only the assembling stage calls this.
    pub(crate) fn with_metadata(mut self, metadata: GraphMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    pub fn metadata(&self) -> &GraphMetadata {
        &self.metadata
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn has_node(&self, id: &NodeId) -> bool {
        self.node_index.contains_key(id)
    }

    pub fn node(&self, id: &NodeId) -> Option<&GraphNode> {
        self.node_index.get(id).map(|&i| &self.nodes[i])
    }

    /// Position of a node in [`nodes`](Self::nodes).
    pub fn position(&self, id: &NodeId) -> Option<usize> {
        self.node_index.get(id).copied()
    }

    /// Number of edges incident to the node at `position`.
    pub fn degree_at(&self, position: usize) -> usize {
        self.topology.edges(NodeIndex::new(position)).count()
    }

    pub fn degree(&self, id: &NodeId) -> usize {
        self.position(id).map_or(0, |p| self.degree_at(p))
    }

    /// Edges incident to the node at `position`, as `(edge position, neighbor position)`,
    /// in build order.
    pub fn incident_at(&self, position: usize) -> Vec<(usize, usize)> {
        let idx = NodeIndex::new(position);
        let mut incident: Vec<(usize, usize)> = self
            .topology
            .edges(idx)
            .map(|e| {
                let other = if e.source() == idx { e.target() } else { e.source() };
                (*e.weight(), other.index())
            })
            .collect();
        incident.sort_unstable();
        incident
    }

    /// Edges incident to `id`, in either direction.
    pub fn incident_edges(&self, id: &NodeId) -> Vec<&GraphEdge> {
        match self.position(id) {
            Some(p) => self
                .incident_at(p)
                .into_iter()
                .map(|(e, _)| &self.edges[e])
                .collect(),
            None => Vec::new(),
        }
    }

    /// Distinct neighbor positions of every node, self-loops excluded.
    pub fn neighbor_sets(&self) -> Vec<BTreeSet<usize>> {
        (0..self.nodes.len())
            .map(|p| {
                self.topology
                    .neighbors(NodeIndex::new(p))
                    .map(|n| n.index())
                    .filter(|&n| n != p)
                    .collect()
            })
            .collect()
    }

    pub(crate) fn into_parts(self) -> (Vec<GraphNode>, Vec<GraphEdge>, GraphMetadata) {
        (self.nodes, self.edges, self.metadata)
    }
}

impl std::fmt::Debug for KnowledgeGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeGraph")
            .field("nodes", &self.node_count())
            .field("edges", &self.edge_count())
            .field("clusters", &self.metadata.clusters.len())
            .finish()
    }
}
