//! JSON snapshots of finished graphs.
//!
//! A snapshot is the serializable form of a [`KnowledgeGraph`]: nodes, edges
//! and metadata. Loading one re-validates the graph invariants, so a snapshot
//! edited by hand cannot produce dangling edges.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::GraphError;
use crate::graph::index::{GraphMetadata, GraphResult, KnowledgeGraph};
use crate::graph::{GraphEdge, GraphNode};

/// Serializable form of a knowledge graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphSnapshot {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub metadata: GraphMetadata,
}

impl KnowledgeGraph {
    /// Copy the graph into a snapshot.
    pub fn to_snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self.nodes().to_vec(),
            edges: self.edges().to_vec(),
            metadata: self.metadata().clone(),
        }
    }

    /// Consume the graph into a snapshot without cloning.
    pub fn into_snapshot(self) -> GraphSnapshot {
        let (nodes, edges, metadata) = self.into_parts();
        GraphSnapshot {
            nodes,
            edges,
            metadata,
        }
    }

    /// Rebuild a graph from a snapshot, checking node uniqueness and edge endpoints.
    pub fn from_snapshot(snapshot: GraphSnapshot) -> GraphResult<Self> {
        let kg = KnowledgeGraph::from_parts(snapshot.nodes, snapshot.edges)?;
        Ok(kg.with_metadata(snapshot.metadata))
    }
}

impl GraphSnapshot {
    pub fn to_json(&self) -> GraphResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| GraphError::Snapshot {
            message: e.to_string(),
        })
    }

    pub fn from_json(json: &str) -> GraphResult<Self> {
        serde_json::from_str(json).map_err(|e| GraphError::Snapshot {
            message: e.to_string(),
        })
    }

    /// Write the snapshot as pretty JSON.
    pub fn save(&self, path: &Path) -> GraphResult<()> {
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(|e| GraphError::Snapshot {
            message: format!("{}: {e}", path.display()),
        })
    }

    pub fn load(path: &Path) -> GraphResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| GraphError::Snapshot {
            message: format!("{}: {e}", path.display()),
        })?;
        Self::from_json(&json)
    }
}
