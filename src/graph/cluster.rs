//! Deal cohorts keyed by deal type and status.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{GraphNode, NodeId};

/// A named cohort of deals sharing a deal type and status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealCluster {
    /// `"{dealType}-{status}"`
    pub id: String,
    /// `"{dealType} - {status}"`
    pub label: String,
    pub members: Vec<NodeId>,
    pub characteristics: ClusterCharacteristics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterCharacteristics {
    pub deal_type: String,
    pub status: String,
    pub size: usize,
}

/// Group deal nodes into clusters. Clusters come back sorted by id, members in node order.
pub fn cluster_deals(nodes: &[GraphNode]) -> Vec<DealCluster> {
    let mut buckets: BTreeMap<String, DealCluster> = BTreeMap::new();

    for node in nodes {
        let Some(deal) = node.as_deal() else {
            continue;
        };
        let status = deal.status.as_str();
        let key = format!("{}-{}", deal.deal_type, status);
        buckets
            .entry(key.clone())
            .or_insert_with(|| DealCluster {
                id: key,
                label: format!("{} - {}", deal.deal_type, status),
                members: Vec::new(),
                characteristics: ClusterCharacteristics {
                    deal_type: deal.deal_type.clone(),
                    status: status.to_string(),
                    size: 0,
                },
            })
            .members
            .push(node.id.clone());
    }

    buckets
        .into_values()
        .map(|mut cluster| {
            cluster.characteristics.size = cluster.members.len();
            cluster
        })
        .collect()
}
