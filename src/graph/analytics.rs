//! Graph analytics: degree, density, clustering coefficient, path length and centrality.
//!
//! All functions operate on a [`KnowledgeGraph`] reference and treat every
//! edge as undirected. Rankings are sorted by score desc with ties kept in
//! node order, so results are stable across rebuilds.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::index::sample;
use serde::{Deserialize, Serialize};

use super::index::KnowledgeGraph;
use super::{EdgeType, NodeId, NodeKind};

/// Tuning for [`compute_statistics`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// BFS sources used for the average path length; every node when the graph is smaller.
    pub path_length_samples: usize,
    /// Seed for picking BFS sources on larger graphs.
    pub sample_seed: u64,
    /// How many nodes to report in the centrality ranking.
    pub top_central: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            path_length_samples: 64,
            sample_seed: 0x5eed,
            top_central: 10,
        }
    }
}

/// Whole-graph statistics stored in the graph metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphStatistics {
    pub node_count: usize,
    pub edge_count: usize,
    pub avg_degree: f64,
    pub density: f64,
    pub clustering_coefficient: f64,
    pub avg_path_length: f64,
    pub top_central_nodes: Vec<CentralNode>,
    pub nodes_by_kind: BTreeMap<NodeKind, usize>,
    pub edges_by_type: BTreeMap<EdgeType, usize>,
}

/// A node in the centrality ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CentralNode {
    pub node_id: NodeId,
    /// degree / (n - 1)
    pub score: f64,
}

/// Compute every statistic for a finished graph.
pub fn compute_statistics(kg: &KnowledgeGraph, config: &AnalyticsConfig) -> GraphStatistics {
    let node_count = kg.node_count();
    let edge_count = kg.edge_count();
    let degrees = degree_centrality(kg);

    let avg_degree = if node_count > 0 {
        degrees.iter().map(|d| d.degree).sum::<usize>() as f64 / node_count as f64
    } else {
        0.0
    };

    let top_central_nodes = degrees
        .iter()
        .take(config.top_central)
        .map(|d| CentralNode {
            node_id: d.node_id.clone(),
            score: normalized_degree(d.degree, node_count),
        })
        .collect();

    let mut nodes_by_kind = BTreeMap::new();
    for node in kg.nodes() {
        *nodes_by_kind.entry(node.kind()).or_insert(0) += 1;
    }
    let mut edges_by_type = BTreeMap::new();
    for edge in kg.edges() {
        *edges_by_type.entry(edge.edge_type()).or_insert(0) += 1;
    }

    let neighbors = kg.neighbor_sets();
    let stats = GraphStatistics {
        node_count,
        edge_count,
        avg_degree,
        density: density(node_count, edge_count),
        clustering_coefficient: average_clustering(kg, &neighbors),
        avg_path_length: average_path_length(
            &neighbors,
            config.path_length_samples,
            config.sample_seed,
        ),
        top_central_nodes,
        nodes_by_kind,
        edges_by_type,
    };
    tracing::debug!(
        nodes = stats.node_count,
        edges = stats.edge_count,
        density = stats.density,
        clustering = stats.clustering_coefficient,
        "statistics computed"
    );
    stats
}

// ---------------------------------------------------------------------------
// Degree centrality
// ---------------------------------------------------------------------------

/// Degree of a single node.
#[derive(Debug, Clone, PartialEq)]
pub struct DegreeCentrality {
    pub node_id: NodeId,
    /// Number of incident edges, direction ignored.
    pub degree: usize,
}

/// Compute degree for all nodes. Returns sorted by degree desc.
pub fn degree_centrality(kg: &KnowledgeGraph) -> Vec<DegreeCentrality> {
    let mut results: Vec<DegreeCentrality> = kg
        .nodes()
        .iter()
        .enumerate()
        .map(|(position, node)| DegreeCentrality {
            node_id: node.id.clone(),
            degree: kg.degree_at(position),
        })
        .collect();
    results.sort_by(|a, b| b.degree.cmp(&a.degree));
    results
}

fn normalized_degree(degree: usize, node_count: usize) -> f64 {
    if node_count < 2 {
        0.0
    } else {
        degree as f64 / (node_count - 1) as f64
    }
}

// ---------------------------------------------------------------------------
// Density
// ---------------------------------------------------------------------------

/// Edges over the maximum possible undirected edges; 0 for fewer than two nodes.
pub fn density(node_count: usize, edge_count: usize) -> f64 {
    if node_count < 2 {
        return 0.0;
    }
    let max_edges = node_count as f64 * (node_count - 1) as f64 / 2.0;
    edge_count as f64 / max_edges
}

// ---------------------------------------------------------------------------
// Clustering coefficient
// ---------------------------------------------------------------------------

/// Fraction of a node's neighbor pairs that are directly connected.
///
/// `None` for nodes with degree below 2, which take no part in the average.
pub fn local_clustering_coefficient(kg: &KnowledgeGraph, id: &NodeId) -> Option<f64> {
    let position = kg.position(id)?;
    let neighbors = kg.neighbor_sets();
    local_coefficient(kg.degree_at(position), &neighbors[position], &neighbors)
}

fn local_coefficient(
    degree: usize,
    own: &BTreeSet<usize>,
    neighbors: &[BTreeSet<usize>],
) -> Option<f64> {
    if degree < 2 {
        return None;
    }
    let k = own.len();
    if k < 2 {
        return Some(0.0);
    }
    let members: Vec<usize> = own.iter().copied().collect();
    let mut triangles = 0usize;
    for (i, &u) in members.iter().enumerate() {
        for &v in &members[i + 1..] {
            if neighbors[u].contains(&v) {
                triangles += 1;
            }
        }
    }
    let possible = k * (k - 1) / 2;
    Some(triangles as f64 / possible as f64)
}

/// Mean local coefficient over nodes with degree >= 2; 0 when there are none.
pub fn average_clustering(kg: &KnowledgeGraph, neighbors: &[BTreeSet<usize>]) -> f64 {
    let coefficients: Vec<f64> = (0..kg.node_count())
        .filter_map(|p| local_coefficient(kg.degree_at(p), &neighbors[p], neighbors))
        .collect();
    if coefficients.is_empty() {
        0.0
    } else {
        coefficients.iter().sum::<f64>() / coefficients.len() as f64
    }
}

// ---------------------------------------------------------------------------
// Average path length
// ---------------------------------------------------------------------------

/// Mean shortest-path hop count over reachable ordered pairs.
///
/// Runs a BFS from every node when there are at most `samples` nodes,
/// otherwise from `samples` sources drawn with a seeded RNG. Returns 0 when no
/// pair of distinct nodes is connected.
pub fn average_path_length(neighbors: &[BTreeSet<usize>], samples: usize, seed: u64) -> f64 {
    let n = neighbors.len();
    let sources: Vec<usize> = if n <= samples {
        (0..n).collect()
    } else {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut picked = sample(&mut rng, n, samples).into_vec();
        picked.sort_unstable();
        picked
    };

    let mut total_hops = 0usize;
    let mut pairs = 0usize;
    let mut distance: Vec<Option<usize>> = vec![None; n];
    let mut queue = VecDeque::new();

    for source in sources {
        distance.iter_mut().for_each(|d| *d = None);
        distance[source] = Some(0);
        queue.push_back(source);

        while let Some(current) = queue.pop_front() {
            let hops = distance[current].unwrap_or_default();
            for &next in &neighbors[current] {
                if distance[next].is_none() {
                    distance[next] = Some(hops + 1);
                    total_hops += hops + 1;
                    pairs += 1;
                    queue.push_back(next);
                }
            }
        }
    }

    if pairs == 0 {
        0.0
    } else {
        total_hops as f64 / pairs as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::index::tests::graph;

    fn star() -> KnowledgeGraph {
        graph(
            &["hub", "l1", "l2", "l3", "l4"],
            &[("hub", "l1"), ("hub", "l2"), ("l3", "hub"), ("hub", "l4")],
        )
    }

    fn k4() -> KnowledgeGraph {
        graph(
            &["a", "b", "c", "d"],
            &[("a", "b"), ("a", "c"), ("a", "d"), ("b", "c"), ("b", "d"), ("c", "d")],
        )
    }

    #[test]
    fn degree_centrality_hub_highest() {
        let kg = star();
        let results = degree_centrality(&kg);
        assert_eq!(results[0].node_id, NodeId::from("hub"));
        assert_eq!(results[0].degree, 4);
        // Ties keep node order.
        assert_eq!(results[1].node_id, NodeId::from("l1"));
    }

    #[test]
    fn clique_coefficients_are_one() {
        let kg = k4();
        for id in ["a", "b", "c", "d"] {
            let c = local_clustering_coefficient(&kg, &NodeId::from(id)).unwrap();
            assert!((c - 1.0).abs() < 1e-12);
        }
        let stats = compute_statistics(&kg, &AnalyticsConfig::default());
        assert!((stats.clustering_coefficient - 1.0).abs() < 1e-12);
        assert!((stats.density - 1.0).abs() < 1e-12);
        assert!((stats.avg_path_length - 1.0).abs() < 1e-12);
    }

    #[test]
    fn star_hub_is_zero_and_leaves_are_excluded() {
        let kg = star();
        assert_eq!(local_clustering_coefficient(&kg, &NodeId::from("hub")), Some(0.0));
        assert_eq!(local_clustering_coefficient(&kg, &NodeId::from("l1")), None);

        let stats = compute_statistics(&kg, &AnalyticsConfig::default());
        assert_eq!(stats.clustering_coefficient, 0.0);
        // hub-leaf: 1 hop (8 ordered pairs), leaf-leaf: 2 hops (12 ordered pairs).
        assert!((stats.avg_path_length - 32.0 / 20.0).abs() < 1e-12);
        assert!((stats.avg_degree - 8.0 / 5.0).abs() < 1e-12);
        assert_eq!(stats.top_central_nodes[0].node_id, NodeId::from("hub"));
        assert!((stats.top_central_nodes[0].score - 1.0).abs() < 1e-12);
    }

    #[test]
    fn density_bounds() {
        assert_eq!(density(0, 0), 0.0);
        assert_eq!(density(1, 0), 0.0);
        assert_eq!(density(2, 1), 1.0);
        let d = density(10, 7);
        assert!((0.0..=1.0).contains(&d));
    }

    #[test]
    fn triangle_with_tail() {
        // a-b-c triangle plus c-d tail: c has 3 neighbors, one connected pair.
        let kg = graph(&["a", "b", "c", "d"], &[("a", "b"), ("b", "c"), ("c", "a"), ("c", "d")]);
        let c = local_clustering_coefficient(&kg, &NodeId::from("c")).unwrap();
        assert!((c - 1.0 / 3.0).abs() < 1e-12);
        let stats = compute_statistics(&kg, &AnalyticsConfig::default());
        // a: 1, b: 1, c: 1/3; d excluded.
        assert!((stats.clustering_coefficient - (7.0 / 3.0) / 3.0).abs() < 1e-12);
    }

    #[test]
    fn sampled_path_length_is_deterministic() {
        let names: Vec<String> = (0..30).map(|i| format!("n{i}")).collect();
        let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let pairs: Vec<(&str, &str)> = name_refs.windows(2).map(|w| (w[0], w[1])).collect();
        let kg = graph(&name_refs, &pairs);
        let neighbors = kg.neighbor_sets();

        let first = average_path_length(&neighbors, 8, 42);
        let second = average_path_length(&neighbors, 8, 42);
        assert_eq!(first, second);
        assert!(first >= 1.0);
        // Full BFS over a 30-node path: sum of |i-j| over ordered pairs / pairs = 31/3.
        let full = average_path_length(&neighbors, 64, 0);
        assert!((full - 31.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn empty_graph_statistics_are_zero() {
        let kg = KnowledgeGraph::from_parts(vec![], vec![]).unwrap();
        let stats = compute_statistics(&kg, &AnalyticsConfig::default());
        assert_eq!(stats.node_count, 0);
        assert_eq!(stats.avg_degree, 0.0);
        assert_eq!(stats.density, 0.0);
        assert_eq!(stats.clustering_coefficient, 0.0);
        assert_eq!(stats.avg_path_length, 0.0);
        assert!(stats.top_central_nodes.is_empty());
    }
}
