//! Read-only lookups on a finished graph: similar deals and counterparty insights.

use serde::Serialize;

use super::index::KnowledgeGraph;
use super::{CounterpartyNode, EdgeKind, NodeId, RelationshipStats, SimilarityBreakdown};

/// A deal similar to the queried one.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarDeal {
    pub deal_id: String,
    pub score: f64,
    pub breakdown: SimilarityBreakdown,
}

/// Deals connected to `deal_id` by `similar_to` edges, highest score first.
///
/// An unknown deal id yields an empty list.
pub fn find_similar_deals(kg: &KnowledgeGraph, deal_id: &str, limit: usize) -> Vec<SimilarDeal> {
    let node_id = NodeId::deal(deal_id);
    let mut similar: Vec<SimilarDeal> = kg
        .incident_edges(&node_id)
        .into_iter()
        .filter_map(|edge| {
            let EdgeKind::SimilarTo(breakdown) = &edge.kind else {
                return None;
            };
            let other = kg.node(edge.other_end(&node_id)?)?.as_deal()?;
            Some(SimilarDeal {
                deal_id: other.deal_id.clone(),
                score: edge.weight,
                breakdown: breakdown.clone(),
            })
        })
        .collect();

    similar.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    similar.truncate(limit);
    similar
}

/// A counterparty relationship seen from one side.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterpartyRelationship {
    pub organization_id: String,
    pub organization_name: String,
    pub weight: f64,
    pub stats: RelationshipStats,
}

/// A counterparty node with its `negotiated_with` relationships.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterpartyInsights {
    pub counterparty: CounterpartyNode,
    /// Strongest relationship first.
    pub relationships: Vec<CounterpartyRelationship>,
}

/// Look up a counterparty by organization id; `None` when unknown.
pub fn counterparty_insights(
    kg: &KnowledgeGraph,
    organization_id: &str,
) -> Option<CounterpartyInsights> {
    let node_id = NodeId::counterparty(organization_id);
    let counterparty = kg.node(&node_id)?.as_counterparty()?.clone();

    let mut relationships: Vec<CounterpartyRelationship> = kg
        .incident_edges(&node_id)
        .into_iter()
        .filter_map(|edge| {
            let EdgeKind::NegotiatedWith(stats) = &edge.kind else {
                return None;
            };
            let other = kg.node(edge.other_end(&node_id)?)?.as_counterparty()?;
            Some(CounterpartyRelationship {
                organization_id: other.organization_id.clone(),
                organization_name: other.organization_name.clone(),
                weight: edge.weight,
                stats: stats.clone(),
            })
        })
        .collect();
    relationships.sort_by(|a, b| {
        b.weight
            .partial_cmp(&a.weight)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    Some(CounterpartyInsights {
        counterparty,
        relationships,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::HistoricalDeal;
    use crate::engine::{Engine, EngineConfig};
    use crate::graph::builder::tests::{deal, participant};

    fn corpus() -> Vec<HistoricalDeal> {
        let mut a = deal("a", "closed");
        a.participants = vec![
            participant("p1", Some("lender")),
            participant("p2", Some("borrower")),
        ];
        let mut b = deal("b", "closed");
        b.total_value = Some(95.0);
        b.participants = vec![
            participant("p3", Some("lender")),
            participant("p4", Some("borrower")),
        ];
        let mut c = deal("c", "open");
        c.total_value = Some(80.0);
        let mut d = deal("d", "open");
        d.deal_type = "revolver".into();
        d.industry = "energy".into();
        d.borrower_profile = "corporate".into();
        d.participants = vec![
            participant("p5", Some("lender")),
            participant("p6", Some("sponsor")),
        ];
        vec![a, b, c, d]
    }

    fn build() -> KnowledgeGraph {
        Engine::new(EngineConfig::default())
            .unwrap()
            .build(&corpus())
            .unwrap()
    }

    #[test]
    fn similar_deals_sorted_and_limited() {
        let kg = build();
        let similar = find_similar_deals(&kg, "a", 10);
        let ids: Vec<&str> = similar.iter().map(|s| s.deal_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
        assert!(similar[0].score > similar[1].score);

        let limited = find_similar_deals(&kg, "a", 1);
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].deal_id, "b");
    }

    #[test]
    fn similar_deals_are_found_from_either_end() {
        let kg = build();
        let similar = find_similar_deals(&kg, "c", 10);
        assert_eq!(similar.len(), 2);
        assert!(find_similar_deals(&kg, "d", 10).is_empty());
        assert!(find_similar_deals(&kg, "unknown", 10).is_empty());
    }

    #[test]
    fn counterparty_insights_include_relationships() {
        let kg = build();
        let insights = counterparty_insights(&kg, "lender").unwrap();
        assert_eq!(insights.counterparty.total_deals, 3);
        assert_eq!(insights.relationships.len(), 2);
        assert_eq!(insights.relationships[0].organization_id, "borrower");
        assert!((insights.relationships[0].weight - 0.5).abs() < 1e-9);
        assert_eq!(insights.relationships[0].stats.deal_count, 2);
        assert!((insights.relationships[1].weight - 0.25).abs() < 1e-9);
    }

    #[test]
    fn unknown_counterparty_is_none() {
        let kg = build();
        assert!(counterparty_insights(&kg, "nobody").is_none());
    }
}
