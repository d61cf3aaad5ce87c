//! Deal knowledge graph: typed nodes and edges over a historical deal corpus.
//!
//! - **Model** (this module): [`GraphNode`] / [`GraphEdge`] with one enum
//!   variant per node kind and edge type
//! - **Construction** ([`builder`], [`similarity`], [`relationship`]): structural
//!   edges, `similar_to` scoring and `negotiated_with` aggregation
//! - **Analysis** ([`cluster`], [`analytics`]): cohorts and network statistics
//! - **Queries** ([`query`], [`traverse`]): read-only lookups on a finished
//!   [`KnowledgeGraph`](index::KnowledgeGraph)
//!
//! Node and edge ids are derived from source data, so rebuilding from the same
//! corpus yields the same ids.

pub mod analytics;
pub mod builder;
pub mod cluster;
pub mod index;
pub mod query;
pub mod relationship;
pub mod similarity;
pub mod traverse;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::corpus::DealStatus;

pub use index::{GraphMetadata, GraphResult, KnowledgeGraph};
pub use relationship::RelationshipStats;
pub use similarity::SimilarityBreakdown;

/// Deterministic, source-derived node identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn deal(deal_id: &str) -> Self {
        Self(format!("deal:{deal_id}"))
    }

    /// Terms are scoped to their deal: the same key in two deals yields two ids.
    pub fn term(deal_id: &str, term_key: &str) -> Self {
        Self(format!("term:{deal_id}:{term_key}"))
    }

    pub fn participant(participant_id: &str) -> Self {
        Self(format!("participant:{participant_id}"))
    }

    pub fn counterparty(organization_id: &str) -> Self {
        Self(format!("counterparty:{organization_id}"))
    }

    /// `bucket` is a `YYYY-MM` month.
    pub fn market_condition(bucket: &str) -> Self {
        Self(format!("market:{bucket}"))
    }

    pub fn outcome(deal_id: &str) -> Self {
        Self(format!("outcome:{deal_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Edge identifier derived from `(source, target, type)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(String);

impl EdgeId {
    pub fn new(source: &NodeId, target: &NodeId, edge_type: EdgeType) -> Self {
        Self(format!("{source}->{target}:{edge_type}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EdgeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Nodes
// ---------------------------------------------------------------------------

/// Fieldless tag for [`NodeData`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Deal,
    Term,
    Participant,
    Counterparty,
    MarketCondition,
    Outcome,
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NodeKind::Deal => "deal",
            NodeKind::Term => "term",
            NodeKind::Participant => "participant",
            NodeKind::Counterparty => "counterparty",
            NodeKind::MarketCondition => "market_condition",
            NodeKind::Outcome => "outcome",
        };
        f.write_str(s)
    }
}

/// A node in the deal knowledge graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: NodeId,
    pub label: String,
    #[serde(flatten)]
    pub data: NodeData,
}

impl GraphNode {
    pub fn kind(&self) -> NodeKind {
        self.data.kind()
    }

    pub fn as_deal(&self) -> Option<&DealNode> {
        match &self.data {
            NodeData::Deal(deal) => Some(deal),
            _ => None,
        }
    }

    pub fn as_counterparty(&self) -> Option<&CounterpartyNode> {
        match &self.data {
            NodeData::Counterparty(cp) => Some(cp),
            _ => None,
        }
    }
}

/// Kind-specific properties of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "properties", rename_all = "snake_case")]
pub enum NodeData {
    Deal(DealNode),
    Term(TermNode),
    Participant(ParticipantNode),
    Counterparty(CounterpartyNode),
    MarketCondition(MarketConditionNode),
    Outcome(OutcomeNode),
}

impl NodeData {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeData::Deal(_) => NodeKind::Deal,
            NodeData::Term(_) => NodeKind::Term,
            NodeData::Participant(_) => NodeKind::Participant,
            NodeData::Counterparty(_) => NodeKind::Counterparty,
            NodeData::MarketCondition(_) => NodeKind::MarketCondition,
            NodeData::Outcome(_) => NodeKind::Outcome,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealNode {
    pub deal_id: String,
    pub deal_name: String,
    pub deal_type: String,
    pub status: DealStatus,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub total_value: Option<f64>,
    /// Whole days from creation to close; absent while open.
    pub duration_days: Option<i64>,
    pub negotiation_rounds: u32,
    pub success_score: Option<f64>,
    pub industry: String,
    pub borrower_profile: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TermNode {
    pub deal_id: String,
    pub term_key: String,
    pub term_label: String,
    pub value_type: String,
    pub final_value: Option<serde_json::Value>,
    pub initial_value: Option<serde_json::Value>,
    pub negotiation_rounds: u32,
    pub was_contentious: bool,
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantNode {
    pub participant_id: String,
    pub party_name: String,
    pub party_type: String,
    pub deal_role: String,
    pub organization_id: Option<String>,
}

/// An organization aggregated over every deal its representatives joined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterpartyNode {
    pub organization_id: String,
    pub organization_name: String,
    pub total_deals: usize,
    /// Mean closing time in days over closed deals that carry a closing timestamp.
    pub avg_closing_time: f64,
    /// Populated by downstream enrichment, never by the graph build.
    #[serde(default)]
    pub acceptance_patterns: Vec<String>,
    #[serde(default)]
    pub preferred_term_structures: Vec<String>,
    #[serde(default)]
    pub negotiation_style: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketConditionNode {
    /// Calendar month, `YYYY-MM`.
    pub period: String,
    pub avg_margin: f64,
    pub avg_leverage: f64,
    pub market_volatility: f64,
    pub deal_volume: f64,
    pub economic_indicator: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeType {
    Closed,
    Terminated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeNode {
    pub deal_id: String,
    pub outcome_type: OutcomeType,
    pub closing_time_days: Option<i64>,
    pub final_margin: Option<f64>,
    pub counterparty_acceptance: bool,
    pub post_closing_performance: Option<f64>,
}

// ---------------------------------------------------------------------------
// Edges
// ---------------------------------------------------------------------------

/// Fieldless tag for [`EdgeKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    Contains,
    ParticipatedIn,
    ResultedIn,
    InfluencedBy,
    SimilarTo,
    NegotiatedWith,
}

impl EdgeType {
    /// Weight of structural edges; `None` for computed edge types.
    pub fn fixed_weight(self) -> Option<f64> {
        match self {
            EdgeType::Contains | EdgeType::ParticipatedIn | EdgeType::ResultedIn => Some(1.0),
            EdgeType::InfluencedBy => Some(0.8),
            EdgeType::SimilarTo | EdgeType::NegotiatedWith => None,
        }
    }
}

impl std::fmt::Display for EdgeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EdgeType::Contains => "contains",
            EdgeType::ParticipatedIn => "participated_in",
            EdgeType::ResultedIn => "resulted_in",
            EdgeType::InfluencedBy => "influenced_by",
            EdgeType::SimilarTo => "similar_to",
            EdgeType::NegotiatedWith => "negotiated_with",
        };
        f.write_str(s)
    }
}

/// Edge type together with its type-specific property bag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "properties", rename_all = "snake_case")]
pub enum EdgeKind {
    /// Deal → Term
    Contains,
    /// Participant → Deal
    ParticipatedIn,
    /// Deal → Outcome
    ResultedIn,
    /// Deal → MarketCondition
    InfluencedBy,
    /// Deal ↔ Deal
    SimilarTo(SimilarityBreakdown),
    /// Counterparty ↔ Counterparty
    NegotiatedWith(RelationshipStats),
}

impl EdgeKind {
    pub fn edge_type(&self) -> EdgeType {
        match self {
            EdgeKind::Contains => EdgeType::Contains,
            EdgeKind::ParticipatedIn => EdgeType::ParticipatedIn,
            EdgeKind::ResultedIn => EdgeType::ResultedIn,
            EdgeKind::InfluencedBy => EdgeType::InfluencedBy,
            EdgeKind::SimilarTo(_) => EdgeType::SimilarTo,
            EdgeKind::NegotiatedWith(_) => EdgeType::NegotiatedWith,
        }
    }
}

/// An edge in the deal knowledge graph.
///
/// Stored with a direction, but every traversal and statistic treats it as
/// incident to both endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    #[serde(flatten)]
    pub kind: EdgeKind,
    pub weight: f64,
    pub created_at: DateTime<Utc>,
}

impl GraphEdge {
    /// Create a structural edge carrying its type's fixed weight.
    pub fn structural(
        source: NodeId,
        target: NodeId,
        kind: EdgeKind,
        created_at: DateTime<Utc>,
    ) -> Self {
        let weight = kind.edge_type().fixed_weight().unwrap_or(1.0);
        Self::weighted(source, target, kind, weight, created_at)
    }

    /// Create an edge with a computed weight, clamped to [0, 1].
    pub fn weighted(
        source: NodeId,
        target: NodeId,
        kind: EdgeKind,
        weight: f64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EdgeId::new(&source, &target, kind.edge_type()),
            source,
            target,
            kind,
            weight: weight.clamp(0.0, 1.0),
            created_at,
        }
    }

    pub fn edge_type(&self) -> EdgeType {
        self.kind.edge_type()
    }

    /// Whether `node` is either endpoint.
    pub fn touches(&self, node: &NodeId) -> bool {
        &self.source == node || &self.target == node
    }

    /// The endpoint opposite `node`, if `node` is an endpoint.
    pub fn other_end(&self, node: &NodeId) -> Option<&NodeId> {
        if &self.source == node {
            Some(&self.target)
        } else if &self.target == node {
            Some(&self.source)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_ids_are_source_derived() {
        assert_eq!(NodeId::deal("d1").as_str(), "deal:d1");
        assert_eq!(NodeId::term("d1", "margin").as_str(), "term:d1:margin");
        assert_ne!(NodeId::term("d1", "margin"), NodeId::term("d2", "margin"));
        assert_eq!(NodeId::market_condition("2024-03").as_str(), "market:2024-03");
    }

    #[test]
    fn edge_id_encodes_endpoints_and_type() {
        let id = EdgeId::new(&NodeId::deal("a"), &NodeId::outcome("a"), EdgeType::ResultedIn);
        assert_eq!(id.as_str(), "deal:a->outcome:a:resulted_in");
    }

    #[test]
    fn structural_edges_carry_fixed_weights() {
        let now = Utc::now();
        let influenced = GraphEdge::structural(
            NodeId::deal("a"),
            NodeId::market_condition("2024-01"),
            EdgeKind::InfluencedBy,
            now,
        );
        assert!((influenced.weight - 0.8).abs() < f64::EPSILON);

        let contains = GraphEdge::structural(
            NodeId::deal("a"),
            NodeId::term("a", "k"),
            EdgeKind::Contains,
            now,
        );
        assert!((contains.weight - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn other_end_is_symmetric() {
        let edge = GraphEdge::structural(
            NodeId::participant("p"),
            NodeId::deal("d"),
            EdgeKind::ParticipatedIn,
            Utc::now(),
        );
        assert_eq!(edge.other_end(&NodeId::deal("d")), Some(&NodeId::participant("p")));
        assert_eq!(edge.other_end(&NodeId::participant("p")), Some(&NodeId::deal("d")));
        assert_eq!(edge.other_end(&NodeId::deal("x")), None);
    }

    #[test]
    fn edge_serializes_with_type_tag() {
        let edge = GraphEdge::structural(
            NodeId::deal("a"),
            NodeId::term("a", "k"),
            EdgeKind::Contains,
            Utc::now(),
        );
        let json = serde_json::to_value(&edge).unwrap();
        assert_eq!(json["type"], "contains");
        assert_eq!(json["source"], "deal:a");
    }
}
