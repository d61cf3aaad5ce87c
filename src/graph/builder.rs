//! Single-pass construction of nodes and structural edges from a deal corpus.
//!
//! The builder exclusively owns its identity maps while the pass runs; the
//! resulting [`BuildOutput`] is frozen and handed to the later stages.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};

use crate::corpus::{DealParticipant, DealStatus, DealTerm, HistoricalDeal, MarketSnapshot};

use super::{
    CounterpartyNode, DealNode, EdgeId, EdgeKind, GraphEdge, GraphNode, MarketConditionNode,
    NodeData, NodeId, OutcomeNode, OutcomeType, ParticipantNode, TermNode,
};

/// Everything the builder produced, in corpus order.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    /// organizationId → counterparty node id.
    pub counterparties: BTreeMap<String, NodeId>,
}

impl BuildOutput {
    /// Deal nodes in corpus order.
    pub fn deal_nodes(&self) -> Vec<&GraphNode> {
        self.nodes.iter().filter(|n| n.as_deal().is_some()).collect()
    }
}

/// Running closing-time mean for one organization.
#[derive(Debug, Default, Clone, Copy)]
struct ClosingTimeAverage {
    mean: f64,
    samples: usize,
}

impl ClosingTimeAverage {
    fn observe(&mut self, days: f64) {
        self.samples += 1;
        let n = self.samples as f64;
        self.mean = (self.mean * (n - 1.0) + days) / n;
    }
}

/// Converts a deal corpus into nodes and structural edges.
pub struct GraphBuilder {
    built_at: DateTime<Utc>,
    nodes: Vec<GraphNode>,
    /// NodeId → position in `nodes`; shared identity map for every node kind.
    node_slots: HashMap<NodeId, usize>,
    edges: Vec<GraphEdge>,
    edge_slots: HashMap<EdgeId, usize>,
    counterparties: BTreeMap<String, NodeId>,
    closing_times: HashMap<String, ClosingTimeAverage>,
}

impl GraphBuilder {
    pub fn new(built_at: DateTime<Utc>) -> Self {
        Self {
            built_at,
            nodes: Vec::new(),
            node_slots: HashMap::new(),
            edges: Vec::new(),
            edge_slots: HashMap::new(),
            counterparties: BTreeMap::new(),
            closing_times: HashMap::new(),
        }
    }

    /// Run the pass over the whole corpus.
    pub fn build(mut self, corpus: &[HistoricalDeal]) -> BuildOutput {
        for deal in corpus {
            self.add_deal(deal);
        }
        tracing::debug!(
            nodes = self.nodes.len(),
            edges = self.edges.len(),
            counterparties = self.counterparties.len(),
            "builder pass finished"
        );
        BuildOutput {
            nodes: self.nodes,
            edges: self.edges,
            counterparties: self.counterparties,
        }
    }

    /// Add one deal record with all its terms, participants, outcome and market data.
    pub fn add_deal(&mut self, deal: &HistoricalDeal) {
        let deal_id = NodeId::deal(&deal.id);
        self.upsert_node(GraphNode {
            id: deal_id.clone(),
            label: deal.name.clone(),
            data: NodeData::Deal(DealNode {
                deal_id: deal.id.clone(),
                deal_name: deal.name.clone(),
                deal_type: deal.deal_type.clone(),
                status: deal.status.clone(),
                created_at: deal.created_at,
                closed_at: deal.closed_at,
                total_value: deal.total_value,
                duration_days: deal.duration_days(),
                negotiation_rounds: deal.negotiation_rounds,
                success_score: deal.success_score,
                industry: deal.industry.clone(),
                borrower_profile: deal.borrower_profile.clone(),
            }),
        });

        for term in &deal.terms {
            let term_id = self.add_term(deal, term);
            self.add_edge(GraphEdge::structural(
                deal_id.clone(),
                term_id,
                EdgeKind::Contains,
                self.built_at,
            ));
        }

        let mut organizations_seen: BTreeSet<&str> = BTreeSet::new();
        for participant in &deal.participants {
            let participant_id = self.add_participant(participant);
            self.add_edge(GraphEdge::structural(
                participant_id,
                deal_id.clone(),
                EdgeKind::ParticipatedIn,
                self.built_at,
            ));

            if let Some(org) = participant.organization_id.as_deref() {
                // One deal counts once per organization.
                if organizations_seen.insert(org) {
                    self.record_counterparty(org, participant, deal);
                }
            }
        }

        if deal.status.is_final() {
            let outcome_id = self.add_outcome(deal);
            self.add_edge(GraphEdge::structural(
                deal_id.clone(),
                outcome_id,
                EdgeKind::ResultedIn,
                self.built_at,
            ));
        }

        if let Some(snapshot) = &deal.market_conditions {
            let market_id = self.add_market_condition(&deal.market_bucket(), snapshot);
            self.add_edge(GraphEdge::structural(
                deal_id,
                market_id,
                EdgeKind::InfluencedBy,
                self.built_at,
            ));
        }
    }

    fn add_term(&mut self, deal: &HistoricalDeal, term: &DealTerm) -> NodeId {
        let id = NodeId::term(&deal.id, &term.key);
        if !self.node_slots.contains_key(&id) {
            let label = if term.label.is_empty() {
                term.key.clone()
            } else {
                term.label.clone()
            };
            self.upsert_node(GraphNode {
                id: id.clone(),
                label: label.clone(),
                data: NodeData::Term(TermNode {
                    deal_id: deal.id.clone(),
                    term_key: term.key.clone(),
                    term_label: label,
                    value_type: term.value_type.clone(),
                    final_value: term.final_value.clone(),
                    initial_value: term.initial_value.clone(),
                    negotiation_rounds: term.negotiation_rounds,
                    was_contentious: term.was_contentious,
                    category: term.category.clone(),
                }),
            });
        }
        id
    }

    fn add_participant(&mut self, participant: &DealParticipant) -> NodeId {
        let id = NodeId::participant(&participant.id);
        if !self.node_slots.contains_key(&id) {
            self.upsert_node(GraphNode {
                id: id.clone(),
                label: participant.party_name.clone(),
                data: NodeData::Participant(ParticipantNode {
                    participant_id: participant.id.clone(),
                    party_name: participant.party_name.clone(),
                    party_type: participant.party_type.clone(),
                    deal_role: participant.deal_role.clone(),
                    organization_id: participant.organization_id.clone(),
                }),
            });
        }
        id
    }

    /// Create the counterparty on first sighting, otherwise bump its aggregates.
    fn record_counterparty(
        &mut self,
        organization_id: &str,
        participant: &DealParticipant,
        deal: &HistoricalDeal,
    ) {
        let closing = self
            .closing_times
            .entry(organization_id.to_string())
            .or_default();
        if deal.status == DealStatus::Closed {
            if let Some(days) = deal.duration_days() {
                closing.observe(days as f64);
            }
        }
        let avg_closing_time = closing.mean;

        let id = NodeId::counterparty(organization_id);
        match self.node_slots.get(&id) {
            Some(&slot) => {
                if let NodeData::Counterparty(cp) = &mut self.nodes[slot].data {
                    cp.total_deals += 1;
                    cp.avg_closing_time = avg_closing_time;
                }
            }
            None => {
                let name = participant
                    .organization_name
                    .clone()
                    .unwrap_or_else(|| participant.party_name.clone());
                self.upsert_node(GraphNode {
                    id: id.clone(),
                    label: name.clone(),
                    data: NodeData::Counterparty(CounterpartyNode {
                        organization_id: organization_id.to_string(),
                        organization_name: name,
                        total_deals: 1,
                        avg_closing_time,
                        acceptance_patterns: Vec::new(),
                        preferred_term_structures: Vec::new(),
                        negotiation_style: None,
                    }),
                });
                self.counterparties.insert(organization_id.to_string(), id);
            }
        }
    }

    fn add_outcome(&mut self, deal: &HistoricalDeal) -> NodeId {
        let id = NodeId::outcome(&deal.id);
        let outcome_type = if deal.status == DealStatus::Closed {
            OutcomeType::Closed
        } else {
            OutcomeType::Terminated
        };
        self.upsert_node(GraphNode {
            id: id.clone(),
            label: format!("{} ({})", deal.name, deal.status),
            data: NodeData::Outcome(OutcomeNode {
                deal_id: deal.id.clone(),
                outcome_type,
                closing_time_days: deal.duration_days(),
                final_margin: deal.margin,
                counterparty_acceptance: outcome_type == OutcomeType::Closed,
                post_closing_performance: deal.post_closing_score,
            }),
        });
        id
    }

    /// First snapshot seen in a month bucket defines that bucket's node.
    fn add_market_condition(&mut self, bucket: &str, snapshot: &MarketSnapshot) -> NodeId {
        let id = NodeId::market_condition(bucket);
        if !self.node_slots.contains_key(&id) {
            self.upsert_node(GraphNode {
                id: id.clone(),
                label: format!("Market {bucket}"),
                data: NodeData::MarketCondition(MarketConditionNode {
                    period: bucket.to_string(),
                    avg_margin: snapshot.avg_margin,
                    avg_leverage: snapshot.avg_leverage,
                    market_volatility: snapshot.market_volatility,
                    deal_volume: snapshot.deal_volume,
                    economic_indicator: snapshot.economic_indicator.clone(),
                }),
            });
        }
        id
    }

    fn upsert_node(&mut self, node: GraphNode) {
        match self.node_slots.get(&node.id) {
            Some(&slot) => self.nodes[slot] = node,
            None => {
                self.node_slots.insert(node.id.clone(), self.nodes.len());
                self.nodes.push(node);
            }
        }
    }

    /// Re-adding an edge id overwrites the earlier edge in place.
    fn add_edge(&mut self, edge: GraphEdge) {
        match self.edge_slots.get(&edge.id) {
            Some(&slot) => self.edges[slot] = edge,
            None => {
                self.edge_slots.insert(edge.id.clone(), self.edges.len());
                self.edges.push(edge);
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::graph::{EdgeType, NodeKind};
    use chrono::TimeZone;

    pub(crate) fn deal(id: &str, status: &str) -> HistoricalDeal {
        HistoricalDeal {
            id: id.into(),
            name: format!("Deal {id}"),
            deal_type: "term_loan".into(),
            status: DealStatus::from(status.to_string()),
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
            closed_at: None,
            total_value: Some(100.0),
            margin: None,
            synergy_value: None,
            negotiation_rounds: 0,
            success_score: None,
            post_closing_score: None,
            industry: "retail".into(),
            borrower_profile: "sponsor_backed".into(),
            sticking_points: Vec::new(),
            terms: Vec::new(),
            participants: Vec::new(),
            market_conditions: None,
        }
    }

    pub(crate) fn participant(id: &str, org: Option<&str>) -> DealParticipant {
        DealParticipant {
            id: id.into(),
            party_name: format!("Party {id}"),
            party_type: "lender".into(),
            deal_role: "arranger".into(),
            organization_id: org.map(str::to_string),
            organization_name: None,
        }
    }

    fn term(key: &str) -> DealTerm {
        DealTerm {
            key: key.into(),
            label: "Margin".into(),
            value_type: "percentage".into(),
            final_value: Some(serde_json::json!(3.5)),
            initial_value: Some(serde_json::json!(4.0)),
            negotiation_rounds: 2,
            was_contentious: true,
            category: Some("pricing".into()),
        }
    }

    fn snapshot() -> MarketSnapshot {
        MarketSnapshot {
            avg_margin: 3.0,
            avg_leverage: 4.0,
            market_volatility: 0.1,
            deal_volume: 42.0,
            economic_indicator: None,
        }
    }

    fn count_kind(output: &BuildOutput, kind: NodeKind) -> usize {
        output.nodes.iter().filter(|n| n.kind() == kind).count()
    }

    #[test]
    fn duplicate_term_keys_yield_one_node() {
        let mut d = deal("d1", "open");
        d.terms = vec![term("margin"), term("margin")];
        let out = GraphBuilder::new(Utc::now()).build(&[d]);

        assert_eq!(count_kind(&out, NodeKind::Term), 1);
        let contains = out
            .edges
            .iter()
            .filter(|e| e.edge_type() == EdgeType::Contains)
            .count();
        assert_eq!(contains, 1);
    }

    #[test]
    fn same_term_key_in_two_deals_yields_two_nodes() {
        let mut a = deal("a", "open");
        a.terms = vec![term("margin")];
        let mut b = deal("b", "open");
        b.terms = vec![term("margin")];
        let out = GraphBuilder::new(Utc::now()).build(&[a, b]);
        assert_eq!(count_kind(&out, NodeKind::Term), 2);
    }

    #[test]
    fn counterparty_counts_distinct_deals_and_averages_closing_time() {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        let mut a = deal("a", "closed");
        a.created_at = created;
        a.closed_at = Some(created + chrono::Duration::days(10));
        // Two representatives of the same organization in one deal.
        a.participants = vec![participant("p1", Some("org")), participant("p2", Some("org"))];

        let mut b = deal("b", "closed");
        b.created_at = created;
        b.closed_at = Some(created + chrono::Duration::days(30));
        b.participants = vec![participant("p3", Some("org"))];

        let mut c = deal("c", "open");
        c.participants = vec![participant("p4", Some("org"))];

        let out = GraphBuilder::new(Utc::now()).build(&[a, b, c]);
        let cp = out
            .nodes
            .iter()
            .find_map(GraphNode::as_counterparty)
            .unwrap();
        assert_eq!(cp.total_deals, 3);
        assert!((cp.avg_closing_time - 20.0).abs() < 1e-9);
        assert_eq!(cp.organization_name, "Party p1");
        assert_eq!(out.counterparties["org"], NodeId::counterparty("org"));
    }

    #[test]
    fn terminated_deals_do_not_count_toward_closing_time() {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        let mut closed = deal("a", "closed");
        closed.created_at = created;
        closed.closed_at = Some(created + chrono::Duration::days(10));
        closed.participants = vec![participant("p1", Some("org"))];

        let mut open = deal("b", "open");
        open.participants = vec![participant("p2", Some("org"))];

        let mut terminated = deal("c", "terminated");
        terminated.created_at = created;
        terminated.closed_at = Some(created + chrono::Duration::days(60));
        terminated.participants = vec![participant("p3", Some("org"))];

        let out = GraphBuilder::new(Utc::now()).build(&[closed, open, terminated]);
        let cp = out
            .nodes
            .iter()
            .find_map(GraphNode::as_counterparty)
            .unwrap();
        assert_eq!(cp.total_deals, 3);
        assert!((cp.avg_closing_time - 10.0).abs() < 1e-9);
    }

    #[test]
    fn outcomes_only_for_final_statuses() {
        let out = GraphBuilder::new(Utc::now()).build(&[
            deal("a", "closed"),
            deal("b", "terminated"),
            deal("c", "open"),
            deal("d", "in_review"),
        ]);
        assert_eq!(count_kind(&out, NodeKind::Outcome), 2);

        let terminated = out
            .nodes
            .iter()
            .find(|n| n.id == NodeId::outcome("b"))
            .unwrap();
        match &terminated.data {
            NodeData::Outcome(o) => {
                assert_eq!(o.outcome_type, OutcomeType::Terminated);
                assert!(!o.counterparty_acceptance);
            }
            other => panic!("expected outcome, got {other:?}"),
        }
    }

    #[test]
    fn market_conditions_share_a_month_bucket() {
        let mut a = deal("a", "open");
        a.market_conditions = Some(snapshot());
        let mut b = deal("b", "open");
        b.created_at = Utc.with_ymd_and_hms(2024, 3, 31, 23, 0, 0).unwrap();
        b.market_conditions = Some(snapshot());
        let mut c = deal("c", "open");
        c.created_at = Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap();
        c.market_conditions = Some(snapshot());

        let out = GraphBuilder::new(Utc::now()).build(&[a, b, c]);
        assert_eq!(count_kind(&out, NodeKind::MarketCondition), 2);
        let influenced: Vec<_> = out
            .edges
            .iter()
            .filter(|e| e.edge_type() == EdgeType::InfluencedBy)
            .collect();
        assert_eq!(influenced.len(), 3);
        assert_eq!(influenced[1].target, NodeId::market_condition("2024-03"));
    }

    #[test]
    fn absent_optional_data_creates_no_edges() {
        let out = GraphBuilder::new(Utc::now()).build(&[deal("a", "open")]);
        assert_eq!(out.nodes.len(), 1);
        assert!(out.edges.is_empty());
        assert!(out.counterparties.is_empty());
    }

    #[test]
    fn shared_participant_links_to_both_deals() {
        let mut a = deal("a", "open");
        a.participants = vec![participant("p", None)];
        let mut b = deal("b", "open");
        b.participants = vec![participant("p", None)];
        let out = GraphBuilder::new(Utc::now()).build(&[a, b]);
        assert_eq!(count_kind(&out, NodeKind::Participant), 1);
        assert_eq!(out.edges.len(), 2);
    }
}
