//! Corpus-wide counterparty co-participation and `negotiated_with` edges.
//!
//! Unlike similarity scoring this is an aggregation: every deal adds to the
//! tally of each organization pair it contains, and edges are only emitted once
//! the whole corpus has been seen.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::corpus::{DealStatus, HistoricalDeal};

use super::{EdgeKind, GraphEdge, NodeId};

/// Default cap on sticking-point tags reported per relationship.
pub const DEFAULT_MAX_STICKING_POINTS: usize = 5;

/// Aggregated history between two counterparties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipStats {
    pub deal_count: usize,
    pub avg_negotiation_rounds: f64,
    pub success_rate: f64,
    /// Mean closing days over successful deals; 0 when none succeeded.
    pub avg_closing_days: f64,
    pub common_sticking_points: Vec<String>,
}

/// Additive tally for one sorted organization pair.
#[derive(Debug, Default, Clone)]
struct PairTally {
    deal_count: usize,
    rounds_sum: u64,
    success_count: usize,
    closing_days_sum: f64,
    sticking_points: Vec<String>,
}

impl PairTally {
    fn observe(&mut self, deal: &HistoricalDeal) {
        self.deal_count += 1;
        self.rounds_sum += u64::from(deal.negotiation_rounds);
        if deal.status == DealStatus::Closed {
            self.success_count += 1;
            if let Some(days) = deal.duration_days() {
                self.closing_days_sum += days as f64;
            }
        }
        self.sticking_points.extend(deal.sticking_points.iter().cloned());
    }

    fn stats(&self, max_sticking_points: usize) -> RelationshipStats {
        let deals = self.deal_count as f64;
        let mut common_sticking_points: Vec<String> = Vec::new();
        for tag in &self.sticking_points {
            if common_sticking_points.len() >= max_sticking_points {
                break;
            }
            if !common_sticking_points.contains(tag) {
                common_sticking_points.push(tag.clone());
            }
        }
        RelationshipStats {
            deal_count: self.deal_count,
            avg_negotiation_rounds: self.rounds_sum as f64 / deals,
            success_rate: self.success_count as f64 / deals,
            avg_closing_days: if self.success_count > 0 {
                self.closing_days_sum / self.success_count as f64
            } else {
                0.0
            },
            common_sticking_points,
        }
    }
}

/// Accumulates organization-pair tallies over a corpus in a single ordered pass.
pub struct RelationshipAggregator<'a> {
    counterparties: &'a BTreeMap<String, NodeId>,
    tallies: BTreeMap<(String, String), PairTally>,
    deals_seen: usize,
    max_sticking_points: usize,
}

impl<'a> RelationshipAggregator<'a> {
    pub fn new(counterparties: &'a BTreeMap<String, NodeId>, max_sticking_points: usize) -> Self {
        Self {
            counterparties,
            tallies: BTreeMap::new(),
            deals_seen: 0,
            max_sticking_points,
        }
    }

    /// Add one deal to the tallies of every organization pair it contains.
    pub fn observe(&mut self, deal: &HistoricalDeal) {
        self.deals_seen += 1;
        let orgs: Vec<&str> = deal.organization_ids().into_iter().collect();
        for (i, a) in orgs.iter().enumerate() {
            for b in &orgs[i + 1..] {
                self.tallies
                    .entry((a.to_string(), b.to_string()))
                    .or_default()
                    .observe(deal);
            }
        }
    }

    /// Emit one edge per pair whose organizations both have counterparty nodes.
    pub fn finish(self, created_at: DateTime<Utc>) -> Vec<GraphEdge> {
        let corpus_size = self.deals_seen;
        let edges: Vec<GraphEdge> = self
            .tallies
            .iter()
            .filter_map(|((a, b), tally)| {
                let source = self.counterparties.get(a)?;
                let target = self.counterparties.get(b)?;
                let weight = tally.deal_count as f64 / corpus_size as f64;
                Some(GraphEdge::weighted(
                    source.clone(),
                    target.clone(),
                    EdgeKind::NegotiatedWith(tally.stats(self.max_sticking_points)),
                    weight,
                    created_at,
                ))
            })
            .collect();
        tracing::debug!(
            pairs = self.tallies.len(),
            edges = edges.len(),
            "relationship pass complete"
        );
        edges
    }
}

/// Aggregate the whole corpus and return its `negotiated_with` edges.
pub fn relationship_edges(
    corpus: &[HistoricalDeal],
    counterparties: &BTreeMap<String, NodeId>,
    max_sticking_points: usize,
    created_at: DateTime<Utc>,
) -> Vec<GraphEdge> {
    let mut aggregator = RelationshipAggregator::new(counterparties, max_sticking_points);
    for deal in corpus {
        aggregator.observe(deal);
    }
    aggregator.finish(created_at)
}
