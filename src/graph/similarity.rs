//! Pairwise deal similarity and `similar_to` edge generation.
//!
//! Every unordered pair of deals is scored as a weighted sum of four factors.
//! The denominator is the full weight sum regardless of which values were
//! present, so deals with sparse data score lower.

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::{DealNode, EdgeKind, GraphEdge, GraphNode};

/// Minimum score for a `similar_to` edge.
pub const SIMILARITY_THRESHOLD: f64 = 0.6;

const DEAL_TYPE_WEIGHT: f64 = 0.30;
const INDUSTRY_WEIGHT: f64 = 0.25;
const BORROWER_PROFILE_WEIGHT: f64 = 0.25;
const VALUE_WEIGHT: f64 = 0.20;
/// Value ratios below this contribute nothing.
const VALUE_RATIO_FLOOR: f64 = 0.7;

const TOTAL_WEIGHT: f64 =
    DEAL_TYPE_WEIGHT + INDUSTRY_WEIGHT + BORROWER_PROFILE_WEIGHT + VALUE_WEIGHT;

/// Which factors contributed to a similarity score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarityBreakdown {
    pub same_deal_type: bool,
    pub same_industry: bool,
    pub same_borrower_profile: bool,
    /// min/max of the two total values, when both are present and positive.
    pub value_ratio: Option<f64>,
}

/// A similarity score with its explanation.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityScore {
    pub score: f64,
    pub breakdown: SimilarityBreakdown,
}

/// Score two deals in [0, 1].
pub fn score_deals(a: &DealNode, b: &DealNode) -> SimilarityScore {
    let same_deal_type = a.deal_type == b.deal_type;
    let same_industry = a.industry == b.industry;
    let same_borrower_profile = a.borrower_profile == b.borrower_profile;
    let value_ratio = match (a.total_value, b.total_value) {
        (Some(x), Some(y)) => value_ratio(x, y),
        _ => None,
    };

    let mut total = 0.0;
    if same_deal_type {
        total += DEAL_TYPE_WEIGHT;
    }
    if same_industry {
        total += INDUSTRY_WEIGHT;
    }
    if same_borrower_profile {
        total += BORROWER_PROFILE_WEIGHT;
    }
    if let Some(ratio) = value_ratio {
        if ratio >= VALUE_RATIO_FLOOR {
            total += VALUE_WEIGHT * ratio;
        }
    }

    SimilarityScore {
        score: (total / TOTAL_WEIGHT).clamp(0.0, 1.0),
        breakdown: SimilarityBreakdown {
            same_deal_type,
            same_industry,
            same_borrower_profile,
            value_ratio,
        },
    }
}

/// min/max of two positive values; two zeros count as identical.
///
/// `None` when either value is negative, or exactly one is zero.
fn value_ratio(x: f64, y: f64) -> Option<f64> {
    if x == 0.0 && y == 0.0 {
        return Some(1.0);
    }
    if x <= 0.0 || y <= 0.0 {
        return None;
    }
    Some(x.min(y) / x.max(y))
}

/// Score every unordered pair of deal nodes and emit `similar_to` edges.
///
/// Runs on the current rayon pool. Output order matches the sequential
/// `(i, j), i < j` pair order, with the earlier deal as the edge source.
pub fn similarity_edges(deals: &[&GraphNode], created_at: DateTime<Utc>) -> Vec<GraphEdge> {
    let deal_data: Vec<(&GraphNode, &DealNode)> = deals
        .iter()
        .filter_map(|node| node.as_deal().map(|deal| (*node, deal)))
        .collect();
    let scored = &deal_data;
    let n = scored.len();

    let edges: Vec<GraphEdge> = (0..n)
        .into_par_iter()
        .flat_map_iter(move |i| {
            (i + 1..n).filter_map(move |j| {
                let (left, left_deal) = scored[i];
                let (right, right_deal) = scored[j];
                let result = score_deals(left_deal, right_deal);
                (result.score >= SIMILARITY_THRESHOLD).then(|| {
                    GraphEdge::weighted(
                        left.id.clone(),
                        right.id.clone(),
                        EdgeKind::SimilarTo(result.breakdown),
                        result.score,
                        created_at,
                    )
                })
            })
        })
        .collect();

    tracing::debug!(deals = n, edges = edges.len(), "similarity pass complete");
    edges
}
