//! Historical deal records: the input corpus of the graph build.
//!
//! Records arrive as camelCase JSON from whatever system of record owns them.
//! [`load_corpus`] and [`parse_corpus`] form the loading boundary: they reject
//! records with missing required fields so the graph build itself never has
//! to second-guess its input.

use std::collections::BTreeSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CorpusError;

/// Result type for corpus loading.
pub type CorpusResult<T> = std::result::Result<T, CorpusError>;

/// Lifecycle status of a deal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DealStatus {
    Open,
    Closed,
    Terminated,
    /// Any other workflow state reported by the source system.
    Other(String),
}

impl DealStatus {
    pub fn as_str(&self) -> &str {
        match self {
            DealStatus::Open => "open",
            DealStatus::Closed => "closed",
            DealStatus::Terminated => "terminated",
            DealStatus::Other(s) => s,
        }
    }

    /// Whether the deal reached a final state that produces an outcome.
    pub fn is_final(&self) -> bool {
        matches!(self, DealStatus::Closed | DealStatus::Terminated)
    }
}

impl From<String> for DealStatus {
    fn from(s: String) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "open" => DealStatus::Open,
            "closed" => DealStatus::Closed,
            "terminated" => DealStatus::Terminated,
            _ => DealStatus::Other(s),
        }
    }
}

impl From<DealStatus> for String {
    fn from(status: DealStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for DealStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One negotiated deal as recorded by the system of record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalDeal {
    pub id: String,
    pub name: String,
    pub deal_type: String,
    pub status: DealStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub total_value: Option<f64>,
    #[serde(default)]
    pub margin: Option<f64>,
    #[serde(default)]
    pub synergy_value: Option<f64>,
    #[serde(default)]
    pub negotiation_rounds: u32,
    #[serde(default)]
    pub success_score: Option<f64>,
    #[serde(default)]
    pub post_closing_score: Option<f64>,
    #[serde(default)]
    pub industry: String,
    #[serde(default)]
    pub borrower_profile: String,
    #[serde(default)]
    pub sticking_points: Vec<String>,
    #[serde(default)]
    pub terms: Vec<DealTerm>,
    #[serde(default)]
    pub participants: Vec<DealParticipant>,
    #[serde(default)]
    pub market_conditions: Option<MarketSnapshot>,
}

impl HistoricalDeal {
    /// Whole days between creation and close, `None` while the deal is not closed.
    pub fn duration_days(&self) -> Option<i64> {
        self.closed_at
            .map(|closed| (closed - self.created_at).num_days())
    }

    /// Calendar-month bucket (`YYYY-MM`, UTC) the deal was created in.
    pub fn market_bucket(&self) -> String {
        self.created_at.format("%Y-%m").to_string()
    }

    /// Distinct organization ids among the participants, sorted.
    pub fn organization_ids(&self) -> BTreeSet<&str> {
        self.participants
            .iter()
            .filter_map(|p| p.organization_id.as_deref())
            .collect()
    }
}

/// A single negotiated clause within a deal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealTerm {
    pub key: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub value_type: String,
    #[serde(default)]
    pub final_value: Option<serde_json::Value>,
    #[serde(default)]
    pub initial_value: Option<serde_json::Value>,
    #[serde(default)]
    pub negotiation_rounds: u32,
    #[serde(default)]
    pub was_contentious: bool,
    #[serde(default)]
    pub category: Option<String>,
}

/// A party taking part in a deal, optionally on behalf of an organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealParticipant {
    pub id: String,
    pub party_name: String,
    #[serde(default)]
    pub party_type: String,
    #[serde(default)]
    pub deal_role: String,
    #[serde(default)]
    pub organization_id: Option<String>,
    #[serde(default)]
    pub organization_name: Option<String>,
}

/// Market conditions captured when the deal was struck.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSnapshot {
    pub avg_margin: f64,
    pub avg_leverage: f64,
    pub market_volatility: f64,
    pub deal_volume: f64,
    #[serde(default)]
    pub economic_indicator: Option<String>,
}

/// Read and validate a corpus from a JSON file.
pub fn load_corpus(path: &Path) -> CorpusResult<Vec<HistoricalDeal>> {
    let content = std::fs::read_to_string(path).map_err(|e| CorpusError::Read {
        path: path.display().to_string(),
        source: e,
    })?;
    let deals = parse_corpus(&content)?;
    tracing::info!(deals = deals.len(), path = %path.display(), "loaded deal corpus");
    Ok(deals)
}

/// Parse and validate a corpus from a JSON string.
pub fn parse_corpus(json: &str) -> CorpusResult<Vec<HistoricalDeal>> {
    let deals: Vec<HistoricalDeal> =
        serde_json::from_str(json).map_err(|e| CorpusError::Parse {
            message: e.to_string(),
        })?;
    validate_corpus(&deals)?;
    Ok(deals)
}

/// Reject records whose required fields are empty.
pub fn validate_corpus(deals: &[HistoricalDeal]) -> CorpusResult<()> {
    for (index, deal) in deals.iter().enumerate() {
        for (field, value) in [
            ("id", &deal.id),
            ("name", &deal.name),
            ("dealType", &deal.deal_type),
            ("industry", &deal.industry),
            ("borrowerProfile", &deal.borrower_profile),
        ] {
            if value.trim().is_empty() {
                return Err(CorpusError::MissingDealField { index, field });
            }
        }

        for (i, participant) in deal.participants.iter().enumerate() {
            for (field, value) in [
                ("id", &participant.id),
                ("partyName", &participant.party_name),
            ] {
                if value.trim().is_empty() {
                    return Err(CorpusError::MissingParticipantField {
                        deal_id: deal.id.clone(),
                        index: i,
                        field,
                    });
                }
            }
        }

        if let Some(i) = deal.terms.iter().position(|t| t.key.trim().is_empty()) {
            return Err(CorpusError::MissingTermKey {
                deal_id: deal.id.clone(),
                index: i,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE_DEAL: &str = r#"[{
        "id": "d1",
        "name": "Acme refinancing",
        "dealType": "term_loan",
        "status": "closed",
        "createdAt": "2024-01-15T00:00:00Z",
        "closedAt": "2024-02-14T12:00:00Z",
        "totalValue": 250.0,
        "negotiationRounds": 3,
        "industry": "retail",
        "borrowerProfile": "sponsor_backed",
        "stickingPoints": ["pricing"],
        "terms": [{"key": "margin", "label": "Margin", "finalValue": 3.25}],
        "participants": [
            {"id": "p1", "partyName": "Jane Roe", "organizationId": "org-a"},
            {"id": "p2", "partyName": "John Doe", "organizationId": "org-a"},
            {"id": "p3", "partyName": "Sam Poe", "organizationId": "org-b"}
        ],
        "marketConditions": {
            "avgMargin": 3.1, "avgLeverage": 4.5, "marketVolatility": 0.2, "dealVolume": 120
        }
    }]"#;

    #[test]
    fn parses_camel_case_records() {
        let deals = parse_corpus(ONE_DEAL).unwrap();
        assert_eq!(deals.len(), 1);
        let deal = &deals[0];
        assert_eq!(deal.status, DealStatus::Closed);
        assert_eq!(deal.terms[0].final_value, Some(serde_json::json!(3.25)));
        assert!(deal.market_conditions.is_some());
        assert_eq!(deal.duration_days(), Some(30));
        assert_eq!(deal.market_bucket(), "2024-01");
    }

    #[test]
    fn organization_ids_are_distinct_and_sorted() {
        let deals = parse_corpus(ONE_DEAL).unwrap();
        let orgs: Vec<&str> = deals[0].organization_ids().into_iter().collect();
        assert_eq!(orgs, vec!["org-a", "org-b"]);
    }

    #[test]
    fn status_round_trips_unknown_values() {
        let status = DealStatus::from("Under_Review".to_string());
        assert_eq!(status, DealStatus::Other("Under_Review".into()));
        assert_eq!(status.as_str(), "Under_Review");
        assert!(!status.is_final());
        assert!(DealStatus::from("TERMINATED".to_string()).is_final());
    }

    #[test]
    fn empty_participant_name_is_rejected() {
        let json = ONE_DEAL.replace("\"Jane Roe\"", "\"\"");
        let err = parse_corpus(&json).unwrap_err();
        assert!(matches!(
            err,
            CorpusError::MissingParticipantField { field: "partyName", index: 0, .. }
        ));
    }

    #[test]
    fn missing_industry_is_rejected() {
        let json = ONE_DEAL.replace("\"industry\": \"retail\",", "");
        let err = parse_corpus(&json).unwrap_err();
        assert!(matches!(
            err,
            CorpusError::MissingDealField { index: 0, field: "industry" }
        ));
    }

    #[test]
    fn blank_borrower_profile_is_rejected() {
        let json = ONE_DEAL.replace("\"sponsor_backed\"", "\"  \"");
        let err = parse_corpus(&json).unwrap_err();
        assert!(matches!(
            err,
            CorpusError::MissingDealField { index: 0, field: "borrowerProfile" }
        ));
    }

    #[test]
    fn missing_status_is_a_parse_error() {
        let json = ONE_DEAL.replace("\"status\": \"closed\",", "");
        assert!(matches!(parse_corpus(&json), Err(CorpusError::Parse { .. })));
    }

    #[test]
    fn empty_corpus_is_valid() {
        assert!(parse_corpus("[]").unwrap().is_empty());
    }
}
