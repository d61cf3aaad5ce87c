//! Rich diagnostic error types for the deal-graph engine.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains so users know exactly what
//! went wrong and how to fix it.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the deal-graph engine.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain (error codes, help text) through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum DealGraphError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Corpus(#[from] CorpusError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Engine(#[from] EngineError),
}

// ---------------------------------------------------------------------------
// Graph errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum GraphError {
    #[error("node not found: {node_id}")]
    #[diagnostic(
        code(deal_graph::graph::node_not_found),
        help(
            "No node with this id exists in the knowledge graph. \
             Node ids are derived from the corpus, e.g. `deal:<dealId>` or \
             `counterparty:<organizationId>`."
        )
    )]
    NodeNotFound { node_id: String },

    #[error("duplicate node id: {node_id}")]
    #[diagnostic(
        code(deal_graph::graph::duplicate_node),
        help(
            "Node ids within a finished graph must be unique. \
             If this graph came from a snapshot file, the file has been edited \
             or corrupted; rebuild it from the corpus."
        )
    )]
    DuplicateNode { node_id: String },

    #[error("edge {edge_id} references missing node {node_id}")]
    #[diagnostic(
        code(deal_graph::graph::dangling_edge),
        help(
            "Every edge endpoint must exist among the graph's nodes. \
             Rebuild the graph from the corpus instead of editing snapshots by hand."
        )
    )]
    DanglingEdge { edge_id: String, node_id: String },

    #[error("snapshot serialization error: {message}")]
    #[diagnostic(
        code(deal_graph::graph::snapshot),
        help(
            "The graph snapshot could not be encoded or decoded as JSON. \
             Snapshots are only portable between compatible deal-graph versions."
        )
    )]
    Snapshot { message: String },
}

// ---------------------------------------------------------------------------
// Corpus errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum CorpusError {
    #[error("failed to read corpus file {path}")]
    #[diagnostic(
        code(deal_graph::corpus::io),
        help("Check that the corpus file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse corpus: {message}")]
    #[diagnostic(
        code(deal_graph::corpus::parse),
        help(
            "The corpus must be a JSON array of deal records with camelCase keys \
             (id, name, dealType, status, createdAt, terms, participants, ...)."
        )
    )]
    Parse { message: String },

    #[error("deal #{index} has an empty required field `{field}`")]
    #[diagnostic(
        code(deal_graph::corpus::missing_deal_field),
        help(
            "Every deal record needs a non-empty id, name, dealType, industry \
             and borrowerProfile."
        )
    )]
    MissingDealField { index: usize, field: &'static str },

    #[error("deal {deal_id}: participant #{index} has an empty required field `{field}`")]
    #[diagnostic(
        code(deal_graph::corpus::missing_participant_field),
        help("Every participant needs a non-empty id and partyName.")
    )]
    MissingParticipantField {
        deal_id: String,
        index: usize,
        field: &'static str,
    },

    #[error("deal {deal_id}: term #{index} has an empty key")]
    #[diagnostic(
        code(deal_graph::corpus::missing_term_key),
        help("Term nodes are identified by (dealId, termKey); the key must not be empty.")
    )]
    MissingTermKey { deal_id: String, index: usize },
}

// ---------------------------------------------------------------------------
// Engine errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum EngineError {
    #[error("invalid configuration: {message}")]
    #[diagnostic(
        code(deal_graph::engine::invalid_config),
        help("Check the EngineConfig fields. {message}")
    )]
    InvalidConfig { message: String },

    #[error("failed to read config file {path}")]
    #[diagnostic(
        code(deal_graph::engine::config_read),
        help("Check that the config file exists and is readable.")
    )]
    ConfigRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write config file {path}")]
    #[diagnostic(
        code(deal_graph::engine::config_write),
        help("Check that the target directory exists and is writable.")
    )]
    ConfigWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {message}")]
    #[diagnostic(
        code(deal_graph::engine::config_parse),
        help("The config file must be valid TOML. Unknown keys are ignored.")
    )]
    ConfigParse { path: String, message: String },

    #[error("failed to start worker pool: {message}")]
    #[diagnostic(
        code(deal_graph::engine::thread_pool),
        help("Lower `threads` in the config, or leave it unset to use rayon's default.")
    )]
    ThreadPool { message: String },
}

/// Convenience alias for functions returning deal-graph results.
pub type DealGraphResult<T> = std::result::Result<T, DealGraphError>;
