// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # deal-graph
//!
//! A knowledge graph over historical financing deals: who negotiated with
//! whom, which terms were fought over, how deals closed and which deals look
//! alike.
//!
//! ## Architecture
//!
//! - **Corpus** (`corpus`): historical deal records loaded from JSON
//! - **Graph model** (`graph`): typed nodes and edges with source-derived ids
//! - **Construction** (`graph::builder`, `graph::similarity`, `graph::relationship`):
//!   structural pass, then pairwise similarity and counterparty aggregation on rayon
//! - **Analysis** (`graph::cluster`, `graph::analytics`): cohorts and network statistics
//! - **Queries** (`graph::query`, `graph::traverse`): read-only lookups on a finished graph
//! - **Snapshots** (`export`): JSON persistence of a built graph
//!
//! ## Library usage
//!
//! ```no_run
//! use std::path::Path;
//!
//! use deal_graph::corpus::load_corpus;
//! use deal_graph::engine::{Engine, EngineConfig};
//! use deal_graph::graph::query::find_similar_deals;
//!
//! let corpus = load_corpus(Path::new("deals.json")).unwrap();
//! let engine = Engine::new(EngineConfig::default()).unwrap();
//! let kg = engine.build(&corpus).unwrap();
//! for similar in find_similar_deals(&kg, "deal-42", 5) {
//!     println!("{} {:.2}", similar.deal_id, similar.score);
//! }
//! ```

pub mod corpus;
pub mod engine;
pub mod error;
pub mod export;
pub mod graph;
