//! Engine facade: top-level API for building deal knowledge graphs.
//!
//! The `Engine` owns the configuration and worker pool and runs the build
//! pipeline: structural pass, then similarity and relationship passes in
//! parallel, then clustering and statistics over the assembled graph.

use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::corpus::HistoricalDeal;
use crate::error::{DealGraphResult, EngineError};
use crate::graph::analytics::{self, AnalyticsConfig};
use crate::graph::builder::GraphBuilder;
use crate::graph::index::{GraphMetadata, KnowledgeGraph};
use crate::graph::relationship::{self, DEFAULT_MAX_STICKING_POINTS};
use crate::graph::{cluster, similarity};

/// Configuration for the deal-graph engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Worker threads for the parallel passes. `None` uses rayon's default.
    pub threads: Option<usize>,
    /// Cap on sticking-point tags kept per counterparty relationship.
    pub max_sticking_points: usize,
    /// Statistics tuning.
    pub analytics: AnalyticsConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            threads: None,
            max_sticking_points: DEFAULT_MAX_STICKING_POINTS,
            analytics: AnalyticsConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load from a TOML file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let content = std::fs::read_to_string(path).map_err(|e| EngineError::ConfigRead {
            path: path.display().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| EngineError::ConfigParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Save to a TOML file.
    pub fn save(&self, path: &Path) -> Result<(), EngineError> {
        let content = toml::to_string_pretty(self).map_err(|e| EngineError::ConfigParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        std::fs::write(path, content).map_err(|e| EngineError::ConfigWrite {
            path: path.display().to_string(),
            source: e,
        })
    }

    fn validate(&self) -> Result<(), EngineError> {
        if self.threads == Some(0) {
            return Err(EngineError::InvalidConfig {
                message: "threads must be > 0".into(),
            });
        }
        if self.analytics.top_central == 0 {
            return Err(EngineError::InvalidConfig {
                message: "analytics.top_central must be > 0".into(),
            });
        }
        if self.analytics.path_length_samples == 0 {
            return Err(EngineError::InvalidConfig {
                message: "analytics.path_length_samples must be > 0".into(),
            });
        }
        Ok(())
    }
}

/// Builds immutable [`KnowledgeGraph`]s from deal corpora.
pub struct Engine {
    config: EngineConfig,
    pool: rayon::ThreadPool,
}

impl Engine {
    /// Create a new engine with the given configuration.
    pub fn new(config: EngineConfig) -> DealGraphResult<Self> {
        config.validate()?;

        let mut pool = rayon::ThreadPoolBuilder::new().thread_name(|i| format!("deal-graph-{i}"));
        if let Some(threads) = config.threads {
            pool = pool.num_threads(threads);
        }
        let pool = pool.build().map_err(|e| EngineError::ThreadPool {
            message: e.to_string(),
        })?;

        tracing::info!(
            threads = pool.current_num_threads(),
            path_samples = config.analytics.path_length_samples,
            "initializing deal-graph engine"
        );
        Ok(Self { config, pool })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Build a fresh graph from the corpus. Input order determines node and edge order.
    pub fn build(&self, corpus: &[HistoricalDeal]) -> DealGraphResult<KnowledgeGraph> {
        let built_at = Utc::now();
        let structure = GraphBuilder::new(built_at).build(corpus);
        tracing::info!(
            deals = corpus.len(),
            nodes = structure.nodes.len(),
            structural_edges = structure.edges.len(),
            "structural pass complete"
        );

        let (similar, negotiated) = {
            let deals = structure.deal_nodes();
            self.pool.install(|| {
                rayon::join(
                    || similarity::similarity_edges(&deals, built_at),
                    || {
                        relationship::relationship_edges(
                            corpus,
                            &structure.counterparties,
                            self.config.max_sticking_points,
                            built_at,
                        )
                    },
                )
            })
        };
        tracing::info!(
            similar_to = similar.len(),
            negotiated_with = negotiated.len(),
            "derived edges computed"
        );

        let mut edges = structure.edges;
        edges.extend(similar);
        edges.extend(negotiated);

        let kg = KnowledgeGraph::from_parts(structure.nodes, edges)?;
        let clusters = cluster::cluster_deals(kg.nodes());
        let statistics = analytics::compute_statistics(&kg, &self.config.analytics);
        tracing::info!(
            nodes = statistics.node_count,
            edges = statistics.edge_count,
            clusters = clusters.len(),
            density = statistics.density,
            "knowledge graph built"
        );

        Ok(kg.with_metadata(GraphMetadata {
            built_at: Some(built_at),
            corpus_size: corpus.len(),
            clusters,
            statistics,
        }))
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("threads", &self.pool.current_num_threads())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DealGraphError;

    #[test]
    fn zero_threads_is_rejected() {
        let err = Engine::new(EngineConfig {
            threads: Some(0),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(
            err,
            DealGraphError::Engine(EngineError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn empty_corpus_builds_empty_graph() {
        let engine = Engine::new(EngineConfig {
            threads: Some(2),
            ..Default::default()
        })
        .unwrap();
        let kg = engine.build(&[]).unwrap();
        assert_eq!(kg.node_count(), 0);
        assert_eq!(kg.edge_count(), 0);
        assert_eq!(kg.metadata().statistics.density, 0.0);
        assert!(kg.metadata().clusters.is_empty());
    }

    #[test]
    fn config_round_trips_through_toml() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("deal-graph.toml");
        let config = EngineConfig {
            threads: Some(3),
            max_sticking_points: 2,
            analytics: AnalyticsConfig {
                top_central: 5,
                ..Default::default()
            },
        };
        config.save(&path).unwrap();
        assert_eq!(EngineConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn partial_config_takes_defaults() {
        let config: EngineConfig = toml::from_str("[analytics]\ntop_central = 3\n").unwrap();
        assert_eq!(config.analytics.top_central, 3);
        assert_eq!(config.analytics.path_length_samples, 64);
        assert_eq!(config.max_sticking_points, DEFAULT_MAX_STICKING_POINTS);
        assert_eq!(config.threads, None);
    }
}
