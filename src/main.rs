//! deal-graph CLI: build and query deal knowledge graphs.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use serde::Serialize;

use deal_graph::corpus::load_corpus;
use deal_graph::engine::{Engine, EngineConfig};
use deal_graph::error::GraphError;
use deal_graph::graph::NodeId;
use deal_graph::graph::index::KnowledgeGraph;
use deal_graph::graph::query::{counterparty_insights, find_similar_deals};
use deal_graph::graph::traverse::related_nodes;

#[derive(Parser)]
#[command(name = "deal-graph", version, about = "Knowledge graph over historical deals")]
struct Cli {
    /// JSON file with the historical deal corpus.
    #[arg(long, global = true, default_value = "deals.json")]
    corpus: PathBuf,

    /// TOML engine configuration.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Worker threads (overrides the config file).
    #[arg(long, global = true)]
    threads: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the graph and print (or save) a JSON snapshot.
    Build {
        /// Write the snapshot here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Print graph statistics.
    Stats,

    /// Print deal clusters.
    Clusters,

    /// Deals most similar to a given deal.
    Similar {
        /// Deal id from the corpus.
        #[arg(long)]
        deal: String,

        #[arg(long, default_value = "10")]
        limit: usize,
    },

    /// A counterparty and its negotiation relationships.
    Counterparty {
        /// Organization id.
        #[arg(long)]
        org: String,
    },

    /// Nodes within a number of hops of a node.
    Related {
        /// Full node id, e.g. `deal:d-17` or `counterparty:acme`.
        #[arg(long)]
        node: String,

        #[arg(long, default_value = "1")]
        depth: usize,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).into_diagnostic()?;
    println!("{json}");
    Ok(())
}

fn build_graph(cli: &Cli) -> Result<KnowledgeGraph> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if cli.threads.is_some() {
        config.threads = cli.threads;
    }

    let engine = Engine::new(config)?;
    let corpus = load_corpus(&cli.corpus)?;
    Ok(engine.build(&corpus)?)
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok();

    // stdout carries JSON output only.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let kg = build_graph(&cli)?;

    match cli.command {
        Commands::Build { output } => {
            let snapshot = kg.into_snapshot();
            match output {
                Some(path) => {
                    snapshot.save(&path)?;
                    eprintln!(
                        "Wrote {} nodes and {} edges to {}",
                        snapshot.nodes.len(),
                        snapshot.edges.len(),
                        path.display()
                    );
                }
                None => println!("{}", snapshot.to_json()?),
            }
        }

        Commands::Stats => print_json(&kg.metadata().statistics)?,

        Commands::Clusters => print_json(&kg.metadata().clusters)?,

        Commands::Similar { deal, limit } => {
            print_json(&find_similar_deals(&kg, &deal, limit))?;
        }

        Commands::Counterparty { org } => match counterparty_insights(&kg, &org) {
            Some(insights) => print_json(&insights)?,
            None => {
                return Err(GraphError::NodeNotFound {
                    node_id: NodeId::counterparty(&org).to_string(),
                }
                .into());
            }
        },

        Commands::Related { node, depth } => {
            let result = related_nodes(&kg, &NodeId::from(node.as_str()), depth)?;
            print_json(&result)?;
        }
    }

    Ok(())
}
