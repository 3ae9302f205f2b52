//! CLI entry point for linkhop-pathfind.
//!
//! Designed for subprocess invocation: `discover` reads a JSON request from
//! stdin and every command writes JSON to stdout. Logs go to stderr.

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use linkhop_core::VertexId;
use linkhop_graph::{GraphSource, MemoryFixture, MemoryGraph, Neo4jSource};
use linkhop_pathfind::types::DiscoveryRequest;
use linkhop_pathfind::{PathfindEngine, Settings};

#[derive(Parser)]
#[command(name = "linkhop-pathfind")]
#[command(about = "Multi-hop relationship discovery over a remote property graph")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file prefix (default: linkhop).
    #[arg(short, long, default_value = "linkhop", global = true)]
    config: String,

    /// Run against a JSON fixture instead of Neo4j.
    #[arg(long, global = true)]
    fixture: Option<std::path::PathBuf>,

    /// Emit logs as JSON.
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Discover how two entities connect (reads JSON from stdin).
    Discover,
    /// Find paths between two entities.
    Paths {
        /// First entity.
        #[arg(long)]
        from: String,
        /// Second entity.
        #[arg(long)]
        to: String,
        /// Hop budget.
        #[arg(long, default_value_t = 3)]
        hops: usize,
    },
    /// Sample the neighborhood of one vertex.
    Sample {
        /// Center vertex.
        #[arg(long)]
        center: String,
        /// Hops to expand.
        #[arg(long, default_value_t = 2)]
        hops: usize,
        /// Node budget (default: discovery.node_budget).
        #[arg(long)]
        max_nodes: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    if cli.log_json {
        fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
    }

    let settings = Settings::load(&cli.config)?;

    match &cli.fixture {
        Some(path) => {
            let fixture = MemoryFixture::from_path(path)?;
            tracing::info!(path = %path.display(), "Using fixture graph");
            run(MemoryGraph::from_fixture(fixture), settings, cli.command).await
        }
        None => {
            let source = Neo4jSource::connect(&settings.neo4j).await?;
            run(source, settings, cli.command).await
        }
    }
}

async fn run<S: GraphSource>(source: S, settings: Settings, command: Command) -> anyhow::Result<()> {
    let node_budget = settings.discovery.node_budget;
    let engine = PathfindEngine::new(source)
        .with_sampler_config(settings.sampler)
        .with_discovery_config(settings.discovery);

    match command {
        Command::Discover => {
            let input = std::io::read_to_string(std::io::stdin())?;
            let request: DiscoveryRequest = serde_json::from_str(&input)?;
            let report = engine.discover(request).await?;
            println!("{}", serde_json::to_string(&report)?);
        }
        Command::Paths { from, to, hops } => {
            let report = engine.discover(DiscoveryRequest::new(from, to, hops)).await?;
            println!("{}", serde_json::to_string(&report)?);
        }
        Command::Sample {
            center,
            hops,
            max_nodes,
        } => {
            let subgraph = engine
                .sample_subgraph(&VertexId::new(center), hops, max_nodes.unwrap_or(node_budget))
                .await?;
            println!("{}", serde_json::to_string(&subgraph)?);
        }
    }

    Ok(())
}
