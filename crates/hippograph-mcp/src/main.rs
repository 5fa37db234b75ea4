//! HippoGraph MCP Server
//!
//! A stdio JSON-RPC front-end for the HippoGraph associative memory store.
//! Exposes the Ingest, Query, and Maintenance APIs as MCP tools backed by
//! [`hippograph_core::Engine`].

mod protocol;
mod server;
mod tools;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use directories::ProjectDirs;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

use hippograph_core::{load_config, Engine, GraphCache, Store};

use crate::protocol::stdio::StdioTransport;
use crate::server::McpServer;

#[cfg(feature = "embeddings")]
use hippograph_core::LocalEmbedder;
#[cfg(feature = "vector-search")]
use hippograph_core::VectorIndex;

/// Parse command-line arguments and return the optional data directory path.
/// Returns `None` for the path if no `--data-dir` was specified.
/// Exits the process if `--help` or `--version` is requested.
fn parse_args() -> Option<PathBuf> {
    let args: Vec<String> = std::env::args().collect();
    let mut data_dir: Option<PathBuf> = None;
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                println!("HippoGraph MCP Server v{}", env!("CARGO_PKG_VERSION"));
                println!();
                println!("Stdio JSON-RPC server exposing a personal associative memory store.");
                println!();
                println!("USAGE:");
                println!("    hippograph-mcp [OPTIONS]");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help              Print help information");
                println!("    -V, --version           Print version information");
                println!("    --data-dir <PATH>       Custom data directory");
                println!();
                println!("ENVIRONMENT:");
                println!("    RUST_LOG               Log level filter (e.g., debug, info, warn, error)");
                println!("    HIPPOGRAPH_*           Configuration overrides (see README)");
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("hippograph-mcp {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--data-dir" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("error: --data-dir requires a path argument");
                    std::process::exit(1);
                }
                data_dir = Some(PathBuf::from(&args[i]));
            }
            arg if arg.starts_with("--data-dir=") => {
                let path = arg.strip_prefix("--data-dir=").unwrap_or("");
                if path.is_empty() {
                    eprintln!("error: --data-dir requires a path argument");
                    std::process::exit(1);
                }
                data_dir = Some(PathBuf::from(path));
            }
            arg => {
                eprintln!("error: unknown argument '{}'", arg);
                eprintln!("Try 'hippograph-mcp --help' for more information.");
                std::process::exit(1);
            }
        }
        i += 1;
    }

    data_dir
}

fn snapshot_dir() -> PathBuf {
    if let Some(proj_dirs) = ProjectDirs::from("dev", "hippograph", "core") {
        proj_dirs.data_dir().join("snapshots")
    } else {
        PathBuf::from(".hippograph/snapshots")
    }
}

#[tokio::main]
async fn main() {
    let data_dir = parse_args();

    // Logging goes to stderr only — stdout is the JSON-RPC wire.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with_writer(io::stderr)
        .with_target(false)
        .with_ansi(false)
        .init();

    info!("HippoGraph MCP Server v{} starting...", env!("CARGO_PKG_VERSION"));

    let store = match Store::open(data_dir) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to open store: {}", e);
            std::process::exit(1);
        }
    };

    #[cfg(feature = "vector-search")]
    let vector_index = match VectorIndex::new() {
        Ok(v) => v,
        Err(e) => {
            error!("Failed to create vector index: {}", e);
            std::process::exit(1);
        }
    };

    let config = load_config();

    #[cfg(feature = "embeddings")]
    let embedder: Box<dyn hippograph_core::Embedder> = {
        let embedder = LocalEmbedder::new();
        if let Err(e) = embedder.init() {
            warn!("Embedding model failed to initialize: {} — add/search will degrade", e);
        }
        Box::new(embedder)
    };
    #[cfg(not(feature = "embeddings"))]
    let embedder: Box<dyn hippograph_core::Embedder> = Box::new(hippograph_core::NullEmbedder);

    #[cfg(feature = "embeddings")]
    let reranker: Box<dyn hippograph_core::Reranker> = {
        let reranker = hippograph_core::search::CrossEncoderReranker::new();
        reranker.load();
        Box::new(reranker)
    };
    #[cfg(not(feature = "embeddings"))]
    let reranker: Box<dyn hippograph_core::Reranker> = Box::new(hippograph_core::NullReranker);

    let entity_extractor: Box<dyn hippograph_core::EntityExtractor> =
        Box::new(hippograph_core::NullExtractor);
    let date_resolver: Box<dyn hippograph_core::DateResolver> =
        Box::new(hippograph_core::NullDateResolver);
    let relation_extractor: Box<dyn hippograph_core::RelationExtractor> =
        Box::new(hippograph_core::NullRelationExtractor);

    let engine = Engine::new(
        store,
        vector_index,
        GraphCache::new(),
        embedder,
        reranker,
        entity_extractor,
        date_resolver,
        relation_extractor,
        config,
        snapshot_dir(),
    );

    if let Err(e) = engine.rebuild_indices() {
        error!("Failed to rebuild indices from store: {}", e);
        std::process::exit(1);
    }
    info!("Store opened and indices rebuilt");

    let engine = Arc::new(engine);

    // Periodic background maintenance, mirroring the reference crate's
    // auto-consolidation loop: checks on a short cadence, only actually runs
    // when `light_sleep_due`/`deep_sleep_due` says so (§4.9).
    {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_secs(2)).await;
            loop {
                if engine.light_sleep_due() {
                    match engine.run_sleep(hippograph_core::SleepMode::Light, false) {
                        Ok(report) => info!(steps = report.steps.len(), "light sleep completed"),
                        Err(e) => warn!("light sleep failed: {}", e),
                    }
                }
                if engine.deep_sleep_due() {
                    match engine.run_sleep(hippograph_core::SleepMode::Deep, false) {
                        Ok(report) => info!(steps = report.steps.len(), "deep sleep completed"),
                        Err(e) => warn!("deep sleep failed: {}", e),
                    }
                }
                tokio::time::sleep(std::time::Duration::from_secs(300)).await;
            }
        });
    }

    let server = McpServer::new(engine);
    let transport = StdioTransport::new();

    info!("Starting MCP server on stdio...");
    if let Err(e) = transport.run(server).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }

    info!("HippoGraph MCP Server shutting down");
}
