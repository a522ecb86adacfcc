//! Plate Planner HTTP server binary

use plateplanner::{
    demo, server, Collaborators, HttpEmbedder, HttpMetadataStore, HttpVectorIndex, Neo4jGraph,
    Normalizer, PlannerEngine, Settings,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_level(true)
        .init();

    info!("Plate Planner {}", env!("CARGO_PKG_VERSION"));

    let settings = Settings::from_env()?;

    // Check for --use-real flag
    let use_real = std::env::args().any(|arg| arg == "--use-real");

    let normalizer = Normalizer::load(
        settings.normalizer_config.as_deref(),
        settings.wordlist.as_deref(),
    )?;

    let engine = if use_real {
        info!("Mode: REAL collaborators");
        info!("Neo4j: {} (database '{}')", settings.neo4j.url, settings.neo4j.database);
        info!("Embedding service: {}", settings.embedding_service_url);
        info!("Vector service: {}", settings.vector_service_url);
        info!("Metadata service: {}", settings.metadata_service_url);

        let graph = Neo4jGraph::new(&settings.neo4j, settings.request_timeout)?;
        match graph.health_check().await {
            Ok(_) => info!("Neo4j is reachable"),
            Err(e) => {
                warn!("Neo4j health check failed: {}", e);
                return Err(e.into());
            }
        }

        PlannerEngine::new(
            Collaborators {
                graph: Box::new(graph),
                embedder: Box::new(HttpEmbedder::new(
                    settings.embedding_service_url.clone(),
                    settings.embedding_dim,
                    settings.request_timeout,
                )?),
                index: Box::new(HttpVectorIndex::new(
                    settings.vector_service_url.clone(),
                    settings.request_timeout,
                )?),
                metadata: Box::new(HttpMetadataStore::new(
                    settings.metadata_service_url.clone(),
                    settings.request_timeout,
                )?),
            },
            normalizer,
            settings.scoring.clone(),
        )
    } else {
        info!("Mode: MOCK in-memory kitchen (use --use-real for Neo4j and the recipe services)");
        demo::demo_engine_with(normalizer, settings.scoring.clone())
    };

    server::run_server(engine, settings.port).await?;

    Ok(())
}
