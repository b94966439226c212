use anyhow::Context;
use family_graph::{
    Family, FamilyCollection, FamilyConfig, HttpServer, MemoryCollection, RocksCollection,
    StorageBackend,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Environment variable naming the configuration file
const CONFIG_ENV: &str = "FAMILY_GRAPH_CONFIG";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Family Graph v{}", family_graph::version());

    let config = load_config()?;
    let collection: Arc<dyn FamilyCollection> = match config.storage.backend {
        StorageBackend::Memory => {
            info!("Using in-memory storage; nothing will be kept after shutdown");
            Arc::new(MemoryCollection::new())
        }
        StorageBackend::RocksDb => {
            info!(
                "Using RocksDB storage at {} (namespace {})",
                config.storage.path.display(),
                config.storage.namespace
            );
            Arc::new(RocksCollection::new(&config.storage.path, &config.storage.namespace))
        }
    };

    let mut family = Family::with_layout(collection, config.layout.clone());
    family.connect().context("failed to load the family graph")?;
    info!(
        "Loaded {} members and {} relationships",
        family.member_count(),
        family.relationship_count()
    );

    let server = HttpServer::new(Arc::new(RwLock::new(family)), config.server.clone());
    server.start().await.map_err(|e| anyhow::anyhow!(e))?;

    Ok(())
}

/// Configuration from the first argument, else the environment, else defaults
fn load_config() -> anyhow::Result<FamilyConfig> {
    let path = std::env::args().nth(1).or_else(|| std::env::var(CONFIG_ENV).ok());
    match path {
        Some(path) => {
            info!("Loading configuration from {}", path);
            FamilyConfig::from_yaml_file(&path)
                .with_context(|| format!("failed to read configuration {}", path))
        }
        None => Ok(FamilyConfig::default()),
    }
}
