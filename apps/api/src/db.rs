use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::config::StorageBackend;
use crate::storage::{Collection, DocumentCollection, MemoryCollection, PgCollection};

pub const RESPONSES_COLLECTION: &str = "event_responses";
pub const METADATA_COLLECTION: &str = "event_metadata";

/// Creates a PostgreSQL pool. Acquisition times out quickly so an
/// unreachable database surfaces as a storage error instead of a hang.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}

/// The two collections backing the response and metadata stores.
pub struct Collections {
    pub responses: Arc<dyn Collection>,
    pub metadata: Arc<dyn Collection>,
}

/// Opens both collections as Postgres tables.
pub async fn open_tables(pool: PgPool) -> Result<Collections> {
    let responses = PgCollection::open(pool.clone(), RESPONSES_COLLECTION).await?;
    let metadata = PgCollection::open(pool, METADATA_COLLECTION).await?;
    Ok(Collections {
        responses: Arc::new(responses),
        metadata: Arc::new(metadata),
    })
}

/// Opens both collections as flat JSON documents under `data_dir`.
pub async fn open_documents(data_dir: &Path) -> Result<Collections> {
    let responses = DocumentCollection::open(data_dir, "responses").await?;
    let metadata = DocumentCollection::open(data_dir, "metadata").await?;
    Ok(Collections {
        responses: Arc::new(responses),
        metadata: Arc::new(metadata),
    })
}

/// Opens both collections as process-local maps.
pub fn open_memory() -> Collections {
    Collections {
        responses: Arc::new(MemoryCollection::new(RESPONSES_COLLECTION)),
        metadata: Arc::new(MemoryCollection::new(METADATA_COLLECTION)),
    }
}

/// Opens the collections for whichever backend the configuration selects.
pub async fn open_collections(backend: &StorageBackend) -> Result<Collections> {
    match backend {
        StorageBackend::Postgres { database_url } => {
            open_tables(create_pool(database_url).await?).await
        }
        StorageBackend::Documents { data_dir } => {
            info!("Using JSON documents in {}", data_dir.display());
            open_documents(data_dir).await
        }
        StorageBackend::Memory => {
            info!("Using in-memory storage; nothing will persist across restarts");
            Ok(open_memory())
        }
    }
}
