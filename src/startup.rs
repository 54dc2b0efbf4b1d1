//! Application Startup
//!
//! Wires a document store handle into the sequence allocator and the
//! repositories. Nothing here is global: every repository receives the store
//! it was built with.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::{PasswordSettings, Settings, StoreBackend};
use crate::infrastructure::database;
use crate::infrastructure::repositories::{
    DocumentMessageRepository, DocumentUserRepository, SequenceAllocator,
};
use crate::infrastructure::store::{DocumentStore, MemoryDocumentStore, PgDocumentStore};
use crate::shared::password::CredentialHasher;

/// Repositories sharing one store handle.
#[derive(Clone)]
pub struct Repositories {
    pub store: Arc<dyn DocumentStore>,
    pub sequences: SequenceAllocator,
    pub users: DocumentUserRepository,
    pub messages: DocumentMessageRepository,
}

impl Repositories {
    /// Connect the configured store and prepare it for use.
    ///
    /// For PostgreSQL this creates the pool and applies pending migrations.
    /// Unique indexes are ensured on every backend.
    pub async fn build(settings: &Settings) -> Result<Self> {
        let store: Arc<dyn DocumentStore> = match settings.store.backend {
            StoreBackend::Postgres => {
                let pool = database::create_pool(&settings.database)
                    .await
                    .context("Failed to connect to PostgreSQL")?;
                tracing::info!("Database connection pool created");

                database::run_migrations(&pool)
                    .await
                    .context("Failed to run migrations")?;
                tracing::info!("Migrations applied");

                Arc::new(PgDocumentStore::new(pool))
            }
            StoreBackend::Memory => {
                tracing::warn!("Using in-memory store; data will not survive a restart");
                Arc::new(MemoryDocumentStore::new())
            }
        };

        let hasher = CredentialHasher::new(&settings.password)?;
        let repositories = Self::with_store(store, hasher);
        repositories.ensure_indexes().await?;

        Ok(repositories)
    }

    /// Fresh in-memory repositories with cheap password hashing.
    pub async fn in_memory() -> Result<Self> {
        let hasher = CredentialHasher::new(&PasswordSettings::low_cost())?;
        let repositories = Self::with_store(Arc::new(MemoryDocumentStore::new()), hasher);
        repositories.ensure_indexes().await?;
        Ok(repositories)
    }

    /// Wire repositories over an existing store. Indexes are not touched.
    pub fn with_store(store: Arc<dyn DocumentStore>, hasher: CredentialHasher) -> Self {
        let sequences = SequenceAllocator::new(store.clone());

        Self {
            users: DocumentUserRepository::new(store.clone(), sequences.clone(), hasher),
            messages: DocumentMessageRepository::new(store.clone(), sequences.clone()),
            sequences,
            store,
        }
    }

    /// Create the unique indexes the user repository relies on.
    pub async fn ensure_indexes(&self) -> Result<()> {
        self.users
            .ensure_indexes()
            .await
            .context("Failed to create unique indexes")?;
        tracing::debug!("Unique indexes ensured");
        Ok(())
    }
}
