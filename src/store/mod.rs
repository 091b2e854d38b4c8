//! Link storage.
//!
//! A link is a single row keyed by its slug. Every operation here is atomic on
//! that one row: creation is a conditional insert, owner-only mutations carry
//! the ownership predicate in the same statement, and click increments are a
//! single in-place update. Handlers never check-then-insert.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use time::OffsetDateTime;

pub mod memory;
pub mod postgres;

pub use memory::MemoryLinkStore;
pub use postgres::PgLinkStore;

/// DSN scheme selecting the in-process store.
pub const MEMORY_DSN: &str = "memory://";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub slug: String,
    pub creator: String,
    pub destination: String,
    pub created_at: OffsetDateTime,
    pub clicks: i64,
}

impl Link {
    #[must_use]
    pub fn is_owned_by(&self, email: &str) -> bool {
        self.creator == email
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("link not found: {0}")]
    NotFound(String),

    #[error("link already exists: {0}")]
    AlreadyExists(String),

    #[error("link {0} belongs to another creator")]
    Forbidden(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[async_trait]
pub trait LinkStore: Send + Sync {
    /// Insert a new link with zero clicks, failing with `AlreadyExists` if the
    /// slug is taken. Exactly one of any number of concurrent creates wins.
    async fn create(&self, slug: &str, creator: &str, destination: &str) -> StoreResult<Link>;

    async fn get(&self, slug: &str) -> StoreResult<Link>;

    /// Replace the destination if `requester` created the link.
    async fn update_destination(
        &self,
        slug: &str,
        destination: &str,
        requester: &str,
    ) -> StoreResult<()>;

    /// Hard-delete the link if `requester` created it. The slug becomes free.
    async fn delete(&self, slug: &str, requester: &str) -> StoreResult<()>;

    /// Add one click. Missing slugs are ignored.
    async fn increment_clicks(&self, slug: &str) -> StoreResult<()>;

    /// Current click count, or 0 when the slug does not exist.
    async fn get_clicks(&self, slug: &str) -> StoreResult<i64>;

    async fn health_check(&self) -> StoreResult<()>;
}

pub type SharedLinkStore = Arc<dyn LinkStore>;

/// Open the store named by `dsn`: `memory://` or a Postgres URL.
///
/// # Errors
/// Returns an error if the database is unreachable or the schema cannot be applied.
pub async fn connect(dsn: &str) -> Result<SharedLinkStore> {
    if dsn == MEMORY_DSN {
        return Ok(Arc::new(MemoryLinkStore::new()));
    }

    let store = PgLinkStore::connect(dsn)
        .await
        .context("Failed to connect to database")?;
    store
        .migrate()
        .await
        .context("Failed to apply database schema")?;
    Ok(Arc::new(store))
}
