//! Postgres-backed link store.

use async_trait::async_trait;
use sqlx::{
    PgPool, Row,
    postgres::{PgPoolOptions, PgRow},
};
use std::time::Duration;
use tracing::{Instrument, info_span};

use super::{Link, LinkStore, StoreError, StoreResult};

pub const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

const LINK_COLUMNS: &str = "id, creator, destination, created_at, clicks";

#[derive(Debug, Clone)]
pub struct PgLinkStore {
    pool: PgPool,
}

impl PgLinkStore {
    /// Connect a small pool to `dsn`.
    ///
    /// # Errors
    /// Returns an error if no connection can be established.
    pub async fn connect(dsn: &str) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(5)
            .max_lifetime(Duration::from_secs(60 * 2))
            .test_before_acquire(true)
            .connect(dsn)
            .await?;

        Ok(Self { pool })
    }

    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the `links` table if it does not exist yet.
    ///
    /// # Errors
    /// Returns an error if the schema statements fail.
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    /// Tell a missing row from one owned by someone else after a guarded write
    /// touched nothing.
    async fn ownership_failure(&self, slug: &str) -> StoreError {
        match sqlx::query("SELECT 1 FROM links WHERE id = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
        {
            Ok(Some(_)) => StoreError::Forbidden(slug.to_string()),
            Ok(None) => StoreError::NotFound(slug.to_string()),
            Err(err) => StoreError::Database(err),
        }
    }
}

fn link_from_row(row: &PgRow) -> Result<Link, sqlx::Error> {
    Ok(Link {
        slug: row.try_get("id")?,
        creator: row.try_get("creator")?,
        destination: row.try_get("destination")?,
        created_at: row.try_get("created_at")?,
        clicks: row.try_get("clicks")?,
    })
}

#[async_trait]
impl LinkStore for PgLinkStore {
    async fn create(&self, slug: &str, creator: &str, destination: &str) -> StoreResult<Link> {
        // ON CONFLICT DO NOTHING returns no row, so the loser of a race sees None.
        let query = format!(
            r"
            INSERT INTO links (id, name, creator, destination, created_at, clicks)
            VALUES ($1, $1, $2, $3, NOW(), 0)
            ON CONFLICT (id) DO NOTHING
            RETURNING {LINK_COLUMNS}
            "
        );
        let span = info_span!("db.insert", db.system = "postgresql", db.operation = "INSERT");
        let row = sqlx::query(&query)
            .bind(slug)
            .bind(creator)
            .bind(destination)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await?;

        match row {
            Some(row) => Ok(link_from_row(&row)?),
            None => Err(StoreError::AlreadyExists(slug.to_string())),
        }
    }

    async fn get(&self, slug: &str) -> StoreResult<Link> {
        let query = format!("SELECT {LINK_COLUMNS} FROM links WHERE id = $1");
        let span = info_span!("db.select", db.system = "postgresql", db.operation = "SELECT");
        let row = sqlx::query(&query)
            .bind(slug)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await?;

        match row {
            Some(row) => Ok(link_from_row(&row)?),
            None => Err(StoreError::NotFound(slug.to_string())),
        }
    }

    async fn update_destination(
        &self,
        slug: &str,
        destination: &str,
        requester: &str,
    ) -> StoreResult<()> {
        let result = sqlx::query("UPDATE links SET destination = $1 WHERE id = $2 AND creator = $3")
            .bind(destination)
            .bind(slug)
            .bind(requester)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 1 {
            Ok(())
        } else {
            Err(self.ownership_failure(slug).await)
        }
    }

    async fn delete(&self, slug: &str, requester: &str) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM links WHERE id = $1 AND creator = $2")
            .bind(slug)
            .bind(requester)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 1 {
            Ok(())
        } else {
            Err(self.ownership_failure(slug).await)
        }
    }

    async fn increment_clicks(&self, slug: &str) -> StoreResult<()> {
        let span = info_span!("db.update", db.system = "postgresql", db.operation = "UPDATE");
        sqlx::query("UPDATE links SET clicks = clicks + 1 WHERE id = $1")
            .bind(slug)
            .execute(&self.pool)
            .instrument(span)
            .await?;
        Ok(())
    }

    async fn get_clicks(&self, slug: &str) -> StoreResult<i64> {
        let clicks: Option<i64> = sqlx::query_scalar("SELECT clicks FROM links WHERE id = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(clicks.unwrap_or(0))
    }

    async fn health_check(&self) -> StoreResult<()> {
        let span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .instrument(span)
            .await?;
        Ok(())
    }
}
