//! In-process link store for local runs and tests.
//!
//! All state lives behind one `RwLock`; each operation takes the lock once, so
//! the conditional insert and ownership-checked writes are atomic just like
//! their single-statement SQL counterparts.

use async_trait::async_trait;
use std::collections::{HashMap, hash_map::Entry};
use time::OffsetDateTime;
use tokio::sync::RwLock;

use super::{Link, LinkStore, StoreError, StoreResult};

#[derive(Debug, Default)]
pub struct MemoryLinkStore {
    links: RwLock<HashMap<String, Link>>,
}

impl MemoryLinkStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LinkStore for MemoryLinkStore {
    async fn create(&self, slug: &str, creator: &str, destination: &str) -> StoreResult<Link> {
        let mut links = self.links.write().await;
        match links.entry(slug.to_string()) {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists(slug.to_string())),
            Entry::Vacant(entry) => {
                let link = Link {
                    slug: slug.to_string(),
                    creator: creator.to_string(),
                    destination: destination.to_string(),
                    created_at: OffsetDateTime::now_utc(),
                    clicks: 0,
                };
                entry.insert(link.clone());
                Ok(link)
            }
        }
    }

    async fn get(&self, slug: &str) -> StoreResult<Link> {
        self.links
            .read()
            .await
            .get(slug)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(slug.to_string()))
    }

    async fn update_destination(
        &self,
        slug: &str,
        destination: &str,
        requester: &str,
    ) -> StoreResult<()> {
        let mut links = self.links.write().await;
        let link = links
            .get_mut(slug)
            .ok_or_else(|| StoreError::NotFound(slug.to_string()))?;
        if !link.is_owned_by(requester) {
            return Err(StoreError::Forbidden(slug.to_string()));
        }
        link.destination = destination.to_string();
        Ok(())
    }

    async fn delete(&self, slug: &str, requester: &str) -> StoreResult<()> {
        let mut links = self.links.write().await;
        match links.entry(slug.to_string()) {
            Entry::Vacant(_) => Err(StoreError::NotFound(slug.to_string())),
            Entry::Occupied(entry) if !entry.get().is_owned_by(requester) => {
                Err(StoreError::Forbidden(slug.to_string()))
            }
            Entry::Occupied(entry) => {
                entry.remove();
                Ok(())
            }
        }
    }

    async fn increment_clicks(&self, slug: &str) -> StoreResult<()> {
        if let Some(link) = self.links.write().await.get_mut(slug) {
            link.clicks = link.clicks.saturating_add(1);
        }
        Ok(())
    }

    async fn get_clicks(&self, slug: &str) -> StoreResult<i64> {
        Ok(self
            .links
            .read()
            .await
            .get(slug)
            .map_or(0, |link| link.clicks))
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }
}
