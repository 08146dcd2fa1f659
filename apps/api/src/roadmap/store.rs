//! Persistence collaborator for user roadmaps.
//!
//! `RoadmapStore` is the seam; `PgRoadmapStore` is the production backend and
//! `InMemoryRoadmapStore` serves local development without a database.
//! Every `save` replaces the user's roadmap as a whole.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::models::roadmap::{UserRoadmap, UserRoadmapRow};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("stored roadmap could not be decoded: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("roadmap {0} has step orders that are not 1..N")]
    InvalidOrders(String),
}

/// Refuses writes that would break the `1..N` step order invariant.
fn check_orders(roadmap: &UserRoadmap) -> Result<(), StoreError> {
    if roadmap.has_contiguous_orders() {
        Ok(())
    } else {
        Err(StoreError::InvalidOrders(roadmap.roadmap_id.clone()))
    }
}

#[async_trait]
pub trait RoadmapStore: Send + Sync {
    /// Current roadmap for the user, if one was ever selected.
    async fn load(&self, user_id: Uuid) -> Result<Option<UserRoadmap>, StoreError>;

    /// Atomically replaces whatever roadmap the user had before.
    async fn save(&self, roadmap: &UserRoadmap) -> Result<(), StoreError>;
}

// ────────────────────────────────────────────────────────────────────────────
// PostgreSQL
// ────────────────────────────────────────────────────────────────────────────

pub struct PgRoadmapStore {
    pool: PgPool,
}

impl PgRoadmapStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoadmapStore for PgRoadmapStore {
    async fn load(&self, user_id: Uuid) -> Result<Option<UserRoadmap>, StoreError> {
        let row = sqlx::query_as::<_, UserRoadmapRow>(
            r#"
            SELECT user_id, roadmap_id, title, steps, last_updated
            FROM user_roadmaps
            WHERE user_id = $1
            ORDER BY last_updated DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(UserRoadmap::try_from).transpose()?)
    }

    async fn save(&self, roadmap: &UserRoadmap) -> Result<(), StoreError> {
        check_orders(roadmap)?;
        let steps = serde_json::to_value(&roadmap.steps)?;

        let mut tx = self.pool.begin().await?;

        // One roadmap per user: selecting a new template drops the old row.
        sqlx::query("DELETE FROM user_roadmaps WHERE user_id = $1 AND roadmap_id <> $2")
            .bind(roadmap.user_id)
            .bind(&roadmap.roadmap_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO user_roadmaps (user_id, roadmap_id, title, steps, last_updated)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id, roadmap_id)
            DO UPDATE SET title = EXCLUDED.title,
                          steps = EXCLUDED.steps,
                          last_updated = EXCLUDED.last_updated
            "#,
        )
        .bind(roadmap.user_id)
        .bind(&roadmap.roadmap_id)
        .bind(&roadmap.title)
        .bind(steps)
        .bind(roadmap.last_updated)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(
            "Saved roadmap {} for user {} ({} steps)",
            roadmap.roadmap_id,
            roadmap.user_id,
            roadmap.steps.len()
        );
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// In-process
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryRoadmapStore {
    roadmaps: Mutex<HashMap<Uuid, UserRoadmap>>,
}

impl InMemoryRoadmapStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a roadmap without the write checks, to stand in for bad stored data.
    #[cfg(test)]
    pub fn put_unchecked(&self, roadmap: UserRoadmap) {
        self.roadmaps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(roadmap.user_id, roadmap);
    }
}

#[async_trait]
impl RoadmapStore for InMemoryRoadmapStore {
    async fn load(&self, user_id: Uuid) -> Result<Option<UserRoadmap>, StoreError> {
        let roadmaps = self.roadmaps.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(roadmaps.get(&user_id).cloned())
    }

    async fn save(&self, roadmap: &UserRoadmap) -> Result<(), StoreError> {
        check_orders(roadmap)?;
        let mut roadmaps = self.roadmaps.lock().unwrap_or_else(PoisonError::into_inner);
        roadmaps.insert(roadmap.user_id, roadmap.clone());
        Ok(())
    }
}
