use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

use crate::roadmap::progress::progress_pct;

/// One step of a user's roadmap. `order` is 1-based and unique within the roadmap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoadmapStep {
    pub order: u32,
    pub label: String,
    #[serde(rename = "estTime")]
    pub est_time: String,
    #[serde(default)]
    pub completed: bool,
}

/// A template's steps bound to one user, plus completion state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRoadmap {
    pub user_id: Uuid,
    pub roadmap_id: String,
    pub title: String,
    pub steps: Vec<RoadmapStep>,
    pub last_updated: DateTime<Utc>,
}

impl UserRoadmap {
    /// Derived from the steps on every call, never cached.
    pub fn progress_pct(&self) -> u8 {
        progress_pct(&self.steps)
    }

    pub fn completed_count(&self) -> usize {
        self.steps.iter().filter(|s| s.completed).count()
    }

    pub fn step(&self, order: u32) -> Option<&RoadmapStep> {
        self.steps.iter().find(|s| s.order == order)
    }

    /// True when step orders form a permutation of `1..=N`.
    pub fn has_contiguous_orders(&self) -> bool {
        let mut orders: Vec<u32> = self.steps.iter().map(|s| s.order).collect();
        orders.sort_unstable();
        orders
            .iter()
            .enumerate()
            .all(|(i, &order)| order as usize == i + 1)
    }

    /// Sorts steps by order and renumbers them `1..=N`, keeping labels and
    /// completion flags. Returns whether anything had to change.
    pub fn renumber_steps(&mut self) -> bool {
        if self.has_contiguous_orders() {
            return false;
        }
        self.steps.sort_by_key(|s| s.order);
        for (i, step) in self.steps.iter_mut().enumerate() {
            step.order = i as u32 + 1;
        }
        true
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct UserRoadmapRow {
    pub user_id: Uuid,
    pub roadmap_id: String,
    pub title: String,
    pub steps: Value,
    pub last_updated: DateTime<Utc>,
}

impl TryFrom<UserRoadmapRow> for UserRoadmap {
    type Error = serde_json::Error;

    fn try_from(row: UserRoadmapRow) -> Result<Self, Self::Error> {
        Ok(UserRoadmap {
            user_id: row.user_id,
            roadmap_id: row.roadmap_id,
            title: row.title,
            steps: serde_json::from_value(row.steps)?,
            last_updated: row.last_updated,
        })
    }
}
