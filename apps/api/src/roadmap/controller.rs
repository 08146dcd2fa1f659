//! RoadmapProgressController: owns one user's roadmap for the lifetime of a session.
//!
//! Every mutation is computed on a copy, persisted, and only then swapped into
//! `self.roadmap`. A failed write or a bad personalization answer leaves the
//! controller exactly as it was, so the caller can retry.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::llm_client::TextGenerator;
use crate::models::profile::UserProfile;
use crate::models::roadmap::{RoadmapStep, UserRoadmap};
use crate::roadmap::error::RoadmapError;
use crate::roadmap::personalize::{build_prompt, decode_suggestions, number_new_steps, system_prompt};
use crate::roadmap::store::RoadmapStore;
use crate::roadmap::templates::find_template;

pub struct RoadmapProgressController {
    user_id: Uuid,
    roadmap: Option<UserRoadmap>,
    store: Arc<dyn RoadmapStore>,
    generator: Arc<dyn TextGenerator>,
    ended: Arc<AtomicBool>,
}

/// Marks a controller's session as over, from outside its lock. Once ended, the
/// controller refuses to persist anything, so a request still running at
/// logout cannot overwrite what a later session writes.
#[derive(Clone)]
pub struct SessionEnd(Arc<AtomicBool>);

impl SessionEnd {
    pub fn end(&self) {
        self.0.store(true, Ordering::Release);
    }
}

impl RoadmapProgressController {
    /// Starts a controller with no roadmap selected and no storage read.
    pub fn new(
        user_id: Uuid,
        store: Arc<dyn RoadmapStore>,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        Self {
            user_id,
            roadmap: None,
            store,
            generator,
            ended: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Starts a controller seeded with the user's stored roadmap, if any.
    ///
    /// A stored roadmap whose step orders are not `1..N` is renumbered in
    /// memory; the repaired list is written back with the next mutation.
    pub async fn load(
        user_id: Uuid,
        store: Arc<dyn RoadmapStore>,
        generator: Arc<dyn TextGenerator>,
    ) -> Result<Self, RoadmapError> {
        let mut controller = Self::new(user_id, store, generator);
        let mut roadmap = controller.store.load(user_id).await.map_err(|e| {
            error!("Failed to load roadmap for user {user_id}: {e}");
            RoadmapError::Persistence(e)
        })?;

        if let Some(r) = roadmap.as_mut() {
            if r.renumber_steps() {
                warn!(
                    "Stored roadmap {} for user {user_id} had out-of-sequence step orders; renumbered",
                    r.roadmap_id
                );
            }
        }
        controller.roadmap = roadmap;
        Ok(controller)
    }

    pub fn session_end(&self) -> SessionEnd {
        SessionEnd(self.ended.clone())
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn roadmap(&self) -> Option<&UserRoadmap> {
        self.roadmap.as_ref()
    }

    pub fn progress_pct(&self) -> u8 {
        self.roadmap.as_ref().map_or(0, UserRoadmap::progress_pct)
    }

    /// Replaces any current roadmap with a fresh copy of `template_id`.
    pub async fn select_template(&mut self, template_id: &str) -> Result<&UserRoadmap, RoadmapError> {
        let template = find_template(template_id)
            .ok_or_else(|| RoadmapError::NotFound(template_id.to_string()))?;

        let user_id = self.user_id;
        let roadmap = self.commit(template.instantiate(user_id)).await?;

        info!("User {user_id} selected roadmap template {template_id}");
        Ok(roadmap)
    }

    /// Sets the `completed` flag of the step with the given `order`.
    pub async fn toggle_step(
        &mut self,
        order: u32,
        completed: bool,
    ) -> Result<&UserRoadmap, RoadmapError> {
        let mut next = self
            .roadmap
            .clone()
            .ok_or(RoadmapError::InvalidStep(order))?;

        let step = next
            .steps
            .iter_mut()
            .find(|s| s.order == order)
            .ok_or(RoadmapError::InvalidStep(order))?;
        step.completed = completed;
        next.last_updated = Utc::now();

        let user_id = self.user_id;
        let roadmap = self.commit(next).await?;

        info!(
            "User {user_id} marked step {order} ({}) {}: {}/{} done, {}%",
            roadmap.step(order).map_or("", |s| s.label.as_str()),
            if completed { "complete" } else { "incomplete" },
            roadmap.completed_count(),
            roadmap.steps.len(),
            roadmap.progress_pct()
        );
        Ok(roadmap)
    }

    /// Clears every completion flag. The step list itself is kept.
    pub async fn reset_progress(&mut self) -> Result<&UserRoadmap, RoadmapError> {
        let mut next = self.roadmap.clone().ok_or(RoadmapError::NoActiveRoadmap)?;

        for step in &mut next.steps {
            step.completed = false;
        }
        next.last_updated = Utc::now();

        let user_id = self.user_id;
        let roadmap = self.commit(next).await?;

        info!("User {user_id} reset roadmap progress");
        Ok(roadmap)
    }

    /// Asks the generation collaborator for up to three extra steps and appends them.
    ///
    /// Returns the newly added steps. Generation and decoding failures are
    /// recoverable: state is untouched and the caller may retry.
    pub async fn personalize(
        &mut self,
        profile: &UserProfile,
    ) -> Result<Vec<RoadmapStep>, RoadmapError> {
        let current = self.roadmap.as_ref().ok_or(RoadmapError::NoActiveRoadmap)?;

        let prompt = build_prompt(current, profile);
        let text = self
            .generator
            .generate(&prompt, &system_prompt())
            .await
            .map_err(|e| {
                warn!("Personalization request failed for user {}: {e}", self.user_id);
                RoadmapError::Generation(e)
            })?;

        let suggestions = decode_suggestions(&text).map_err(|e| {
            warn!("Discarding personalization response for user {}: {e}", self.user_id);
            e
        })?;

        let added = number_new_steps(&current.steps, suggestions);
        if added.is_empty() {
            warn!(
                "Personalization for user {} only repeated existing steps",
                self.user_id
            );
            return Err(RoadmapError::MalformedResponse(
                "every suggested step is already on the roadmap".to_string(),
            ));
        }

        let mut next = current.clone();
        next.steps.extend(added.iter().cloned());
        next.last_updated = Utc::now();

        let user_id = self.user_id;
        let roadmap = self.commit(next).await?;

        info!(
            "Personalized roadmap {} for user {user_id}: {} step(s) added",
            roadmap.roadmap_id,
            added.len()
        );
        Ok(added)
    }

    /// Persists `next` and, only if that succeeds, makes it the current roadmap.
    async fn commit(&mut self, next: UserRoadmap) -> Result<&UserRoadmap, RoadmapError> {
        if self.ended.load(Ordering::Acquire) {
            warn!(
                "Dropping update to roadmap {} for user {}: session already ended",
                next.roadmap_id, self.user_id
            );
            return Err(RoadmapError::SessionEnded);
        }
        if let Err(e) = self.store.save(&next).await {
            error!(
                "Failed to save roadmap {} for user {}: {e}",
                next.roadmap_id, self.user_id
            );
            return Err(RoadmapError::Persistence(e));
        }
        Ok(&*self.roadmap.insert(next))
    }
}
