//! Session-scoped controllers.
//!
//! A controller is built when a user logs in and dropped when they log out;
//! there is no ambient "current roadmap". Each session owns one controller
//! behind an async mutex. Mutations take it with `try_lock`, so a second one
//! is rejected as in flight. Reads never touch that lock: they see the roadmap
//! as of the last finished mutation.

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::{Mutex, MutexGuard};
use tracing::info;
use uuid::Uuid;

use crate::llm_client::TextGenerator;
use crate::models::roadmap::UserRoadmap;
use crate::roadmap::controller::{RoadmapProgressController, SessionEnd};
use crate::roadmap::error::RoadmapError;
use crate::roadmap::store::RoadmapStore;

pub type SessionHandle = Arc<Session>;

pub struct Session {
    controller: Mutex<RoadmapProgressController>,
    published: RwLock<Option<UserRoadmap>>,
    end: SessionEnd,
}

impl Session {
    fn new(controller: RoadmapProgressController) -> Self {
        Self {
            published: RwLock::new(controller.roadmap().cloned()),
            end: controller.session_end(),
            controller: Mutex::new(controller),
        }
    }

    /// The roadmap as of the last completed mutation. Never waits on one in flight.
    pub fn roadmap(&self) -> Option<UserRoadmap> {
        self.published
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Non-blocking acquire for mutating operations: `None` means another
    /// operation on this session is still in flight.
    pub fn try_begin(&self) -> Option<Mutation<'_>> {
        let controller = self.controller.try_lock().ok()?;
        Some(Mutation {
            session: self,
            controller,
        })
    }
}

/// Exclusive access to a session's controller. Dropping it publishes the
/// controller's roadmap for readers.
pub struct Mutation<'a> {
    session: &'a Session,
    controller: MutexGuard<'a, RoadmapProgressController>,
}

impl Deref for Mutation<'_> {
    type Target = RoadmapProgressController;

    fn deref(&self) -> &Self::Target {
        &self.controller
    }
}

impl DerefMut for Mutation<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.controller
    }
}

impl Drop for Mutation<'_> {
    fn drop(&mut self) {
        *self
            .session
            .published
            .write()
            .unwrap_or_else(PoisonError::into_inner) = self.controller.roadmap().cloned();
    }
}

#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<Uuid, SessionHandle>>>,
    store: Arc<dyn RoadmapStore>,
    generator: Arc<dyn TextGenerator>,
}

impl SessionRegistry {
    pub fn new(store: Arc<dyn RoadmapStore>, generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            store,
            generator,
        }
    }

    /// Returns the user's session, loading their roadmap into a new one if
    /// they have none. A user never has two live controllers.
    pub async fn login(&self, user_id: Uuid) -> Result<SessionHandle, RoadmapError> {
        if let Some(existing) = self.get(user_id) {
            info!("Session resumed for user {user_id}");
            return Ok(existing);
        }

        let controller =
            RoadmapProgressController::load(user_id, self.store.clone(), self.generator.clone())
                .await?;
        let fresh = Arc::new(Session::new(controller));

        // A concurrent login may have registered first; keep that one.
        let handle = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(user_id)
            .or_insert(fresh)
            .clone();

        info!("Session started for user {user_id}");
        Ok(handle)
    }

    /// Ends and drops the user's session. Returns false if there was none.
    pub fn logout(&self, user_id: Uuid) -> bool {
        let removed = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&user_id);
        match removed {
            Some(session) => {
                session.end.end();
                info!("Session ended for user {user_id}");
                true
            }
            None => false,
        }
    }

    pub fn get(&self, user_id: Uuid) -> Option<SessionHandle> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&user_id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::LlmError;
    use crate::models::profile::UserProfile;
    use crate::roadmap::store::InMemoryRoadmapStore;
    use async_trait::async_trait;

    struct SilentGenerator;

    #[async_trait]
    impl TextGenerator for SilentGenerator {
        async fn generate(&self, _prompt: &str, _system: &str) -> Result<String, LlmError> {
            Err(LlmError::EmptyContent)
        }
    }

    struct OneStepGenerator;

    #[async_trait]
    impl TextGenerator for OneStepGenerator {
        async fn generate(&self, _prompt: &str, _system: &str) -> Result<String, LlmError> {
            Ok(r#"[{"order": 1, "label": "Ship a portfolio site", "estTime": "3 weeks"}]"#.to_string())
        }
    }

    fn registry() -> SessionRegistry {
        SessionRegistry::new(
            Arc::new(InMemoryRoadmapStore::new()),
            Arc::new(SilentGenerator),
        )
    }

    #[tokio::test]
    async fn test_login_get_logout() {
        let sessions = registry();
        let user_id = Uuid::new_v4();

        assert!(sessions.get(user_id).is_none());
        sessions.login(user_id).await.unwrap();
        assert!(sessions.get(user_id).is_some());
        assert_eq!(sessions.len(), 1);

        assert!(sessions.logout(user_id));
        assert!(sessions.get(user_id).is_none());
        assert!(!sessions.logout(user_id));
    }

    #[tokio::test]
    async fn test_relogin_restores_persisted_roadmap() {
        let sessions = registry();
        let user_id = Uuid::new_v4();

        let handle = sessions.login(user_id).await.unwrap();
        {
            let mut c = handle.try_begin().unwrap();
            c.select_template("frontend").await.unwrap();
            c.toggle_step(1, true).await.unwrap();
        }
        sessions.logout(user_id);

        let handle = sessions.login(user_id).await.unwrap();
        let roadmap = handle.roadmap().unwrap();
        assert_eq!(roadmap.roadmap_id, "frontend");
        assert_eq!(roadmap.progress_pct(), 33);
    }

    #[tokio::test]
    async fn test_try_begin_rejects_while_in_flight() {
        let sessions = registry();
        let handle = sessions.login(Uuid::new_v4()).await.unwrap();

        let first = handle.try_begin();
        assert!(first.is_some());
        assert!(handle.try_begin().is_none());

        drop(first);
        assert!(handle.try_begin().is_some());
    }

    #[tokio::test]
    async fn test_second_login_shares_the_in_flight_guard() {
        let store = Arc::new(InMemoryRoadmapStore::new());
        let sessions = SessionRegistry::new(store.clone(), Arc::new(OneStepGenerator));
        let user_id = Uuid::new_v4();

        let first = sessions.login(user_id).await.unwrap();
        first
            .try_begin()
            .unwrap()
            .select_template("frontend")
            .await
            .unwrap();

        let mut running = first.try_begin().unwrap();
        let second = sessions.login(user_id).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(second.try_begin().is_none());
        assert_eq!(sessions.len(), 1);

        let added = running.personalize(&UserProfile::default()).await.unwrap();
        assert_eq!(added.len(), 1);
        drop(running);

        second
            .try_begin()
            .unwrap()
            .toggle_step(1, true)
            .await
            .unwrap();
        let stored = store.load(user_id).await.unwrap().unwrap();
        assert_eq!(stored.steps.len(), 4);
        assert!(stored.step(1).unwrap().completed);
    }

    #[tokio::test]
    async fn test_reads_see_last_finished_mutation_while_one_runs() {
        let sessions = registry();
        let handle = sessions.login(Uuid::new_v4()).await.unwrap();
        assert!(handle.roadmap().is_none());

        let mut running = handle.try_begin().unwrap();
        running.select_template("backend").await.unwrap();
        assert!(handle.roadmap().is_none(), "published only when the mutation finishes");

        drop(running);
        assert_eq!(handle.roadmap().unwrap().roadmap_id, "backend");
    }

    #[tokio::test]
    async fn test_logout_mid_flight_discards_the_stale_write() {
        let store = Arc::new(InMemoryRoadmapStore::new());
        let sessions = SessionRegistry::new(store.clone(), Arc::new(OneStepGenerator));
        let user_id = Uuid::new_v4();

        let stale = sessions.login(user_id).await.unwrap();
        stale
            .try_begin()
            .unwrap()
            .select_template("frontend")
            .await
            .unwrap();
        let mut running = stale.try_begin().unwrap();

        sessions.logout(user_id);
        let fresh = sessions.login(user_id).await.unwrap();
        assert!(!Arc::ptr_eq(&stale, &fresh));

        assert!(matches!(
            running.personalize(&UserProfile::default()).await,
            Err(RoadmapError::SessionEnded)
        ));
        drop(running);

        fresh
            .try_begin()
            .unwrap()
            .toggle_step(2, true)
            .await
            .unwrap();
        let stored = store.load(user_id).await.unwrap().unwrap();
        assert_eq!(stored.steps.len(), 3);
        assert_eq!(stored.progress_pct(), 33);
    }
}
