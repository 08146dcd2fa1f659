use crate::roadmap::SessionRegistry;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Logged-in users' roadmap controllers. Owns the store and generator handles.
    pub sessions: SessionRegistry,
}
