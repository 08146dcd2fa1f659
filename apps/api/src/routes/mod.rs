pub mod health;

use axum::{
    routing::{delete, get, patch, post},
    Router,
};

use crate::roadmap::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Templates
        .route(
            "/api/v1/roadmaps/templates",
            get(handlers::handle_list_templates),
        )
        .route(
            "/api/v1/roadmaps/templates/:id",
            get(handlers::handle_get_template),
        )
        // Sessions
        .route("/api/v1/sessions", post(handlers::handle_login))
        .route("/api/v1/sessions/:user_id", delete(handlers::handle_logout))
        // Roadmap progress
        .route("/api/v1/roadmap", get(handlers::handle_get_roadmap))
        .route(
            "/api/v1/roadmap/select",
            post(handlers::handle_select_template),
        )
        .route(
            "/api/v1/roadmap/steps/:order",
            patch(handlers::handle_toggle_step),
        )
        .route("/api/v1/roadmap/reset", post(handlers::handle_reset_progress))
        .route(
            "/api/v1/roadmap/personalize",
            post(handlers::handle_personalize),
        )
        .with_state(state)
}
