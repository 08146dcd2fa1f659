//! Axum route handlers for templates, sessions and roadmap progress.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::profile::UserProfile;
use crate::models::roadmap::{RoadmapStep, UserRoadmap};
use crate::roadmap::RoadmapProgressController;
use crate::roadmap::session::SessionHandle;
use crate::roadmap::templates::{all_templates, find_template, RoadmapTemplate};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct SessionRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct SelectTemplateRequest {
    pub user_id: Uuid,
    pub template_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ToggleStepRequest {
    pub user_id: Uuid,
    pub completed: bool,
}

#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct PersonalizeRequest {
    pub user_id: Uuid,
    #[serde(default)]
    pub profile: UserProfile,
}

/// The roadmap as the client renders it: steps plus the derived percentage.
#[derive(Debug, Serialize)]
pub struct RoadmapView {
    pub roadmap: Option<UserRoadmap>,
    pub progress_pct: u8,
}

impl RoadmapView {
    fn of(controller: &RoadmapProgressController) -> Self {
        Self {
            roadmap: controller.roadmap().cloned(),
            progress_pct: controller.progress_pct(),
        }
    }

    /// Built from a session's published roadmap, without waiting on a mutation.
    fn published(session: &SessionHandle) -> Self {
        let roadmap = session.roadmap();
        Self {
            progress_pct: roadmap.as_ref().map_or(0, UserRoadmap::progress_pct),
            roadmap,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PersonalizeResponse {
    #[serde(flatten)]
    pub view: RoadmapView,
    pub added_steps: Vec<RoadmapStep>,
}

fn session_for(state: &AppState, user_id: Uuid) -> Result<SessionHandle, AppError> {
    state.sessions.get(user_id).ok_or(AppError::Unauthorized)
}

// ────────────────────────────────────────────────────────────────────────────
// Templates
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/roadmaps/templates
pub async fn handle_list_templates() -> Json<&'static [RoadmapTemplate]> {
    Json(all_templates())
}

/// GET /api/v1/roadmaps/templates/:id
pub async fn handle_get_template(
    Path(id): Path<String>,
) -> Result<Json<&'static RoadmapTemplate>, AppError> {
    find_template(&id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Roadmap template '{id}' does not exist")))
}

// ────────────────────────────────────────────────────────────────────────────
// Sessions
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/sessions
///
/// Called once the hosted auth provider has signed the user in.
pub async fn handle_login(
    State(state): State<AppState>,
    Json(req): Json<SessionRequest>,
) -> Result<Json<RoadmapView>, AppError> {
    let session = state.sessions.login(req.user_id).await?;
    Ok(Json(RoadmapView::published(&session)))
}

/// DELETE /api/v1/sessions/:user_id
pub async fn handle_logout(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> StatusCode {
    state.sessions.logout(user_id);
    StatusCode::NO_CONTENT
}

// ────────────────────────────────────────────────────────────────────────────
// Roadmap
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/roadmap
pub async fn handle_get_roadmap(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<RoadmapView>, AppError> {
    let session = session_for(&state, params.user_id)?;
    Ok(Json(RoadmapView::published(&session)))
}

/// POST /api/v1/roadmap/select
pub async fn handle_select_template(
    State(state): State<AppState>,
    Json(req): Json<SelectTemplateRequest>,
) -> Result<Json<RoadmapView>, AppError> {
    if req.template_id.trim().is_empty() {
        return Err(AppError::Validation("template_id cannot be empty".to_string()));
    }

    let session = session_for(&state, req.user_id)?;
    let mut controller = session.try_begin().ok_or(AppError::OperationInFlight)?;
    controller.select_template(req.template_id.trim()).await?;
    Ok(Json(RoadmapView::of(&controller)))
}

/// PATCH /api/v1/roadmap/steps/:order
pub async fn handle_toggle_step(
    State(state): State<AppState>,
    Path(order): Path<u32>,
    Json(req): Json<ToggleStepRequest>,
) -> Result<Json<RoadmapView>, AppError> {
    let session = session_for(&state, req.user_id)?;
    let mut controller = session.try_begin().ok_or(AppError::OperationInFlight)?;
    controller.toggle_step(order, req.completed).await?;
    Ok(Json(RoadmapView::of(&controller)))
}

/// POST /api/v1/roadmap/reset
pub async fn handle_reset_progress(
    State(state): State<AppState>,
    Json(req): Json<ResetRequest>,
) -> Result<Json<RoadmapView>, AppError> {
    let session = session_for(&state, req.user_id)?;
    let mut controller = session.try_begin().ok_or(AppError::OperationInFlight)?;
    controller.reset_progress().await?;
    Ok(Json(RoadmapView::of(&controller)))
}

/// POST /api/v1/roadmap/personalize
///
/// Holds the session for the whole LLM round trip, so concurrent toggles for
/// the same user are rejected until it finishes. Reads still answer.
pub async fn handle_personalize(
    State(state): State<AppState>,
    Json(req): Json<PersonalizeRequest>,
) -> Result<Json<PersonalizeResponse>, AppError> {
    let session = session_for(&state, req.user_id)?;
    let mut controller = session.try_begin().ok_or(AppError::OperationInFlight)?;
    let added_steps = controller.personalize(&req.profile).await?;
    Ok(Json(PersonalizeResponse {
        view: RoadmapView::of(&controller),
        added_steps,
    }))
}
