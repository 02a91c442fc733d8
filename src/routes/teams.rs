use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::directory::{Organization, Team};
use crate::routes::auth::session::AuthSession;
use crate::state::AppState;

/// The organization scoping a request: an explicit id must exist, no id
/// falls back to the seeded default organization.
pub async fn resolve_organization(
    state: &AppState,
    requested: Option<Uuid>,
) -> Result<Organization, AppError> {
    match requested {
        Some(id) => state
            .directory
            .find_organization(id)
            .await?
            .ok_or(AppError::NotFound),
        None => Ok(state
            .directory
            .ensure_organization(&state.config.default_organization)
            .await?),
    }
}

/// Like [`resolve_organization`], but consults the caller's stored
/// selection before falling back to the default. A stale selection (the
/// organization no longer resolves) degrades to the default rather than
/// erroring.
pub async fn resolve_selected_organization(
    state: &AppState,
    requested: Option<Uuid>,
    selected: Option<Uuid>,
) -> Result<Organization, AppError> {
    if requested.is_some() {
        return resolve_organization(state, requested).await;
    }
    if let Some(id) = selected {
        if let Some(org) = state.directory.find_organization(id).await? {
            return Ok(org);
        }
    }
    resolve_organization(state, None).await
}

/// Idempotent create: an existing team under the same case-insensitive
/// name is success, not an error. The loser of a concurrent insert race
/// reads the winner's row.
pub async fn find_or_create_team(
    state: &AppState,
    organization_id: Uuid,
    name: &str,
    created_by: Option<&str>,
) -> Result<Team, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation("Team name is required"));
    }

    if let Some(team) = state
        .directory
        .find_team_by_name(organization_id, name)
        .await?
    {
        return Ok(team);
    }

    match state
        .directory
        .insert_team(organization_id, name, created_by)
        .await?
    {
        Some(team) => Ok(team),
        None => state
            .directory
            .find_team_by_name(organization_id, name)
            .await?
            .ok_or(AppError::NotFound),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTeamPayload {
    pub name: String,
    #[serde(default)]
    pub organization_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TeamResponse {
    team: Team,
}

pub async fn create_team(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
    Json(payload): Json<CreateTeamPayload>,
) -> Result<impl IntoResponse, AppError> {
    let organization = resolve_organization(&state, payload.organization_id).await?;
    let team =
        find_or_create_team(&state, organization.id, &payload.name, Some(&claims.sub)).await?;
    Ok(Json(TeamResponse { team }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamListQuery {
    #[serde(default)]
    pub organization_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TeamListResponse {
    organization_id: Uuid,
    teams: Vec<Team>,
}

pub async fn list_teams(
    State(state): State<AppState>,
    AuthSession(_claims): AuthSession,
    Query(query): Query<TeamListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let organization = resolve_organization(&state, query.organization_id).await?;
    let teams = state.directory.list_teams(organization.id).await?;
    Ok(Json(TeamListResponse {
        organization_id: organization.id,
        teams,
    }))
}
