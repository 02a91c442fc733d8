use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::checkin_repository::NewCheckin;
use crate::error::AppError;
use crate::models::checkin::{CheckinCommentView, CheckinHistoryItem, CheckinStats};
use crate::models::directory::Team;
use crate::routes::auth::session::AuthSession;
use crate::routes::teams::{
    find_or_create_team, resolve_organization, resolve_selected_organization,
};
use crate::routes::require_contributor;
use crate::state::AppState;

const HISTORY_LIMIT: i64 = 30;
const FEED_LIMIT: i64 = 30;

fn validate_mood(mood: i32) -> Result<i16, AppError> {
    if (1..=5).contains(&mood) {
        Ok(mood as i16)
    } else {
        Err(AppError::validation("Mood must be an integer between 1 and 5"))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckinPayload {
    pub mood: i32,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub team_id: Option<Uuid>,
    #[serde(default)]
    pub team_name: Option<String>,
    #[serde(default)]
    pub organization_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreatedCheckin {
    id: Uuid,
    mood: i16,
    note: Option<String>,
    team_name: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckinSubmitResponse {
    checkin: CreatedCheckin,
    stats: CheckinStats,
    teams: Vec<Team>,
}

pub async fn create_checkin(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
    Json(payload): Json<CheckinPayload>,
) -> Result<impl IntoResponse, AppError> {
    require_contributor(&state, &claims.sub).await?;
    let mood = validate_mood(payload.mood)?;
    let note = payload
        .note
        .as_deref()
        .map(str::trim)
        .filter(|note| !note.is_empty());

    let team_name = payload
        .team_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty());

    // A team name wins over a team id: it find-or-creates within the
    // (defaulted) organization.
    let team: Option<Team> = match (team_name, payload.team_id) {
        (Some(name), _) => {
            let organization = resolve_organization(&state, payload.organization_id).await?;
            Some(find_or_create_team(&state, organization.id, name, Some(&claims.sub)).await?)
        }
        (None, Some(team_id)) => Some(
            state
                .directory
                .find_team(team_id)
                .await?
                .ok_or(AppError::NotFound)?,
        ),
        (None, None) => None,
    };

    let checkin = state
        .checkins
        .insert_checkin(NewCheckin {
            provider_account_id: &claims.sub,
            team_id: team.as_ref().map(|team| team.id),
            mood,
            note,
        })
        .await?;
    let stats = state.checkins.user_stats(&claims.sub).await?;

    let listing_org = match team.as_ref() {
        Some(team) => team.organization_id,
        None => resolve_organization(&state, payload.organization_id).await?.id,
    };
    let teams = state.directory.list_teams(listing_org).await?;

    Ok(Json(CheckinSubmitResponse {
        checkin: CreatedCheckin {
            id: checkin.id,
            mood: checkin.mood,
            note: checkin.note,
            team_name: team.map(|team| team.name),
            created_at: checkin.created_at,
        },
        stats,
        teams,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckinListQuery {
    #[serde(default)]
    pub team_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckinListResponse {
    teams: Vec<Team>,
    history: Vec<CheckinHistoryItem>,
    stats: CheckinStats,
    team_feed: Vec<CheckinHistoryItem>,
}

pub async fn list_checkins(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
    Query(query): Query<CheckinListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let selection = state.preferences.get_selection(&claims.sub).await?;
    let organization =
        resolve_selected_organization(&state, None, selection.and_then(|s| s.organization_id))
            .await?;

    let history = state
        .checkins
        .list_user_checkins(&claims.sub, HISTORY_LIMIT)
        .await?;
    let stats = state.checkins.user_stats(&claims.sub).await?;
    let teams = state.directory.list_teams(organization.id).await?;

    // The feed stays scoped to the caller's own check-ins within the team;
    // teammates' notes are not visible here.
    let team_feed = match query.team_id {
        Some(team_id) => {
            state
                .checkins
                .list_team_feed(team_id, &claims.sub, FEED_LIMIT)
                .await?
        }
        None => Vec::new(),
    };

    Ok(Json(CheckinListResponse {
        teams,
        history,
        stats,
        team_feed,
    }))
}

#[derive(Debug, Deserialize)]
pub struct CommentPayload {
    pub content: String,
}

#[derive(Debug, Serialize)]
struct CommentResponse {
    comment: CheckinCommentView,
}

pub async fn create_checkin_comment(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
    Path(checkin_id): Path<Uuid>,
    Json(payload): Json<CommentPayload>,
) -> Result<impl IntoResponse, AppError> {
    require_contributor(&state, &claims.sub).await?;
    let content = payload.content.trim();
    if content.is_empty() {
        return Err(AppError::validation("Comment content is required"));
    }
    if !state.checkins.checkin_exists(checkin_id).await? {
        return Err(AppError::NotFound);
    }

    let comment = state
        .checkins
        .insert_comment(checkin_id, &claims.sub, content)
        .await?;
    Ok(Json(CommentResponse { comment }))
}

#[derive(Debug, Serialize)]
struct CommentListResponse {
    comments: Vec<CheckinCommentView>,
}

pub async fn list_checkin_comments(
    State(state): State<AppState>,
    AuthSession(_claims): AuthSession,
    Path(checkin_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    if !state.checkins.checkin_exists(checkin_id).await? {
        return Err(AppError::NotFound);
    }
    let comments = state.checkins.list_comments(checkin_id).await?;
    Ok(Json(CommentListResponse { comments }))
}
