use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::db::whisper_repository::WallScope;
use crate::error::AppError;
use crate::models::checkin::TeamCheckinStats;
use crate::models::directory::Team;
use crate::models::whisper::{Participant, WallStats};
use crate::routes::auth::session::AuthSession;
use crate::routes::require_identity;
use crate::state::AppState;

const PARTICIPANT_CAP: i64 = 8;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardQuery {
    #[serde(default)]
    pub team_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DashboardResponse {
    needs_selection: bool,
    team: Team,
    organization_id: Uuid,
    checkins: TeamCheckinStats,
    wall: WallStats,
    participants: Vec<Participant>,
}

pub async fn get_dashboard(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
    Query(query): Query<DashboardQuery>,
) -> Result<Response, AppError> {
    require_identity(&state, &claims.sub).await?;

    // An explicit team must exist; a stored selection that no longer
    // resolves just asks the client to pick again.
    let team: Option<Team> = match query.team_id {
        Some(team_id) => Some(
            state
                .directory
                .find_team(team_id)
                .await?
                .ok_or(AppError::NotFound)?,
        ),
        None => {
            let selection = state.preferences.get_selection(&claims.sub).await?;
            match selection.and_then(|s| s.team_id) {
                Some(team_id) => state.directory.find_team(team_id).await?,
                None => None,
            }
        }
    };

    let Some(team) = team else {
        return Ok(Json(json!({ "needsSelection": true })).into_response());
    };

    let scope = WallScope {
        organization_id: team.organization_id,
        team_id: Some(team.id),
    };
    let (checkins, wall, participants) = tokio::try_join!(
        state.checkins.team_stats(team.id),
        state.whispers.wall_stats(scope),
        state.whispers.recent_participants(scope, PARTICIPANT_CAP),
    )?;

    Ok(Json(DashboardResponse {
        needs_selection: false,
        organization_id: team.organization_id,
        team,
        checkins,
        wall,
        participants,
    })
    .into_response())
}
