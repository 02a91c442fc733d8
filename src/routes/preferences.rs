use axum::{extract::State, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::directory::{Organization, Team};
use crate::responses::JsonResponse;
use crate::routes::auth::session::AuthSession;
use crate::routes::require_identity;
use crate::routes::teams::resolve_selected_organization;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PreferencesResponse {
    organizations: Vec<Organization>,
    organization_id: Uuid,
    selected_organization_id: Option<Uuid>,
    teams: Vec<Team>,
    selected_team_id: Option<Uuid>,
    needs_selection: bool,
}

pub async fn get_preferences(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
) -> Result<impl IntoResponse, AppError> {
    require_identity(&state, &claims.sub).await?;

    let selection = state.preferences.get_selection(&claims.sub).await?;
    let selected_organization_id = selection.and_then(|s| s.organization_id);
    let selected_team_id = selection.and_then(|s| s.team_id);

    let organization =
        resolve_selected_organization(&state, None, selected_organization_id).await?;
    let (organizations, teams) = tokio::try_join!(
        state.directory.list_organizations(),
        state.directory.list_teams(organization.id),
    )?;

    Ok(Json(PreferencesResponse {
        organizations,
        organization_id: organization.id,
        selected_organization_id,
        teams,
        selected_team_id,
        needs_selection: selected_organization_id.is_none(),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePreferencesPayload {
    pub organization_id: Uuid,
    #[serde(default)]
    pub team_id: Option<Uuid>,
}

pub async fn update_preferences(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
    Json(payload): Json<UpdatePreferencesPayload>,
) -> Result<impl IntoResponse, AppError> {
    require_identity(&state, &claims.sub).await?;

    let organization = state
        .directory
        .find_organization(payload.organization_id)
        .await?
        .ok_or_else(|| AppError::validation("Unknown organization"))?;

    if let Some(team_id) = payload.team_id {
        let team = state
            .directory
            .find_team(team_id)
            .await?
            .ok_or_else(|| AppError::validation("Unknown team"))?;
        if team.organization_id != organization.id {
            return Err(AppError::validation("Team is not part of that organization"));
        }
    }

    state
        .preferences
        .upsert_selection(&claims.sub, Some(organization.id), payload.team_id)
        .await?;
    Ok(JsonResponse::success("Selection saved"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use std::sync::Arc;

    use crate::db::mock_db::MockDb;
    use crate::routes::auth::claims::test_claims;
    use crate::state::test_state;

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), 65536).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn fresh_users_need_a_selection_but_still_get_the_default_scope() {
        let db = Arc::new(MockDb::default());
        db.seed_user("acct-1", "SunnyWren11");
        let state = test_state(Arc::clone(&db));

        let json = json_body(
            get_preferences(State(state), AuthSession(test_claims("acct-1")))
                .await
                .unwrap()
                .into_response(),
        )
        .await;

        assert_eq!(json["needsSelection"], true);
        assert!(json["selectedOrganizationId"].is_null());
        assert!(json["organizationId"].is_string(), "default organization must resolve");
    }

    #[tokio::test]
    async fn valid_selections_persist_and_round_trip() {
        let db = Arc::new(MockDb::default());
        db.seed_user("acct-1", "SunnyWren11");
        let org = db.seed_organization("Acme");
        let team = db.seed_team(org.id, "Platform");
        let state = test_state(Arc::clone(&db));

        let response = update_preferences(
            State(state.clone()),
            AuthSession(test_claims("acct-1")),
            Json(UpdatePreferencesPayload {
                organization_id: org.id,
                team_id: Some(team.id),
            }),
        )
        .await
        .unwrap()
        .into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_body(
            get_preferences(State(state), AuthSession(test_claims("acct-1")))
                .await
                .unwrap()
                .into_response(),
        )
        .await;
        assert_eq!(json["needsSelection"], false);
        assert_eq!(json["selectedOrganizationId"], serde_json::json!(org.id));
        assert_eq!(json["selectedTeamId"], serde_json::json!(team.id));
        assert_eq!(json["organizationId"], serde_json::json!(org.id));
    }

    #[tokio::test]
    async fn rejects_unknown_organizations_and_mismatched_teams() {
        let db = Arc::new(MockDb::default());
        db.seed_user("acct-1", "SunnyWren11");
        let org = db.seed_organization("Acme");
        let other_org = db.seed_organization("Globex");
        let foreign_team = db.seed_team(other_org.id, "Platform");
        let state = test_state(Arc::clone(&db));

        let err = update_preferences(
            State(state.clone()),
            AuthSession(test_claims("acct-1")),
            Json(UpdatePreferencesPayload {
                organization_id: Uuid::new_v4(),
                team_id: None,
            }),
        )
        .await
        .err()
        .expect("unknown organization should be rejected");
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);

        let err = update_preferences(
            State(state),
            AuthSession(test_claims("acct-1")),
            Json(UpdatePreferencesPayload {
                organization_id: org.id,
                team_id: Some(foreign_team.id),
            }),
        )
        .await
        .err()
        .expect("team from another organization should be rejected");
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
        assert!(db.selections.lock().unwrap().is_empty());
    }
}
