use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use crate::db::whisper_repository::{NewWhisper, WallScope, WhisperUpdate};
use crate::error::AppError;
use crate::models::directory::{Organization, Team};
use crate::models::whisper::{
    Participant, WallStats, WhisperCategory, WhisperCommentView, WhisperView,
};
use crate::routes::auth::session::AuthSession;
use crate::routes::teams::resolve_selected_organization;
use crate::routes::{require_contributor, require_identity};
use crate::state::AppState;

const WALL_LIMIT_DEFAULT: i64 = 50;
const WALL_LIMIT_MAX: i64 = 200;
/// Fixed size of the recent-participants ranking.
const PARTICIPANT_CAP: i64 = 8;

/// A wall post with its comment thread attached.
#[derive(Debug, Serialize)]
struct WallPost {
    #[serde(flatten)]
    whisper: WhisperView,
    comments: Vec<WhisperCommentView>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhisperCreatePayload {
    pub content: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub organization_id: Option<Uuid>,
    #[serde(default)]
    pub team_id: Option<Uuid>,
}

pub async fn create_whisper(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
    Json(payload): Json<WhisperCreatePayload>,
) -> Result<impl IntoResponse, AppError> {
    let identity = require_contributor(&state, &claims.sub).await?;

    let content = payload.content.trim();
    if content.is_empty() {
        return Err(AppError::validation("Whisper content is required"));
    }
    // Unrecognized categories coerce to General; never an error.
    let category = WhisperCategory::parse(payload.category.as_deref().unwrap_or_default());

    let selection = state.preferences.get_selection(&claims.sub).await?;
    let organization = resolve_selected_organization(
        &state,
        payload.organization_id,
        selection.and_then(|s| s.organization_id),
    )
    .await?;

    let team: Option<Team> = match payload.team_id {
        Some(team_id) => {
            let team = state
                .directory
                .find_team(team_id)
                .await?
                .ok_or(AppError::NotFound)?;
            if team.organization_id != organization.id {
                return Err(AppError::validation("Team is not part of that organization"));
            }
            Some(team)
        }
        None => None,
    };

    let whisper = state
        .whispers
        .insert_whisper(NewWhisper {
            provider_account_id: &claims.sub,
            organization_id: organization.id,
            team_id: team.as_ref().map(|team| team.id),
            category,
            content,
        })
        .await?;

    // Posting also becomes the caller's new dashboard context.
    state
        .preferences
        .upsert_selection(
            &claims.sub,
            Some(organization.id),
            team.as_ref().map(|team| team.id),
        )
        .await?;

    let view = WhisperView {
        id: whisper.id,
        organization_id: whisper.organization_id,
        team_id: whisper.team_id,
        category: whisper.category,
        content: whisper.content,
        shares: whisper.shares,
        anonymous_username: Some(identity.anonymous_username),
        likes: 0,
        liked_by_me: false,
        mine: true,
        created_at: whisper.created_at,
        updated_at: whisper.updated_at,
    };
    Ok(Json(json!({
        "whisper": WallPost {
            whisper: view,
            comments: Vec::new(),
        }
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhisperUpdatePayload {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

pub async fn update_whisper(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
    Path(whisper_id): Path<Uuid>,
    Json(payload): Json<WhisperUpdatePayload>,
) -> Result<impl IntoResponse, AppError> {
    require_contributor(&state, &claims.sub).await?;

    let content = match payload.content.as_deref() {
        Some(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Err(AppError::validation("Whisper content is required"));
            }
            Some(trimmed)
        }
        None => None,
    };
    let category = payload
        .category
        .as_deref()
        .map(WhisperCategory::parse);

    let updated = state
        .whispers
        .update_whisper(
            whisper_id,
            &claims.sub,
            WhisperUpdate { content, category },
        )
        .await?
        // One answer whether the post is missing or simply not the
        // caller's; existence must not leak.
        .ok_or_else(|| AppError::validation("Unable to update whisper"))?;

    let view = state
        .whispers
        .view_whisper(updated.id, &claims.sub)
        .await?
        .ok_or(AppError::NotFound)?;
    let comments = state
        .whispers
        .comments_for_whispers(&[updated.id])
        .await?;
    Ok(Json(json!({
        "whisper": WallPost {
            whisper: view,
            comments,
        }
    })))
}

pub async fn delete_whisper(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
    Path(whisper_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    require_identity(&state, &claims.sub).await?;
    let deleted = state.whispers.delete_whisper(whisper_id, &claims.sub).await?;
    if !deleted {
        return Err(AppError::NotFound);
    }
    Ok(Json(json!({ "success": true })))
}

pub async fn toggle_whisper_like(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
    Path(whisper_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    require_identity(&state, &claims.sub).await?;
    let like = state
        .whispers
        .toggle_like(whisper_id, &claims.sub)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(like))
}

#[derive(Debug, Deserialize)]
pub struct WhisperCommentPayload {
    pub content: String,
}

pub async fn create_whisper_comment(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
    Path(whisper_id): Path<Uuid>,
    Json(payload): Json<WhisperCommentPayload>,
) -> Result<impl IntoResponse, AppError> {
    require_contributor(&state, &claims.sub).await?;
    let content = payload.content.trim();
    if content.is_empty() {
        return Err(AppError::validation("Comment content is required"));
    }

    let comment = state
        .whispers
        .insert_comment(whisper_id, &claims.sub, content)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(json!({ "comment": comment })))
}

pub async fn share_whisper(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
    Path(whisper_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    require_identity(&state, &claims.sub).await?;
    let shares = state
        .whispers
        .increment_share(whisper_id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(json!({ "shares": shares })))
}

#[derive(Debug, Deserialize)]
pub struct WhisperReportPayload {
    #[serde(default)]
    pub reason: Option<String>,
}

/// Moderation stub: acknowledges the report and leaves a structured trace
/// for operators. No workflow behind it.
pub async fn report_whisper(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
    Path(whisper_id): Path<Uuid>,
    Json(payload): Json<WhisperReportPayload>,
) -> Result<impl IntoResponse, AppError> {
    let identity = require_identity(&state, &claims.sub).await?;
    state
        .whispers
        .find_whisper(whisper_id)
        .await?
        .ok_or(AppError::NotFound)?;

    warn!(
        %whisper_id,
        reporter = %identity.anonymous_id,
        reason = payload.reason.as_deref().unwrap_or("unspecified"),
        "whisper reported"
    );
    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WallQuery {
    #[serde(default)]
    pub organization_id: Option<Uuid>,
    #[serde(default)]
    pub team_id: Option<Uuid>,
    /// Comma-separated category filter; applies to the post list only.
    #[serde(default)]
    pub categories: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
}

fn parse_category_filter(raw: Option<&str>) -> Vec<WhisperCategory> {
    let mut categories = Vec::new();
    for token in raw.unwrap_or_default().split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        let category = WhisperCategory::parse(token);
        if !categories.contains(&category) {
            categories.push(category);
        }
    }
    categories
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WallResponse {
    whispers: Vec<WallPost>,
    stats: WallStats,
    participants: Vec<Participant>,
    needs_selection: bool,
    organizations: Vec<Organization>,
    organization_id: Uuid,
    selected_organization_id: Option<Uuid>,
    teams: Vec<Team>,
    team_id: Option<Uuid>,
}

pub async fn get_whisper_wall(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
    Query(query): Query<WallQuery>,
) -> Result<impl IntoResponse, AppError> {
    require_identity(&state, &claims.sub).await?;

    let selection = state.preferences.get_selection(&claims.sub).await?;
    let selected_organization_id = selection.and_then(|s| s.organization_id);
    let needs_selection = query.organization_id.is_none() && selected_organization_id.is_none();

    let organization =
        resolve_selected_organization(&state, query.organization_id, selected_organization_id)
            .await?;

    let team: Option<Team> = match query.team_id {
        Some(team_id) => {
            let team = state
                .directory
                .find_team(team_id)
                .await?
                .ok_or(AppError::NotFound)?;
            if team.organization_id != organization.id {
                return Err(AppError::validation("Team is not part of that organization"));
            }
            Some(team)
        }
        // A stored team selection only applies while it matches the
        // resolved organization.
        None => match selection.and_then(|s| s.team_id) {
            Some(team_id) => state
                .directory
                .find_team(team_id)
                .await?
                .filter(|team| team.organization_id == organization.id),
            None => None,
        },
    };

    let categories = parse_category_filter(query.categories.as_deref());
    let scope = WallScope {
        organization_id: organization.id,
        team_id: team.as_ref().map(|team| team.id),
    };
    let limit = query
        .limit
        .unwrap_or(WALL_LIMIT_DEFAULT)
        .clamp(1, WALL_LIMIT_MAX);

    // Independent aggregate reads; no reason to serialize them. Stats and
    // participants describe the whole scoped wall, so the category filter
    // applies only to the post list.
    let (posts, stats, participants, organizations, teams) = tokio::try_join!(
        state.whispers.wall_posts(scope, &categories, &claims.sub, limit),
        state.whispers.wall_stats(scope),
        state.whispers.recent_participants(scope, PARTICIPANT_CAP),
        state.directory.list_organizations(),
        state.directory.list_teams(organization.id),
    )?;

    let post_ids: Vec<Uuid> = posts.iter().map(|post| post.id).collect();
    let comments = state.whispers.comments_for_whispers(&post_ids).await?;
    let mut comments_by_post: HashMap<Uuid, Vec<WhisperCommentView>> = HashMap::new();
    for comment in comments {
        comments_by_post
            .entry(comment.whisper_id)
            .or_default()
            .push(comment);
    }

    let whispers = posts
        .into_iter()
        .map(|post| WallPost {
            comments: comments_by_post.remove(&post.id).unwrap_or_default(),
            whisper: post,
        })
        .collect();

    Ok(Json(WallResponse {
        whispers,
        stats,
        participants,
        needs_selection,
        organizations,
        organization_id: organization.id,
        selected_organization_id,
        teams,
        team_id: scope.team_id,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use std::sync::Arc;

    use crate::db::mock_db::MockDb;
    use crate::db::whisper_repository::WhisperRepository;
    use crate::routes::auth::claims::test_claims;
    use crate::state::test_state;

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), 1 << 20).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn create_payload(content: &str, category: &str) -> WhisperCreatePayload {
        WhisperCreatePayload {
            content: content.into(),
            category: Some(category.into()),
            organization_id: None,
            team_id: None,
        }
    }

    fn empty_wall_query() -> WallQuery {
        WallQuery {
            organization_id: None,
            team_id: None,
            categories: None,
            limit: None,
        }
    }

    async fn post_whisper(
        state: &AppState,
        account: &str,
        content: &str,
        category: &str,
    ) -> Uuid {
        let response = create_whisper(
            State(state.clone()),
            AuthSession(test_claims(account)),
            Json(create_payload(content, category)),
        )
        .await
        .unwrap()
        .into_response();
        let json = json_body(response).await;
        serde_json::from_value(json["whisper"]["id"].clone()).unwrap()
    }

    #[tokio::test]
    async fn bad_categories_coerce_to_general_instead_of_failing() {
        let db = Arc::new(MockDb::default());
        db.seed_user("acct-1", "SunnyWren11");
        let state = test_state(Arc::clone(&db));

        let id = post_whisper(&state, "acct-1", "hello wall", "not-a-category").await;

        let stored = db.find_whisper(id).await.unwrap().unwrap();
        assert_eq!(stored.category, WhisperCategory::General);
    }

    #[tokio::test]
    async fn empty_content_is_rejected() {
        let db = Arc::new(MockDb::default());
        db.seed_user("acct-1", "SunnyWren11");
        let state = test_state(db);

        let err = create_whisper(
            State(state),
            AuthSession(test_claims("acct-1")),
            Json(create_payload("   ", "general")),
        )
        .await
        .err()
        .expect("blank content should be rejected");
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn posting_persists_the_callers_selection() {
        let db = Arc::new(MockDb::default());
        db.seed_user("acct-1", "SunnyWren11");
        let state = test_state(Arc::clone(&db));

        post_whisper(&state, "acct-1", "context please", "general").await;

        let selection = db.selections.lock().unwrap().get("acct-1").copied().unwrap();
        assert!(selection.organization_id.is_some());
    }

    #[tokio::test]
    async fn update_is_partial_and_owner_only() {
        let db = Arc::new(MockDb::default());
        db.seed_user("acct-1", "SunnyWren11");
        db.seed_user("acct-2", "BoldHeron22");
        let state = test_state(Arc::clone(&db));

        let id = post_whisper(&state, "acct-1", "original", "idea").await;

        // Content-only update keeps the category.
        let response = update_whisper(
            State(state.clone()),
            AuthSession(test_claims("acct-1")),
            Path(id),
            Json(WhisperUpdatePayload {
                content: Some("edited".into()),
                category: None,
            }),
        )
        .await
        .unwrap()
        .into_response();
        let json = json_body(response).await;
        assert_eq!(json["whisper"]["content"], "edited");
        assert_eq!(json["whisper"]["category"], "idea");

        // Someone else's update is one indistinct 400.
        let err = update_whisper(
            State(state),
            AuthSession(test_claims("acct-2")),
            Path(id),
            Json(WhisperUpdatePayload {
                content: Some("hijacked".into()),
                category: None,
            }),
        )
        .await
        .err()
        .expect("non-owner update should fail");
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
        assert_eq!(db.find_whisper(id).await.unwrap().unwrap().content, "edited");
    }

    #[tokio::test]
    async fn delete_refuses_non_owners_and_leaves_everything_intact() {
        let db = Arc::new(MockDb::default());
        db.seed_user("acct-1", "SunnyWren11");
        db.seed_user("acct-2", "BoldHeron22");
        let state = test_state(Arc::clone(&db));

        let id = post_whisper(&state, "acct-1", "keep me", "general").await;
        toggle_whisper_like(
            State(state.clone()),
            AuthSession(test_claims("acct-2")),
            Path(id),
        )
        .await
        .unwrap();
        create_whisper_comment(
            State(state.clone()),
            AuthSession(test_claims("acct-2")),
            Path(id),
            Json(WhisperCommentPayload {
                content: "nice".into(),
            }),
        )
        .await
        .unwrap();

        let err = delete_whisper(
            State(state.clone()),
            AuthSession(test_claims("acct-2")),
            Path(id),
        )
        .await
        .err()
        .expect("non-owner delete should fail");
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);

        assert!(db.find_whisper(id).await.unwrap().is_some());
        assert_eq!(db.whisper_likes.lock().unwrap().len(), 1);
        assert_eq!(db.whisper_comments.lock().unwrap().len(), 1);

        // The owner's delete cascades likes and comments away.
        let response = delete_whisper(
            State(state),
            AuthSession(test_claims("acct-1")),
            Path(id),
        )
        .await
        .unwrap()
        .into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(db.find_whisper(id).await.unwrap().is_none());
        assert!(db.whisper_likes.lock().unwrap().is_empty());
        assert!(db.whisper_comments.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn like_toggle_flips_presence_with_fresh_counts() {
        let db = Arc::new(MockDb::default());
        db.seed_user("acct-1", "SunnyWren11");
        let state = test_state(Arc::clone(&db));

        let id = post_whisper(&state, "acct-1", "like me", "fun").await;

        let first = json_body(
            toggle_whisper_like(
                State(state.clone()),
                AuthSession(test_claims("acct-1")),
                Path(id),
            )
            .await
            .unwrap()
            .into_response(),
        )
        .await;
        assert_eq!(first["liked"], true);
        assert_eq!(first["likes"], 1);

        let second = json_body(
            toggle_whisper_like(
                State(state),
                AuthSession(test_claims("acct-1")),
                Path(id),
            )
            .await
            .unwrap()
            .into_response(),
        )
        .await;
        assert_eq!(second["liked"], false);
        assert_eq!(second["likes"], 0);
    }

    #[tokio::test]
    async fn share_is_a_counter_not_a_toggle() {
        let db = Arc::new(MockDb::default());
        db.seed_user("acct-1", "SunnyWren11");
        let state = test_state(Arc::clone(&db));

        let id = post_whisper(&state, "acct-1", "share me", "praise").await;
        for expected in 1..=3 {
            let json = json_body(
                share_whisper(
                    State(state.clone()),
                    AuthSession(test_claims("acct-1")),
                    Path(id),
                )
                .await
                .unwrap()
                .into_response(),
            )
            .await;
            assert_eq!(json["shares"], expected);
        }
    }

    #[tokio::test]
    async fn wall_stats_cover_all_categories_and_ignore_the_filter() {
        let db = Arc::new(MockDb::default());
        db.seed_user("acct-1", "SunnyWren11");
        let state = test_state(Arc::clone(&db));

        post_whisper(&state, "acct-1", "an idea", "idea").await;
        post_whisper(&state, "acct-1", "some praise", "praise").await;

        let mut query = empty_wall_query();
        query.categories = Some("idea".into());
        let json = json_body(
            get_whisper_wall(
                State(state),
                AuthSession(test_claims("acct-1")),
                Query(query),
            )
            .await
            .unwrap()
            .into_response(),
        )
        .await;

        // Post list honors the category subset.
        assert_eq!(json["whispers"].as_array().unwrap().len(), 1);
        assert_eq!(json["whispers"][0]["category"], "idea");

        // Stats describe the whole scoped wall, with every category key
        // present even at zero.
        assert_eq!(json["stats"]["totalPosts"], 2);
        let counts = &json["stats"]["categoryCounts"];
        for key in ["general", "praise", "concern", "idea", "fun"] {
            assert!(counts[key].is_i64(), "missing category key {key}");
        }
        assert_eq!(counts["idea"], 1);
        assert_eq!(counts["praise"], 1);
        assert_eq!(counts["concern"], 0);
    }

    #[tokio::test]
    async fn wall_round_trip_matches_the_product_scenario() {
        let db = Arc::new(MockDb::default());
        db.seed_user("acct-a", "SunnyWren11");
        db.seed_user("acct-b", "BoldHeron22");
        let state = test_state(Arc::clone(&db));

        // A posts an idea.
        let id = post_whisper(&state, "acct-a", "Try async standups", "idea").await;

        let wall = json_body(
            get_whisper_wall(
                State(state.clone()),
                AuthSession(test_claims("acct-a")),
                Query(empty_wall_query()),
            )
            .await
            .unwrap()
            .into_response(),
        )
        .await;
        assert!(wall["stats"]["totalPosts"].as_i64().unwrap() >= 1);
        assert!(wall["stats"]["categoryCounts"]["idea"].as_i64().unwrap() >= 1);
        let post = &wall["whispers"][0];
        assert_eq!(post["mine"], true);
        assert_eq!(post["likes"], 0);

        // B likes it.
        let like = json_body(
            toggle_whisper_like(
                State(state.clone()),
                AuthSession(test_claims("acct-b")),
                Path(id),
            )
            .await
            .unwrap()
            .into_response(),
        )
        .await;
        assert_eq!(like["liked"], true);
        assert_eq!(like["likes"], 1);

        // A's next wall fetch sees B's like but not as their own.
        let wall = json_body(
            get_whisper_wall(
                State(state),
                AuthSession(test_claims("acct-a")),
                Query(empty_wall_query()),
            )
            .await
            .unwrap()
            .into_response(),
        )
        .await;
        let post = &wall["whispers"][0];
        assert_eq!(post["likes"], 1);
        assert_eq!(post["likedByMe"], false);
        assert_eq!(post["mine"], true);
        assert_eq!(post["anonymousUsername"], "SunnyWren11");
    }

    #[tokio::test]
    async fn wall_attaches_comments_oldest_first_and_ranks_participants() {
        let db = Arc::new(MockDb::default());
        db.seed_user("acct-a", "SunnyWren11");
        db.seed_user("acct-b", "BoldHeron22");
        let state = test_state(Arc::clone(&db));

        let id = post_whisper(&state, "acct-a", "discuss", "general").await;
        for (account, text) in [("acct-a", "first"), ("acct-b", "second")] {
            create_whisper_comment(
                State(state.clone()),
                AuthSession(test_claims(account)),
                Path(id),
                Json(WhisperCommentPayload {
                    content: text.into(),
                }),
            )
            .await
            .unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }

        let wall = json_body(
            get_whisper_wall(
                State(state),
                AuthSession(test_claims("acct-a")),
                Query(empty_wall_query()),
            )
            .await
            .unwrap()
            .into_response(),
        )
        .await;

        let comments = wall["whispers"][0]["comments"].as_array().unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0]["content"], "first");
        assert_eq!(comments[1]["content"], "second");

        // Commenting last makes B the most recent participant.
        let participants = wall["participants"].as_array().unwrap();
        assert_eq!(participants.len(), 2);
        assert_eq!(participants[0]["anonymousUsername"], "BoldHeron22");
    }

    #[tokio::test]
    async fn needs_selection_reflects_a_missing_stored_choice() {
        let db = Arc::new(MockDb::default());
        db.seed_user("acct-1", "SunnyWren11");
        let state = test_state(Arc::clone(&db));

        let wall = json_body(
            get_whisper_wall(
                State(state.clone()),
                AuthSession(test_claims("acct-1")),
                Query(empty_wall_query()),
            )
            .await
            .unwrap()
            .into_response(),
        )
        .await;
        assert_eq!(wall["needsSelection"], true);

        // Posting stores a selection; the flag clears.
        post_whisper(&state, "acct-1", "now I have context", "general").await;
        let wall = json_body(
            get_whisper_wall(
                State(state),
                AuthSession(test_claims("acct-1")),
                Query(empty_wall_query()),
            )
            .await
            .unwrap()
            .into_response(),
        )
        .await;
        assert_eq!(wall["needsSelection"], false);
    }

    #[tokio::test]
    async fn team_scope_filters_posts_stats_and_participants_together() {
        let db = Arc::new(MockDb::default());
        db.seed_user("acct-1", "SunnyWren11");
        db.seed_user("acct-2", "BoldHeron22");
        let org = db.seed_organization("General");
        let team = db.seed_team(org.id, "Platform");
        let state = test_state(Arc::clone(&db));

        // One post on the team wall, one on the org-wide wall.
        create_whisper(
            State(state.clone()),
            AuthSession(test_claims("acct-1")),
            Json(WhisperCreatePayload {
                content: "team only".into(),
                category: Some("general".into()),
                organization_id: Some(org.id),
                team_id: Some(team.id),
            }),
        )
        .await
        .unwrap();
        create_whisper(
            State(state.clone()),
            AuthSession(test_claims("acct-2")),
            Json(WhisperCreatePayload {
                content: "org wide".into(),
                category: Some("general".into()),
                organization_id: Some(org.id),
                team_id: None,
            }),
        )
        .await
        .unwrap();

        let mut query = empty_wall_query();
        query.organization_id = Some(org.id);
        query.team_id = Some(team.id);
        let wall = json_body(
            get_whisper_wall(
                State(state),
                AuthSession(test_claims("acct-1")),
                Query(query),
            )
            .await
            .unwrap()
            .into_response(),
        )
        .await;

        assert_eq!(wall["whispers"].as_array().unwrap().len(), 1);
        assert_eq!(wall["whispers"][0]["content"], "team only");
        assert_eq!(wall["stats"]["totalPosts"], 1);
        let participants = wall["participants"].as_array().unwrap();
        assert_eq!(participants.len(), 1);
        assert_eq!(participants[0]["anonymousUsername"], "SunnyWren11");
    }

    #[tokio::test]
    async fn blocked_accounts_can_read_but_not_post() {
        let db = Arc::new(MockDb::default());
        db.seed_user("acct-blocked", "QuietLynx33");
        db.users
            .lock()
            .unwrap()
            .get_mut("acct-blocked")
            .unwrap()
            .blocked = true;
        let state = test_state(Arc::clone(&db));

        let err = create_whisper(
            State(state.clone()),
            AuthSession(test_claims("acct-blocked")),
            Json(create_payload("should not land", "general")),
        )
        .await
        .err()
        .expect("blocked account should be refused");
        assert_eq!(err.into_response().status(), StatusCode::FORBIDDEN);

        let response = get_whisper_wall(
            State(state),
            AuthSession(test_claims("acct-blocked")),
            Query(empty_wall_query()),
        )
        .await
        .unwrap()
        .into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn category_filter_parses_and_dedupes() {
        assert!(parse_category_filter(None).is_empty());
        assert!(parse_category_filter(Some("")).is_empty());
        assert_eq!(
            parse_category_filter(Some("idea, praise ,idea")),
            vec![WhisperCategory::Idea, WhisperCategory::Praise]
        );
        // Unknown tokens coerce rather than fail, matching the write path.
        assert_eq!(
            parse_category_filter(Some("bogus")),
            vec![WhisperCategory::General]
        );
    }
}
