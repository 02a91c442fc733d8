use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context;
use axum::{extract::State, response::IntoResponse, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::error::AppError;
use crate::responses::JsonResponse;
use crate::routes::auth::claims::Claims;
use crate::routes::auth::session::{AuthSession, AUTH_COOKIE};
use crate::state::AppState;
use crate::utils::jwt::create_jwt;

/// A verified provider profile, delivered by the OAuth gateway once per
/// login event. Trusted as already-authenticated.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionLoginPayload {
    pub provider_account_id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub image: Option<String>,
}

pub async fn handle_session_login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<SessionLoginPayload>,
) -> Result<impl IntoResponse, AppError> {
    let provider_account_id = payload.provider_account_id.trim();
    if provider_account_id.is_empty() {
        return Err(AppError::validation("providerAccountId is required"));
    }

    let identity = state
        .identity
        .ensure_user_record(
            provider_account_id,
            payload.email.as_deref(),
            payload.name.as_deref(),
            payload.image.as_deref(),
            None,
        )
        .await?;

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system clock is before the UNIX epoch")?
        .as_secs();
    let claims = Claims {
        sub: provider_account_id.to_string(),
        email: payload.email.clone(),
        name: payload.name.clone(),
        picture: payload.image.clone(),
        exp: (now + state.config.session_ttl_hours as u64 * 3600) as usize,
        iss: String::new(),
        aud: String::new(),
    };
    let token = create_jwt(
        claims,
        &state.jwt_keys,
        &state.config.jwt_issuer,
        &state.config.jwt_audience,
    )
    .context("failed to sign session token")?;

    let cookie = Cookie::build((AUTH_COOKIE, token))
        .http_only(true)
        .secure(state.config.auth_cookie_secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::hours(state.config.session_ttl_hours))
        .build();

    info!(anonymous_id = %identity.anonymous_id, "session established");
    Ok((jar.add(cookie), Json(json!({ "user": identity }))))
}

pub async fn handle_logout(jar: CookieJar) -> impl IntoResponse {
    let removal = Cookie::build((AUTH_COOKIE, "")).path("/").build();
    (jar.remove(removal), JsonResponse::success("Signed out"))
}

pub async fn handle_me(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
) -> Result<impl IntoResponse, AppError> {
    let identity = state
        .identity
        .get_user_record(&claims.sub)
        .await?
        .ok_or(AppError::AuthenticationRequired)?;
    Ok(Json(json!({ "user": identity })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use std::sync::Arc;

    use crate::db::mock_db::MockDb;
    use crate::routes::auth::claims::test_claims;
    use crate::state::test_state;

    #[tokio::test]
    async fn login_creates_the_record_and_sets_the_cookie() {
        let db = Arc::new(MockDb::default());
        let state = test_state(Arc::clone(&db));

        let response = handle_session_login(
            State(state),
            CookieJar::new(),
            Json(SessionLoginPayload {
                provider_account_id: "acct-1".into(),
                email: Some("a@example.com".into()),
                name: Some("Ada".into()),
                image: None,
            }),
        )
        .await
        .unwrap()
        .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        let set_cookie = response
            .headers()
            .get(axum::http::header::SET_COOKIE)
            .expect("login should set the auth cookie")
            .to_str()
            .unwrap();
        assert!(set_cookie.starts_with(AUTH_COOKIE));
        assert!(set_cookie.contains("HttpOnly"));

        assert!(db.users.lock().unwrap().contains_key("acct-1"));
    }

    #[tokio::test]
    async fn login_rejects_a_blank_account_id() {
        let state = test_state(Arc::new(MockDb::default()));

        let result = handle_session_login(
            State(state),
            CookieJar::new(),
            Json(SessionLoginPayload {
                provider_account_id: "   ".into(),
                email: None,
                name: None,
                image: None,
            }),
        )
        .await;

        let err = result.err().expect("blank account id should be rejected");
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn me_returns_the_pseudonymous_identity() {
        let db = Arc::new(MockDb::default());
        db.seed_user("acct-1", "MellowFalcon42");
        let state = test_state(Arc::clone(&db));

        let response = handle_me(State(state), AuthSession(test_claims("acct-1")))
            .await
            .unwrap()
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), 4096).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["user"]["anonymousUsername"], "MellowFalcon42");
        assert!(json["user"].get("email").is_none(), "email must never leave the resolver");
    }

    #[tokio::test]
    async fn me_rejects_sessions_for_unknown_accounts() {
        let state = test_state(Arc::new(MockDb::default()));
        let err = handle_me(State(state), AuthSession(test_claims("ghost")))
            .await
            .err()
            .expect("unknown account should be rejected");
        assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
    }
}
