use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::CookieJar;

use crate::error::AppError;
use crate::routes::auth::claims::Claims;
use crate::state::AppState;
use crate::utils::jwt::decode_jwt;

pub const AUTH_COOKIE: &str = "auth_token";

#[derive(Debug)]
pub struct AuthSession(pub Claims);

impl FromRequestParts<AppState> for AuthSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get(AUTH_COOKIE)
            .ok_or(AppError::AuthenticationRequired)?;

        let data = decode_jwt(
            token.value(),
            &state.jwt_keys,
            &state.config.jwt_issuer,
            &state.config.jwt_audience,
        )
        .map_err(|_| AppError::AuthenticationRequired)?;

        Ok(AuthSession(data.claims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, Method, Request, StatusCode};
    use axum::response::IntoResponse;
    use axum_extra::extract::cookie::Cookie;
    use std::sync::Arc;
    use std::time::{SystemTime, UNIX_EPOCH};

    use crate::db::mock_db::MockDb;
    use crate::state::test_state;
    use crate::utils::jwt::create_jwt;

    fn make_valid_jwt(state: &AppState) -> String {
        let claims = Claims {
            sub: "acct-42".into(),
            email: Some("test@example.com".into()),
            name: None,
            picture: None,
            exp: (SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap()
                .as_secs()
                + 3600) as usize,
            iss: String::new(),
            aud: String::new(),
        };
        create_jwt(
            claims,
            &state.jwt_keys,
            &state.config.jwt_issuer,
            &state.config.jwt_audience,
        )
        .expect("JWT should create successfully")
    }

    #[tokio::test]
    async fn valid_token_is_extracted() {
        let state = test_state(Arc::new(MockDb::default()));
        let jwt = make_valid_jwt(&state);
        let cookie = Cookie::new(AUTH_COOKIE, jwt);

        let request = Request::builder()
            .method(Method::GET)
            .uri("/")
            .header(header::COOKIE, cookie.to_string())
            .body(())
            .unwrap();

        let mut parts = request.into_parts().0;
        let session = AuthSession::from_request_parts(&mut parts, &state)
            .await
            .expect("extraction should succeed");
        assert_eq!(session.0.sub, "acct-42");
        assert_eq!(session.0.email.as_deref(), Some("test@example.com"));
    }

    #[tokio::test]
    async fn missing_cookie_returns_unauthorized() {
        let state = test_state(Arc::new(MockDb::default()));
        let request = Request::builder()
            .method(Method::GET)
            .uri("/")
            .body(())
            .unwrap();

        let mut parts = request.into_parts().0;
        let err = AuthSession::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn invalid_token_returns_unauthorized() {
        let state = test_state(Arc::new(MockDb::default()));
        let cookie = Cookie::new(AUTH_COOKIE, "invalid.token.here");

        let request = Request::builder()
            .method(Method::GET)
            .uri("/")
            .header(header::COOKIE, cookie.to_string())
            .body(())
            .unwrap();

        let mut parts = request.into_parts().0;
        let err = AuthSession::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
    }
}
