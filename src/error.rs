use axum::{http::StatusCode, response::IntoResponse, response::Response};
use thiserror::Error;
use tracing::error;

use crate::responses::JsonResponse;

/// Failures surfaced by the domain components. The `IntoResponse` impl is
/// the only place these become wire responses; handlers just use `?`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Authentication required")]
    AuthenticationRequired,

    #[error("{0}")]
    Validation(String),

    /// Covers both "does not exist" and "not owned by the caller" so the
    /// response never reveals which one it was.
    #[error("Not found")]
    NotFound,

    #[error("Account is restricted")]
    Blocked,

    #[error("Could not allocate a unique value within the retry budget")]
    ConflictExhausted,

    #[error(transparent)]
    Store(#[from] sqlx::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::AuthenticationRequired => {
                JsonResponse::unauthorized("Authentication required").into_response()
            }
            AppError::Validation(msg) => JsonResponse::bad_request(&msg).into_response(),
            AppError::NotFound => JsonResponse::not_found("Not found").into_response(),
            AppError::Blocked => {
                (StatusCode::FORBIDDEN, JsonResponse::error_body("Account is restricted"))
                    .into_response()
            }
            AppError::ConflictExhausted => {
                error!("allocation retry budget exhausted");
                JsonResponse::server_error("Something went wrong").into_response()
            }
            AppError::Store(err) => {
                error!(?err, "store operation failed");
                JsonResponse::server_error("Something went wrong").into_response()
            }
            AppError::Internal(err) => {
                error!(?err, "internal error");
                JsonResponse::server_error("Something went wrong").into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn maps_taxonomy_to_status_codes() {
        assert_eq!(
            AppError::AuthenticationRequired.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::validation("bad mood").into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::NotFound.into_response().status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Blocked.into_response().status(), StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::ConflictExhausted.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::Store(sqlx::Error::RowNotFound).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn store_errors_never_leak_detail() {
        let resp = AppError::Store(sqlx::Error::Protocol("connection refused by 10.0.0.1".into()))
            .into_response();
        let body = axum::body::to_bytes(resp.into_body(), 1024).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(!text.contains("10.0.0.1"));
        assert!(text.contains("Something went wrong"));
    }
}
