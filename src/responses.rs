use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Error payload shape shared by every endpoint: `{"error": "..."}`.
#[derive(Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

pub struct JsonResponse;

impl JsonResponse {
    pub fn error_body(msg: &str) -> Json<ErrorBody> {
        Json(ErrorBody {
            error: msg.to_string(),
        })
    }

    pub fn success(msg: &str) -> impl IntoResponse {
        (StatusCode::OK, Json(json!({ "success": true, "message": msg })))
    }

    pub fn bad_request(msg: &str) -> impl IntoResponse {
        (StatusCode::BAD_REQUEST, Self::error_body(msg))
    }

    pub fn unauthorized(msg: &str) -> impl IntoResponse {
        (StatusCode::UNAUTHORIZED, Self::error_body(msg))
    }

    pub fn not_found(msg: &str) -> impl IntoResponse {
        (StatusCode::NOT_FOUND, Self::error_body(msg))
    }

    pub fn server_error(msg: &str) -> impl IntoResponse {
        (StatusCode::INTERNAL_SERVER_ERROR, Self::error_body(msg))
    }
}

#[cfg(test)]
mod tests {
    use axum::response::IntoResponse;
    use serde_json::{from_slice, Value};

    use crate::responses::JsonResponse;

    #[tokio::test]
    async fn success_carries_message() {
        let resp = JsonResponse::success("ok").into_response();
        assert_eq!(resp.status(), axum::http::StatusCode::OK);

        let body = axum::body::to_bytes(resp.into_body(), 1024).await.unwrap();
        let json: Value = from_slice(&body).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["message"], "ok");
    }

    #[tokio::test]
    async fn errors_use_the_error_field() {
        let resp = JsonResponse::bad_request("Mood must be between 1 and 5").into_response();
        assert_eq!(resp.status(), axum::http::StatusCode::BAD_REQUEST);

        let body = axum::body::to_bytes(resp.into_body(), 1024).await.unwrap();
        let json: Value = from_slice(&body).unwrap();
        assert_eq!(json["error"], "Mood must be between 1 and 5");
    }
}
