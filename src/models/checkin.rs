use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, FromRow, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Checkin {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub provider_account_id: String,
    pub team_id: Option<Uuid>,
    pub mood: i16,
    pub note: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// A check-in annotated with its team's name, as rendered in history and
/// feed lists.
#[derive(Debug, FromRow, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CheckinHistoryItem {
    pub id: Uuid,
    pub mood: i16,
    pub note: Option<String>,
    pub team_name: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, FromRow, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CheckinStats {
    pub average_mood: f64,
    pub total_checkins: i64,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_checkin_at: Option<OffsetDateTime>,
}

impl CheckinStats {
    pub fn empty() -> Self {
        CheckinStats {
            average_mood: 0.0,
            total_checkins: 0,
            last_checkin_at: None,
        }
    }
}

/// Cross-user aggregate for a team's dashboard. Individual notes stay
/// private; only numbers leave the ledger at team scope.
#[derive(Debug, FromRow, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TeamCheckinStats {
    pub average_mood: f64,
    pub total_checkins: i64,
    pub participant_count: i64,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_checkin_at: Option<OffsetDateTime>,
}

#[derive(Debug, FromRow, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CheckinCommentView {
    pub id: Uuid,
    pub checkin_id: Uuid,
    pub content: String,
    pub anonymous_username: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
