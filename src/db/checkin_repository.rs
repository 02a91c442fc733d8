use async_trait::async_trait;
use uuid::Uuid;

use crate::models::checkin::{
    Checkin, CheckinCommentView, CheckinHistoryItem, CheckinStats, TeamCheckinStats,
};

pub struct NewCheckin<'a> {
    pub provider_account_id: &'a str,
    pub team_id: Option<Uuid>,
    pub mood: i16,
    pub note: Option<&'a str>,
}

#[async_trait]
pub trait CheckinRepository: Send + Sync {
    async fn insert_checkin(&self, new: NewCheckin<'_>) -> Result<Checkin, sqlx::Error>;

    /// Most recent check-ins for a user, newest first, annotated with team
    /// names.
    async fn list_user_checkins(
        &self,
        provider_account_id: &str,
        limit: i64,
    ) -> Result<Vec<CheckinHistoryItem>, sqlx::Error>;

    async fn user_stats(&self, provider_account_id: &str) -> Result<CheckinStats, sqlx::Error>;

    /// The caller's own recent check-ins within one team. Deliberately NOT
    /// a cross-user feed: widening it would expose teammates' mood notes.
    async fn list_team_feed(
        &self,
        team_id: Uuid,
        provider_account_id: &str,
        limit: i64,
    ) -> Result<Vec<CheckinHistoryItem>, sqlx::Error>;

    async fn team_stats(&self, team_id: Uuid) -> Result<TeamCheckinStats, sqlx::Error>;

    async fn checkin_exists(&self, id: Uuid) -> Result<bool, sqlx::Error>;

    async fn insert_comment(
        &self,
        checkin_id: Uuid,
        provider_account_id: &str,
        content: &str,
    ) -> Result<CheckinCommentView, sqlx::Error>;

    /// Comments for one check-in, newest first, with commenter pseudonyms.
    async fn list_comments(
        &self,
        checkin_id: Uuid,
    ) -> Result<Vec<CheckinCommentView>, sqlx::Error>;
}
