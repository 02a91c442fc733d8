use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::checkin_repository::{CheckinRepository, NewCheckin};
use crate::models::checkin::{
    Checkin, CheckinCommentView, CheckinHistoryItem, CheckinStats, TeamCheckinStats,
};

pub struct PostgresCheckinRepository {
    pub pool: PgPool,
}

#[async_trait]
impl CheckinRepository for PostgresCheckinRepository {
    async fn insert_checkin(&self, new: NewCheckin<'_>) -> Result<Checkin, sqlx::Error> {
        sqlx::query_as::<_, Checkin>(
            r#"
            INSERT INTO checkins (provider_account_id, team_id, mood, note)
            VALUES ($1, $2, $3, $4)
            RETURNING id, provider_account_id, team_id, mood, note, created_at
            "#,
        )
        .bind(new.provider_account_id)
        .bind(new.team_id)
        .bind(new.mood)
        .bind(new.note)
        .fetch_one(&self.pool)
        .await
    }

    async fn list_user_checkins(
        &self,
        provider_account_id: &str,
        limit: i64,
    ) -> Result<Vec<CheckinHistoryItem>, sqlx::Error> {
        sqlx::query_as::<_, CheckinHistoryItem>(
            r#"
            SELECT c.id, c.mood, c.note, t.name AS team_name, c.created_at
            FROM checkins c
            LEFT JOIN teams t ON t.id = c.team_id
            WHERE c.provider_account_id = $1
            ORDER BY c.created_at DESC
            LIMIT $2
            "#,
        )
        .bind(provider_account_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    async fn user_stats(&self, provider_account_id: &str) -> Result<CheckinStats, sqlx::Error> {
        sqlx::query_as::<_, CheckinStats>(
            r#"
            SELECT COALESCE(AVG(mood)::float8, 0) AS average_mood,
                   COUNT(*)::bigint AS total_checkins,
                   MAX(created_at) AS last_checkin_at
            FROM checkins
            WHERE provider_account_id = $1
            "#,
        )
        .bind(provider_account_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn list_team_feed(
        &self,
        team_id: Uuid,
        provider_account_id: &str,
        limit: i64,
    ) -> Result<Vec<CheckinHistoryItem>, sqlx::Error> {
        sqlx::query_as::<_, CheckinHistoryItem>(
            r#"
            SELECT c.id, c.mood, c.note, t.name AS team_name, c.created_at
            FROM checkins c
            LEFT JOIN teams t ON t.id = c.team_id
            WHERE c.team_id = $1 AND c.provider_account_id = $2
            ORDER BY c.created_at DESC
            LIMIT $3
            "#,
        )
        .bind(team_id)
        .bind(provider_account_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    async fn team_stats(&self, team_id: Uuid) -> Result<TeamCheckinStats, sqlx::Error> {
        sqlx::query_as::<_, TeamCheckinStats>(
            r#"
            SELECT COALESCE(AVG(mood)::float8, 0) AS average_mood,
                   COUNT(*)::bigint AS total_checkins,
                   COUNT(DISTINCT provider_account_id)::bigint AS participant_count,
                   MAX(created_at) AS last_checkin_at
            FROM checkins
            WHERE team_id = $1
            "#,
        )
        .bind(team_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn checkin_exists(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let found: Option<Uuid> = sqlx::query_scalar("SELECT id FROM checkins WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    async fn insert_comment(
        &self,
        checkin_id: Uuid,
        provider_account_id: &str,
        content: &str,
    ) -> Result<CheckinCommentView, sqlx::Error> {
        sqlx::query_as::<_, CheckinCommentView>(
            r#"
            WITH inserted AS (
                INSERT INTO checkin_comments (checkin_id, provider_account_id, content)
                VALUES ($1, $2, $3)
                RETURNING id, checkin_id, provider_account_id, content, created_at
            )
            SELECT i.id, i.checkin_id, i.content, u.anonymous_username, i.created_at
            FROM inserted i
            LEFT JOIN users u ON u.provider_account_id = i.provider_account_id
            "#,
        )
        .bind(checkin_id)
        .bind(provider_account_id)
        .bind(content)
        .fetch_one(&self.pool)
        .await
    }

    async fn list_comments(
        &self,
        checkin_id: Uuid,
    ) -> Result<Vec<CheckinCommentView>, sqlx::Error> {
        sqlx::query_as::<_, CheckinCommentView>(
            r#"
            SELECT c.id, c.checkin_id, c.content, u.anonymous_username, c.created_at
            FROM checkin_comments c
            LEFT JOIN users u ON u.provider_account_id = c.provider_account_id
            WHERE c.checkin_id = $1
            ORDER BY c.created_at DESC
            "#,
        )
        .bind(checkin_id)
        .fetch_all(&self.pool)
        .await
    }
}
