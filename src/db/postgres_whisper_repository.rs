use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::whisper_repository::{
    LikeState, NewWhisper, WallScope, WhisperRepository, WhisperUpdate,
};
use crate::models::whisper::{
    CategoryCounts, Participant, WallStats, Whisper, WhisperCategory, WhisperCommentView,
    WhisperView,
};

pub struct PostgresWhisperRepository {
    pub pool: PgPool,
}

const WHISPER_COLUMNS: &str = r#"id, provider_account_id, organization_id, team_id,
    category, content, shares, created_at, updated_at"#;

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.is_foreign_key_violation(),
        _ => false,
    }
}

#[async_trait]
impl WhisperRepository for PostgresWhisperRepository {
    async fn insert_whisper(&self, new: NewWhisper<'_>) -> Result<Whisper, sqlx::Error> {
        sqlx::query_as::<_, Whisper>(&format!(
            r#"
            INSERT INTO whispers (provider_account_id, organization_id, team_id, category, content)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {WHISPER_COLUMNS}
            "#
        ))
        .bind(new.provider_account_id)
        .bind(new.organization_id)
        .bind(new.team_id)
        .bind(new.category)
        .bind(new.content)
        .fetch_one(&self.pool)
        .await
    }

    async fn find_whisper(&self, id: Uuid) -> Result<Option<Whisper>, sqlx::Error> {
        sqlx::query_as::<_, Whisper>(&format!(
            "SELECT {WHISPER_COLUMNS} FROM whispers WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn view_whisper(
        &self,
        id: Uuid,
        viewer: &str,
    ) -> Result<Option<WhisperView>, sqlx::Error> {
        sqlx::query_as::<_, WhisperView>(
            r#"
            SELECT w.id, w.organization_id, w.team_id, w.category, w.content, w.shares,
                   u.anonymous_username,
                   (SELECT COUNT(*)::bigint FROM whisper_likes wl WHERE wl.whisper_id = w.id) AS likes,
                   EXISTS (
                       SELECT 1 FROM whisper_likes ml
                       WHERE ml.whisper_id = w.id AND ml.provider_account_id = $2
                   ) AS liked_by_me,
                   (w.provider_account_id = $2) AS mine,
                   w.created_at, w.updated_at
            FROM whispers w
            LEFT JOIN users u ON u.provider_account_id = w.provider_account_id
            WHERE w.id = $1
            "#,
        )
        .bind(id)
        .bind(viewer)
        .fetch_optional(&self.pool)
        .await
    }

    async fn update_whisper(
        &self,
        id: Uuid,
        owner: &str,
        update: WhisperUpdate<'_>,
    ) -> Result<Option<Whisper>, sqlx::Error> {
        sqlx::query_as::<_, Whisper>(&format!(
            r#"
            UPDATE whispers
            SET content = COALESCE($3, content),
                category = COALESCE($4, category),
                updated_at = now()
            WHERE id = $1 AND provider_account_id = $2
            RETURNING {WHISPER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(owner)
        .bind(update.content)
        .bind(update.category)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_whisper(&self, id: Uuid, owner: &str) -> Result<bool, sqlx::Error> {
        // One transaction across the three deletes so a crash mid-sequence
        // cannot orphan comments or likes.
        let mut tx = self.pool.begin().await?;

        let owned: Option<Uuid> = sqlx::query_scalar(
            "SELECT id FROM whispers WHERE id = $1 AND provider_account_id = $2 FOR UPDATE",
        )
        .bind(id)
        .bind(owner)
        .fetch_optional(&mut *tx)
        .await?;

        if owned.is_none() {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query("DELETE FROM whisper_comments WHERE whisper_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM whisper_likes WHERE whisper_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM whispers WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn toggle_like(
        &self,
        id: Uuid,
        provider_account_id: &str,
    ) -> Result<Option<LikeState>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM whispers WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            tx.rollback().await?;
            return Ok(None);
        }

        let already_liked: Option<i32> = sqlx::query_scalar(
            "SELECT 1 FROM whisper_likes WHERE whisper_id = $1 AND provider_account_id = $2",
        )
        .bind(id)
        .bind(provider_account_id)
        .fetch_optional(&mut *tx)
        .await?;

        let liked = if already_liked.is_some() {
            sqlx::query(
                "DELETE FROM whisper_likes WHERE whisper_id = $1 AND provider_account_id = $2",
            )
            .bind(id)
            .bind(provider_account_id)
            .execute(&mut *tx)
            .await?;
            false
        } else {
            // Conflict-ignore: a concurrent duplicate insert is a no-op,
            // never an error and never a second row.
            sqlx::query(
                r#"
                INSERT INTO whisper_likes (whisper_id, provider_account_id)
                VALUES ($1, $2)
                ON CONFLICT (whisper_id, provider_account_id) DO NOTHING
                "#,
            )
            .bind(id)
            .bind(provider_account_id)
            .execute(&mut *tx)
            .await?;
            true
        };

        // Always a fresh count of the underlying set, so the reported
        // number cannot drift from the rows.
        let likes: i64 =
            sqlx::query_scalar("SELECT COUNT(*)::bigint FROM whisper_likes WHERE whisper_id = $1")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;

        tx.commit().await?;
        Ok(Some(LikeState { liked, likes }))
    }

    async fn insert_comment(
        &self,
        whisper_id: Uuid,
        provider_account_id: &str,
        content: &str,
    ) -> Result<Option<WhisperCommentView>, sqlx::Error> {
        let result = sqlx::query_as::<_, WhisperCommentView>(
            r#"
            WITH inserted AS (
                INSERT INTO whisper_comments (whisper_id, provider_account_id, content)
                VALUES ($1, $2, $3)
                RETURNING id, whisper_id, provider_account_id, content, created_at
            )
            SELECT i.id, i.whisper_id, i.content, u.anonymous_username, i.created_at
            FROM inserted i
            LEFT JOIN users u ON u.provider_account_id = i.provider_account_id
            "#,
        )
        .bind(whisper_id)
        .bind(provider_account_id)
        .bind(content)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(comment) => Ok(Some(comment)),
            Err(err) if is_foreign_key_violation(&err) => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn increment_share(&self, whisper_id: Uuid) -> Result<Option<i32>, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            UPDATE whispers
            SET shares = shares + 1, updated_at = now()
            WHERE id = $1
            RETURNING shares
            "#,
        )
        .bind(whisper_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn wall_posts(
        &self,
        scope: WallScope,
        categories: &[WhisperCategory],
        viewer: &str,
        limit: i64,
    ) -> Result<Vec<WhisperView>, sqlx::Error> {
        let category_names: Vec<String> = categories
            .iter()
            .map(|c| c.as_str().to_string())
            .collect();

        sqlx::query_as::<_, WhisperView>(
            r#"
            SELECT w.id, w.organization_id, w.team_id, w.category, w.content, w.shares,
                   u.anonymous_username,
                   COALESCE(l.likes, 0) AS likes,
                   EXISTS (
                       SELECT 1 FROM whisper_likes ml
                       WHERE ml.whisper_id = w.id AND ml.provider_account_id = $2
                   ) AS liked_by_me,
                   (w.provider_account_id = $2) AS mine,
                   w.created_at, w.updated_at
            FROM whispers w
            LEFT JOIN users u ON u.provider_account_id = w.provider_account_id
            LEFT JOIN LATERAL (
                SELECT COUNT(*)::bigint AS likes
                FROM whisper_likes wl
                WHERE wl.whisper_id = w.id
            ) l ON TRUE
            WHERE w.organization_id = $1
              AND ($3::uuid IS NULL OR w.team_id = $3)
              AND (cardinality($4::text[]) = 0 OR w.category::text = ANY($4::text[]))
            ORDER BY w.created_at DESC
            LIMIT $5
            "#,
        )
        .bind(scope.organization_id)
        .bind(viewer)
        .bind(scope.team_id)
        .bind(category_names)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    async fn comments_for_whispers(
        &self,
        whisper_ids: &[Uuid],
    ) -> Result<Vec<WhisperCommentView>, sqlx::Error> {
        if whisper_ids.is_empty() {
            return Ok(Vec::new());
        }

        sqlx::query_as::<_, WhisperCommentView>(
            r#"
            SELECT c.id, c.whisper_id, c.content, u.anonymous_username, c.created_at
            FROM whisper_comments c
            LEFT JOIN users u ON u.provider_account_id = c.provider_account_id
            WHERE c.whisper_id = ANY($1)
            ORDER BY c.created_at ASC
            "#,
        )
        .bind(whisper_ids)
        .fetch_all(&self.pool)
        .await
    }

    async fn wall_stats(&self, scope: WallScope) -> Result<WallStats, sqlx::Error> {
        let (total_posts, total_shares): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*)::bigint, COALESCE(SUM(shares), 0)::bigint
            FROM whispers w
            WHERE w.organization_id = $1 AND ($2::uuid IS NULL OR w.team_id = $2)
            "#,
        )
        .bind(scope.organization_id)
        .bind(scope.team_id)
        .fetch_one(&self.pool)
        .await?;

        let total_likes: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)::bigint
            FROM whisper_likes wl
            JOIN whispers w ON w.id = wl.whisper_id
            WHERE w.organization_id = $1 AND ($2::uuid IS NULL OR w.team_id = $2)
            "#,
        )
        .bind(scope.organization_id)
        .bind(scope.team_id)
        .fetch_one(&self.pool)
        .await?;

        let total_comments: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)::bigint
            FROM whisper_comments wc
            JOIN whispers w ON w.id = wc.whisper_id
            WHERE w.organization_id = $1 AND ($2::uuid IS NULL OR w.team_id = $2)
            "#,
        )
        .bind(scope.organization_id)
        .bind(scope.team_id)
        .fetch_one(&self.pool)
        .await?;

        let per_category: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT w.category::text, COUNT(*)::bigint
            FROM whispers w
            WHERE w.organization_id = $1 AND ($2::uuid IS NULL OR w.team_id = $2)
            GROUP BY w.category
            "#,
        )
        .bind(scope.organization_id)
        .bind(scope.team_id)
        .fetch_all(&self.pool)
        .await?;

        let mut category_counts = CategoryCounts::default();
        for (category, count) in per_category {
            category_counts.add(WhisperCategory::parse(&category), count);
        }

        Ok(WallStats {
            total_posts,
            total_likes,
            total_comments,
            total_shares,
            category_counts,
        })
    }

    async fn recent_participants(
        &self,
        scope: WallScope,
        cap: i64,
    ) -> Result<Vec<Participant>, sqlx::Error> {
        sqlx::query_as::<_, Participant>(
            r#"
            SELECT u.anonymous_username, MAX(a.activity_at) AS last_active_at
            FROM (
                SELECT w.provider_account_id, w.created_at AS activity_at
                FROM whispers w
                WHERE w.organization_id = $1 AND ($2::uuid IS NULL OR w.team_id = $2)
                UNION ALL
                SELECT c.provider_account_id, c.created_at AS activity_at
                FROM whisper_comments c
                JOIN whispers w ON w.id = c.whisper_id
                WHERE w.organization_id = $1 AND ($2::uuid IS NULL OR w.team_id = $2)
            ) a
            LEFT JOIN users u ON u.provider_account_id = a.provider_account_id
            GROUP BY a.provider_account_id, u.anonymous_username
            ORDER BY MAX(a.activity_at) DESC
            LIMIT $3
            "#,
        )
        .bind(scope.organization_id)
        .bind(scope.team_id)
        .bind(cap)
        .fetch_all(&self.pool)
        .await
    }
}
