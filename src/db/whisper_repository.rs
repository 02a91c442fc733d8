use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::models::whisper::{
    Participant, WallStats, Whisper, WhisperCategory, WhisperCommentView, WhisperView,
};

pub struct NewWhisper<'a> {
    pub provider_account_id: &'a str,
    pub organization_id: Uuid,
    pub team_id: Option<Uuid>,
    pub category: WhisperCategory,
    pub content: &'a str,
}

/// Partial update: a `None` field keeps the stored value.
pub struct WhisperUpdate<'a> {
    pub content: Option<&'a str>,
    pub category: Option<WhisperCategory>,
}

/// The organization (and optional team) filter every wall read shares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WallScope {
    pub organization_id: Uuid,
    pub team_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct LikeState {
    pub liked: bool,
    pub likes: i64,
}

#[async_trait]
pub trait WhisperRepository: Send + Sync {
    async fn insert_whisper(&self, new: NewWhisper<'_>) -> Result<Whisper, sqlx::Error>;

    async fn find_whisper(&self, id: Uuid) -> Result<Option<Whisper>, sqlx::Error>;

    /// One whisper shaped for display from `viewer`'s perspective.
    async fn view_whisper(
        &self,
        id: Uuid,
        viewer: &str,
    ) -> Result<Option<WhisperView>, sqlx::Error>;

    /// `None` when no row matches both the id and the owner; callers must
    /// not learn which condition failed.
    async fn update_whisper(
        &self,
        id: Uuid,
        owner: &str,
        update: WhisperUpdate<'_>,
    ) -> Result<Option<Whisper>, sqlx::Error>;

    /// Cascades comments, then likes, then the post, inside one
    /// transaction. `false` means nothing matched the id+owner pair.
    async fn delete_whisper(&self, id: Uuid, owner: &str) -> Result<bool, sqlx::Error>;

    /// Flips like presence for `(id, account)`. The returned count is a
    /// fresh row count, never an incremented cache. `None` when the
    /// whisper does not exist.
    async fn toggle_like(
        &self,
        id: Uuid,
        provider_account_id: &str,
    ) -> Result<Option<LikeState>, sqlx::Error>;

    async fn insert_comment(
        &self,
        whisper_id: Uuid,
        provider_account_id: &str,
        content: &str,
    ) -> Result<Option<WhisperCommentView>, sqlx::Error>;

    /// Monotonic counter, no uniqueness: sharing is a broadcast action,
    /// not a toggle.
    async fn increment_share(&self, whisper_id: Uuid) -> Result<Option<i32>, sqlx::Error>;

    /// Scoped posts, newest first. An empty `categories` slice means all
    /// categories.
    async fn wall_posts(
        &self,
        scope: WallScope,
        categories: &[WhisperCategory],
        viewer: &str,
        limit: i64,
    ) -> Result<Vec<WhisperView>, sqlx::Error>;

    /// Comments for the given posts, oldest first.
    async fn comments_for_whispers(
        &self,
        whisper_ids: &[Uuid],
    ) -> Result<Vec<WhisperCommentView>, sqlx::Error>;

    /// Whole-wall aggregates for the scope; never filtered by category.
    async fn wall_stats(&self, scope: WallScope) -> Result<WallStats, sqlx::Error>;

    /// Most recently active authors/commenters on the scoped wall.
    async fn recent_participants(
        &self,
        scope: WallScope,
        cap: i64,
    ) -> Result<Vec<Participant>, sqlx::Error>;
}
