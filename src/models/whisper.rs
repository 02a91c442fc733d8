use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "whisper_category")]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum WhisperCategory {
    General,
    Praise,
    Concern,
    Idea,
    Fun,
}

impl WhisperCategory {
    pub const ALL: [WhisperCategory; 5] = [
        WhisperCategory::General,
        WhisperCategory::Praise,
        WhisperCategory::Concern,
        WhisperCategory::Idea,
        WhisperCategory::Fun,
    ];

    /// Infallible: anything unrecognized coerces to `General`. Bad category
    /// input is never an error anywhere in the board.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "praise" => WhisperCategory::Praise,
            "concern" => WhisperCategory::Concern,
            "idea" => WhisperCategory::Idea,
            "fun" => WhisperCategory::Fun,
            _ => WhisperCategory::General,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WhisperCategory::General => "general",
            WhisperCategory::Praise => "praise",
            WhisperCategory::Concern => "concern",
            WhisperCategory::Idea => "idea",
            WhisperCategory::Fun => "fun",
        }
    }
}

#[derive(Debug, FromRow, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Whisper {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub provider_account_id: String,
    pub organization_id: Uuid,
    pub team_id: Option<Uuid>,
    pub category: WhisperCategory,
    pub content: String,
    pub shares: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// A whisper as rendered on the wall: author resolved to a pseudonym and
/// viewer-relative flags computed in the select.
#[derive(Debug, FromRow, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct WhisperView {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub team_id: Option<Uuid>,
    pub category: WhisperCategory,
    pub content: String,
    pub shares: i32,
    pub anonymous_username: Option<String>,
    pub likes: i64,
    pub liked_by_me: bool,
    pub mine: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, FromRow, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct WhisperCommentView {
    pub id: Uuid,
    pub whisper_id: Uuid,
    pub content: String,
    pub anonymous_username: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Category breakdown with every category present, zero or not, so
/// dashboards never special-case missing keys.
#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CategoryCounts {
    pub general: i64,
    pub praise: i64,
    pub concern: i64,
    pub idea: i64,
    pub fun: i64,
}

impl CategoryCounts {
    pub fn add(&mut self, category: WhisperCategory, count: i64) {
        match category {
            WhisperCategory::General => self.general += count,
            WhisperCategory::Praise => self.praise += count,
            WhisperCategory::Concern => self.concern += count,
            WhisperCategory::Idea => self.idea += count,
            WhisperCategory::Fun => self.fun += count,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WallStats {
    pub total_posts: i64,
    pub total_likes: i64,
    pub total_comments: i64,
    pub total_shares: i64,
    pub category_counts: CategoryCounts,
}

/// A recently active author or commenter on the scoped wall.
#[derive(Debug, FromRow, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub anonymous_username: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub last_active_at: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_all_valid_categories() {
        assert_eq!(WhisperCategory::parse("praise"), WhisperCategory::Praise);
        assert_eq!(WhisperCategory::parse("Concern"), WhisperCategory::Concern);
        assert_eq!(WhisperCategory::parse(" idea "), WhisperCategory::Idea);
        assert_eq!(WhisperCategory::parse("FUN"), WhisperCategory::Fun);
        assert_eq!(WhisperCategory::parse("general"), WhisperCategory::General);
    }

    #[test]
    fn parse_coerces_anything_else_to_general() {
        assert_eq!(WhisperCategory::parse("not-a-category"), WhisperCategory::General);
        assert_eq!(WhisperCategory::parse(""), WhisperCategory::General);
        assert_eq!(WhisperCategory::parse("praise!"), WhisperCategory::General);
    }

    #[test]
    fn category_counts_serialize_all_five_keys_when_zero() {
        let json = serde_json::to_value(CategoryCounts::default()).unwrap();
        for key in ["general", "praise", "concern", "idea", "fun"] {
            assert_eq!(json[key], 0, "missing category key {key}");
        }
    }
}
