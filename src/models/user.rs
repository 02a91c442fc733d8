use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role")] // Matches the Postgres enum name
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Member,
    Guest,
}

/// A user record keyed by the immutable external provider account id.
/// The pseudonym pair (`anonymous_id`, `anonymous_username`) is generated
/// once and shown everywhere instead of the provider identity.
#[derive(Debug, FromRow, Serialize, Deserialize, Clone)]
pub struct User {
    #[serde(skip_serializing)]
    pub provider_account_id: String,
    #[serde(skip_serializing)]
    pub email: Option<String>,
    #[serde(skip_serializing)]
    pub name: Option<String>,
    #[serde(skip_serializing)]
    pub image: Option<String>,
    pub anonymous_id: Uuid,
    // Nullable so partial legacy rows can exist until the resolver backfills them.
    pub anonymous_username: Option<String>,
    pub role: UserRole,
    pub blocked: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// The identity shape handed to the presentation layer.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PublicIdentity {
    pub anonymous_id: Uuid,
    pub anonymous_username: String,
    pub role: UserRole,
    pub blocked: bool,
}

impl User {
    /// The resolver backfills the pseudonym before returning a record, so
    /// the empty-string fallback is unreachable in practice.
    pub fn identity(&self) -> PublicIdentity {
        PublicIdentity {
            anonymous_id: self.anonymous_id,
            anonymous_username: self
                .anonymous_username
                .clone()
                .unwrap_or_default(),
            role: self.role,
            blocked: self.blocked,
        }
    }
}
