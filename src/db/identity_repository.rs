use async_trait::async_trait;
use uuid::Uuid;

use crate::models::user::{User, UserRole};

/// Outcome of a first-login insert that also allocates a pseudonym.
#[derive(Debug)]
pub enum InsertUserOutcome {
    Created(User),
    /// The generated pseudonym lost a uniqueness race; retry with a fresh
    /// candidate.
    UsernameTaken,
    /// The account row already exists: a concurrent login won the insert.
    AccountExists,
}

/// Outcome of backfilling a missing pseudonym onto an existing row.
#[derive(Debug)]
pub enum ClaimUsernameOutcome {
    Claimed(User),
    UsernameTaken,
    /// Another writer settled the row first (or it vanished); re-read.
    AlreadySettled,
}

pub struct NewUser<'a> {
    pub provider_account_id: &'a str,
    pub email: Option<&'a str>,
    pub name: Option<&'a str>,
    pub image: Option<&'a str>,
    pub role: UserRole,
    pub anonymous_id: Uuid,
    pub anonymous_username: &'a str,
}

#[async_trait]
pub trait IdentityRepository: Send + Sync {
    async fn find_user(&self, provider_account_id: &str) -> Result<Option<User>, sqlx::Error>;

    async fn insert_user(&self, new: NewUser<'_>) -> Result<InsertUserOutcome, sqlx::Error>;

    /// Refreshes the mutable display fields and the per-login role. Never
    /// touches the pseudonym pair.
    async fn refresh_profile(
        &self,
        provider_account_id: &str,
        email: Option<&str>,
        name: Option<&str>,
        image: Option<&str>,
        role: UserRole,
    ) -> Result<Option<User>, sqlx::Error>;

    /// Assigns `candidate` to the row only if its pseudonym is still NULL.
    async fn claim_username(
        &self,
        provider_account_id: &str,
        candidate: &str,
    ) -> Result<ClaimUsernameOutcome, sqlx::Error>;

    /// Pseudonyms held by more than one account (possible after a data
    /// migration; never produced by this resolver).
    async fn duplicated_usernames(&self) -> Result<Vec<String>, sqlx::Error>;

    /// Clears `username` from every holder except the oldest; returns the
    /// account ids that were cleared and now need a fresh pseudonym.
    async fn clear_duplicate_username(&self, username: &str) -> Result<Vec<String>, sqlx::Error>;
}
