use async_trait::async_trait;
use uuid::Uuid;

use crate::models::directory::{Organization, Team};

#[async_trait]
pub trait DirectoryRepository: Send + Sync {
    async fn list_organizations(&self) -> Result<Vec<Organization>, sqlx::Error>;

    async fn find_organization(&self, id: Uuid) -> Result<Option<Organization>, sqlx::Error>;

    async fn find_organization_by_name(
        &self,
        name: &str,
    ) -> Result<Option<Organization>, sqlx::Error>;

    /// Find-or-create; a loser of the insert race reads the winner's row.
    async fn ensure_organization(&self, name: &str) -> Result<Organization, sqlx::Error>;

    async fn list_teams(&self, organization_id: Uuid) -> Result<Vec<Team>, sqlx::Error>;

    async fn find_team(&self, id: Uuid) -> Result<Option<Team>, sqlx::Error>;

    /// Case-insensitive lookup within one organization.
    async fn find_team_by_name(
        &self,
        organization_id: Uuid,
        name: &str,
    ) -> Result<Option<Team>, sqlx::Error>;

    /// Conflict-ignoring insert; `None` means another writer created the
    /// team first and the caller should re-read.
    async fn insert_team(
        &self,
        organization_id: Uuid,
        name: &str,
        created_by: Option<&str>,
    ) -> Result<Option<Team>, sqlx::Error>;
}
