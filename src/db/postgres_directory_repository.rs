use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::directory_repository::DirectoryRepository;
use crate::models::directory::{Organization, Team};

pub struct PostgresDirectoryRepository {
    pub pool: PgPool,
}

#[async_trait]
impl DirectoryRepository for PostgresDirectoryRepository {
    async fn list_organizations(&self) -> Result<Vec<Organization>, sqlx::Error> {
        sqlx::query_as::<_, Organization>(
            "SELECT id, name, created_at FROM organizations ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn find_organization(&self, id: Uuid) -> Result<Option<Organization>, sqlx::Error> {
        sqlx::query_as::<_, Organization>(
            "SELECT id, name, created_at FROM organizations WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn find_organization_by_name(
        &self,
        name: &str,
    ) -> Result<Option<Organization>, sqlx::Error> {
        sqlx::query_as::<_, Organization>(
            "SELECT id, name, created_at FROM organizations WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
    }

    async fn ensure_organization(&self, name: &str) -> Result<Organization, sqlx::Error> {
        if let Some(org) = self.find_organization_by_name(name).await? {
            return Ok(org);
        }

        let inserted = sqlx::query_as::<_, Organization>(
            r#"
            INSERT INTO organizations (name)
            VALUES ($1)
            ON CONFLICT (name) DO NOTHING
            RETURNING id, name, created_at
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        match inserted {
            Some(org) => Ok(org),
            // Lost the insert race; the winner's row must be there now.
            None => self
                .find_organization_by_name(name)
                .await?
                .ok_or(sqlx::Error::RowNotFound),
        }
    }

    async fn list_teams(&self, organization_id: Uuid) -> Result<Vec<Team>, sqlx::Error> {
        sqlx::query_as::<_, Team>(
            r#"
            SELECT id, organization_id, name, created_by, created_at
            FROM teams
            WHERE organization_id = $1
            ORDER BY name ASC
            "#,
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn find_team(&self, id: Uuid) -> Result<Option<Team>, sqlx::Error> {
        sqlx::query_as::<_, Team>(
            r#"
            SELECT id, organization_id, name, created_by, created_at
            FROM teams
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn find_team_by_name(
        &self,
        organization_id: Uuid,
        name: &str,
    ) -> Result<Option<Team>, sqlx::Error> {
        sqlx::query_as::<_, Team>(
            r#"
            SELECT id, organization_id, name, created_by, created_at
            FROM teams
            WHERE organization_id = $1 AND lower(name) = lower($2)
            "#,
        )
        .bind(organization_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
    }

    async fn insert_team(
        &self,
        organization_id: Uuid,
        name: &str,
        created_by: Option<&str>,
    ) -> Result<Option<Team>, sqlx::Error> {
        sqlx::query_as::<_, Team>(
            r#"
            INSERT INTO teams (organization_id, name, created_by)
            VALUES ($1, $2, $3)
            ON CONFLICT (organization_id, lower(name)) DO NOTHING
            RETURNING id, organization_id, name, created_by, created_at
            "#,
        )
        .bind(organization_id)
        .bind(name)
        .bind(created_by)
        .fetch_optional(&self.pool)
        .await
    }
}
