use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::preference_repository::PreferenceRepository;
use crate::models::selection::UserSelection;

pub struct PostgresPreferenceRepository {
    pub pool: PgPool,
}

#[async_trait]
impl PreferenceRepository for PostgresPreferenceRepository {
    async fn get_selection(
        &self,
        provider_account_id: &str,
    ) -> Result<Option<UserSelection>, sqlx::Error> {
        sqlx::query_as::<_, UserSelection>(
            "SELECT organization_id, team_id FROM user_selections WHERE provider_account_id = $1",
        )
        .bind(provider_account_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn upsert_selection(
        &self,
        provider_account_id: &str,
        organization_id: Option<Uuid>,
        team_id: Option<Uuid>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO user_selections (provider_account_id, organization_id, team_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (provider_account_id) DO UPDATE
            SET organization_id = EXCLUDED.organization_id,
                team_id = EXCLUDED.team_id,
                updated_at = now()
            "#,
        )
        .bind(provider_account_id)
        .bind(organization_id)
        .bind(team_id)
        .execute(&self.pool)
        .await
        .map(|_| ())
    }
}
