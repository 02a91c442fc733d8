use async_trait::async_trait;
use uuid::Uuid;

use crate::models::selection::UserSelection;

#[async_trait]
pub trait PreferenceRepository: Send + Sync {
    async fn get_selection(
        &self,
        provider_account_id: &str,
    ) -> Result<Option<UserSelection>, sqlx::Error>;

    async fn upsert_selection(
        &self,
        provider_account_id: &str,
        organization_id: Option<Uuid>,
        team_id: Option<Uuid>,
    ) -> Result<(), sqlx::Error>;
}
