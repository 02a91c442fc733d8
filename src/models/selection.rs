use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// The caller's last-selected organization/team pair. Restores dashboard
/// context only; never authoritative for any business rule.
#[derive(Debug, FromRow, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserSelection {
    pub organization_id: Option<Uuid>,
    pub team_id: Option<Uuid>,
}
