pub mod auth;
pub mod checkins;
pub mod dashboard;
pub mod preferences;
pub mod teams;
pub mod whispers;

use crate::error::AppError;
use crate::models::user::PublicIdentity;
use crate::state::AppState;

/// Resolves the authenticated caller to their pseudonymous identity. A
/// session whose account no longer exists is treated as unauthenticated.
pub(crate) async fn require_identity(
    state: &AppState,
    provider_account_id: &str,
) -> Result<PublicIdentity, AppError> {
    state
        .identity
        .get_user_record(provider_account_id)
        .await?
        .ok_or(AppError::AuthenticationRequired)
}

/// Like [`require_identity`], but refuses blocked accounts. Used by every
/// endpoint that accepts user-authored content.
pub(crate) async fn require_contributor(
    state: &AppState,
    provider_account_id: &str,
) -> Result<PublicIdentity, AppError> {
    let identity = require_identity(state, provider_account_id).await?;
    if identity.blocked {
        return Err(AppError::Blocked);
    }
    Ok(identity)
}
