//! Identity Resolver: maps an external provider account onto a stable
//! pseudonymous identity and keeps the pseudonym space collision-free.

pub mod pseudonym;
pub mod retry;

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::db::identity_repository::{
    ClaimUsernameOutcome, IdentityRepository, InsertUserOutcome, NewUser,
};
use crate::error::AppError;
use crate::models::user::{PublicIdentity, User, UserRole};
use retry::{with_unique_retry, Attempt, RetryError};

/// Upper bound on pseudonym candidates tried per allocation. Hitting it
/// means the store is saturated with conflicts or the uniqueness invariant
/// is corrupted; the failure is loud, never a silent duplicate.
pub const MAX_PSEUDONYM_ATTEMPTS: usize = 16;

pub struct IdentityService {
    repo: Arc<dyn IdentityRepository>,
    admin_allowlist: Vec<String>,
    guest_allowlist: Vec<String>,
    repair_done: OnceCell<()>,
}

fn allowlist_matches(list: &[String], email: &str, domain: Option<&str>) -> bool {
    list.iter()
        .any(|entry| entry == email || domain.map_or(false, |domain| entry == domain))
}

impl IdentityService {
    pub fn new(repo: Arc<dyn IdentityRepository>, config: &Config) -> Self {
        IdentityService {
            repo,
            admin_allowlist: config.admin_allowlist.clone(),
            guest_allowlist: config.guest_allowlist.clone(),
            repair_done: OnceCell::new(),
        }
    }

    /// Recomputed on every login from the configured allow-lists; never
    /// sticky beyond the login that derived it.
    pub fn derive_role(&self, email: Option<&str>) -> UserRole {
        let Some(email) = email else {
            return UserRole::Member;
        };
        let email = email.trim().to_ascii_lowercase();
        let domain = email.split_once('@').map(|(_, domain)| domain);

        if allowlist_matches(&self.admin_allowlist, &email, domain) {
            UserRole::Admin
        } else if allowlist_matches(&self.guest_allowlist, &email, domain) {
            UserRole::Guest
        } else {
            UserRole::Member
        }
    }

    /// Idempotent upsert for a login event. Creates the record with a fresh
    /// pseudonym on first login; on later logins refreshes the mutable
    /// display fields and backfills a pseudonym if one is missing. An
    /// already-assigned pseudonym is never changed.
    pub async fn ensure_user_record(
        &self,
        provider_account_id: &str,
        email: Option<&str>,
        name: Option<&str>,
        image: Option<&str>,
        role_override: Option<UserRole>,
    ) -> Result<PublicIdentity, AppError> {
        let role = role_override.unwrap_or_else(|| self.derive_role(email));

        if let Some(existing) = self.repo.find_user(provider_account_id).await? {
            let refreshed = self
                .repo
                .refresh_profile(provider_account_id, email, name, image, role)
                .await?
                .unwrap_or(existing);
            let user = match refreshed.anonymous_username {
                Some(_) => refreshed,
                None => self.backfill_username(provider_account_id).await?,
            };
            return Ok(user.identity());
        }

        let anonymous_id = Uuid::new_v4();
        let repo = Arc::clone(&self.repo);
        let account = provider_account_id.to_string();
        let email_owned = email.map(str::to_string);
        let name_owned = name.map(str::to_string);
        let image_owned = image.map(str::to_string);

        let outcome = with_unique_retry(
            MAX_PSEUDONYM_ATTEMPTS,
            pseudonym::generate,
            move |candidate| {
                let repo = Arc::clone(&repo);
                let account = account.clone();
                let email = email_owned.clone();
                let name = name_owned.clone();
                let image = image_owned.clone();
                Box::pin(async move {
                    let outcome = repo
                        .insert_user(NewUser {
                            provider_account_id: &account,
                            email: email.as_deref(),
                            name: name.as_deref(),
                            image: image.as_deref(),
                            role,
                            anonymous_id,
                            anonymous_username: &candidate,
                        })
                        .await?;
                    Ok(match outcome {
                        InsertUserOutcome::Created(user) => Attempt::Done(user),
                        InsertUserOutcome::UsernameTaken => Attempt::Conflict,
                        InsertUserOutcome::AccountExists => Attempt::Abort,
                    })
                })
            },
        )
        .await;

        match outcome {
            Ok(Some(user)) => {
                info!(anonymous_id = %user.anonymous_id, "created user record");
                Ok(user.identity())
            }
            // A concurrent first login for the same account won the insert;
            // adopt its row instead of allocating a second pseudonym.
            Ok(None) => {
                let user = self
                    .repo
                    .find_user(provider_account_id)
                    .await?
                    .ok_or(AppError::NotFound)?;
                let user = match user.anonymous_username {
                    Some(_) => user,
                    None => self.backfill_username(provider_account_id).await?,
                };
                Ok(user.identity())
            }
            Err(RetryError::Exhausted(_)) => Err(AppError::ConflictExhausted),
            Err(RetryError::Store(err)) => Err(AppError::Store(err)),
        }
    }

    /// Read-only lookup, with the same defensive pseudonym backfill as the
    /// upsert path.
    pub async fn get_user_record(
        &self,
        provider_account_id: &str,
    ) -> Result<Option<PublicIdentity>, AppError> {
        match self.repo.find_user(provider_account_id).await? {
            None => Ok(None),
            Some(user) => {
                let user = match user.anonymous_username {
                    Some(_) => user,
                    None => self.backfill_username(provider_account_id).await?,
                };
                Ok(Some(user.identity()))
            }
        }
    }

    async fn backfill_username(&self, provider_account_id: &str) -> Result<User, AppError> {
        let repo = Arc::clone(&self.repo);
        let account = provider_account_id.to_string();

        let outcome = with_unique_retry(
            MAX_PSEUDONYM_ATTEMPTS,
            pseudonym::generate,
            move |candidate| {
                let repo = Arc::clone(&repo);
                let account = account.clone();
                Box::pin(async move {
                    Ok(match repo.claim_username(&account, &candidate).await? {
                        ClaimUsernameOutcome::Claimed(user) => Attempt::Done(user),
                        ClaimUsernameOutcome::UsernameTaken => Attempt::Conflict,
                        ClaimUsernameOutcome::AlreadySettled => Attempt::Abort,
                    })
                })
            },
        )
        .await;

        match outcome {
            Ok(Some(user)) => {
                info!(username = ?user.anonymous_username, "backfilled missing pseudonym");
                Ok(user)
            }
            // Another process settled the row first.
            Ok(None) => self
                .repo
                .find_user(provider_account_id)
                .await?
                .ok_or(AppError::NotFound),
            Err(RetryError::Exhausted(_)) => Err(AppError::ConflictExhausted),
            Err(RetryError::Store(err)) => Err(AppError::Store(err)),
        }
    }

    /// Idempotent repair for duplicate pseudonyms left behind by data
    /// migrations: every holder but the oldest is cleared and regenerated.
    /// Latched to run once per process lifetime.
    pub async fn repair_duplicate_pseudonyms(&self) -> Result<(), AppError> {
        self.repair_done
            .get_or_try_init(|| async {
                let duplicates = self.repo.duplicated_usernames().await?;
                for username in duplicates {
                    let cleared = self.repo.clear_duplicate_username(&username).await?;
                    warn!(%username, cleared = cleared.len(), "repairing duplicate pseudonyms");
                    for account in cleared {
                        self.backfill_username(&account).await?;
                    }
                }
                Ok::<(), AppError>(())
            })
            .await
            .map(|_| ())
    }
}
