use async_trait::async_trait;
use sqlx::PgPool;

use crate::db::identity_repository::{
    ClaimUsernameOutcome, IdentityRepository, InsertUserOutcome, NewUser,
};
use crate::models::user::{User, UserRole};

pub struct PostgresIdentityRepository {
    pub pool: PgPool,
}

fn is_username_conflict(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            db.is_unique_violation() && db.constraint() == Some("users_anonymous_username_key")
        }
        _ => false,
    }
}

#[async_trait]
impl IdentityRepository for PostgresIdentityRepository {
    async fn find_user(&self, provider_account_id: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT provider_account_id, email, name, image, anonymous_id,
                   anonymous_username, role, blocked, created_at, updated_at
            FROM users
            WHERE provider_account_id = $1
            "#,
        )
        .bind(provider_account_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn insert_user(&self, new: NewUser<'_>) -> Result<InsertUserOutcome, sqlx::Error> {
        let result = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (
                provider_account_id, email, name, image,
                anonymous_id, anonymous_username, role
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (provider_account_id) DO NOTHING
            RETURNING provider_account_id, email, name, image, anonymous_id,
                      anonymous_username, role, blocked, created_at, updated_at
            "#,
        )
        .bind(new.provider_account_id)
        .bind(new.email)
        .bind(new.name)
        .bind(new.image)
        .bind(new.anonymous_id)
        .bind(new.anonymous_username)
        .bind(new.role)
        .fetch_optional(&self.pool)
        .await;

        match result {
            Ok(Some(user)) => Ok(InsertUserOutcome::Created(user)),
            Ok(None) => Ok(InsertUserOutcome::AccountExists),
            Err(err) if is_username_conflict(&err) => Ok(InsertUserOutcome::UsernameTaken),
            Err(err) => Err(err),
        }
    }

    async fn refresh_profile(
        &self,
        provider_account_id: &str,
        email: Option<&str>,
        name: Option<&str>,
        image: Option<&str>,
        role: UserRole,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET email = $2, name = $3, image = $4, role = $5, updated_at = now()
            WHERE provider_account_id = $1
            RETURNING provider_account_id, email, name, image, anonymous_id,
                      anonymous_username, role, blocked, created_at, updated_at
            "#,
        )
        .bind(provider_account_id)
        .bind(email)
        .bind(name)
        .bind(image)
        .bind(role)
        .fetch_optional(&self.pool)
        .await
    }

    async fn claim_username(
        &self,
        provider_account_id: &str,
        candidate: &str,
    ) -> Result<ClaimUsernameOutcome, sqlx::Error> {
        let result = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET anonymous_username = $2, updated_at = now()
            WHERE provider_account_id = $1 AND anonymous_username IS NULL
            RETURNING provider_account_id, email, name, image, anonymous_id,
                      anonymous_username, role, blocked, created_at, updated_at
            "#,
        )
        .bind(provider_account_id)
        .bind(candidate)
        .fetch_optional(&self.pool)
        .await;

        match result {
            Ok(Some(user)) => Ok(ClaimUsernameOutcome::Claimed(user)),
            Ok(None) => Ok(ClaimUsernameOutcome::AlreadySettled),
            Err(err) if is_username_conflict(&err) => Ok(ClaimUsernameOutcome::UsernameTaken),
            Err(err) => Err(err),
        }
    }

    async fn duplicated_usernames(&self) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT anonymous_username
            FROM users
            WHERE anonymous_username IS NOT NULL
            GROUP BY anonymous_username
            HAVING COUNT(*) > 1
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn clear_duplicate_username(&self, username: &str) -> Result<Vec<String>, sqlx::Error> {
        // The oldest holder keeps the pseudonym; everyone else is cleared
        // and regenerated by the caller.
        sqlx::query_scalar(
            r#"
            UPDATE users
            SET anonymous_username = NULL, updated_at = now()
            WHERE anonymous_username = $1
              AND provider_account_id <> (
                  SELECT provider_account_id
                  FROM users
                  WHERE anonymous_username = $1
                  ORDER BY created_at ASC, provider_account_id ASC
                  LIMIT 1
              )
            RETURNING provider_account_id
            "#,
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await
    }
}
