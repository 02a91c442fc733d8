use sqlx::PgPool;
use tokio::sync::OnceCell;
use tracing::info;

static SCHEMA_READY: OnceCell<()> = OnceCell::const_new();

// Each statement is idempotent so the whole list can be replayed safely.
const DDL: &[&str] = &[
    r#"
    DO $$ BEGIN
        CREATE TYPE user_role AS ENUM ('admin', 'member', 'guest');
    EXCEPTION WHEN duplicate_object THEN NULL;
    END $$
    "#,
    r#"
    DO $$ BEGIN
        CREATE TYPE whisper_category AS ENUM ('general', 'praise', 'concern', 'idea', 'fun');
    EXCEPTION WHEN duplicate_object THEN NULL;
    END $$
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS users (
        provider_account_id TEXT PRIMARY KEY,
        email               TEXT,
        name                TEXT,
        image               TEXT,
        anonymous_id        UUID NOT NULL DEFAULT gen_random_uuid(),
        anonymous_username  TEXT,
        role                user_role NOT NULL DEFAULT 'member',
        blocked             BOOLEAN NOT NULL DEFAULT FALSE,
        created_at          TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at          TIMESTAMPTZ NOT NULL DEFAULT now(),
        CONSTRAINT users_anonymous_username_key UNIQUE (anonymous_username)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS organizations (
        id         UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        name       TEXT NOT NULL UNIQUE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS teams (
        id              UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        organization_id UUID NOT NULL REFERENCES organizations(id),
        name            TEXT NOT NULL,
        created_by      TEXT REFERENCES users(provider_account_id),
        created_at      TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    // Uniqueness is case-insensitive per organization; the insert race
    // loser falls back to reading the winner's row.
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS teams_org_lower_name_key
        ON teams (organization_id, lower(name))
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS checkins (
        id                  UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        provider_account_id TEXT NOT NULL REFERENCES users(provider_account_id),
        team_id             UUID REFERENCES teams(id),
        mood                SMALLINT NOT NULL CHECK (mood BETWEEN 1 AND 5),
        note                TEXT,
        created_at          TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS checkins_account_created_idx
        ON checkins (provider_account_id, created_at DESC)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS checkin_comments (
        id                  UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        checkin_id          UUID NOT NULL REFERENCES checkins(id) ON DELETE CASCADE,
        provider_account_id TEXT NOT NULL REFERENCES users(provider_account_id),
        content             TEXT NOT NULL,
        created_at          TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS whispers (
        id                  UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        provider_account_id TEXT NOT NULL REFERENCES users(provider_account_id),
        organization_id     UUID NOT NULL REFERENCES organizations(id),
        team_id             UUID REFERENCES teams(id),
        category            whisper_category NOT NULL DEFAULT 'general',
        content             TEXT NOT NULL,
        shares              INTEGER NOT NULL DEFAULT 0 CHECK (shares >= 0),
        created_at          TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at          TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS whispers_org_created_idx
        ON whispers (organization_id, created_at DESC)
    "#,
    // Presence of a row is the sole source of truth for "liked"; the
    // composite key keeps it a set, never a counter.
    r#"
    CREATE TABLE IF NOT EXISTS whisper_likes (
        whisper_id          UUID NOT NULL REFERENCES whispers(id) ON DELETE CASCADE,
        provider_account_id TEXT NOT NULL REFERENCES users(provider_account_id),
        created_at          TIMESTAMPTZ NOT NULL DEFAULT now(),
        PRIMARY KEY (whisper_id, provider_account_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS whisper_comments (
        id                  UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        whisper_id          UUID NOT NULL REFERENCES whispers(id) ON DELETE CASCADE,
        provider_account_id TEXT NOT NULL REFERENCES users(provider_account_id),
        content             TEXT NOT NULL,
        created_at          TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS user_selections (
        provider_account_id TEXT PRIMARY KEY REFERENCES users(provider_account_id),
        organization_id     UUID REFERENCES organizations(id),
        team_id             UUID REFERENCES teams(id),
        updated_at          TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
];

/// Idempotent schema migration, latched so repeated calls within one
/// process are no-ops. Run from `main` before the listener binds.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    SCHEMA_READY
        .get_or_try_init(|| async {
            for statement in DDL {
                sqlx::query(statement).execute(pool).await?;
            }
            info!("database schema ensured");
            Ok::<(), sqlx::Error>(())
        })
        .await
        .map(|_| ())
}
