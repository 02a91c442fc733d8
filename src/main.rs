use std::sync::Arc;

use anyhow::Context;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::{
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use sqlx::PgPool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

use squadpulse_backend::config::Config;
use squadpulse_backend::db::postgres_checkin_repository::PostgresCheckinRepository;
use squadpulse_backend::db::postgres_directory_repository::PostgresDirectoryRepository;
use squadpulse_backend::db::postgres_identity_repository::PostgresIdentityRepository;
use squadpulse_backend::db::postgres_preference_repository::PostgresPreferenceRepository;
use squadpulse_backend::db::postgres_whisper_repository::PostgresWhisperRepository;
use squadpulse_backend::db::schema::ensure_schema;
use squadpulse_backend::responses::JsonResponse;
use squadpulse_backend::routes::{
    auth::{handle_logout, handle_me, handle_session_login},
    checkins::{create_checkin, create_checkin_comment, list_checkin_comments, list_checkins},
    dashboard::get_dashboard,
    preferences::{get_preferences, update_preferences},
    teams::{create_team, find_or_create_team, list_teams},
    whispers::{
        create_whisper, create_whisper_comment, delete_whisper, get_whisper_wall, report_whisper,
        share_whisper, toggle_whisper_like, update_whisper,
    },
};
use squadpulse_backend::services::identity::IdentityService;
use squadpulse_backend::utils::jwt::JwtKeys;
use squadpulse_backend::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Arc::new(Config::from_env());
    let jwt_keys = Arc::new(JwtKeys::from_env().context("invalid JWT configuration")?);

    let pg_pool = establish_connection(&config.database_url).await?;
    ensure_schema(&pg_pool)
        .await
        .context("failed to ensure database schema")?;

    let identity = Arc::new(IdentityService::new(
        Arc::new(PostgresIdentityRepository {
            pool: pg_pool.clone(),
        }),
        &config,
    ));

    let state = AppState {
        identity: Arc::clone(&identity),
        directory: Arc::new(PostgresDirectoryRepository {
            pool: pg_pool.clone(),
        }),
        checkins: Arc::new(PostgresCheckinRepository {
            pool: pg_pool.clone(),
        }),
        whispers: Arc::new(PostgresWhisperRepository {
            pool: pg_pool.clone(),
        }),
        preferences: Arc::new(PostgresPreferenceRepository { pool: pg_pool }),
        config: Arc::clone(&config),
        jwt_keys,
    };

    seed_default_tenancy(&state)
        .await
        .context("failed to seed the default organization and team")?;
    identity
        .repair_duplicate_pseudonyms()
        .await
        .map_err(|err| anyhow::anyhow!("pseudonym repair pass failed: {err}"))?;

    let cors = CorsLayer::new()
        .allow_origin(
            config
                .frontend_origin
                .parse::<HeaderValue>()
                .context("FRONTEND_ORIGIN is not a valid header value")?,
        )
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(true);

    let auth_routes = Router::new()
        .route("/session", post(handle_session_login))
        .route("/logout", post(handle_logout))
        .route("/me", get(handle_me));

    let checkin_routes = Router::new()
        .route("/", post(create_checkin).get(list_checkins))
        .route(
            "/{checkin_id}/comments",
            post(create_checkin_comment).get(list_checkin_comments),
        );

    let team_routes = Router::new().route("/", post(create_team).get(list_teams));

    let whisper_routes = Router::new()
        .route("/", get(get_whisper_wall).post(create_whisper))
        .route(
            "/{whisper_id}",
            put(update_whisper).delete(delete_whisper),
        )
        .route("/{whisper_id}/like", post(toggle_whisper_like))
        .route("/{whisper_id}/comments", post(create_whisper_comment))
        .route("/{whisper_id}/share", post(share_whisper))
        .route("/{whisper_id}/report", post(report_whisper));

    let preference_routes =
        Router::new().route("/", get(get_preferences).post(update_preferences));

    let app = Router::new()
        .route("/", get(root))
        .nest("/api/auth", auth_routes)
        .nest("/api/checkins", checkin_routes)
        .nest("/api/teams", team_routes)
        .nest("/api/whispers", whisper_routes)
        .nest("/api/preferences", preference_routes)
        .route("/api/dashboard", get(get_dashboard))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!("SquadPulse backend listening on http://{}", config.bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}

/// A simple root route.
async fn root() -> Response {
    JsonResponse::success("Hello, SquadPulse!").into_response()
}

/// Establish a connection to the database and verify it.
async fn establish_connection(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPool::connect(database_url)
        .await
        .context("failed to connect to the database")?;

    sqlx::query("SELECT 1")
        .execute(&pool)
        .await
        .context("failed to verify database connection")?;

    info!("successfully connected to the database");
    Ok(pool)
}

/// The system is usable with zero configuration: a default organization
/// and team always exist.
async fn seed_default_tenancy(state: &AppState) -> anyhow::Result<()> {
    let organization = state
        .directory
        .ensure_organization(&state.config.default_organization)
        .await?;
    find_or_create_team(state, organization.id, &state.config.default_team, None)
        .await
        .map_err(|err| anyhow::anyhow!("default team seeding failed: {err}"))?;
    Ok(())
}
