use std::sync::Arc;

use crate::config::Config;
use crate::db::checkin_repository::CheckinRepository;
use crate::db::directory_repository::DirectoryRepository;
use crate::db::preference_repository::PreferenceRepository;
use crate::db::whisper_repository::WhisperRepository;
use crate::services::identity::IdentityService;
use crate::utils::jwt::JwtKeys;

#[derive(Clone)]
pub struct AppState {
    pub identity: Arc<IdentityService>,
    pub directory: Arc<dyn DirectoryRepository>,
    pub checkins: Arc<dyn CheckinRepository>,
    pub whispers: Arc<dyn WhisperRepository>,
    pub preferences: Arc<dyn PreferenceRepository>,
    pub config: Arc<Config>,
    pub jwt_keys: Arc<JwtKeys>,
}

#[cfg(test)]
pub fn test_state(db: Arc<crate::db::mock_db::MockDb>) -> AppState {
    use crate::db::identity_repository::IdentityRepository;

    let config = Arc::new(Config {
        database_url: String::new(),
        frontend_origin: "http://localhost".into(),
        bind_addr: "127.0.0.1:0".into(),
        session_ttl_hours: 1,
        auth_cookie_secure: false,
        admin_allowlist: Vec::new(),
        guest_allowlist: Vec::new(),
        default_organization: "General".into(),
        default_team: "General".into(),
        jwt_issuer: "test-issuer".into(),
        jwt_audience: "test-audience".into(),
    });

    AppState {
        identity: Arc::new(IdentityService::new(
            Arc::clone(&db) as Arc<dyn IdentityRepository>,
            &config,
        )),
        directory: Arc::clone(&db) as _,
        checkins: Arc::clone(&db) as _,
        whispers: Arc::clone(&db) as _,
        preferences: db as _,
        config,
        jwt_keys: Arc::new(
            JwtKeys::from_secret("0123456789abcdef0123456789abcdef")
                .expect("test JWT secret should be valid"),
        ),
    }
}
