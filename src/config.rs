use std::env;

/// Runtime configuration, sourced from the environment once at startup.
pub struct Config {
    pub database_url: String,
    pub frontend_origin: String,
    pub bind_addr: String,
    pub session_ttl_hours: i64,
    pub auth_cookie_secure: bool,
    /// Emails or domains granted the admin role at login.
    pub admin_allowlist: Vec<String>,
    /// Emails or domains restricted to the guest role at login.
    pub guest_allowlist: Vec<String>,
    pub default_organization: String,
    pub default_team: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
}

fn allowlist_from_env(var: &str) -> Vec<String> {
    env::var(var)
        .unwrap_or_default()
        .split(',')
        .map(|entry| entry.trim().to_ascii_lowercase())
        .filter(|entry| !entry.is_empty())
        .collect()
}

impl Config {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let frontend_origin = env::var("FRONTEND_ORIGIN").expect("FRONTEND_ORIGIN must be set");

        Config {
            database_url,
            frontend_origin,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".to_string()),
            session_ttl_hours: env::var("SESSION_TTL_HOURS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(24 * 7),
            auth_cookie_secure: env::var("AUTH_COOKIE_SECURE")
                .map(|v| v != "false")
                .unwrap_or(true),
            admin_allowlist: allowlist_from_env("ADMIN_ALLOWLIST"),
            guest_allowlist: allowlist_from_env("GUEST_ALLOWLIST"),
            default_organization: env::var("DEFAULT_ORGANIZATION")
                .unwrap_or_else(|_| "General".to_string()),
            default_team: env::var("DEFAULT_TEAM").unwrap_or_else(|_| "General".to_string()),
            jwt_issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "squadpulse".to_string()),
            jwt_audience: env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| "squadpulse-web".to_string()),
        }
    }
}
