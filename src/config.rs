use std::env;

const LOCAL_JWT_SECRET: &str = "super-secure-test-secret-value-local";
const DEFAULT_TOKEN_TTL_SECS: u64 = 60 * 60 * 24;
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:4000";
const DEFAULT_CORS_ORIGIN: &str = "http://localhost:5173";

/// AppConfig
///
/// Holds the application's entire configuration state. Immutable once loaded and pulled into
/// handlers and extractors through `FromRef`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Postgres connection string. `None` is only allowed locally and selects the in-process store.
    pub db_url: Option<String>,
    // Runtime environment marker. Controls the dev auth bypass and log format.
    pub env: Env,
    // HS256 key used to sign and validate session tokens.
    pub jwt_secret: String,
    // Lifetime of issued tokens.
    pub token_ttl_secs: u64,
    // Socket address the HTTP server binds to.
    pub bind_addr: String,
    // Browser origin allowed by CORS (credentials enabled).
    pub cors_origin: String,
}

/// Env
///
/// Runtime context. `Local` enables development conveniences; `Production` demands every secret.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// Safe, non-panicking values for test state scaffolding.
    fn default() -> Self {
        Self {
            db_url: None,
            env: Env::Local,
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            token_ttl_secs: DEFAULT_TOKEN_TTL_SECS,
            bind_addr: "127.0.0.1:0".to_string(),
            cors_origin: DEFAULT_CORS_ORIGIN.to_string(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables at startup (fail-fast).
    ///
    /// # Panics
    /// Panics in `Production` when `DATABASE_URL` or `JWT_SECRET` is missing, or in any
    /// environment when `TOKEN_TTL_SECS` is set but not a positive integer.
    pub fn load() -> Self {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let (db_url, jwt_secret) = match env {
            Env::Production => (
                Some(env::var("DATABASE_URL").expect("FATAL: DATABASE_URL required in prod")),
                env::var("JWT_SECRET").expect("FATAL: JWT_SECRET must be set in production."),
            ),
            Env::Local => (
                env::var("DATABASE_URL").ok(),
                env::var("JWT_SECRET").unwrap_or_else(|_| LOCAL_JWT_SECRET.to_string()),
            ),
        };

        let token_ttl_secs = match env::var("TOKEN_TTL_SECS") {
            Ok(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|ttl| *ttl > 0)
                .expect("FATAL: TOKEN_TTL_SECS must be a positive integer"),
            Err(_) => DEFAULT_TOKEN_TTL_SECS,
        };

        Self {
            db_url,
            env,
            jwt_secret,
            token_ttl_secs,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
            cors_origin: env::var("CORS_ORIGIN")
                .unwrap_or_else(|_| DEFAULT_CORS_ORIGIN.to_string()),
        }
    }

    /// True when the `x-user-id` bypass is live against a real database, which usually means
    /// `APP_ENV` was left unset or misspelled on a deployed instance.
    pub fn dev_bypass_with_database(&self) -> bool {
        self.env == Env::Local && self.db_url.is_some()
    }
}
