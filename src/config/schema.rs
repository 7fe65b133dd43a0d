//! Configuration schema definitions

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub guard: GuardConfig,

    /// Admin seeded at startup when no user with this matricula exists
    #[serde(default)]
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapAdmin {
    pub matricula: i64,
    pub nome: String,
    pub email: String,
    pub telefone: String,
}

/// Server configuration for the HTTP API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub environment: Environment,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: Environment::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    #[default]
    Production,
}

impl Environment {
    pub fn is_development(self) -> bool {
        self == Environment::Development
    }
}

/// Token, cookie and password settings
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret used to sign session tokens
    #[serde(default)]
    pub jwt_secret: String,

    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,

    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    #[serde(default = "default_cookie_max_age_days")]
    pub cookie_max_age_days: i64,

    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,

    /// Initial passwords are this prefix followed by the matricula
    #[serde(default = "default_password_prefix")]
    pub default_password_prefix: String,

    #[serde(default = "default_true")]
    pub single_use_default_password: bool,
}

/// Upper bound for `auth.token_ttl_hours` (one year)
pub const MAX_TOKEN_TTL_HOURS: i64 = 24 * 366;

/// Upper bound for `auth.cookie_max_age_days` (ten years)
pub const MAX_COOKIE_MAX_AGE_DAYS: i64 = 3660;

fn default_token_ttl_hours() -> i64 {
    24
}

fn default_cookie_name() -> String {
    "auth-token".to_string()
}

fn default_cookie_max_age_days() -> i64 {
    7
}

fn default_bcrypt_cost() -> u32 {
    10
}

fn default_password_prefix() -> String {
    "acad".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_ttl_hours: default_token_ttl_hours(),
            cookie_name: default_cookie_name(),
            cookie_max_age_days: default_cookie_max_age_days(),
            bcrypt_cost: default_bcrypt_cost(),
            default_password_prefix: default_password_prefix(),
            single_use_default_password: default_true(),
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"[REDACTED]")
            .field("token_ttl_hours", &self.token_ttl_hours)
            .field("cookie_name", &self.cookie_name)
            .field("cookie_max_age_days", &self.cookie_max_age_days)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("default_password_prefix", &self.default_password_prefix)
            .field("single_use_default_password", &self.single_use_default_password)
            .finish()
    }
}

/// Backing data store
#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub backend: DatabaseBackend,

    /// libpq-style connection string, e.g. "host=localhost user=postgres dbname=academia"
    #[serde(default)]
    pub url: Option<String>,

    /// Upper bound for every store call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: DatabaseBackend::default(),
            url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("backend", &self.backend)
            .field("url", &self.url.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    #[default]
    Memory,
    Postgres,
}

/// Route guard behaviour for page navigation
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GuardConfig {
    #[serde(default)]
    pub mode: GuardMode,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GuardMode {
    /// Protected pages without a valid token are still served; the page
    /// rechecks on the client and every API endpoint enforces on its own.
    #[default]
    Advisory,
    /// Protected pages without a valid token redirect to the login page.
    Strict,
}

impl Config {
    /// Token lifetime as a chrono duration
    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.auth.token_ttl_hours)
    }

    /// Fail fast on settings the server cannot run without
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.auth.jwt_secret.trim().is_empty() {
            return Err(crate::error::Error::Config(
                "auth.jwt_secret must be set".to_string(),
            ));
        }
        if !(1..=MAX_TOKEN_TTL_HOURS).contains(&self.auth.token_ttl_hours) {
            return Err(crate::error::Error::Config(format!(
                "auth.token_ttl_hours must be between 1 and {}",
                MAX_TOKEN_TTL_HOURS
            )));
        }
        if !(1..=MAX_COOKIE_MAX_AGE_DAYS).contains(&self.auth.cookie_max_age_days) {
            return Err(crate::error::Error::Config(format!(
                "auth.cookie_max_age_days must be between 1 and {}",
                MAX_COOKIE_MAX_AGE_DAYS
            )));
        }
        if self.database.backend == DatabaseBackend::Postgres && self.database.url.is_none() {
            return Err(crate::error::Error::Config(
                "database.url is required for the postgres backend".to_string(),
            ));
        }
        Ok(())
    }
}
