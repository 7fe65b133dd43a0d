//! Configuration loading and environment variable interpolation

use crate::error::{Error, Result};
use regex::Regex;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use super::Config;

pub const CONFIG_FILENAME: &str = "academia.toml";

/// Load configuration from academia.toml
pub fn load_config() -> Result<Config> {
    let config_path = find_config_file()?;
    load_config_from_path(&config_path)
}

/// Load configuration from a specific path
pub fn load_config_from_path(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path).map_err(|_| Error::ConfigNotFound)?;
    let content = interpolate_env_vars(&content);
    let config: Config = toml::from_str(&content)?;
    tracing::debug!(path = %path.display(), "Loaded configuration");
    Ok(config)
}

/// Find the configuration file, searching upward from current directory
fn find_config_file() -> Result<PathBuf> {
    let mut current = env::current_dir().map_err(|e| Error::Config(e.to_string()))?;

    loop {
        let config_path = current.join(CONFIG_FILENAME);
        if config_path.exists() {
            return Ok(config_path);
        }

        if !current.pop() {
            return Err(Error::ConfigNotFound);
        }
    }
}

/// Interpolate environment variables in the format ${VAR_NAME} or ${VAR_NAME:-default}
fn interpolate_env_vars(content: &str) -> String {
    // Compile-time constant pattern; a failure here is a bug, not a runtime condition
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(?::-([^}]*))?\}")
        .expect("Invalid regex pattern - this is a bug in the codebase");

    re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");

        env::var(var_name).unwrap_or_else(|_| default.to_string())
    })
    .to_string()
}

/// Generate a fresh signing secret for new installations
pub fn generate_secret() -> String {
    format!(
        "{}{}",
        uuid::Uuid::new_v4().simple(),
        uuid::Uuid::new_v4().simple()
    )
}

/// Generate a default configuration file content
pub fn default_config_content(secret: &str) -> String {
    format!(
        r#"# Academia de Líderes configuration

[server]
host = "0.0.0.0"
port = 3000
environment = "production"  # or "development" to expose internal error details

[auth]
# Overridable from the environment: jwt_secret = "${{JWT_SECRET}}"
jwt_secret = "{secret}"
token_ttl_hours = 24
cookie_name = "auth-token"
cookie_max_age_days = 7
bcrypt_cost = 10
default_password_prefix = "acad"
single_use_default_password = true

[database]
backend = "memory"  # or "postgres"
# url = "${{DATABASE_URL:-host=localhost user=postgres password=postgres dbname=academia}}"
timeout_secs = 10

[guard]
mode = "advisory"  # or "strict" to redirect unauthenticated page loads to /login

# Seeded on startup if missing; initial password is default_password_prefix + matricula
# [bootstrap_admin]
# matricula = 1
# nome = "Administrador"
# email = "admin@academia.local"
# telefone = "+5511900000000"
"#
    )
}
