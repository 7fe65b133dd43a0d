//! CLI command implementations

use anyhow::Result;
use dialoguer::{theme::ColorfulTheme, Password};
use std::fs;
use std::sync::Arc;

use crate::api::{self, users::provision_user};
use crate::auth::password::{default_password, hash_blocking};
use crate::auth::{Role, Status};
use crate::cli::{
    confirm, error, info, print_user_table, success, warn, OutputFormat, UsersAction,
};
use crate::config::{self, loader::CONFIG_FILENAME, Config, DatabaseBackend};
use crate::models::{NewUser, PublicUser, UserChanges, UserFilter};
use crate::store::{PostgresStore, Store};

/// Initialize a new academia.toml configuration file
pub async fn init() -> Result<()> {
    let config_path = std::path::Path::new(CONFIG_FILENAME);

    if config_path.exists() {
        warn(&format!("{} already exists", CONFIG_FILENAME));
        return Ok(());
    }

    let secret = config::loader::generate_secret();
    fs::write(config_path, config::loader::default_config_content(&secret))?;

    success(&format!("Created {}", CONFIG_FILENAME));
    info("A fresh jwt_secret was generated. Run 'academia serve' to start the server");

    Ok(())
}

/// Start the HTTP server
pub async fn serve(host: Option<String>, port: Option<u16>) -> Result<()> {
    let config = load_config()?;
    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);

    info(&format!("Starting server on {}:{}", host, port));
    api::run_server(config, &host, port).await?;
    Ok(())
}

/// Apply the schema to the configured database
pub async fn migrate() -> Result<()> {
    let config = load_config()?;
    let Some(url) = config.database.url.as_deref() else {
        error("database.url is not set");
        anyhow::bail!("migrate needs the postgres backend");
    };

    let store = PostgresStore::connect(url, config.database.timeout_secs).await?;
    store.migrate().await?;
    success("Schema applied");
    Ok(())
}

/// Create an administrator account
pub async fn create_admin(
    matricula: i64,
    nome: String,
    email: String,
    telefone: String,
) -> Result<()> {
    let config = load_config()?;
    let store = open_persistent_store(&config).await?;

    let payload = NewUser {
        matricula,
        nome,
        email,
        telefone,
        role: Some(Role::Admin),
        ..NewUser::default()
    };

    match provision_user(store.as_ref(), &config.auth, payload).await {
        Ok(user) => {
            success(&format!("Created admin {} ({})", user.name, user.matricula));
            info(&format!(
                "Initial password: {}",
                default_password(&config.auth.default_password_prefix, user.matricula)
            ));
            Ok(())
        }
        Err(e) => {
            error(&format!("Failed to create admin: {}", e));
            Err(e.into())
        }
    }
}

/// User management subcommands
pub async fn users(action: UsersAction) -> Result<()> {
    let config = load_config()?;
    let store = open_persistent_store(&config).await?;

    match action {
        UsersAction::List { format } => {
            let users: Vec<PublicUser> = store
                .list_users(&UserFilter::default())
                .await?
                .iter()
                .map(PublicUser::from)
                .collect();

            match format {
                OutputFormat::Table => print_user_table(&users),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&users)?),
                OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&users)?),
            }
        }
        UsersAction::Deactivate { matricula, force } => {
            if !force && !confirm(&format!("Deactivate user {}?", matricula)) {
                info("Cancelled");
                return Ok(());
            }

            match store
                .update_user(matricula, UserChanges::status(Status::Inactive))
                .await?
            {
                Some(user) => success(&format!("Deactivated {} ({})", user.name, matricula)),
                None => {
                    error(&format!("User {} not found", matricula));
                    anyhow::bail!("no such user");
                }
            }
        }
    }

    Ok(())
}

/// Print a bcrypt digest, e.g. for seeding a database by hand
pub async fn hash_password(plaintext: Option<String>) -> Result<()> {
    let plaintext = match plaintext {
        Some(p) => p,
        None => Password::with_theme(&ColorfulTheme::default())
            .with_prompt("Password")
            .with_confirmation("Repeat password", "Passwords do not match")
            .interact()?,
    };

    let cost = load_config()
        .map(|c| c.auth.bcrypt_cost)
        .unwrap_or(bcrypt::DEFAULT_COST);
    println!("{}", hash_blocking(plaintext, cost).await?);
    Ok(())
}

// Helper functions

fn load_config() -> Result<Config> {
    config::load_config().map_err(|e| anyhow::anyhow!("{}", e))
}

/// Commands that change users are pointless against the in-memory backend
async fn open_persistent_store(config: &Config) -> Result<Arc<dyn Store>> {
    if config.database.backend == DatabaseBackend::Memory {
        anyhow::bail!("this command needs database.backend = \"postgres\"");
    }
    api::open_store(config)
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))
}
