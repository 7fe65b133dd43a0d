use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use academia::cli::{self, Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "academia=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => cli::commands::init().await,
        Commands::Serve { host, port } => cli::commands::serve(host, port).await,
        Commands::Migrate => cli::commands::migrate().await,
        Commands::CreateAdmin {
            matricula,
            nome,
            email,
            telefone,
        } => cli::commands::create_admin(matricula, nome, email, telefone).await,
        Commands::Users { action } => cli::commands::users(action).await,
        Commands::HashPassword { plaintext } => cli::commands::hash_password(plaintext).await,
    }
}
