// rest_api/src/main.rs

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use rest_api::seed::{seed, AdminSeed};
use rest_api::{build_state, load_app_config, start_server};

#[derive(Parser, Debug)]
#[command(name = "rest_api")]
#[command(version = "0.1.0")]
#[command(about = "Clinic appointment booking API")]
struct Cli {
    /// Allow the built-in development JWT secret when JWT_SECRET is unset
    #[arg(long, global = true)]
    dev: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (the default)
    Serve {
        #[arg(short = 'p', long = "port", value_name = "PORT")]
        port: Option<u16>,
    },
    /// Insert sample doctors, and an admin when credentials are given
    Seed {
        #[arg(long = "admin-email", value_name = "EMAIL", requires = "admin_password")]
        admin_email: Option<String>,
        #[arg(long = "admin-password", value_name = "PASSWORD", env = "SEED_ADMIN_PASSWORD", hide_env_values = true)]
        admin_password: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=info")))
        .init();

    let cli = Cli::parse();
    let mut config = load_app_config(cli.dev).context("Failed to load configuration")?;

    match cli.command.unwrap_or(Command::Serve { port: None }) {
        Command::Serve { port } => {
            if let Some(port) = port {
                config.port = port;
            }
            start_server(config).await
        }
        Command::Seed { admin_email, admin_password } => {
            let (state, storage) = build_state(&config)?;
            let admin = match (admin_email, admin_password) {
                (Some(email), Some(password)) => Some(AdminSeed { email, password }),
                _ => None,
            };
            let report = seed(&storage, &state.auth, &state.doctors, admin)
                .await
                .context("Seeding failed")?;
            info!("{:?}", report);
            Ok(())
        }
    }
}
