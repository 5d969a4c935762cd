use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::bail;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use rankhall::auth::{TokenGenerator, mint_token};
use rankhall::config::ServerConfig;
use rankhall::identity::{HttpIdentityLookup, IdentityLookup, StoreIdentityLookup};
use rankhall::server::{AppState, create_router};
use rankhall::store::{SqliteStore, Store};

const ADMIN_TOKEN_FILE: &str = ".admin_token";

#[cfg(unix)]
fn set_restrictive_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
        tracing::warn!("Failed to set permissions on {}: {e}", path.display());
    }
}

#[derive(Parser)]
#[command(name = "rankhall")]
#[command(about = "Workspace roles and promotion voting server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Administrative commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Start the server
    Serve {
        /// TOML config file; flags below override its values
        #[arg(long, short)]
        config: Option<PathBuf>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(long, short)]
        port: Option<u16>,

        /// Data directory for the database
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Seconds before an in-flight request is answered with 503
        #[arg(long)]
        request_timeout_secs: Option<u64>,

        /// Base URL of the user directory used for display names and avatars.
        /// If not set, the local users table is used.
        #[arg(long)]
        identity_base_url: Option<String>,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Initialize the server (create database and admin token)
    Init {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,
    },
}

fn run_init(data_dir: &Path) -> anyhow::Result<()> {
    fs::create_dir_all(data_dir)?;

    let config = ServerConfig {
        data_dir: data_dir.to_path_buf(),
        ..ServerConfig::default()
    };
    let store = SqliteStore::new(config.db_path())?;
    store.initialize()?;

    let token_file = data_dir.join(ADMIN_TOKEN_FILE);

    if store.has_admin_token()? {
        bail!(
            "Server already initialized. Admin token exists at: {}",
            token_file.display()
        );
    }

    let (token, raw_token) = mint_token(&TokenGenerator::new(), true, None, None)?;

    store.create_token(&token)?;
    fs::write(&token_file, &raw_token)?;

    #[cfg(unix)]
    set_restrictive_permissions(&token_file);

    println!();
    println!("========================================");
    println!("Admin token (save this, it won't be shown again):");
    println!();
    println!("  {raw_token}");
    println!();
    println!("Token also written to: {}", token_file.display());
    println!("========================================");
    println!();

    Ok(())
}

fn build_identity_lookup(
    config: &ServerConfig,
    store: Arc<dyn Store>,
) -> anyhow::Result<Arc<dyn IdentityLookup>> {
    match &config.identity_base_url {
        Some(base_url) => {
            info!("Resolving identities from {base_url}");
            Ok(Arc::new(HttpIdentityLookup::new(
                base_url,
                config.identity_timeout(),
            )?))
        }
        None => Ok(Arc::new(StoreIdentityLookup::new(store))),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("rankhall=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Admin { command } => match command {
            AdminCommands::Init { data_dir } => {
                run_init(&data_dir)?;
            }
        },
        Commands::Serve {
            config,
            host,
            port,
            data_dir,
            request_timeout_secs,
            identity_base_url,
        } => {
            let mut config = match config {
                Some(path) => ServerConfig::from_file(&path)?,
                None => ServerConfig::default(),
            };
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(data_dir) = data_dir {
                config.data_dir = data_dir;
            }
            if let Some(secs) = request_timeout_secs {
                config.request_timeout_secs = secs;
            }
            if identity_base_url.is_some() {
                config.identity_base_url = identity_base_url;
            }

            let token_file = config.data_dir.join(ADMIN_TOKEN_FILE);
            let store = SqliteStore::new(config.db_path())?;
            store.initialize()?;
            if !token_file.exists() || !store.has_admin_token()? {
                bail!(
                    "Server not initialized. Run 'rankhall admin init' first to create the database and admin token."
                );
            }

            info!("Admin token available at {}", token_file.display());

            let store: Arc<dyn Store> = Arc::new(store);
            let state = Arc::new(AppState {
                identity: build_identity_lookup(&config, store.clone())?,
                store,
                request_timeout: config.request_timeout(),
            });

            let app = create_router(state);
            let addr = config.socket_addr()?;

            info!("Starting server on {}", addr);

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
