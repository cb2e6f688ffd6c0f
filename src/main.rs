use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use filedrop::auth::TokenGenerator;
use filedrop::blob::{BlobStore, LocalBlobStore};
use filedrop::config::{FileConfig, ServerConfig};
use filedrop::error::Error;
use filedrop::files::Sweeper;
use filedrop::files::sweep::sweep;
use filedrop::server::{AppState, create_router};
use filedrop::store::{SqliteStore, Store};
use filedrop::types::{Identity, IdentityToken, Role};
use filedrop::users;

const ADMIN_TOKEN_FILE: &str = ".admin_token";
const MAX_TOKEN_RETRIES: u32 = 3;

#[cfg(unix)]
fn set_restrictive_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
        tracing::warn!("Failed to set permissions on {}: {e}", path.display());
    }
}

#[derive(Parser)]
#[command(name = "filedrop")]
#[command(about = "A multi-tenant file sharing server", long_about = None)]
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
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(long, short, default_value = "8080")]
        port: u16,

        /// Data directory for the database and blobs
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Public base URL for external access (e.g., "https://files.example.com").
        /// Used for generating blob upload and download URLs.
        #[arg(long)]
        public_base_url: Option<String>,
    },

    /// Run a single purge sweep and exit
    Sweep {
        /// Data directory for the database and blobs
        #[arg(long, default_value = "./data")]
        data_dir: String,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Initialize the server (create database and admin token)
    Init {
        /// Data directory for the database and blobs
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Skip interactive prompts
        #[arg(long)]
        non_interactive: bool,
    },

    /// Mint an identity token for a subject
    Identity {
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Stable subject id from the identity provider
        #[arg(long)]
        subject: String,

        /// Display name used when the user is first created
        #[arg(long)]
        name: String,
    },

    /// Set a subject's role in an org
    Member {
        #[arg(long, default_value = "./data")]
        data_dir: String,

        #[arg(long)]
        subject: String,

        #[arg(long)]
        org: String,

        /// admin or member
        #[arg(long, value_parser = parse_role)]
        role: Role,
    },
}

fn parse_role(s: &str) -> Result<Role, String> {
    Role::parse(s).ok_or_else(|| format!("unknown role '{s}', expected admin or member"))
}

/// Command-line values win; the data dir's config file fills the rest.
fn load_config(data_dir: PathBuf, base: ServerConfig) -> anyhow::Result<ServerConfig> {
    let mut config = ServerConfig { data_dir, ..base };
    config.merge_file(FileConfig::load(&config.data_dir)?)?;
    Ok(config)
}

fn open_initialized_store(config: &ServerConfig) -> anyhow::Result<SqliteStore> {
    let not_initialized =
        "Server not initialized. Run 'filedrop admin init' first to create the database and admin token.";

    if !config.db_path().exists() {
        bail!(not_initialized);
    }

    let store = SqliteStore::new(config.db_path())?;
    store.initialize()?;
    if !store.has_admin_token()? {
        bail!(not_initialized);
    }

    Ok(store)
}

fn issue_token(
    store: &dyn Store,
    generator: &TokenGenerator,
    subject: Option<(&str, &str)>,
) -> anyhow::Result<(IdentityToken, String)> {
    for _ in 0..MAX_TOKEN_RETRIES {
        let (token, raw_token) = generator.issue(subject, None)?;
        match store.create_token(&token) {
            Ok(()) => return Ok((token, raw_token)),
            Err(Error::TokenLookupCollision) => continue,
            Err(e) => return Err(e.into()),
        }
    }
    bail!("Failed to create token after retries")
}

fn print_token(heading: &str, raw_token: &str) {
    println!();
    println!("========================================");
    println!("{heading}");
    println!();
    println!("  {raw_token}");
    println!();
    println!("========================================");
    println!();
}

fn run_init(data_dir: String, non_interactive: bool) -> anyhow::Result<()> {
    let config = load_config(data_dir.into(), ServerConfig::default())?;
    fs::create_dir_all(&config.data_dir)?;

    let store = SqliteStore::new(config.db_path())?;
    store.initialize()?;

    let token_file = config.data_dir.join(ADMIN_TOKEN_FILE);

    if store.has_admin_token()? {
        bail!(
            "Server already initialized. Admin token exists at: {}",
            token_file.display()
        );
    }

    let generator = TokenGenerator::new();
    let (_, raw_token) = issue_token(&store, &generator, None)?;

    fs::write(&token_file, &raw_token)?;

    #[cfg(unix)]
    set_restrictive_permissions(&token_file);

    print_token("Admin token (save this, it won't be shown again):", &raw_token);
    println!("Token also written to: {}", token_file.display());

    if !non_interactive {
        create_first_identity_prompt(&store, &generator, &config)?;
    }

    Ok(())
}

fn create_first_identity_prompt(
    store: &SqliteStore,
    generator: &TokenGenerator,
    config: &ServerConfig,
) -> anyhow::Result<()> {
    let create = inquire::Confirm::new("Would you like to create a first identity?")
        .with_default(false)
        .prompt()?;

    if !create {
        return Ok(());
    }

    let subject = inquire::Text::new("Subject:")
        .with_validator(|input: &str| {
            if input.trim().is_empty() {
                Err("Subject cannot be empty".into())
            } else if input.contains(char::is_whitespace) || input.contains('|') {
                Err("Subject cannot contain whitespace or '|'".into())
            } else {
                Ok(inquire::validator::Validation::Valid)
            }
        })
        .prompt()?;

    let name = inquire::Text::new("Display name:")
        .with_default(&subject)
        .prompt()?;

    let org = inquire::Text::new("Org to make them admin of (blank to skip):").prompt()?;

    let (_, raw_token) = issue_token(store, generator, Some((&subject, &name)))?;

    let identity = Identity::new(&config.issuer, subject.as_str());
    users::ensure_user(store, &identity, &name)?;
    if !org.trim().is_empty() {
        users::set_membership(store, &identity, org.trim(), Role::Admin)?;
    }

    print_token(&format!("Created identity '{subject}' with token:"), &raw_token);

    Ok(())
}

fn run_identity(data_dir: String, subject: String, name: String) -> anyhow::Result<()> {
    if subject.is_empty() || subject.contains('|') {
        bail!("Subject must be non-empty and contain no '|'");
    }

    let config = load_config(data_dir.into(), ServerConfig::default())?;
    let store = open_initialized_store(&config)?;

    let (_, raw_token) = issue_token(&store, &TokenGenerator::new(), Some((&subject, &name)))?;
    print_token(&format!("Identity token for '{subject}':"), &raw_token);

    Ok(())
}

fn run_member(data_dir: String, subject: String, org: String, role: Role) -> anyhow::Result<()> {
    let config = load_config(data_dir.into(), ServerConfig::default())?;
    let store = open_initialized_store(&config)?;

    let identity = Identity::new(&config.issuer, subject.as_str());
    let user = users::set_membership(&store, &identity, &org, role)?;

    println!("{subject} ({}) is now {role} of {org}", user.id);

    Ok(())
}

fn run_sweep(data_dir: String) -> anyhow::Result<()> {
    let config = load_config(data_dir.into(), ServerConfig::default())?;
    let store = open_initialized_store(&config)?;
    let blobs = LocalBlobStore::new(config.blob_dir(), config.base_url());

    let report = sweep(&store, &blobs, Utc::now())?;

    println!(
        "expired: {}, purged: {}, skipped: {}, failed: {}",
        report.expired, report.purged, report.skipped, report.failed
    );

    Ok(())
}

async fn run_serve(config: ServerConfig) -> anyhow::Result<()> {
    let store = open_initialized_store(&config)?;

    let token_file = config.data_dir.join(ADMIN_TOKEN_FILE);
    if token_file.exists() {
        info!("Admin token available at {}", token_file.display());
    }

    let store: Arc<dyn Store> = Arc::new(store);
    let blobs = Arc::new(LocalBlobStore::new(config.blob_dir(), config.base_url()));

    let sweeper = Sweeper::new(
        Arc::clone(&store),
        Arc::clone(&blobs) as Arc<dyn BlobStore>,
        Duration::from_secs(config.sweep_interval_secs),
    );
    tokio::spawn(sweeper.run());

    let addr = config.socket_addr()?;
    let state = Arc::new(AppState {
        store,
        blobs,
        config,
    });

    let app = create_router(state);

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("filedrop=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Admin { command } => match command {
            AdminCommands::Init {
                data_dir,
                non_interactive,
            } => run_init(data_dir, non_interactive)?,
            AdminCommands::Identity {
                data_dir,
                subject,
                name,
            } => run_identity(data_dir, subject, name)?,
            AdminCommands::Member {
                data_dir,
                subject,
                org,
                role,
            } => run_member(data_dir, subject, org, role)?,
        },
        Commands::Serve {
            host,
            port,
            data_dir,
            public_base_url,
        } => {
            let config = load_config(
                data_dir.into(),
                ServerConfig {
                    host,
                    port,
                    public_base_url,
                    ..ServerConfig::default()
                },
            )?;
            run_serve(config).await?;
        }
        Commands::Sweep { data_dir } => run_sweep(data_dir)?,
    }

    Ok(())
}
