//! privault: encrypted vault CLI
//!
//! Commands:
//!   init                      - create the vault and master key
//!   status                    - unlock-path and storage summary
//!   passcode set              - configure the passcode unlock path
//!   unlock / lock             - session control
//!   add <file>                - encrypt a file into the vault
//!   get <id> [-o out]         - decrypt an item
//!   ls / folders / dups       - catalog views
//!   rm / mv / rename          - catalog mutations
//!   recovery create|redeem    - recovery-key escrow
//!   reset                     - irreversible vault wipe

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use privault_core::config::VaultConfig;
use privault_core::VaultError;
use privault_crypto::KdfParams;
use privault_keys::KeyLifecycleManager;
use privault_secrets::{HardwareKeyAgent, KeyringStore, PresenceGate};
use privault_vault::{FolderNode, VaultEngine};

#[derive(Parser, Debug)]
#[command(name = "privault", version, about = "Encrypted local vault")]
struct Cli {
    /// Path to privault.toml configuration file
    #[arg(long, short = 'c', env = "PRIVAULT_CONFIG", default_value = "privault.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "PRIVAULT_LOG", default_value = "warn")]
    log: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the vault directories and master key
    Init,

    /// Show unlock paths and storage totals
    Status,

    /// Passcode unlock path management
    Passcode {
        #[command(subcommand)]
        action: PasscodeAction,
    },

    /// Unlock the vault for this invocation (sanity check of a path)
    Unlock,

    /// Drop the cached master key
    Lock,

    /// Encrypt a file into the vault
    Add {
        file: PathBuf,
        /// Folder path inside the vault, e.g. "Trips/2024"
        #[arg(long, short = 'f')]
        folder: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },

    /// Decrypt an item to stdout or a file
    Get {
        id: String,
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,
    },

    /// List all items
    Ls,

    /// Delete items by id
    Rm { ids: Vec<String> },

    /// Move items to a folder (omit --folder for the vault root)
    Mv {
        ids: Vec<String>,
        #[arg(long, short = 'f')]
        folder: Option<String>,
    },

    /// Rename an item
    Rename { id: String, new_name: String },

    /// Show the folder tree
    Folders,

    /// Create an empty folder
    Mkdir { path: String },

    /// Move a folder and everything under it
    MvDir { from: String, to: String },

    /// List groups of exact-duplicate items
    Dups,

    /// Recovery-key escrow
    Recovery {
        #[command(subcommand)]
        action: RecoveryAction,
    },

    /// Delete every secret and record. Irreversible.
    Reset {
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
enum PasscodeAction {
    /// Set (or replace) the 6-digit passcode
    Set,
}

#[derive(Subcommand, Debug)]
enum RecoveryAction {
    /// Generate the recovery key; shown once, never stored
    Create,
    /// Redeem a recovery key after losing the device unlock path
    Redeem,
}

/// User-presence check for a terminal session: an explicit confirmation
/// stands in for the platform biometric prompt.
struct ConsoleGate;

impl PresenceGate for ConsoleGate {
    fn verify(&self) -> Pin<Box<dyn Future<Output = bool> + Send + '_>> {
        Box::pin(async {
            tokio::task::spawn_blocking(|| {
                eprint!("Confirm presence [y/N]: ");
                let mut line = String::new();
                match std::io::stdin().read_line(&mut line) {
                    Ok(_) => matches!(line.trim(), "y" | "Y" | "yes"),
                    Err(_) => false,
                }
            })
            .await
            .unwrap_or(false)
        })
    }
}

struct App {
    agent: Arc<HardwareKeyAgent>,
    keys: Arc<KeyLifecycleManager>,
    engine: VaultEngine,
}

async fn build_app(config: &VaultConfig) -> Result<App> {
    let store = Arc::new(KeyringStore::new(config.storage.credential_service.clone()));
    let agent = Arc::new(HardwareKeyAgent::new(
        store.clone(),
        Arc::new(ConsoleGate),
        Duration::from_secs(config.lock.presence_timeout_secs),
        Duration::from_secs(config.lock.auth_context_ttl_secs),
    ));
    let keys = Arc::new(KeyLifecycleManager::new(
        store,
        agent.clone(),
        KdfParams {
            mem_cost_kib: config.crypto.argon2_mem_cost_kib,
            time_cost: config.crypto.argon2_time_cost,
            parallelism: config.crypto.argon2_parallelism,
        },
        Duration::from_secs(config.lock.auto_lock_secs),
    ));
    let engine = VaultEngine::prepare(&config.storage.data_dir, keys.clone())
        .await
        .context("preparing vault storage")?;
    Ok(App { agent, keys, engine })
}

impl App {
    /// Resolve the master key, driving re-authentication the way a UI
    /// would: prefer the passcode if one is set, else a presence challenge
    /// for the hardware path. One retry, never a loop.
    async fn ensure_unlocked(&self) -> Result<()> {
        match self.keys.get_or_create_master_key().await {
            Ok(_) => Ok(()),
            Err(VaultError::AuthorizationRequired) => {
                if self.keys.has_passcode()? {
                    let code = rpassword::prompt_password("Passcode: ")?;
                    if !self.keys.unlock_with_passcode(&code).await? {
                        anyhow::bail!("wrong passcode");
                    }
                } else {
                    let ctx = self.agent.authorize().await?;
                    self.keys.set_authorization(ctx).await;
                    self.keys.get_or_create_master_key().await?;
                }
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log);

    let config = VaultConfig::load(&cli.config)?;
    let app = build_app(&config).await?;

    match cli.command {
        Commands::Init => {
            app.ensure_unlocked().await?;
            println!("vault ready at {}", config.storage.data_dir.display());
        }
        Commands::Status => {
            let items = app.engine.list_items().await;
            println!("items:            {}", items.len());
            println!(
                "plaintext bytes:  {}",
                app.engine.total_storage_bytes().await
            );
            println!("unlocked:         {}", app.keys.is_unlocked().await);
            println!("hardware path:    {}", app.keys.has_hardware_record()?);
            println!("passcode path:    {}", app.keys.has_passcode()?);
            println!("recovery escrow:  {}", app.keys.has_recovery_record()?);
        }
        Commands::Passcode { action } => match action {
            PasscodeAction::Set => {
                app.ensure_unlocked().await?;
                let code = rpassword::prompt_password("New 6-digit passcode: ")?;
                let confirm = rpassword::prompt_password("Repeat passcode: ")?;
                if code != confirm {
                    anyhow::bail!("passcodes do not match");
                }
                app.keys.set_passcode(&code).await?;
                println!("passcode set");
            }
        },
        Commands::Unlock => {
            app.ensure_unlocked().await?;
            println!("unlocked");
        }
        Commands::Lock => {
            app.keys.clear_master_key_from_memory().await;
            println!("locked");
        }
        Commands::Add { file, folder, category } => {
            app.ensure_unlocked().await?;
            let plaintext = std::fs::read(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "unnamed".into());
            let mime = guess_mime(&name);
            let is_image = mime.starts_with("image/");
            let item = app
                .engine
                .add_item(
                    &plaintext,
                    &name,
                    mime,
                    is_image,
                    category.as_deref(),
                    folder.as_deref(),
                )
                .await?;
            println!("{}  {}", item.id, item.original_name);
        }
        Commands::Get { id, out } => {
            app.ensure_unlocked().await?;
            let plaintext = app.engine.decrypt_item_data(&id).await?;
            match out {
                Some(path) => {
                    std::fs::write(&path, plaintext)
                        .with_context(|| format!("writing {}", path.display()))?;
                    println!("wrote {}", path.display());
                }
                None => {
                    use std::io::Write;
                    std::io::stdout().write_all(&plaintext)?;
                }
            }
        }
        Commands::Ls => {
            for item in app.engine.list_items().await {
                println!(
                    "{}  {:>9}  {:<24}  {}",
                    item.id,
                    item.size_bytes,
                    item.folder_path.as_deref().unwrap_or("/"),
                    item.original_name
                );
            }
        }
        Commands::Rm { ids } => {
            app.engine.delete_items(&ids).await?;
            println!("deleted {} item(s)", ids.len());
        }
        Commands::Mv { ids, folder } => {
            app.engine.assign_folder(&ids, folder.as_deref()).await?;
        }
        Commands::Rename { id, new_name } => {
            app.engine.rename_item(&id, &new_name).await?;
        }
        Commands::Folders => {
            for node in app.engine.folder_nodes().await {
                print_tree(&node, 0);
            }
        }
        Commands::Mkdir { path } => {
            app.engine.create_folder(&path).await?;
        }
        Commands::MvDir { from, to } => {
            app.engine.move_folder(&from, &to).await?;
        }
        Commands::Dups => {
            for group in app.engine.find_exact_duplicates().await {
                println!("{} copies of {}:", group.len(), group[0].content_hash);
                for item in group {
                    println!("  {}  {}", item.id, item.original_name);
                }
            }
        }
        Commands::Recovery { action } => match action {
            RecoveryAction::Create => {
                app.ensure_unlocked().await?;
                let key = app.keys.create_recovery_key().await?;
                println!("Recovery key (write it down — it will not be shown again):");
                println!("{key}");
            }
            RecoveryAction::Redeem => {
                let key = rpassword::prompt_password("Recovery key: ")?;
                app.keys.recover_master_key(&key).await?;
                println!("master key recovered and re-wrapped");
            }
        },
        Commands::Reset { yes } => {
            if !yes {
                anyhow::bail!("refusing to wipe the vault without --yes");
            }
            app.keys.reset_all_secrets().await?;
            println!("all secrets reset; vault content is unrecoverable");
        }
    }

    Ok(())
}

fn print_tree(node: &FolderNode, depth: usize) {
    println!(
        "{}{}/  ({} items, {} bytes)",
        "  ".repeat(depth),
        node.name,
        node.items.len(),
        node.total_size
    );
    for child in &node.children {
        print_tree(child, depth + 1);
    }
}

fn guess_mime(name: &str) -> &'static str {
    match name.rsplit('.').next().map(str::to_ascii_lowercase).as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("heic") => "image/heic",
        Some("webp") => "image/webp",
        Some("mp4") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain",
        Some("json") => "application/json",
        _ => "application/octet-stream",
    }
}

fn init_logging(level: &str) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();
}
