use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use nostr_sdk::prelude::*;
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

use flohchat::config::{self, Config};
use flohchat::identity::{self, LocalSigner};
use flohchat::session::{ChatSession, FeedUpdate};
use flohchat::storage::FileStorage;
use flohchat::tui;

#[derive(Parser)]
#[command(name = "flohchat")]
#[command(about = "Terminal chat for the Hofflohmarkt Nostr channel", long_about = None)]
struct Cli {
    /// Path to a config file (defaults to the platform data dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Relay URL to use instead of the configured set (repeatable)
    #[arg(long = "relay", global = true)]
    relays: Vec<String>,

    /// Channel tag to join instead of the configured one
    #[arg(long, global = true)]
    channel_tag: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new identity and store it
    Keygen,

    /// Import an existing identity (nsec or hex secret key)
    Import {
        /// Secret key, `nsec1...` or 64-char hex
        #[arg(long)]
        secret: String,
    },

    /// Show the stored identity
    Whoami,

    /// Delete the stored identity
    Reset,

    /// Write a default config file (if absent) and print the effective config
    Config,

    /// Resolve and print the channel id
    Channel,

    /// Publish one message to the channel
    Send {
        /// Message text
        #[arg(long)]
        message: String,
    },

    /// Print channel messages as they arrive
    Listen {
        /// History window in hours (overrides the config)
        #[arg(long)]
        since_hours: Option<u64>,
    },

    /// Open the interactive chat (default)
    Chat,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let storage = FileStorage::new(&config::data_dir())?;
    let mut config = match &cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load(&storage)?,
    };
    config.apply_overrides(&cli.relays, cli.channel_tag.as_deref());

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Keygen => cmd_keygen(&storage),
        Commands::Import { secret } => cmd_import(&storage, &secret),
        Commands::Whoami => cmd_whoami(&storage),
        Commands::Reset => cmd_reset(&storage),
        Commands::Config => cmd_config(&config, &storage),
        Commands::Channel => Runtime::new()?.block_on(cmd_channel(config, &storage)),
        Commands::Send { message } => Runtime::new()?.block_on(cmd_send(config, &storage, &message)),
        Commands::Listen { since_hours } => {
            if let Some(hours) = since_hours {
                config.history_hours = hours;
            }
            Runtime::new()?.block_on(cmd_listen(config, &storage))
        }
        Commands::Chat => {
            let runtime = Runtime::new()?;
            tui::run(config, storage, runtime.handle().clone())
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_keygen(storage: &FileStorage) -> Result<()> {
    let keys = identity::generate(storage)?;
    println!("Generated a new identity.");
    println!("  npub: {}", keys.public_key().to_bech32()?);
    println!("  hex:  {}", keys.public_key());
    println!("The secret key is stored in {}", storage.base_dir().display());
    Ok(())
}

fn cmd_import(storage: &FileStorage, secret: &str) -> Result<()> {
    let keys = identity::import(storage, secret)?;
    println!("Imported identity.");
    println!("  npub: {}", keys.public_key().to_bech32()?);
    Ok(())
}

fn cmd_whoami(storage: &FileStorage) -> Result<()> {
    match identity::load(storage)? {
        Some(keys) => {
            println!("npub: {}", keys.public_key().to_bech32()?);
            println!("hex:  {}", keys.public_key());
            Ok(())
        }
        None => {
            println!("No identity stored. Run `flohchat keygen` to create one.");
            Ok(())
        }
    }
}

fn cmd_reset(storage: &FileStorage) -> Result<()> {
    if identity::reset(storage)? {
        println!("Identity deleted.");
    } else {
        println!("No identity was stored.");
    }
    Ok(())
}

fn cmd_config(config: &Config, storage: &FileStorage) -> Result<()> {
    if config.ensure_saved(storage)? {
        let path = storage.base_dir().join(config::CONFIG_FILE);
        println!("Wrote default config to {}", path.display());
    }
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}

/// Stored identity if present, ephemeral keys otherwise (read-only use)
fn session_keys(storage: &FileStorage) -> Result<Keys> {
    match identity::load(storage)? {
        Some(keys) => Ok(keys),
        None => {
            eprintln!("No stored identity, using an ephemeral key (read-only).");
            Ok(Keys::generate())
        }
    }
}

async fn cmd_channel(config: Config, storage: &FileStorage) -> Result<()> {
    let keys = session_keys(storage)?;
    let session = ChatSession::connect(config, keys.clone(), LocalSigner::new(keys)).await?;
    println!("Channel: {}", session.channel());
    session.disconnect().await;
    Ok(())
}

async fn cmd_send(config: Config, storage: &FileStorage, message: &str) -> Result<()> {
    let Some(keys) = identity::load(storage)? else {
        bail!("sending requires an identity; run `flohchat keygen` first");
    };
    let mut session = ChatSession::connect(config, keys.clone(), LocalSigner::new(keys)).await?;
    let report = session.publish(message).await?;
    println!("Sent {} ({})", report.event_id, report.summary());
    for (relay, reason) in &report.rejected {
        println!("  rejected by {relay}: {reason}");
    }
    session.disconnect().await;
    Ok(())
}

async fn cmd_listen(config: Config, storage: &FileStorage) -> Result<()> {
    let keys = session_keys(storage)?;
    let mut session = ChatSession::connect(config, keys.clone(), LocalSigner::new(keys)).await?;
    println!("Listening on channel {} (Ctrl-C to stop)", session.channel());

    while let Some(update) = session.recv().await {
        match update {
            FeedUpdate::Message(msg) => {
                let name = session.profiles().display_name(&msg.author);
                println!("[{}] {}: {}", format_time(msg.created_at), name, msg.content);
            }
            FeedUpdate::Confirmed(_) | FeedUpdate::Profile(_) => {}
        }
        session.flush_profile_requests().await?;
    }
    Ok(())
}

fn format_time(ts: Timestamp) -> String {
    use chrono::{Local, TimeZone};
    Local
        .timestamp_opt(ts.as_u64() as i64, 0)
        .single()
        .map(|dt| dt.format("%H:%M").to_string())
        .unwrap_or_else(|| ts.as_u64().to_string())
}
