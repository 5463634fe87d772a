//! # WirdBot
//!
//! Delivers the daily Quran wird to Telegram groups, five pages after each
//! of the group's prayers.
//!
//! Usage:
//!   wirdbot                              # Run with ~/.wirdbot/config.toml
//!   wirdbot --config ./wirdbot.toml      # Custom config
//!   wirdbot --check                      # Validate config and store, then exit

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use wird_channels::{BotService, ConfigDialog, TelegramChannel};
use wird_core::WirdConfig;
use wird_core::traits::{Transport, TriggerResolver};
use wird_providers::AladhanResolver;
use wird_scheduler::{SchedulerEngine, TenantStore, spawn_scheduler};

#[derive(Parser)]
#[command(
    name = "wirdbot",
    version,
    about = "📖 WirdBot: daily Quran pages paced by prayer times"
)]
struct Cli {
    /// Config file (default: ~/.wirdbot/config.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Data directory, overrides storage.data_dir
    #[arg(long)]
    data_dir: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Validate config and tenant store, then exit
    #[arg(long)]
    check: bool,
}

fn expand_path(p: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(p).to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "wirdbot=debug,wird_scheduler=debug,wird_channels=debug,wird_providers=debug"
    } else {
        "wirdbot=info,wird_scheduler=info,wird_channels=info,wird_providers=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    let mut config = match &cli.config {
        Some(path) => WirdConfig::load_from(&expand_path(path))?,
        None => WirdConfig::load()?,
    };
    if let Some(dir) = &cli.data_dir {
        config.storage.data_dir = dir.clone();
    }
    config.validate()?;

    let data_dir = config.storage.data_path();
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("creating data dir {}", data_dir.display()))?;
    let store = TenantStore::open(&data_dir)?;

    if cli.check {
        println!("✅ Config OK");
        println!("   🗂️  Store:   {} ({} tenants)", store.file_path().display(), store.len());
        println!("   🕌 Prayer:  {} (method {})", config.prayer.base_url, config.prayer.method);
        println!(
            "   ⏰ Tick:    {}s, window {}m, dedup {}m",
            config.scheduler.tick_secs,
            config.scheduler.fire_window_mins,
            config.scheduler.dedup_margin_mins
        );
        return Ok(());
    }

    if config.telegram.bot_token.is_empty() {
        bail!(
            "No Telegram bot token: set telegram.bot_token or {}",
            wird_core::config::TOKEN_ENV
        );
    }

    tracing::info!("📖 WirdBot v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("   🗂️  {} tenants loaded from {}", store.len(), store.file_path().display());

    let store = store.shared();
    let resolver: Arc<dyn TriggerResolver> = Arc::new(AladhanResolver::new(&config.prayer));
    let telegram = TelegramChannel::new(config.telegram.clone());
    let transport: Arc<dyn Transport> = Arc::new(telegram.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let engine = Arc::new(SchedulerEngine::new(
        store.clone(),
        resolver.clone(),
        transport,
        &config,
    ));
    let scheduler = tokio::spawn(spawn_scheduler(engine, shutdown_rx.clone()));

    let dialog = Arc::new(ConfigDialog::new(store.clone(), resolver));
    let bot = BotService::new(telegram, dialog, store, config.operator.clone());
    let front_end = tokio::spawn(bot.run(shutdown_rx));

    tokio::signal::ctrl_c().await?;
    tracing::info!("🛑 Shutting down");
    shutdown_tx.send(true)?;

    scheduler.await?;
    front_end.await?;
    Ok(())
}
