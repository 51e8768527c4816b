//! Probation service - wires the ledger, the platform and the periodic jobs.
//!
//! Architecture:
//! - Single shared RocksDB ledger
//! - Reconciler and Promotion Scheduler, each on its own tokio task
//! - Gateway event handler feeding the Event Listener

use crate::config::BotConfig;
use crate::discord::Handler;
use crate::error::Result;
use crate::storage::Storage;
use probation_core::{run_periodic, Ledger, Platform, PromotionScheduler, Reconciler};
use serenity::all::{Client, GatewayIntents};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Shared state for the bot: one ledger, one cancellation token.
pub struct ProbationService {
    config: BotConfig,
    ledger: Arc<dyn Ledger>,
    cancel: CancellationToken,
    started: AtomicBool,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl ProbationService {
    /// Open the ledger at the configured path.
    pub fn open(config: BotConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.db_path)?;
        let storage = Arc::new(Storage::open(&config.db_path)?);
        Ok(Self::with_ledger(config, storage))
    }

    /// Build a service around an existing ledger.
    pub fn with_ledger(config: BotConfig, ledger: Arc<dyn Ledger>) -> Self {
        Self {
            config,
            ledger,
            cancel: CancellationToken::new(),
            started: AtomicBool::new(false),
            workers: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    pub fn ledger(&self) -> Arc<dyn Ledger> {
        Arc::clone(&self.ledger)
    }

    /// Spawn the reconciliation and promotion tasks.
    ///
    /// Only the first call starts anything; returns whether this call did.
    pub fn start_workers(&self, platform: Arc<dyn Platform>) -> bool {
        if self.started.swap(true, Ordering::SeqCst) {
            return false;
        }
        let schedule = self.config.schedule.clone();
        let probation = &self.config.probation;
        info!(
            dry_run = probation.dry_run,
            wait_secs = probation.wait.num_seconds(),
            "Starting probation workers"
        );

        let reconciler = Arc::new(Reconciler::new(
            self.ledger(),
            Arc::clone(&platform),
            probation.monitored_role,
        ));
        let reconcile = tokio::spawn(run_periodic(
            "reconcile",
            schedule.reconcile_every,
            schedule.cycle_timeout,
            self.cancel.clone(),
            move || {
                let reconciler = Arc::clone(&reconciler);
                async move { reconciler.run_cycle().await }
            },
        ));

        let scheduler = Arc::new(PromotionScheduler::new(
            self.ledger(),
            platform,
            probation.clone(),
        ));
        let promote = tokio::spawn(run_periodic(
            "promote",
            schedule.promote_every,
            schedule.cycle_timeout,
            self.cancel.clone(),
            move || {
                let scheduler = Arc::clone(&scheduler);
                async move { scheduler.run_cycle().await }
            },
        ));

        if let Ok(mut workers) = self.workers.lock() {
            workers.extend([reconcile, promote]);
        }
        true
    }

    /// Stop the periodic tasks and wait for them to exit.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let workers = match self.workers.lock() {
            Ok(mut workers) => std::mem::take(&mut *workers),
            Err(_) => Vec::new(),
        };
        for worker in workers {
            if let Err(e) = worker.await {
                error!("Worker join failed: {}", e);
            }
        }
        info!("Probation workers stopped");
    }

    /// Connect to Discord and run until Ctrl-C.
    pub async fn run(self: Arc<Self>) -> Result<()> {
        info!("Probation bot starting");
        info!("  Data: {:?}", self.config.db_path);
        info!("  Monitored role: {}", self.config.probation.monitored_role);
        info!("  Validated role: {}", self.config.probation.validated_role);

        let intents = GatewayIntents::GUILDS | GatewayIntents::GUILD_MEMBERS;
        let mut client = Client::builder(&self.config.token, intents)
            .event_handler(Handler::new(Arc::clone(&self)))
            .await?;

        let shard_manager = Arc::clone(&client.shard_manager);
        let service = Arc::clone(&self);
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
                return;
            }
            info!("Shutdown requested");
            service.shutdown().await;
            shard_manager.shutdown_all().await;
        });

        client.start().await?;
        self.shutdown().await;
        Ok(())
    }
}
