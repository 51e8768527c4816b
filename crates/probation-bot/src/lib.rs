//! Probation Bot - Discord front end for probation tracking
//!
//! Watches a "probation" role, keeps a durable record of when each member
//! entered it, and promotes members to a validated role after the waiting
//! period.
//!
//! # Architecture
//!
//! - **Storage**: RocksDB-backed probation ledger
//! - **Discord**: serenity gateway handler and REST platform adapter
//! - **Service**: owns the ledger and the reconcile/promote workers
//! - **Config**: environment-driven startup parameters
//!
//! # Example
//!
//! ```no_run
//! use probation_bot::{BotConfig, ProbationService};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BotConfig::from_env()?;
//!     let service = Arc::new(ProbationService::open(config)?);
//!     service.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod discord;
pub mod error;
pub mod logging;
pub mod service;
pub mod storage;

pub use config::BotConfig;
pub use discord::{DiscordPlatform, Handler};
pub use error::{Error, Result};
pub use service::ProbationService;
pub use storage::Storage;
