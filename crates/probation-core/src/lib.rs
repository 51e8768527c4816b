//! Probation Core - ledger reconciliation and time-gated promotion
//!
//! Tracks members holding a monitored "probation" role, records when each
//! one entered probation, and promotes them to a validated role once the
//! waiting period has elapsed.
//!
//! # Architecture
//!
//! - **Ledger**: durable `user -> entered_at` mapping, behind the [`Ledger`] trait
//! - **Platform**: the chat platform, behind the [`Platform`] trait
//! - **Reconciler**: corrects drift between the ledger and live role membership
//! - **Promotion Scheduler**: swaps roles for users whose waiting period elapsed
//! - **Event Listener**: incremental ledger updates from role-change notifications
//!
//! None of the components talk to each other. They share the ledger only, and
//! every ledger operation is atomic and idempotent, so the three producers can
//! interleave freely.

pub mod config;
pub mod error;
pub mod ledger;
pub mod listener;
pub mod model;
pub mod platform;
pub mod reconciler;
pub mod scheduler;
pub mod task;

#[cfg(test)]
pub(crate) mod testing;

pub use config::ProbationConfig;
pub use error::{Error, Result};
pub use ledger::Ledger;
pub use listener::{EventListener, RoleTransition};
pub use model::{GuildId, ProbationRecord, RoleId, UserId};
pub use platform::{Platform, PlatformError};
pub use reconciler::{Drift, ReconcileSummary, Reconciler};
pub use scheduler::{PromotionScheduler, PromotionSummary};
pub use task::{run_periodic, TaskSchedule};
