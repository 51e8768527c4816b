//! Reconciliation between the ledger and live role membership.
//!
//! Each pass re-derives the truth from the platform, so a failed or
//! abandoned pass is safe to retry from scratch on the next tick.

use crate::error::Result;
use crate::ledger::Ledger;
use crate::model::{GuildId, RoleId, UserId};
use crate::platform::Platform;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, warn};

/// Difference between live role holders and tracked users.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Drift {
    /// Holding the role but untracked.
    pub missing: BTreeSet<UserId>,
    /// Tracked but no longer holding the role.
    pub stale: BTreeSet<UserId>,
}

impl Drift {
    /// Compute `live - tracked` and `tracked - live`.
    pub fn between(live: &BTreeSet<UserId>, tracked: &BTreeSet<UserId>) -> Self {
        Self {
            missing: live.difference(tracked).copied().collect(),
            stale: tracked.difference(live).copied().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.stale.is_empty()
    }
}

/// Outcome of one reconciliation pass over every guild.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub added: BTreeSet<UserId>,
    pub removed: BTreeSet<UserId>,
    pub skipped_guilds: Vec<GuildId>,
}

/// Periodically brings the ledger back in line with the monitored role.
pub struct Reconciler {
    ledger: Arc<dyn Ledger>,
    platform: Arc<dyn Platform>,
    monitored_role: RoleId,
}

impl Reconciler {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        platform: Arc<dyn Platform>,
        monitored_role: RoleId,
    ) -> Self {
        Self {
            ledger,
            platform,
            monitored_role,
        }
    }

    /// Reconcile every guild, stamping new records with the current time.
    pub async fn run_cycle(&self) -> Result<ReconcileSummary> {
        self.run_cycle_at(Utc::now()).await
    }

    /// Reconcile every guild, stamping new records with `now`.
    ///
    /// A platform failure skips that guild only. A ledger failure aborts the
    /// pass.
    ///
    /// Each guild is diffed against the whole ledger, which is shared by all
    /// guilds. With several guilds, a user holding the role in one guild is
    /// removed as stale by the next guild and re-added on the following pass,
    /// restarting their clock. Correct behaviour needs a single guild per
    /// ledger.
    pub async fn run_cycle_at(&self, now: DateTime<Utc>) -> Result<ReconcileSummary> {
        info!("Scanning for missing role changes");
        let mut summary = ReconcileSummary::default();

        for guild in self.platform.guilds().await {
            let live = match self.platform.role_members(guild, self.monitored_role).await {
                Ok(live) => live,
                Err(e) => {
                    warn!(guild_id = %guild, error = %e, "Skipping reconciliation for guild");
                    summary.skipped_guilds.push(guild);
                    continue;
                }
            };

            let drift = self.reconcile(&live, now)?;
            if !drift.is_empty() {
                info!(
                    guild_id = %guild,
                    added = drift.missing.len(),
                    removed = drift.stale.len(),
                    "Corrected ledger drift"
                );
            }
            summary.added.extend(drift.missing);
            summary.removed.extend(drift.stale);
        }

        Ok(summary)
    }

    /// Apply one live snapshot to the ledger. Afterwards the tracked set
    /// equals `live`.
    pub fn reconcile(&self, live: &BTreeSet<UserId>, now: DateTime<Utc>) -> Result<Drift> {
        let tracked = self.ledger.user_ids()?;
        let drift = Drift::between(live, &tracked);

        for user in &drift.stale {
            self.ledger.remove(*user)?;
        }
        // Discovery time, not the unknown grant time, starts the clock.
        for user in &drift.missing {
            self.ledger.add_if_absent_at(*user, now)?;
        }

        Ok(drift)
    }
}
