//! Time-gated promotion out of probation.
//!
//! A user is promoted only when the ledger says their waiting period has
//! elapsed *and* the platform confirms they still hold the monitored role.
//! Eligible users who lost the role are left alone for the reconciler.

use crate::config::ProbationConfig;
use crate::error::Result;
use crate::ledger::Ledger;
use crate::model::{GuildId, UserId};
use crate::platform::{Platform, PlatformError};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of one promotion pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromotionSummary {
    /// Users eligible by timestamp at the start of the pass.
    pub eligible: BTreeSet<UserId>,
    /// Users promoted and removed from the ledger.
    pub promoted: BTreeSet<UserId>,
    /// Users whose role swap failed. Their records are kept.
    pub failed: BTreeSet<UserId>,
    pub skipped_guilds: Vec<GuildId>,
}

/// Promotes users whose probation period has elapsed.
pub struct PromotionScheduler {
    ledger: Arc<dyn Ledger>,
    platform: Arc<dyn Platform>,
    config: ProbationConfig,
}

impl PromotionScheduler {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        platform: Arc<dyn Platform>,
        config: ProbationConfig,
    ) -> Self {
        Self {
            ledger,
            platform,
            config,
        }
    }

    pub async fn run_cycle(&self) -> Result<PromotionSummary> {
        self.run_cycle_at(Utc::now()).await
    }

    /// Run one promotion pass as of `now`.
    ///
    /// Role lookup failures skip the guild. A failed role swap skips the
    /// user and keeps their record. A ledger failure aborts the pass.
    pub async fn run_cycle_at(&self, now: DateTime<Utc>) -> Result<PromotionSummary> {
        let eligible = self.ledger.eligible_user_ids_at(self.config.wait, now)?;
        info!(count = eligible.len(), "Entering promotion cycle");

        let mut summary = PromotionSummary {
            eligible,
            ..Default::default()
        };
        if summary.eligible.is_empty() {
            return Ok(summary);
        }

        for guild in self.platform.guilds().await {
            let holders = match self.promotable_holders(guild).await {
                Ok(holders) => holders,
                Err(e) => {
                    warn!(guild_id = %guild, error = %e, "Skipping promotion for guild");
                    summary.skipped_guilds.push(guild);
                    continue;
                }
            };

            for user in holders.intersection(&summary.eligible) {
                if let Err(e) = self.promote(guild, *user).await {
                    warn!(guild_id = %guild, user_id = %user, error = %e, "Promotion failed");
                    summary.failed.insert(*user);
                    continue;
                }
                self.ledger.remove(*user)?;
                summary.promoted.insert(*user);
            }
        }

        // A later guild may have succeeded for the same user.
        summary.failed.retain(|user| !summary.promoted.contains(user));
        Ok(summary)
    }

    /// Current holders of the monitored role, provided the validated role
    /// exists too.
    async fn promotable_holders(
        &self,
        guild: GuildId,
    ) -> std::result::Result<BTreeSet<UserId>, PlatformError> {
        let holders = self
            .platform
            .role_members(guild, self.config.monitored_role)
            .await?;
        if !self
            .platform
            .role_exists(guild, self.config.validated_role)
            .await?
        {
            return Err(PlatformError::RoleNotFound {
                guild,
                role: self.config.validated_role,
            });
        }
        debug!(guild_id = %guild, holders = holders.len(), "Fetched probation role members");
        Ok(holders)
    }

    async fn promote(
        &self,
        guild: GuildId,
        user: UserId,
    ) -> std::result::Result<(), PlatformError> {
        if self.config.dry_run {
            info!(guild_id = %guild, user_id = %user, "Dry run: skipping role swap");
            return Ok(());
        }
        info!(guild_id = %guild, user_id = %user, "Promoting user");
        self.platform
            .add_role(guild, user, self.config.validated_role)
            .await?;
        self.platform
            .remove_role(guild, user, self.config.monitored_role)
            .await
    }
}
