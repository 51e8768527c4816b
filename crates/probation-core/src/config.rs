//! Runtime settings shared by the reconciler, scheduler and listener.

use crate::model::RoleId;
use chrono::TimeDelta;

/// Default waiting period before promotion.
pub const DEFAULT_WAIT_DAYS: i64 = 7;

/// Settings built once at startup and handed to each component.
#[derive(Debug, Clone)]
pub struct ProbationConfig {
    /// Role marking a user as in probation.
    pub monitored_role: RoleId,

    /// Role granted on promotion.
    pub validated_role: RoleId,

    /// How long a user stays in probation before promotion.
    pub wait: TimeDelta,

    /// Skip the role swap during promotion (the ledger record is still removed).
    pub dry_run: bool,
}

impl ProbationConfig {
    /// Config with the default waiting period and dry-run disabled.
    pub fn new(monitored_role: RoleId, validated_role: RoleId) -> Self {
        Self {
            monitored_role,
            validated_role,
            wait: TimeDelta::days(DEFAULT_WAIT_DAYS),
            dry_run: false,
        }
    }

    /// Override the waiting period.
    pub fn with_wait(mut self, wait: TimeDelta) -> Self {
        self.wait = wait;
        self
    }

    /// Enable or disable dry-run promotion.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}
