//! Incremental ledger updates from member role-change notifications.

use crate::error::Result;
use crate::ledger::Ledger;
use crate::model::{RoleId, UserId};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

/// What a notification did to the monitored role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleTransition {
    Added,
    Removed,
    Unchanged,
}

/// Reacts to "member roles changed" notifications. Never scans or lists.
pub struct EventListener {
    ledger: Arc<dyn Ledger>,
    monitored_role: RoleId,
}

impl EventListener {
    pub fn new(ledger: Arc<dyn Ledger>, monitored_role: RoleId) -> Self {
        Self {
            ledger,
            monitored_role,
        }
    }

    /// Classify a before/after role pair.
    pub fn transition(
        &self,
        before: &BTreeSet<RoleId>,
        after: &BTreeSet<RoleId>,
    ) -> RoleTransition {
        match (
            before.contains(&self.monitored_role),
            after.contains(&self.monitored_role),
        ) {
            (false, true) => RoleTransition::Added,
            (true, false) => RoleTransition::Removed,
            _ => RoleTransition::Unchanged,
        }
    }

    /// Apply a role change for `user`.
    ///
    /// Without a `before` snapshot the current state is applied as-is: a
    /// holder is added if absent, anyone else is removed if present.
    pub fn on_member_update(
        &self,
        user: UserId,
        before: Option<&BTreeSet<RoleId>>,
        after: &BTreeSet<RoleId>,
    ) -> Result<RoleTransition> {
        let transition = match before {
            Some(before) if before == after => return Ok(RoleTransition::Unchanged),
            Some(before) => self.transition(before, after),
            None if after.contains(&self.monitored_role) => RoleTransition::Added,
            None => RoleTransition::Removed,
        };

        match transition {
            RoleTransition::Added => {
                self.ledger.add_if_absent(user)?;
            }
            RoleTransition::Removed => {
                self.ledger.remove(user)?;
            }
            RoleTransition::Unchanged => {
                debug!(user_id = %user, "Role change does not touch probation role");
            }
        }
        Ok(transition)
    }
}
