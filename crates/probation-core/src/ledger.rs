//! The probation ledger capability.
//!
//! Every component that needs the ledger depends on this trait, never on a
//! concrete backend. Implementations must make each mutation durable before
//! returning and must serialise concurrent inserts for the same user.

use crate::error::Result;
use crate::model::{ProbationRecord, UserId};
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::BTreeSet;

/// Durable mapping from user to probation-entry timestamp.
pub trait Ledger: Send + Sync {
    /// Insert a record entered at `now` unless one exists for `user_id`.
    ///
    /// Returns `true` if a record was written. An existing record keeps its
    /// original timestamp.
    fn add_if_absent_at(&self, user_id: UserId, now: DateTime<Utc>) -> Result<bool>;

    /// Delete the record for `user_id`. Returns `true` if one existed.
    fn remove(&self, user_id: UserId) -> Result<bool>;

    /// Point lookup.
    fn get(&self, user_id: UserId) -> Result<Option<ProbationRecord>>;

    /// Snapshot of every record.
    fn records(&self) -> Result<Vec<ProbationRecord>>;

    /// Insert a record entered now unless one exists.
    fn add_if_absent(&self, user_id: UserId) -> Result<bool> {
        self.add_if_absent_at(user_id, Utc::now())
    }

    /// Snapshot of every tracked user.
    fn user_ids(&self) -> Result<BTreeSet<UserId>> {
        Ok(self.records()?.into_iter().map(|r| r.user_id).collect())
    }

    /// Users whose probation started at least `wait` before `now`.
    fn eligible_user_ids_at(
        &self,
        wait: TimeDelta,
        now: DateTime<Utc>,
    ) -> Result<BTreeSet<UserId>> {
        let Some(cutoff) = now.checked_sub_signed(wait) else {
            return Ok(BTreeSet::new());
        };
        Ok(self
            .records()?
            .into_iter()
            .filter(|r| r.is_eligible(cutoff))
            .map(|r| r.user_id)
            .collect())
    }

    /// Users whose probation started at least `wait` ago.
    fn eligible_user_ids(&self, wait: TimeDelta) -> Result<BTreeSet<UserId>> {
        self.eligible_user_ids_at(wait, Utc::now())
    }
}
