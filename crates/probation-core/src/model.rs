//! Identifiers and the probation record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! snowflake {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Raw platform-assigned value.
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

snowflake!(
    /// A community member, as identified by the platform.
    UserId
);
snowflake!(
    /// A guild (community) the bot serves.
    GuildId
);
snowflake!(
    /// A role within a guild.
    RoleId
);

/// One user in probation.
///
/// Immutable between creation and deletion: `entered_at` is written once on
/// insert and never refreshed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbationRecord {
    pub user_id: UserId,
    pub entered_at: DateTime<Utc>,
}

impl ProbationRecord {
    /// Create a record for a user entering probation at `entered_at`.
    pub fn new(user_id: UserId, entered_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            entered_at,
        }
    }

    /// True when the record is at or before the eligibility cutoff.
    pub fn is_eligible(&self, cutoff: DateTime<Utc>) -> bool {
        self.entered_at <= cutoff
    }
}
