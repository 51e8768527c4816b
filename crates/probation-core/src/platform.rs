//! The chat platform capability.
//!
//! Role membership reported here is authoritative, but any call may fail.
//! Callers recover from [`PlatformError`] per guild and never crash on it.

use crate::model::{GuildId, RoleId, UserId};
use async_trait::async_trait;
use std::collections::BTreeSet;
use thiserror::Error;

/// Errors reported by the platform. All of them are transient from the
/// point of view of the periodic tasks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    /// The guild is unknown or no longer reachable.
    #[error("guild {0} not found")]
    GuildNotFound(GuildId),

    /// The role does not exist in the guild.
    #[error("role {role} not found in guild {guild}")]
    RoleNotFound { guild: GuildId, role: RoleId },

    /// Transport or API failure.
    #[error("HTTP failure: {0}")]
    Http(String),
}

/// Operations consumed from the chat platform.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Guilds the bot currently serves.
    async fn guilds(&self) -> Vec<GuildId>;

    /// Every member of `guild` currently holding `role`.
    ///
    /// Returns [`PlatformError::RoleNotFound`] if the role does not exist.
    async fn role_members(
        &self,
        guild: GuildId,
        role: RoleId,
    ) -> Result<BTreeSet<UserId>, PlatformError>;

    /// Whether `role` exists in `guild`.
    async fn role_exists(&self, guild: GuildId, role: RoleId) -> Result<bool, PlatformError>;

    /// Grant `role` to a member. Granting a role already held is a no-op.
    async fn add_role(
        &self,
        guild: GuildId,
        user: UserId,
        role: RoleId,
    ) -> Result<(), PlatformError>;

    /// Revoke `role` from a member. Revoking a role not held is a no-op.
    async fn remove_role(
        &self,
        guild: GuildId,
        user: UserId,
        role: RoleId,
    ) -> Result<(), PlatformError>;
}
