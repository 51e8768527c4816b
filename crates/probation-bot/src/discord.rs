//! Discord adapter: the [`Platform`] implementation and the gateway event
//! handler feeding the event listener.

use crate::service::ProbationService;
use async_trait::async_trait;
use probation_core::{EventListener, GuildId, Platform, PlatformError, RoleId, UserId};
use serenity::all::{Cache, Context, EventHandler, GuildMemberUpdateEvent, Http, Member, Ready};
use serenity::model::id::{
    GuildId as DiscordGuildId, RoleId as DiscordRoleId, UserId as DiscordUserId,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Page size of the guild member list endpoint.
const MEMBER_PAGE_SIZE: u64 = 1000;

const AUDIT_REASON: &str = "Probation period completed";

fn guild_id(id: GuildId) -> Result<DiscordGuildId, PlatformError> {
    match id.get() {
        0 => Err(PlatformError::GuildNotFound(id)),
        raw => Ok(DiscordGuildId::new(raw)),
    }
}

fn role_id(guild: GuildId, id: RoleId) -> Result<DiscordRoleId, PlatformError> {
    match id.get() {
        0 => Err(PlatformError::RoleNotFound { guild, role: id }),
        raw => Ok(DiscordRoleId::new(raw)),
    }
}

fn user_id(id: UserId) -> Result<DiscordUserId, PlatformError> {
    match id.get() {
        0 => Err(PlatformError::Http(format!("invalid user id {id}"))),
        raw => Ok(DiscordUserId::new(raw)),
    }
}

fn http_error(e: serenity::Error) -> PlatformError {
    PlatformError::Http(e.to_string())
}

fn role_set(roles: &[DiscordRoleId]) -> BTreeSet<RoleId> {
    roles.iter().map(|r| RoleId(r.get())).collect()
}

/// Live Discord platform over the REST API and the gateway cache.
pub struct DiscordPlatform {
    http: Arc<Http>,
    cache: Arc<Cache>,
}

impl DiscordPlatform {
    pub fn new(http: Arc<Http>, cache: Arc<Cache>) -> Self {
        Self { http, cache }
    }
}

#[async_trait]
impl Platform for DiscordPlatform {
    async fn guilds(&self) -> Vec<GuildId> {
        self.cache
            .guilds()
            .into_iter()
            .map(|g| GuildId(g.get()))
            .collect()
    }

    async fn role_members(
        &self,
        guild: GuildId,
        role: RoleId,
    ) -> Result<BTreeSet<UserId>, PlatformError> {
        if !self.role_exists(guild, role).await? {
            return Err(PlatformError::RoleNotFound { guild, role });
        }
        let discord_guild = guild_id(guild)?;
        let discord_role = role_id(guild, role)?;

        let mut holders = BTreeSet::new();
        let mut after: Option<DiscordUserId> = None;
        loop {
            let page = discord_guild
                .members(&self.http, Some(MEMBER_PAGE_SIZE), after)
                .await
                .map_err(http_error)?;
            let page_len = page.len() as u64;
            after = page.last().map(|m| m.user.id);
            holders.extend(
                page.iter()
                    .filter(|m| m.roles.contains(&discord_role))
                    .map(|m| UserId(m.user.id.get())),
            );
            if page_len < MEMBER_PAGE_SIZE || after.is_none() {
                break;
            }
        }

        Ok(holders)
    }

    async fn role_exists(&self, guild: GuildId, role: RoleId) -> Result<bool, PlatformError> {
        let roles = guild_id(guild)?
            .roles(&self.http)
            .await
            .map_err(http_error)?;
        Ok(roles.contains_key(&role_id(guild, role)?))
    }

    async fn add_role(
        &self,
        guild: GuildId,
        user: UserId,
        role: RoleId,
    ) -> Result<(), PlatformError> {
        self.http
            .add_member_role(
                guild_id(guild)?,
                user_id(user)?,
                role_id(guild, role)?,
                Some(AUDIT_REASON),
            )
            .await
            .map_err(http_error)
    }

    async fn remove_role(
        &self,
        guild: GuildId,
        user: UserId,
        role: RoleId,
    ) -> Result<(), PlatformError> {
        self.http
            .remove_member_role(
                guild_id(guild)?,
                user_id(user)?,
                role_id(guild, role)?,
                Some(AUDIT_REASON),
            )
            .await
            .map_err(http_error)
    }
}

/// Gateway event handler.
pub struct Handler {
    service: Arc<ProbationService>,
    listener: EventListener,
}

impl Handler {
    pub fn new(service: Arc<ProbationService>) -> Self {
        let monitored_role = service.config().probation.monitored_role;
        let listener = EventListener::new(service.ledger(), monitored_role);
        Self { service, listener }
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!(user = %ready.user.name, guilds = ready.guilds.len(), "Logged in");
    }

    async fn cache_ready(&self, ctx: Context, guilds: Vec<DiscordGuildId>) {
        info!(guilds = guilds.len(), "Guild cache ready");
        let platform = Arc::new(DiscordPlatform::new(
            Arc::clone(&ctx.http),
            Arc::clone(&ctx.cache),
        ));
        if !self.service.start_workers(platform) {
            info!("Workers already running, ignoring repeated cache ready");
        }
    }

    async fn guild_member_update(
        &self,
        _ctx: Context,
        old_if_available: Option<Member>,
        _new: Option<Member>,
        event: GuildMemberUpdateEvent,
    ) {
        let user = UserId(event.user.id.get());
        let before = old_if_available.as_ref().map(|m| role_set(&m.roles));
        let after = role_set(&event.roles);
        if before.is_none() {
            warn!(
                user_id = %user,
                guild_id = %event.guild_id,
                "No cached roles for member, applying current state"
            );
        }

        // One bad notification must not stop the next one.
        if let Err(e) = self.listener.on_member_update(user, before.as_ref(), &after) {
            error!(
                user_id = %user,
                guild_id = %event.guild_id,
                error = %e,
                "Failed to apply role change"
            );
        }
    }
}
