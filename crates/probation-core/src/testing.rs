//! In-memory ledger and scripted platform for unit tests.

use crate::error::{Error, Result};
use crate::ledger::Ledger;
use crate::model::{GuildId, ProbationRecord, RoleId, UserId};
use crate::platform::{Platform, PlatformError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Ledger backed by a map, counting every call that reaches it.
#[derive(Default)]
pub struct MemoryLedger {
    records: Mutex<BTreeMap<UserId, ProbationRecord>>,
    calls: AtomicUsize,
    fail_removals: AtomicBool,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: &[u64], entered_at: DateTime<Utc>) -> Self {
        let ledger = Self::new();
        for &user in users {
            ledger.add_if_absent_at(UserId(user), entered_at).unwrap();
        }
        ledger.calls.store(0, Ordering::SeqCst);
        ledger
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn fail_removals(&self) {
        self.fail_removals.store(true, Ordering::SeqCst);
    }

    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl Ledger for MemoryLedger {
    fn add_if_absent_at(&self, user_id: UserId, now: DateTime<Utc>) -> Result<bool> {
        self.touch();
        let mut records = self.records.lock().unwrap();
        if records.contains_key(&user_id) {
            return Ok(false);
        }
        records.insert(user_id, ProbationRecord::new(user_id, now));
        Ok(true)
    }

    fn remove(&self, user_id: UserId) -> Result<bool> {
        self.touch();
        if self.fail_removals.load(Ordering::SeqCst) {
            return Err(Error::Ledger("disk full".into()));
        }
        Ok(self.records.lock().unwrap().remove(&user_id).is_some())
    }

    fn get(&self, user_id: UserId) -> Result<Option<ProbationRecord>> {
        self.touch();
        Ok(self.records.lock().unwrap().get(&user_id).cloned())
    }

    fn records(&self) -> Result<Vec<ProbationRecord>> {
        self.touch();
        Ok(self.records.lock().unwrap().values().cloned().collect())
    }
}

/// A role mutation the fake platform accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Add(GuildId, UserId, RoleId),
    Remove(GuildId, UserId, RoleId),
}

#[derive(Default)]
struct FakeGuild {
    roles: BTreeSet<RoleId>,
    members: BTreeMap<UserId, BTreeSet<RoleId>>,
    unreachable: bool,
}

/// Platform whose guilds, roles and failures are scripted by the test.
#[derive(Default)]
pub struct FakePlatform {
    guilds: Mutex<BTreeMap<GuildId, FakeGuild>>,
    mutations: Mutex<Vec<Mutation>>,
    failing_users: Mutex<BTreeSet<UserId>>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_guild(&self, guild: u64, roles: &[u64]) {
        let mut guilds = self.guilds.lock().unwrap();
        let entry = guilds.entry(GuildId(guild)).or_default();
        entry.roles.extend(roles.iter().copied().map(RoleId));
    }

    pub fn add_member(&self, guild: u64, user: u64, roles: &[u64]) {
        let mut guilds = self.guilds.lock().unwrap();
        let entry = guilds.entry(GuildId(guild)).or_default();
        entry
            .members
            .entry(UserId(user))
            .or_default()
            .extend(roles.iter().copied().map(RoleId));
    }

    pub fn make_unreachable(&self, guild: u64) {
        if let Some(g) = self.guilds.lock().unwrap().get_mut(&GuildId(guild)) {
            g.unreachable = true;
        }
    }

    pub fn fail_mutations_for(&self, user: u64) {
        self.failing_users.lock().unwrap().insert(UserId(user));
    }

    pub fn mutations(&self) -> Vec<Mutation> {
        self.mutations.lock().unwrap().clone()
    }

    pub fn member_roles(&self, guild: u64, user: u64) -> BTreeSet<RoleId> {
        self.guilds
            .lock()
            .unwrap()
            .get(&GuildId(guild))
            .and_then(|g| g.members.get(&UserId(user)).cloned())
            .unwrap_or_default()
    }

    fn check_guild(&self, guild: GuildId) -> std::result::Result<(), PlatformError> {
        match self.guilds.lock().unwrap().get(&guild) {
            None => Err(PlatformError::GuildNotFound(guild)),
            Some(g) if g.unreachable => Err(PlatformError::Http("503 Service Unavailable".into())),
            Some(_) => Ok(()),
        }
    }

    fn mutate(
        &self,
        guild: GuildId,
        user: UserId,
        role: RoleId,
        grant: bool,
    ) -> std::result::Result<(), PlatformError> {
        self.check_guild(guild)?;
        if self.failing_users.lock().unwrap().contains(&user) {
            return Err(PlatformError::Http("403 Forbidden".into()));
        }
        let mut guilds = self.guilds.lock().unwrap();
        let roles = guilds
            .get_mut(&guild)
            .map(|g| g.members.entry(user).or_default())
            .ok_or(PlatformError::GuildNotFound(guild))?;
        let mutation = if grant {
            roles.insert(role);
            Mutation::Add(guild, user, role)
        } else {
            roles.remove(&role);
            Mutation::Remove(guild, user, role)
        };
        self.mutations.lock().unwrap().push(mutation);
        Ok(())
    }
}

#[async_trait]
impl Platform for FakePlatform {
    async fn guilds(&self) -> Vec<GuildId> {
        self.guilds.lock().unwrap().keys().copied().collect()
    }

    async fn role_members(
        &self,
        guild: GuildId,
        role: RoleId,
    ) -> std::result::Result<BTreeSet<UserId>, PlatformError> {
        self.check_guild(guild)?;
        let guilds = self.guilds.lock().unwrap();
        let g = guilds.get(&guild).ok_or(PlatformError::GuildNotFound(guild))?;
        if !g.roles.contains(&role) {
            return Err(PlatformError::RoleNotFound { guild, role });
        }
        let holders = g
            .members
            .iter()
            .filter(|(_, roles)| roles.contains(&role))
            .map(|(user, _)| *user)
            .collect();
        Ok(holders)
    }

    async fn role_exists(
        &self,
        guild: GuildId,
        role: RoleId,
    ) -> std::result::Result<bool, PlatformError> {
        self.check_guild(guild)?;
        Ok(self
            .guilds
            .lock()
            .unwrap()
            .get(&guild)
            .is_some_and(|g| g.roles.contains(&role)))
    }

    async fn add_role(
        &self,
        guild: GuildId,
        user: UserId,
        role: RoleId,
    ) -> std::result::Result<(), PlatformError> {
        self.mutate(guild, user, role, true)
    }

    async fn remove_role(
        &self,
        guild: GuildId,
        user: UserId,
        role: RoleId,
    ) -> std::result::Result<(), PlatformError> {
        self.mutate(guild, user, role, false)
    }
}
