//! Startup configuration read from the environment.

use crate::error::{Error, Result};
use chrono::TimeDelta;
use probation_core::{ProbationConfig, RoleId, TaskSchedule};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const ENV_DB: &str = "QOBOTDB";
pub const ENV_MONITORED_ROLE: &str = "QOBOTROLEID";
pub const ENV_VALIDATED_ROLE: &str = "QOBOTVALIDATEDROLEID";
pub const ENV_TOKEN: &str = "TOKEN";
pub const ENV_DRY_RUN: &str = "QOBOT_DRY_RUN";
pub const ENV_SCAN_INTERVAL: &str = "QOBOT_SCAN_INTERVAL_SECS";
pub const ENV_PROMOTE_INTERVAL: &str = "QOBOT_PROMOTE_INTERVAL_SECS";
pub const ENV_WAIT: &str = "QOBOT_WAIT_SECS";
pub const ENV_CYCLE_TIMEOUT: &str = "QOBOT_CYCLE_TIMEOUT_SECS";
pub const ENV_LOG_FILE: &str = "QOBOT_LOG_FILE";

const DEFAULT_LOG_FILE: &str = "qobot.log";

/// Configuration for the bot process.
#[derive(Clone)]
pub struct BotConfig {
    /// RocksDB directory holding the ledger
    pub db_path: PathBuf,

    /// Bot auth token
    pub token: String,

    /// Roles, waiting period and dry-run flag
    pub probation: ProbationConfig,

    /// Reconcile/promote intervals
    pub schedule: TaskSchedule,

    /// Append-only operation log, if any
    pub log_file: Option<PathBuf>,
}

impl std::fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotConfig")
            .field("db_path", &self.db_path)
            .field("token", &"<redacted>")
            .field("probation", &self.probation)
            .field("schedule", &self.schedule)
            .field("log_file", &self.log_file)
            .finish()
    }
}

impl BotConfig {
    /// Read config from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read config through `lookup`. Missing required keys are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| Error::Config(format!("{key} is not set")))
        };

        let db_path = PathBuf::from(required(ENV_DB)?);
        let token = required(ENV_TOKEN)?;
        let monitored_role = RoleId(parse_role(
            ENV_MONITORED_ROLE,
            &required(ENV_MONITORED_ROLE)?,
        )?);
        let validated_role = RoleId(parse_role(
            ENV_VALIDATED_ROLE,
            &required(ENV_VALIDATED_ROLE)?,
        )?);
        if monitored_role == validated_role {
            return Err(Error::Config(format!(
                "{ENV_MONITORED_ROLE} and {ENV_VALIDATED_ROLE} must differ"
            )));
        }

        let optional = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let dry_run = match optional(ENV_DRY_RUN) {
            Some(v) => parse_bool(ENV_DRY_RUN, &v)?,
            None => false,
        };

        let wait_secs = parse_or::<u64>(ENV_WAIT, optional(ENV_WAIT), 7 * 24 * 60 * 60)?;
        let wait = i64::try_from(wait_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .ok_or_else(|| Error::Config(format!("{ENV_WAIT} is out of range")))?;

        let defaults = TaskSchedule::default();
        let schedule = TaskSchedule {
            reconcile_every: secs(
                ENV_SCAN_INTERVAL,
                optional(ENV_SCAN_INTERVAL),
                defaults.reconcile_every,
            )?,
            promote_every: secs(
                ENV_PROMOTE_INTERVAL,
                optional(ENV_PROMOTE_INTERVAL),
                defaults.promote_every,
            )?,
            cycle_timeout: secs(
                ENV_CYCLE_TIMEOUT,
                optional(ENV_CYCLE_TIMEOUT),
                defaults.cycle_timeout,
            )?,
        };

        // Set-but-empty disables the file log.
        let log_file = match lookup(ENV_LOG_FILE) {
            Some(v) if v.trim().is_empty() => None,
            Some(v) => Some(PathBuf::from(v.trim())),
            None => Some(PathBuf::from(DEFAULT_LOG_FILE)),
        };

        Ok(Self {
            db_path,
            token,
            probation: ProbationConfig::new(monitored_role, validated_role)
                .with_wait(wait)
                .with_dry_run(dry_run),
            schedule,
            log_file,
        })
    }
}

fn parse_role(key: &str, value: &str) -> Result<u64> {
    match value.parse::<u64>() {
        Ok(0) | Err(_) => Err(Error::Config(format!(
            "{key} must be a non-zero integer id, got {value:?}"
        ))),
        Ok(id) => Ok(id),
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::Config(format!("{key} must be a boolean, got {value:?}"))),
    }
}

fn parse_or<T: FromStr>(key: &str, value: Option<String>, default: T) -> Result<T> {
    match value {
        Some(v) => v
            .parse()
            .map_err(|_| Error::Config(format!("{key} is not a valid number: {v:?}"))),
        None => Ok(default),
    }
}

fn secs(key: &str, value: Option<String>, default: Duration) -> Result<Duration> {
    let secs = parse_or(key, value, default.as_secs())?;
    if secs == 0 {
        return Err(Error::Config(format!("{key} must be greater than zero")));
    }
    Ok(Duration::from_secs(secs))
}
