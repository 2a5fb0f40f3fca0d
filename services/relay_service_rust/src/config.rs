//! Configuration for the relay service
//!
//! Loaded from environment variables (optionally via `.env`) with defaults
//! matching the stock game-server deployment.

use anyhow::{anyhow, Context, Result};
use relay_core::MessageTarget;
use std::env;
use std::net::IpAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::listener::ConnectionPolicy;

#[derive(Debug, Clone)]
pub struct RelayConfig {
    // Listeners
    pub bind_ip: IpAddr,
    pub room_port: u16,
    pub anticheat_port: u16,
    /// Bound on the single frame read; `None` waits forever
    pub frame_read_timeout: Option<Duration>,
    pub connection_policy: ConnectionPolicy,

    // Bot backend
    pub bot_http_url: String,
    pub bot_send_to_group: bool,
    pub bot_target_id: i64,
    pub bot_http_timeout: Duration,

    // Anti-cheat
    pub ban_threshold: u32,
    pub ban_log_path: PathBuf,
    /// Non-banned records idle longer than this are pruned
    pub report_idle_ttl: Option<Duration>,

    /// 0 = unbounded
    pub room_registry_capacity: usize,
}

impl RelayConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_ip = parse_env(&lookup, "RELAY_BIND_IP", IpAddr::from([127, 0, 0, 1]))?;
        let room_port = parse_env(&lookup, "ROOM_PORT", 25000u16)?;
        let anticheat_port = parse_env(&lookup, "ANTICHEAT_PORT", 25250u16)?;
        let frame_read_timeout = optional_secs(parse_env(&lookup, "FRAME_READ_TIMEOUT_SECS", 10u64)?);
        let connection_policy = if parse_bool_env(&lookup, "RETAIN_CONNECTIONS", false)? {
            ConnectionPolicy::Retain
        } else {
            ConnectionPolicy::Close
        };

        let bot_http_url = lookup("BOT_HTTP_URL").unwrap_or_else(|| "http://localhost:3000".to_string());
        let bot_send_to_group = parse_bool_env(&lookup, "BOT_SEND_TO_GROUP", false)?;
        let bot_target_id = parse_env(&lookup, "BOT_TARGET_ID", 2133404320i64)?;
        let bot_http_timeout = Duration::from_secs(parse_env(&lookup, "BOT_HTTP_TIMEOUT_SECS", 10u64)?);

        let ban_threshold = parse_env(&lookup, "BAN_THRESHOLD", 5u32)?;
        let ban_log_path = lookup("BAN_LOG_PATH")
            .unwrap_or_else(|| "./EAC.txt".to_string())
            .into();
        let report_idle_ttl = optional_secs(parse_env(&lookup, "REPORT_IDLE_TTL_SECS", 0u64)?);

        let room_registry_capacity = parse_env(&lookup, "ROOM_REGISTRY_CAPACITY", 0usize)?;

        Ok(Self {
            bind_ip,
            room_port,
            anticheat_port,
            frame_read_timeout,
            connection_policy,
            bot_http_url,
            bot_send_to_group,
            bot_target_id,
            bot_http_timeout,
            ban_threshold,
            ban_log_path,
            report_idle_ttl,
            room_registry_capacity,
        })
    }

    pub fn message_target(&self) -> MessageTarget {
        if self.bot_send_to_group {
            MessageTarget::Group(self.bot_target_id)
        } else {
            MessageTarget::Private(self.bot_target_id)
        }
    }

    /// Log current configuration (useful at startup)
    pub fn log_config(&self) {
        log::info!("RelayConfig loaded:");
        log::info!("  bind_ip: {}", self.bind_ip);
        log::info!("  room_port: {}", self.room_port);
        log::info!("  anticheat_port: {}", self.anticheat_port);
        log::info!("  frame_read_timeout: {:?}", self.frame_read_timeout);
        log::info!("  connection_policy: {:?}", self.connection_policy);
        log::info!("  bot_http_url: {}", self.bot_http_url);
        log::info!("  bot_target: {:?}", self.message_target());
        log::info!("  ban_threshold: {}", self.ban_threshold);
        log::info!("  ban_log_path: {}", self.ban_log_path.display());
        log::info!("  report_idle_ttl: {:?}", self.report_idle_ttl);
        log::info!("  room_registry_capacity: {}", self.room_registry_capacity);
    }
}

fn optional_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

fn parse_env<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow!("{e}"))
            .with_context(|| format!("Invalid {key}: {raw}")),
    }
}

fn parse_bool_env<F>(lookup: &F, key: &str, default: bool) -> Result<bool>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Ok(true),
        "0" | "false" | "no" | "n" | "off" => Ok(false),
        _ => Err(anyhow!("Invalid {key}: {raw} (expected true|false)")),
    }
}
