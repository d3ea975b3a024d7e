use std::{
    env,
    net::{IpAddr, Ipv4Addr, SocketAddr},
};

use crate::generator::DEFAULT_REROLL_LIMIT;
use crate::history::DEFAULT_HISTORY_CAPACITY;

/// Host settings for the reference server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouletteConfig {
    pub command_bind: SocketAddr,
    pub message_bind: SocketAddr,
    pub history_capacity: usize,
    pub reroll_limit: u32,
    /// Fixed generator seed; entropy when unset.
    pub seed: Option<u64>,
}

impl Default for RouletteConfig {
    fn default() -> Self {
        Self {
            command_bind: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 42001),
            message_bind: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 42000),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            reroll_limit: DEFAULT_REROLL_LIMIT,
            seed: None,
        }
    }
}

impl RouletteConfig {
    /// Defaults overridden by `ROULETTE_COMMAND_BIND`, `ROULETTE_MESSAGE_BIND`,
    /// `ROULETTE_HISTORY_LIMIT`, `ROULETTE_REROLL_LIMIT` and `ROULETTE_SEED`.
    /// Unparseable values are logged and ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(addr) = read_env("ROULETTE_COMMAND_BIND") {
            config.command_bind = addr;
        }
        if let Some(addr) = read_env("ROULETTE_MESSAGE_BIND") {
            config.message_bind = addr;
        }
        if let Some(limit) = read_env::<usize>("ROULETTE_HISTORY_LIMIT") {
            config.history_capacity = limit.max(1);
        }
        if let Some(limit) = read_env("ROULETTE_REROLL_LIMIT") {
            config.reroll_limit = limit;
        }
        config.seed = read_env("ROULETTE_SEED");
        config
    }
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(
                target: "roulette::config",
                key,
                value = %raw,
                error = %err,
                "config.env_ignored"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_bind_loopback() {
        let config = RouletteConfig::default();
        assert!(config.command_bind.ip().is_loopback());
        assert_ne!(config.command_bind, config.message_bind);
        assert_eq!(config.history_capacity, DEFAULT_HISTORY_CAPACITY);
        assert_eq!(config.seed, None);
    }

    #[test]
    fn unparseable_env_values_are_ignored() {
        env::set_var("ROULETTE_TEST_BOGUS_ADDR", "not-an-address");
        assert_eq!(read_env::<SocketAddr>("ROULETTE_TEST_BOGUS_ADDR"), None);
        env::set_var("ROULETTE_TEST_SEED", " 1234 ");
        assert_eq!(read_env::<u64>("ROULETTE_TEST_SEED"), Some(1234));
        env::remove_var("ROULETTE_TEST_BOGUS_ADDR");
        env::remove_var("ROULETTE_TEST_SEED");
    }
}
