//! Environment configuration for the sync layer.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::retry::{RetryPolicy, DEFAULT_BASE_DELAY_MS, DEFAULT_MAX_ATTEMPTS};
use crate::types::{Address, TypedDomain};

/// Local development chain
pub const LOCAL_CHAIN_ID: u64 = 31337;
/// Sepolia testnet
pub const SEPOLIA_CHAIN_ID: u64 = 11155111;

pub const DEFAULT_ENCRYPT_PAUSE_MS: u64 = 500;
pub const DEFAULT_LEADERBOARD_SIZE: usize = 10;

/// Deployed score contract per chain.
pub fn contract_for_chain(chain_id: u64) -> Option<Address> {
    let hex = match chain_id {
        LOCAL_CHAIN_ID => "0x4a44ab6Ab4EC21C31fca2FC25B11614c9181e1DF",
        SEPOLIA_CHAIN_ID => "0x44A230c067d7863FA9247fdb01aB047F8fEb7Ebc",
        _ => return None,
    };
    hex.parse().ok()
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("no contract deployed on chain {0}; set TETRIS_CONTRACT_ADDRESS")]
    UnknownChain(u64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    pub chain_id: u64,
    pub contract: Address,
    pub relayer_max_attempts: u32,
    pub relayer_base_delay_ms: u64,
    pub encrypt_pause_ms: u64,
    pub leaderboard_size: usize,
    /// Unset keeps all local state in memory.
    pub store_path: Option<PathBuf>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            chain_id: LOCAL_CHAIN_ID,
            contract: contract_for_chain(LOCAL_CHAIN_ID).unwrap_or(Address::ZERO),
            relayer_max_attempts: DEFAULT_MAX_ATTEMPTS,
            relayer_base_delay_ms: DEFAULT_BASE_DELAY_MS,
            encrypt_pause_ms: DEFAULT_ENCRYPT_PAUSE_MS,
            leaderboard_size: DEFAULT_LEADERBOARD_SIZE,
            store_path: None,
        }
    }
}

impl LedgerConfig {
    /// Create from `TETRIS_*` environment variables.
    ///
    /// Invalid values fall back to their defaults with a warning. The only hard
    /// failure is a chain without a known contract and no explicit address.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`LedgerConfig::from_env`] over an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let chain_id = parse_or("TETRIS_CHAIN_ID", &lookup, defaults.chain_id);
        let contract = match parse_opt::<Address>("TETRIS_CONTRACT_ADDRESS", &lookup) {
            Some(address) => address,
            None => contract_for_chain(chain_id).ok_or(ConfigError::UnknownChain(chain_id))?,
        };

        let relayer_max_attempts = parse_or(
            "TETRIS_RELAYER_MAX_ATTEMPTS",
            &lookup,
            defaults.relayer_max_attempts,
        )
        .max(1);
        let relayer_base_delay_ms = parse_or(
            "TETRIS_RELAYER_BASE_DELAY_MS",
            &lookup,
            defaults.relayer_base_delay_ms,
        );
        let encrypt_pause_ms = parse_or("TETRIS_ENCRYPT_PAUSE_MS", &lookup, defaults.encrypt_pause_ms);
        let leaderboard_size = parse_or(
            "TETRIS_LEADERBOARD_SIZE",
            &lookup,
            defaults.leaderboard_size,
        );

        let store_path = lookup("TETRIS_STORE_PATH")
            .map(|s| s.trim().to_string())
            .and_then(|s| if s.is_empty() { None } else { Some(PathBuf::from(s)) });

        Ok(Self {
            chain_id,
            contract,
            relayer_max_attempts,
            relayer_base_delay_ms,
            encrypt_pause_ms,
            leaderboard_size,
            store_path,
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.relayer_max_attempts,
            Duration::from_millis(self.relayer_base_delay_ms),
        )
    }

    pub fn encrypt_pause(&self) -> Duration {
        Duration::from_millis(self.encrypt_pause_ms)
    }

    pub fn domain(&self) -> TypedDomain {
        TypedDomain::tetris(self.chain_id, self.contract)
    }
}

fn parse_opt<T: FromStr>(key: &str, lookup: &impl Fn(&str) -> Option<String>) -> Option<T> {
    let raw = lookup(key)?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = trimmed, "invalid value, using default");
            None
        }
    }
}

fn parse_or<T: FromStr>(key: &str, lookup: &impl Fn(&str) -> Option<String>, default: T) -> T {
    parse_opt(key, lookup).unwrap_or(default)
}
