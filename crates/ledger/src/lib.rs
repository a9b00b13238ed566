//! Ledger synchronisation for finished games.
//!
//! Turns a frozen [`GameResult`](crate::game::GameResult) into an encrypted ledger
//! record and back into a public leaderboard, while tracking per-session
//! authorization and the player's play-credit balance.
//!
//! # Module Structure
//!
//! - [`error`] / [`classify`]: failure taxonomy and raw-text classification
//! - [`types`]: addresses, handles, typed messages, ledger records
//! - [`traits`]: collaborator seams (`WalletSigner`, `LedgerClient`, `EncryptionGateway`)
//! - [`store`]: session-scoped and persistent local state
//! - [`auth`]: session signature manager
//! - [`credits`]: play-credit client (balance mirror, plays, check-in, first-connect bonus)
//! - [`retry`]: exponential backoff for transient failures
//! - [`submission`]: encrypt → submit → confirm pipeline
//! - [`leaderboard`]: fetch, decrypt, rank
//! - [`config`]: environment configuration
//! - [`local`]: offline in-process collaborators
//! - [`client`]: `SyncClient` facade turning every outcome into a status line
//!
//! All network-facing functions are `async` and expect a tokio runtime.

pub mod auth;
pub mod classify;
pub mod client;
pub mod config;
pub mod credits;
pub mod error;
pub mod leaderboard;
pub mod local;
pub mod retry;
pub mod store;
pub mod submission;
pub mod traits;
pub mod types;

#[cfg(test)]
pub(crate) mod mock;

pub use fhe_tetris_types as game;

pub use auth::SessionAuthManager;
pub use classify::classify_failure;
pub use client::{StatusReport, SyncClient};
pub use config::{ConfigError, LedgerConfig};
pub use credits::{BonusClaim, CheckInOutcome, PlayBalance, PlayCreditClient};
pub use error::{ErrorKind, SyncError};
pub use leaderboard::{LeaderboardAggregator, LeaderboardRefresh};
pub use local::{LocalGateway, LocalLedger, LocalSigner};
pub use retry::RetryPolicy;
pub use store::{FileSessionStore, MemorySessionStore, SessionStore, StoreError};
pub use submission::{PublishOutcome, ScoreField, ScoreSubmissionPipeline, SubmissionStage};
pub use traits::{EncryptionGateway, LedgerClient, WalletSigner};
pub use types::*;
