//! Collaborator seams.
//!
//! The sync layer talks to three external capabilities:
//! - [`WalletSigner`]: the player's wallet (typed-data signatures)
//! - [`LedgerClient`]: the score contract (reads, mutations, confirmations)
//! - [`EncryptionGateway`]: the encrypted-computation relayer
//!
//! Implementations return already-classified [`SyncError`]s; adapters that only
//! see raw failure text should map it with [`crate::classify_failure`].

use async_trait::async_trait;

use crate::error::SyncError;
use crate::types::{
    Address, CheckInStatus, EncryptedInput, EncryptedScore, Handle, PendingTx, ScoreInfo,
    ScoreSubmission, Signature, TxReceipt, TypedDomain, TypedMessage,
};

/// The player's wallet.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    /// Address of the connected account.
    fn address(&self) -> Address;

    /// Ask the wallet holder to sign a typed message.
    async fn sign_typed_data(
        &self,
        domain: &TypedDomain,
        message: &TypedMessage,
    ) -> Result<Signature, SyncError>;

    /// Recover the address that produced `signature` over `message`.
    async fn verify_typed_data(
        &self,
        domain: &TypedDomain,
        message: &TypedMessage,
        signature: &Signature,
    ) -> Result<Address, SyncError>;
}

/// Score contract, bound to the connected account for mutations.
///
/// Mutations return a [`PendingTx`]; state is only trusted after [`LedgerClient::confirm`].
#[async_trait]
pub trait LedgerClient: Send + Sync {
    async fn total_scores(&self) -> Result<u64, SyncError>;

    async fn score_info(&self, index: u64) -> Result<ScoreInfo, SyncError>;

    async fn encrypted_score(&self, index: u64) -> Result<EncryptedScore, SyncError>;

    async fn plays(&self, player: Address) -> Result<u32, SyncError>;

    async fn check_in_status(&self, player: Address) -> Result<CheckInStatus, SyncError>;

    async fn submit_score(&self, submission: ScoreSubmission) -> Result<PendingTx, SyncError>;

    async fn check_in(&self) -> Result<PendingTx, SyncError>;

    async fn use_play(&self) -> Result<PendingTx, SyncError>;

    async fn claim_first_connect_bonus(&self, signature: &Signature) -> Result<PendingTx, SyncError>;

    /// Wait until `pending` is included (or fails).
    async fn confirm(&self, pending: PendingTx) -> Result<TxReceipt, SyncError>;
}

/// Encrypted-computation relayer.
#[async_trait]
pub trait EncryptionGateway: Send + Sync {
    /// Encrypt `value` for `contract`, bound to `player`.
    async fn encrypt(
        &self,
        contract: Address,
        player: Address,
        value: u32,
    ) -> Result<EncryptedInput, SyncError>;

    /// Decrypt a publicly decryptable handle.
    async fn public_decrypt(&self, handle: Handle) -> Result<u32, SyncError>;
}
