//! Offline, in-process collaborators.
//!
//! `LocalLedger` enforces the score contract's rules (play credits, check-in
//! cooldown, one-time bonus) against shared in-memory state. `LocalGateway`
//! issues opaque handles instead of real ciphertexts. `LocalSigner` is a
//! deterministic development wallet. Together they let the binary and the tests
//! run the whole sync protocol without a network.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::classify::classify_failure;
use crate::error::SyncError;
use crate::traits::{EncryptionGateway, LedgerClient, WalletSigner};
use crate::types::{
    Address, CheckInStatus, Clock, EncryptedInput, EncryptedScore, Handle, InputProof, PendingTx,
    ScoreInfo, ScoreSubmission, Signature, TxHash, TxReceipt, TypedDomain, TypedMessage,
    CHECK_IN_COOLDOWN_SECS,
};

/// Plays granted by the one-time first-connect bonus
pub const FIRST_CONNECT_BONUS: u32 = 5;
/// Plays granted per check-in
pub const CHECK_IN_REWARD: u32 = 10;

fn sha256(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

// ============================================================================
// Ledger
// ============================================================================

#[derive(Debug, Clone)]
struct StoredScore {
    player: Address,
    timestamp: u64,
    handles: EncryptedScore,
}

#[derive(Debug, Default)]
struct LedgerState {
    plays: HashMap<Address, u32>,
    last_check_in: HashMap<Address, u64>,
    bonus_claimed: HashSet<Address>,
    scores: Vec<StoredScore>,
    /// Sent but unconfirmed transactions
    pending: HashSet<TxHash>,
    tx_count: u64,
    block: u64,
}

/// In-memory score contract.
///
/// Clones share state; [`LocalLedger::connect`] returns a handle whose
/// mutations are sent from another account.
#[derive(Clone)]
pub struct LocalLedger {
    state: Arc<Mutex<LedgerState>>,
    clock: Arc<dyn Clock>,
    account: Address,
    /// Deployment without the plays feature (no plays/usePlay/bonus).
    legacy: bool,
}

impl LocalLedger {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::new(Mutex::new(LedgerState::default())),
            clock,
            account: Address::ZERO,
            legacy: false,
        }
    }

    /// Older deployment: play-credit functions revert without data.
    pub fn legacy(clock: Arc<dyn Clock>) -> Self {
        Self {
            legacy: true,
            ..Self::new(clock)
        }
    }

    /// Handle over the same state that sends transactions as `account`.
    pub fn connect(&self, account: Address) -> Self {
        Self {
            account,
            ..self.clone()
        }
    }

    pub fn account(&self) -> Address {
        self.account
    }

    fn state(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn revert(reason: &str) -> SyncError {
        classify_failure(None, &format!("execution reverted: {reason}"))
    }

    fn missing_function() -> SyncError {
        classify_failure(Some("CALL_EXCEPTION"), "execution reverted (no data)")
    }

    fn send(&self, state: &mut LedgerState, action: &str) -> PendingTx {
        state.tx_count += 1;
        let hash = TxHash(sha256(&[
            &self.account.0,
            &state.tx_count.to_be_bytes(),
            action.as_bytes(),
        ]));
        state.pending.insert(hash);
        debug!(%hash, account = %self.account, action, "local transaction sent");
        PendingTx { hash }
    }
}

#[async_trait]
impl LedgerClient for LocalLedger {
    async fn total_scores(&self) -> Result<u64, SyncError> {
        Ok(self.state().scores.len() as u64)
    }

    async fn score_info(&self, index: u64) -> Result<ScoreInfo, SyncError> {
        let state = self.state();
        Ok(match state.scores.get(index as usize) {
            Some(stored) => ScoreInfo {
                player: stored.player,
                timestamp: stored.timestamp,
                exists: true,
            },
            None => ScoreInfo {
                player: Address::ZERO,
                timestamp: 0,
                exists: false,
            },
        })
    }

    async fn encrypted_score(&self, index: u64) -> Result<EncryptedScore, SyncError> {
        self.state()
            .scores
            .get(index as usize)
            .map(|stored| stored.handles)
            .ok_or_else(|| Self::revert("Invalid score index"))
    }

    async fn plays(&self, player: Address) -> Result<u32, SyncError> {
        if self.legacy {
            return Err(Self::missing_function());
        }
        Ok(self.state().plays.get(&player).copied().unwrap_or(0))
    }

    async fn check_in_status(&self, player: Address) -> Result<CheckInStatus, SyncError> {
        let last_check_in = self.state().last_check_in.get(&player).copied().unwrap_or(0);
        Ok(CheckInStatus {
            last_check_in,
            cooldown_secs: CHECK_IN_COOLDOWN_SECS,
        })
    }

    async fn submit_score(&self, submission: ScoreSubmission) -> Result<PendingTx, SyncError> {
        let now = self.clock.now_secs();
        let mut state = self.state();
        state.scores.push(StoredScore {
            player: self.account,
            timestamp: now,
            handles: EncryptedScore {
                score: submission.score.handle,
                lines: submission.lines.handle,
                level: submission.level.handle,
            },
        });
        Ok(self.send(&mut state, "submitScore"))
    }

    async fn check_in(&self) -> Result<PendingTx, SyncError> {
        let now = self.clock.now_secs();
        let mut state = self.state();

        let status = CheckInStatus {
            last_check_in: state.last_check_in.get(&self.account).copied().unwrap_or(0),
            cooldown_secs: CHECK_IN_COOLDOWN_SECS,
        };
        if !status.can_check_in(now) {
            return Err(Self::revert("Check-in cooldown not expired"));
        }

        state.last_check_in.insert(self.account, now);
        *state.plays.entry(self.account).or_insert(0) += CHECK_IN_REWARD;
        Ok(self.send(&mut state, "checkIn"))
    }

    async fn use_play(&self) -> Result<PendingTx, SyncError> {
        if self.legacy {
            return Err(Self::missing_function());
        }
        let mut state = self.state();
        match state.plays.get_mut(&self.account) {
            Some(plays) if *plays > 0 => *plays -= 1,
            _ => return Err(Self::revert("No plays remaining")),
        }
        Ok(self.send(&mut state, "usePlay"))
    }

    async fn claim_first_connect_bonus(&self, signature: &Signature) -> Result<PendingTx, SyncError> {
        if self.legacy {
            return Err(Self::missing_function());
        }
        if signature.0.is_empty() {
            return Err(Self::revert("Invalid signature"));
        }
        let mut state = self.state();
        if !state.bonus_claimed.insert(self.account) {
            return Err(Self::revert("Bonus already claimed"));
        }
        *state.plays.entry(self.account).or_insert(0) += FIRST_CONNECT_BONUS;
        Ok(self.send(&mut state, "claimFirstConnectBonus"))
    }

    async fn confirm(&self, pending: PendingTx) -> Result<TxReceipt, SyncError> {
        let mut state = self.state();
        if !state.pending.remove(&pending.hash) {
            return Err(SyncError::Unknown(format!(
                "unknown transaction {}",
                pending.hash
            )));
        }
        state.block += 1;
        Ok(TxReceipt {
            hash: pending.hash,
            block: state.block,
        })
    }
}

// ============================================================================
// Gateway
// ============================================================================

/// Handle-issuing stand-in for the encryption relayer.
///
/// Every handle is publicly decryptable, as if the contract had called
/// `makePubliclyDecryptable` on it.
#[derive(Clone, Default)]
pub struct LocalGateway {
    values: Arc<Mutex<HashMap<Handle, u32>>>,
}

impl LocalGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn values(&self) -> MutexGuard<'_, HashMap<Handle, u32>> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl EncryptionGateway for LocalGateway {
    async fn encrypt(
        &self,
        contract: Address,
        player: Address,
        value: u32,
    ) -> Result<EncryptedInput, SyncError> {
        let mut values = self.values();
        let nonce = values.len() as u64;
        let handle = Handle(sha256(&[
            &contract.0,
            &player.0,
            &nonce.to_be_bytes(),
            &value.to_be_bytes(),
        ]));
        values.insert(handle, value);

        let proof = InputProof(sha256(&[&handle.0, &player.0]).to_vec());
        Ok(EncryptedInput { handle, proof })
    }

    async fn public_decrypt(&self, handle: Handle) -> Result<u32, SyncError> {
        self.values()
            .get(&handle)
            .copied()
            .ok_or_else(|| SyncError::Unknown(format!("handle {handle} is not decryptable")))
    }
}

// ============================================================================
// Signer
// ============================================================================

const SIGNATURE_LEN: usize = 20 + 32;

/// Deterministic development wallet.
///
/// A signature is the signer's address followed by a tag over the typed-data
/// digest, so verification can recover the address without key material.
#[derive(Debug, Clone)]
pub struct LocalSigner {
    address: Address,
}

impl LocalSigner {
    /// Wallet whose address is derived from `seed`.
    pub fn from_seed(seed: &str) -> Self {
        let digest = sha256(&[b"fhe-tetris-dev-wallet", seed.as_bytes()]);
        let mut address = [0u8; 20];
        address.copy_from_slice(&digest[..20]);
        Self {
            address: Address(address),
        }
    }

    pub fn with_address(address: Address) -> Self {
        Self { address }
    }

    fn tag(address: &Address, digest: &[u8; 32]) -> [u8; 32] {
        sha256(&[&address.0, digest])
    }
}

#[async_trait]
impl WalletSigner for LocalSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign_typed_data(
        &self,
        domain: &TypedDomain,
        message: &TypedMessage,
    ) -> Result<Signature, SyncError> {
        let digest = message.digest(domain);
        let mut bytes = Vec::with_capacity(SIGNATURE_LEN);
        bytes.extend_from_slice(&self.address.0);
        bytes.extend_from_slice(&Self::tag(&self.address, &digest));
        Ok(Signature(bytes))
    }

    async fn verify_typed_data(
        &self,
        domain: &TypedDomain,
        message: &TypedMessage,
        signature: &Signature,
    ) -> Result<Address, SyncError> {
        if signature.0.len() != SIGNATURE_LEN {
            return Err(SyncError::Unknown("malformed signature".to_string()));
        }
        let mut raw = [0u8; 20];
        raw.copy_from_slice(&signature.0[..20]);
        let signer = Address(raw);

        let digest = message.digest(domain);
        if signature.0[20..] != Self::tag(&signer, &digest) {
            return Err(SyncError::SignatureMismatch);
        }
        Ok(signer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ManualClock;

    const T0: u64 = 1_700_000_000;

    fn ledger() -> (LocalLedger, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(T0));
        (LocalLedger::new(clock.clone()), clock)
    }

    #[tokio::test]
    async fn check_in_rewards_and_enforces_cooldown() {
        let (ledger, clock) = ledger();
        let alice = ledger.connect(Address([1; 20]));

        let tx = alice.check_in().await.unwrap();
        alice.confirm(tx).await.unwrap();
        assert_eq!(alice.plays(alice.account()).await.unwrap(), CHECK_IN_REWARD);

        clock.advance(CHECK_IN_COOLDOWN_SECS - 1);
        assert_eq!(
            alice.check_in().await,
            Err(SyncError::CooldownActive { remaining_secs: 0 })
        );

        clock.advance(1);
        assert!(alice.check_in().await.is_ok());
    }

    #[tokio::test]
    async fn use_play_reverts_at_zero() {
        let (ledger, _) = ledger();
        let bob = ledger.connect(Address([2; 20]));
        assert_eq!(
            bob.use_play().await,
            Err(SyncError::Rejected("No plays remaining".into()))
        );
    }

    #[tokio::test]
    async fn bonus_is_one_time() {
        let (ledger, _) = ledger();
        let carol = ledger.connect(Address([3; 20]));
        let sig = Signature(vec![1]);

        carol.claim_first_connect_bonus(&sig).await.unwrap();
        assert_eq!(carol.plays(carol.account()).await.unwrap(), FIRST_CONNECT_BONUS);
        assert!(matches!(
            carol.claim_first_connect_bonus(&sig).await,
            Err(SyncError::Rejected(_))
        ));
    }

    #[tokio::test]
    async fn legacy_deployment_lacks_plays() {
        let clock = Arc::new(ManualClock::new(T0));
        let ledger = LocalLedger::legacy(clock).connect(Address([4; 20]));
        assert!(matches!(
            ledger.plays(ledger.account()).await,
            Err(SyncError::CapabilityAbsent(_))
        ));
        assert!(matches!(
            ledger.use_play().await,
            Err(SyncError::CapabilityAbsent(_))
        ));
    }

    #[tokio::test]
    async fn confirm_is_single_use() {
        let (ledger, _) = ledger();
        let dave = ledger.connect(Address([5; 20]));
        let tx = dave.check_in().await.unwrap();
        assert_eq!(dave.confirm(tx).await.unwrap().block, 1);
        assert!(dave.confirm(tx).await.is_err());
    }

    #[tokio::test]
    async fn gateway_round_trips_values() {
        let gateway = LocalGateway::new();
        let a = gateway
            .encrypt(Address::ZERO, Address([1; 20]), 1234)
            .await
            .unwrap();
        let b = gateway
            .encrypt(Address::ZERO, Address([1; 20]), 1234)
            .await
            .unwrap();
        assert_ne!(a.handle, b.handle);
        assert_eq!(gateway.public_decrypt(a.handle).await.unwrap(), 1234);
        assert!(gateway.public_decrypt(Handle([0; 32])).await.is_err());
    }

    #[tokio::test]
    async fn signer_signatures_recover_and_detect_tampering() {
        let signer = LocalSigner::from_seed("alice");
        let domain = TypedDomain::tetris(31337, Address([9; 20]));
        let message = TypedMessage::DecryptionPermission {
            user: signer.address(),
            timestamp: T0,
            chain_id: 31337,
        };

        let sig = signer.sign_typed_data(&domain, &message).await.unwrap();
        assert_eq!(
            signer.verify_typed_data(&domain, &message, &sig).await,
            Ok(signer.address())
        );

        let other = TypedMessage::CheckIn {
            user: signer.address(),
            timestamp: T0,
            chain_id: 31337,
        };
        assert_eq!(
            signer.verify_typed_data(&domain, &other, &sig).await,
            Err(SyncError::SignatureMismatch)
        );
    }
}
