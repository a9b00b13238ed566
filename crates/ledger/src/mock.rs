//! Fault-injecting wrappers around the local collaborators (tests only).

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::SyncError;
use crate::local::{LocalGateway, LocalLedger, LocalSigner};
use crate::traits::{EncryptionGateway, LedgerClient, WalletSigner};
use crate::types::{
    Address, CheckInStatus, EncryptedInput, EncryptedScore, Handle, ManualClock, PendingTx,
    ScoreInfo, ScoreSubmission, Signature, TxReceipt, TypedDomain, TypedMessage,
};

pub const T0: u64 = 1_700_000_000;

/// Gateway that fails scripted encrypt calls and chosen decryptions.
#[derive(Default)]
pub struct FlakyGateway {
    pub inner: LocalGateway,
    encrypt_failures: Mutex<VecDeque<SyncError>>,
    failing_handles: Mutex<HashSet<Handle>>,
    pub encrypt_calls: AtomicU32,
    pub decrypt_calls: AtomicU32,
}

impl FlakyGateway {
    pub fn new(inner: LocalGateway) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    /// Fail the next encrypt calls with these errors, in order.
    pub fn fail_encrypts(&self, errors: impl IntoIterator<Item = SyncError>) {
        self.encrypt_failures.lock().unwrap().extend(errors);
    }

    pub fn fail_decrypt(&self, handle: Handle) {
        self.failing_handles.lock().unwrap().insert(handle);
    }

    pub fn encrypts(&self) -> u32 {
        self.encrypt_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EncryptionGateway for FlakyGateway {
    async fn encrypt(
        &self,
        contract: Address,
        player: Address,
        value: u32,
    ) -> Result<EncryptedInput, SyncError> {
        self.encrypt_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.encrypt_failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        self.inner.encrypt(contract, player, value).await
    }

    async fn public_decrypt(&self, handle: Handle) -> Result<u32, SyncError> {
        self.decrypt_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_handles.lock().unwrap().contains(&handle) {
            return Err(SyncError::Transient("Relayer decryption failed".into()));
        }
        self.inner.public_decrypt(handle).await
    }
}

/// Ledger that records every call and can fail a method once.
pub struct RecordingLedger {
    pub inner: LocalLedger,
    calls: Mutex<Vec<&'static str>>,
    /// Calls to let through before failing, and the failure.
    failures: Mutex<HashMap<&'static str, (usize, SyncError)>>,
}

impl RecordingLedger {
    pub fn new(inner: LocalLedger) -> Self {
        Self {
            inner,
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
        }
    }

    pub fn fail_once(&self, method: &'static str, err: SyncError) {
        self.fail_after(method, 0, err);
    }

    /// Let `skip` calls to `method` succeed, then fail the next one.
    pub fn fail_after(&self, method: &'static str, skip: usize, err: SyncError) {
        self.failures.lock().unwrap().insert(method, (skip, err));
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, method: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| **c == method).count()
    }

    fn enter(&self, method: &'static str) -> Result<(), SyncError> {
        self.calls.lock().unwrap().push(method);
        let mut failures = self.failures.lock().unwrap();
        match failures.get_mut(method) {
            Some((skip, _)) if *skip > 0 => {
                *skip -= 1;
                Ok(())
            }
            Some(_) => Err(failures.remove(method).unwrap().1),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl LedgerClient for RecordingLedger {
    async fn total_scores(&self) -> Result<u64, SyncError> {
        self.enter("total_scores")?;
        self.inner.total_scores().await
    }

    async fn score_info(&self, index: u64) -> Result<ScoreInfo, SyncError> {
        self.enter("score_info")?;
        self.inner.score_info(index).await
    }

    async fn encrypted_score(&self, index: u64) -> Result<EncryptedScore, SyncError> {
        self.enter("encrypted_score")?;
        self.inner.encrypted_score(index).await
    }

    async fn plays(&self, player: Address) -> Result<u32, SyncError> {
        self.enter("plays")?;
        self.inner.plays(player).await
    }

    async fn check_in_status(&self, player: Address) -> Result<CheckInStatus, SyncError> {
        self.enter("check_in_status")?;
        self.inner.check_in_status(player).await
    }

    async fn submit_score(&self, submission: ScoreSubmission) -> Result<PendingTx, SyncError> {
        self.enter("submit_score")?;
        self.inner.submit_score(submission).await
    }

    async fn check_in(&self) -> Result<PendingTx, SyncError> {
        self.enter("check_in")?;
        self.inner.check_in().await
    }

    async fn use_play(&self) -> Result<PendingTx, SyncError> {
        self.enter("use_play")?;
        self.inner.use_play().await
    }

    async fn claim_first_connect_bonus(&self, signature: &Signature) -> Result<PendingTx, SyncError> {
        self.enter("claim_first_connect_bonus")?;
        self.inner.claim_first_connect_bonus(signature).await
    }

    async fn confirm(&self, pending: PendingTx) -> Result<TxReceipt, SyncError> {
        self.enter("confirm")?;
        self.inner.confirm(pending).await
    }
}

/// Signer that can decline or recover to a foreign address.
pub struct ScriptedSigner {
    pub inner: LocalSigner,
    pub decline: bool,
    pub recover_as: Option<Address>,
    pub sign_calls: AtomicU32,
}

impl ScriptedSigner {
    pub fn new(inner: LocalSigner) -> Self {
        Self {
            inner,
            decline: false,
            recover_as: None,
            sign_calls: AtomicU32::new(0),
        }
    }

    pub fn signs(&self) -> u32 {
        self.sign_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WalletSigner for ScriptedSigner {
    fn address(&self) -> Address {
        self.inner.address()
    }

    async fn sign_typed_data(
        &self,
        domain: &TypedDomain,
        message: &TypedMessage,
    ) -> Result<Signature, SyncError> {
        self.sign_calls.fetch_add(1, Ordering::SeqCst);
        if self.decline {
            return Err(SyncError::UserDeclined);
        }
        self.inner.sign_typed_data(domain, message).await
    }

    async fn verify_typed_data(
        &self,
        domain: &TypedDomain,
        message: &TypedMessage,
        signature: &Signature,
    ) -> Result<Address, SyncError> {
        if let Some(address) = self.recover_as {
            return Ok(address);
        }
        self.inner.verify_typed_data(domain, message, signature).await
    }
}

/// Shared fixture: one player on a fresh local ledger.
pub struct Fixture {
    pub clock: Arc<ManualClock>,
    pub ledger: Arc<RecordingLedger>,
    pub gateway: Arc<FlakyGateway>,
    pub signer: Arc<ScriptedSigner>,
    pub player: Address,
    pub domain: TypedDomain,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_signer(ScriptedSigner::new(LocalSigner::from_seed("player-one")))
    }

    pub fn with_signer(signer: ScriptedSigner) -> Self {
        let clock = Arc::new(ManualClock::new(T0));
        let player = signer.address();
        let ledger = LocalLedger::new(clock.clone()).connect(player);
        Self::assemble(clock, ledger, signer)
    }

    pub fn legacy() -> Self {
        let clock = Arc::new(ManualClock::new(T0));
        let signer = ScriptedSigner::new(LocalSigner::from_seed("player-one"));
        let ledger = LocalLedger::legacy(clock.clone()).connect(signer.address());
        Self::assemble(clock, ledger, signer)
    }

    fn assemble(clock: Arc<ManualClock>, ledger: LocalLedger, signer: ScriptedSigner) -> Self {
        let player = signer.address();
        Self {
            clock,
            ledger: Arc::new(RecordingLedger::new(ledger)),
            gateway: Arc::new(FlakyGateway::new(LocalGateway::new())),
            signer: Arc::new(signer),
            player,
            domain: TypedDomain::tetris(31337, Address([0x4a; 20])),
        }
    }

    /// Publish a score as `account` straight through the local collaborators.
    pub async fn seed_score(&self, account: Address, score: u32, lines: u32, level: u32) -> [Handle; 3] {
        let ledger = self.ledger.inner.connect(account);
        let gateway = &self.gateway.inner;
        let contract = self.domain.verifying_contract;
        let submission = ScoreSubmission {
            score: gateway.encrypt(contract, account, score).await.unwrap(),
            lines: gateway.encrypt(contract, account, lines).await.unwrap(),
            level: gateway.encrypt(contract, account, level).await.unwrap(),
        };
        let handles = [
            submission.score.handle,
            submission.lines.handle,
            submission.level.handle,
        ];
        let tx = ledger.submit_score(submission).await.unwrap();
        ledger.confirm(tx).await.unwrap();
        handles
    }
}
