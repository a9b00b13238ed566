//! Play-credit client.
//!
//! Keeps a read-through mirror of each player's remote play balance. Plays can be
//! granted from elsewhere, so a game start always re-reads the ledger first.
//! Every confirmed mutation invalidates the mirror and re-fetches it; a failed
//! re-fetch leaves the balance unknown but does not undo the mutation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::error::SyncError;
use crate::store::SessionStore;
use crate::traits::{LedgerClient, WalletSigner};
use crate::types::{
    Address, CheckInRecord, CheckInStatus, Clock, SessionSignature, TxReceipt, TypedDomain,
    TypedMessage,
};

/// Mirrored play balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayBalance {
    pub plays: u32,
    /// False when the deployed contract has no plays feature.
    pub supported: bool,
}

impl PlayBalance {
    pub const UNSUPPORTED: PlayBalance = PlayBalance {
        plays: 0,
        supported: false,
    };
}

/// Result of a first-connect bonus attempt. None of these are fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BonusClaim {
    /// Bonus granted; `plays` is the refreshed balance, if it could be read.
    Claimed { plays: Option<u32> },
    /// A previous connect already tried.
    AlreadyAttempted,
    /// The contract has no bonus function.
    Unsupported,
    Failed(SyncError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckInOutcome {
    pub receipt: TxReceipt,
    /// `None` when the post-confirmation read failed.
    pub balance: Option<PlayBalance>,
}

pub struct PlayCreditClient {
    ledger: Arc<dyn LedgerClient>,
    signer: Arc<dyn WalletSigner>,
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    domain: TypedDomain,
    mirror: Mutex<HashMap<Address, PlayBalance>>,
}

impl PlayCreditClient {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        signer: Arc<dyn WalletSigner>,
        store: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
        domain: TypedDomain,
    ) -> Self {
        Self {
            ledger,
            signer,
            store,
            clock,
            domain,
            mirror: Mutex::new(HashMap::new()),
        }
    }

    fn mirror(&self) -> MutexGuard<'_, HashMap<Address, PlayBalance>> {
        self.mirror.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mirrored balance, fetched from the ledger on a miss.
    ///
    /// A deployment without the plays feature reads as [`PlayBalance::UNSUPPORTED`].
    pub async fn get_balance(&self, player: Address) -> Result<PlayBalance, SyncError> {
        if let Some(balance) = self.mirror().get(&player).copied() {
            return Ok(balance);
        }

        let balance = match self.ledger.plays(player).await {
            Ok(plays) => PlayBalance {
                plays,
                supported: true,
            },
            Err(SyncError::CapabilityAbsent(detail)) => {
                warn!(%player, %detail, "contract does not support the plays feature");
                PlayBalance::UNSUPPORTED
            }
            Err(e) => return Err(e),
        };
        self.mirror().insert(player, balance);
        Ok(balance)
    }

    pub fn invalidate(&self, player: &Address) {
        self.mirror().remove(player);
    }

    /// Drop the mirrored balance and read it again.
    pub async fn refresh(&self, player: Address) -> Result<PlayBalance, SyncError> {
        self.invalidate(&player);
        self.get_balance(player).await
    }

    pub async fn check_in_status(&self, player: Address) -> Result<CheckInStatus, SyncError> {
        self.ledger.check_in_status(player).await
    }

    /// Spend one play before a game starts.
    ///
    /// Once the ledger confirms, the play is spent: the result is `Ok` even when
    /// the new balance cannot be read (`None`).
    pub async fn consume_play(&self, player: Address) -> Result<Option<PlayBalance>, SyncError> {
        let balance = self.refresh(player).await?;
        if !balance.supported {
            return Err(SyncError::CapabilityAbsent("usePlay".to_string()));
        }
        if balance.plays == 0 {
            let now = self.clock.now_secs();
            let can_check_in = self.check_in_status(player).await?.can_check_in(now);
            return Err(SyncError::NoPlays { can_check_in });
        }

        let receipt = self
            .mutate(player, async {
                let pending = self.ledger.use_play().await?;
                self.ledger.confirm(pending).await
            })
            .await?;
        debug!(%player, block = receipt.block, "play consumed");
        Ok(self.settle(player).await)
    }

    /// Daily check-in: signs an audit message, then claims the reward on the ledger.
    pub async fn check_in(&self, player: Address) -> Result<CheckInOutcome, SyncError> {
        let now = self.clock.now_secs();
        let status = self.check_in_status(player).await?;
        if !status.can_check_in(now) {
            return Err(SyncError::CooldownActive {
                remaining_secs: status.remaining_secs(now),
            });
        }

        let message = TypedMessage::CheckIn {
            user: player,
            timestamp: now,
            chain_id: self.domain.chain_id,
        };
        let signature = self.signer.sign_typed_data(&self.domain, &message).await?;
        let recovered = self
            .signer
            .verify_typed_data(&self.domain, &message, &signature)
            .await?;
        if recovered != player {
            warn!(%player, %recovered, "check-in signature recovered to another address");
            return Err(SyncError::SignatureMismatch);
        }

        let result = self
            .mutate(player, async {
                let pending = self.ledger.check_in().await?;
                self.ledger.confirm(pending).await
            })
            .await;

        let receipt = match result {
            Ok(receipt) => receipt,
            // The ledger's cooldown is authoritative; report its remaining time.
            Err(SyncError::CooldownActive { .. }) => {
                let now = self.clock.now_secs();
                let remaining_secs = match self.check_in_status(player).await {
                    Ok(status) => status.remaining_secs(now),
                    Err(_) => 0,
                };
                return Err(SyncError::CooldownActive { remaining_secs });
            }
            Err(e) => return Err(e),
        };

        let record = CheckInRecord {
            address: player,
            timestamp: now,
            signature,
            tx_hash: receipt.hash,
        };
        if let Err(e) = self.store.record_check_in(record) {
            warn!(%player, error = %e, "failed to store check-in record");
        }

        info!(%player, block = receipt.block, "check-in confirmed");
        let balance = self.settle(player).await;
        Ok(CheckInOutcome { receipt, balance })
    }

    /// One-time bonus on a player's first connect.
    ///
    /// The marker is set after any attempt, successful or not, so the claim is
    /// never retried on a later connect.
    pub async fn claim_first_connect_bonus(
        &self,
        player: Address,
        session: &SessionSignature,
    ) -> Result<BonusClaim, SyncError> {
        if self.store.first_connect_attempted(&player) {
            return Ok(BonusClaim::AlreadyAttempted);
        }

        let result = self
            .mutate(player, async {
                let pending = self.ledger.claim_first_connect_bonus(&session.signature).await?;
                self.ledger.confirm(pending).await
            })
            .await;
        self.store.mark_first_connect(&player)?;

        let claim = match result {
            Ok(receipt) => {
                info!(%player, block = receipt.block, "first-connect bonus claimed");
                BonusClaim::Claimed {
                    plays: self.settle(player).await.map(|balance| balance.plays),
                }
            }
            Err(SyncError::CapabilityAbsent(detail)) => {
                warn!(%player, %detail, "contract does not support the first-connect bonus");
                BonusClaim::Unsupported
            }
            Err(e) => {
                warn!(%player, error = %e, "first-connect bonus claim failed");
                BonusClaim::Failed(e)
            }
        };
        Ok(claim)
    }

    /// Re-read the balance after a confirmed mutation.
    async fn settle(&self, player: Address) -> Option<PlayBalance> {
        match self.refresh(player).await {
            Ok(balance) => Some(balance),
            Err(e) => {
                warn!(%player, error = %e, "balance re-read failed after confirmation");
                self.invalidate(&player);
                None
            }
        }
    }

    /// Run a ledger mutation, dropping the mirror if it fails part-way.
    async fn mutate<F>(&self, player: Address, op: F) -> Result<TxReceipt, SyncError>
    where
        F: std::future::Future<Output = Result<TxReceipt, SyncError>>,
    {
        let result = op.await;
        if result.is_err() {
            self.invalidate(&player);
        }
        result
    }
}
