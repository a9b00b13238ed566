//! `SyncClient`: the front end's single entry point into the sync layer.
//!
//! Every operation resolves to a [`StatusReport`]. Errors are logged in full and
//! never propagate past this boundary.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::auth::SessionAuthManager;
use crate::config::LedgerConfig;
use crate::credits::{BonusClaim, PlayBalance, PlayCreditClient};
use crate::error::SyncError;
use crate::game::GameResult;
use crate::leaderboard::LeaderboardAggregator;
use crate::store::SessionStore;
use crate::submission::{ScoreSubmissionPipeline, SubmissionStage};
use crate::traits::{EncryptionGateway, LedgerClient, WalletSigner};
use crate::types::{Address, Clock, LeaderboardEntry};

const BUSY_MESSAGE: &str = "Another request is still in progress";

/// Outcome of a facade operation, ready for the status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub message: String,
    /// Whether retrying the same action later can succeed.
    pub recoverable: bool,
    pub ok: bool,
}

impl StatusReport {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            recoverable: true,
            ok: true,
        }
    }

    pub fn failure(message: impl Into<String>, recoverable: bool) -> Self {
        Self {
            message: message.into(),
            recoverable,
            ok: false,
        }
    }

    /// Player-facing report for `err`; the full error goes to the log.
    pub fn from_error(action: &str, err: &SyncError) -> Self {
        error!(action, kind = ?err.kind(), "{}", err);
        Self::failure(err.user_message(), err.is_recoverable())
    }
}

/// Clears the in-flight flag when dropped.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct SyncClient {
    player: Address,
    auth: SessionAuthManager,
    credits: PlayCreditClient,
    leaderboard: Arc<LeaderboardAggregator>,
    pipeline: ScoreSubmissionPipeline,
    in_flight: AtomicBool,
    entries: Mutex<Vec<LeaderboardEntry>>,
}

impl SyncClient {
    pub fn new(
        config: &LedgerConfig,
        signer: Arc<dyn WalletSigner>,
        ledger: Arc<dyn LedgerClient>,
        gateway: Arc<dyn EncryptionGateway>,
        store: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let domain = config.domain();
        let leaderboard = Arc::new(
            LeaderboardAggregator::new(ledger.clone(), gateway.clone(), store.clone())
                .with_limit(config.leaderboard_size),
        );
        let pipeline = ScoreSubmissionPipeline::new(
            gateway,
            ledger.clone(),
            config.contract,
            config.retry_policy(),
            config.encrypt_pause(),
        )
        .with_leaderboard(leaderboard.clone());

        Self {
            player: signer.address(),
            auth: SessionAuthManager::new(
                signer.clone(),
                store.clone(),
                clock.clone(),
                domain.clone(),
            ),
            credits: PlayCreditClient::new(ledger, signer, store, clock, domain),
            leaderboard,
            pipeline,
            in_flight: AtomicBool::new(false),
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn player(&self) -> Address {
        self.player
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    fn begin(&self) -> Option<InFlight<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight(&self.in_flight))
    }

    /// Request the session signature and, on a first connect, the bonus plays.
    pub async fn connect(&self) -> StatusReport {
        let session = match self.auth.get_or_request_signature(self.player).await {
            Ok(session) => session,
            Err(SyncError::UserDeclined) => {
                return StatusReport::from_error("connect", &SyncError::SignatureRequired)
            }
            Err(e) => return StatusReport::from_error("connect", &e),
        };

        match self
            .credits
            .claim_first_connect_bonus(self.player, &session)
            .await
        {
            Ok(BonusClaim::Claimed { plays }) => {
                info!(player = %self.player, ?plays, "welcome bonus granted");
                match plays {
                    Some(plays) => StatusReport::success(format!(
                        "Welcome! You received free plays ({plays} total)"
                    )),
                    None => StatusReport::success("Welcome! You received free plays"),
                }
            }
            Ok(BonusClaim::Unsupported) => StatusReport::success(
                "Signature verified! Decryption enabled. (Contract needs update for plays feature)",
            ),
            Ok(BonusClaim::AlreadyAttempted) | Ok(BonusClaim::Failed(_)) => {
                StatusReport::success("Signature verified! Decryption enabled.")
            }
            Err(e) => StatusReport::from_error("connect", &e),
        }
    }

    /// Spend a play credit. The game may start only when the report is `ok`.
    pub async fn start_game(&self) -> StatusReport {
        let Some(_guard) = self.begin() else {
            return StatusReport::failure(BUSY_MESSAGE, true);
        };
        match self.credits.consume_play(self.player).await {
            Ok(Some(balance)) => {
                StatusReport::success(format!("Game started. {} plays left", balance.plays))
            }
            Ok(None) => StatusReport::success("Game started."),
            Err(e) => StatusReport::from_error("start game", &e),
        }
    }

    /// Publish a frozen game result.
    pub async fn publish(&self, result: GameResult) -> StatusReport {
        let Some(_guard) = self.begin() else {
            return StatusReport::failure(BUSY_MESSAGE, true);
        };
        match self.pipeline.publish(self.player, result).await {
            Ok(outcome) => {
                if let Some(refresh) = outcome.leaderboard {
                    self.store_entries(refresh.entries);
                }
                StatusReport::success(SubmissionStage::Done(outcome.receipt).describe())
            }
            Err(e) => StatusReport::from_error("publish", &e),
        }
    }

    pub async fn check_in(&self) -> StatusReport {
        let Some(_guard) = self.begin() else {
            return StatusReport::failure(BUSY_MESSAGE, true);
        };
        match self.credits.check_in(self.player).await {
            Ok(outcome) => match outcome.balance {
                Some(balance) => StatusReport::success(format!(
                    "Check-in successful! {} plays available",
                    balance.plays
                )),
                None => StatusReport::success("Check-in successful!"),
            },
            Err(e) => StatusReport::from_error("check-in", &e),
        }
    }

    /// Reload the leaderboard into [`SyncClient::entries`].
    pub async fn leaderboard(&self) -> StatusReport {
        match self.leaderboard.refresh(self.player).await {
            Ok(refresh) => {
                let line = refresh.status_line();
                if refresh.notice.is_some() {
                    self.store_entries(Vec::new());
                    return StatusReport::failure(line, true);
                }
                if refresh.skipped > 0 {
                    warn!(skipped = refresh.skipped, "leaderboard shown without some records");
                }
                self.store_entries(refresh.entries);
                StatusReport::success(line)
            }
            Err(e) => StatusReport::from_error("leaderboard", &e),
        }
    }

    /// Last loaded leaderboard rows.
    pub fn entries(&self) -> Vec<LeaderboardEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn store_entries(&self, entries: Vec<LeaderboardEntry>) {
        *self.entries.lock().unwrap_or_else(PoisonError::into_inner) = entries;
    }

    /// Play balance re-read from the ledger; `None` when it could not be read.
    pub async fn balance(&self) -> Option<PlayBalance> {
        match self.credits.refresh(self.player).await {
            Ok(balance) => Some(balance),
            Err(e) => {
                warn!(player = %self.player, error = %e, "failed to read play balance");
                None
            }
        }
    }

    pub fn submission_stage(&self) -> watch::Receiver<SubmissionStage> {
        self.pipeline.subscribe()
    }

    /// Forget the session signature and the balance mirror.
    pub fn end_session(&self) {
        self.auth.end_session();
        self.credits.invalidate(&self.player);
        self.store_entries(Vec::new());
    }
}
