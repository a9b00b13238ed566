//! Score submission pipeline.
//!
//! ```text
//! Idle -> Encrypting(Score) -> Encrypting(Lines) -> Encrypting(Level)
//!      -> Submitting -> Confirming -> Done | Failed
//! ```
//!
//! The three fields are encrypted one after another with a pause in between, each
//! step under the retry policy. The ciphertexts then go to the ledger in a single
//! transaction. Progress is published on a `watch` channel.
//!
//! Callers must not run two publishes at once on the same pipeline.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::SyncError;
use crate::game::GameResult;
use crate::leaderboard::{LeaderboardAggregator, LeaderboardRefresh};
use crate::retry::RetryPolicy;
use crate::traits::{EncryptionGateway, LedgerClient};
use crate::types::{Address, EncryptedInput, ScoreSubmission, TxReceipt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreField {
    Score,
    Lines,
    Level,
}

impl ScoreField {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreField::Score => "score",
            ScoreField::Lines => "lines",
            ScoreField::Level => "level",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionStage {
    Idle,
    Encrypting(ScoreField),
    Submitting,
    Confirming,
    Done(TxReceipt),
    /// Player-facing reason
    Failed(String),
}

impl SubmissionStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SubmissionStage::Done(_) | SubmissionStage::Failed(_))
    }

    /// Status line for the stage.
    pub fn describe(&self) -> String {
        match self {
            SubmissionStage::Idle => String::new(),
            SubmissionStage::Encrypting(field) => format!("Encrypting {}...", field.as_str()),
            SubmissionStage::Submitting => "Submitting encrypted score...".to_string(),
            SubmissionStage::Confirming => "Waiting for confirmation...".to_string(),
            SubmissionStage::Done(_) => "Score published successfully!".to_string(),
            SubmissionStage::Failed(reason) => reason.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOutcome {
    pub receipt: TxReceipt,
    /// Leaderboard reloaded after confirmation, when an aggregator is attached
    /// and the reload succeeded.
    pub leaderboard: Option<LeaderboardRefresh>,
}

pub struct ScoreSubmissionPipeline {
    gateway: Arc<dyn EncryptionGateway>,
    ledger: Arc<dyn LedgerClient>,
    contract: Address,
    retry: RetryPolicy,
    encrypt_pause: Duration,
    stage_tx: watch::Sender<SubmissionStage>,
    leaderboard: Option<Arc<LeaderboardAggregator>>,
}

impl ScoreSubmissionPipeline {
    pub fn new(
        gateway: Arc<dyn EncryptionGateway>,
        ledger: Arc<dyn LedgerClient>,
        contract: Address,
        retry: RetryPolicy,
        encrypt_pause: Duration,
    ) -> Self {
        let (stage_tx, _) = watch::channel(SubmissionStage::Idle);
        Self {
            gateway,
            ledger,
            contract,
            retry,
            encrypt_pause,
            stage_tx,
            leaderboard: None,
        }
    }

    /// Reload `leaderboard` after every confirmed submission.
    pub fn with_leaderboard(mut self, leaderboard: Arc<LeaderboardAggregator>) -> Self {
        self.leaderboard = Some(leaderboard);
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<SubmissionStage> {
        self.stage_tx.subscribe()
    }

    pub fn stage(&self) -> SubmissionStage {
        self.stage_tx.borrow().clone()
    }

    fn set_stage(&self, stage: SubmissionStage) {
        debug!(?stage, "submission stage");
        self.stage_tx.send_replace(stage);
    }

    /// Encrypt and submit a finished game's result for `player`.
    ///
    /// A zero score is refused before any network call and leaves the stage as is.
    pub async fn publish(
        &self,
        player: Address,
        result: GameResult,
    ) -> Result<PublishOutcome, SyncError> {
        if result.score == 0 {
            return Err(SyncError::ZeroScore);
        }

        let receipt = match self.submit(player, result).await {
            Ok(receipt) => receipt,
            Err(e) => {
                warn!(%player, error = %e, "score publish failed");
                self.set_stage(SubmissionStage::Failed(e.user_message()));
                return Err(e);
            }
        };
        info!(
            %player,
            score = result.score,
            block = receipt.block,
            tx = %receipt.hash,
            "score published"
        );
        self.set_stage(SubmissionStage::Done(receipt));

        let leaderboard = match &self.leaderboard {
            Some(aggregator) => match aggregator.refresh(player).await {
                Ok(refresh) => Some(refresh),
                Err(e) => {
                    warn!(error = %e, "leaderboard reload after publish failed");
                    None
                }
            },
            None => None,
        };

        Ok(PublishOutcome {
            receipt,
            leaderboard,
        })
    }

    async fn submit(&self, player: Address, result: GameResult) -> Result<TxReceipt, SyncError> {
        let score = self.encrypt(player, ScoreField::Score, result.score).await?;
        let lines = self.encrypt(player, ScoreField::Lines, result.lines).await?;
        let level = self.encrypt(player, ScoreField::Level, result.level).await?;

        self.set_stage(SubmissionStage::Submitting);
        let pending = self
            .ledger
            .submit_score(ScoreSubmission {
                score,
                lines,
                level,
            })
            .await?;

        self.set_stage(SubmissionStage::Confirming);
        self.ledger.confirm(pending).await
    }

    async fn encrypt(
        &self,
        player: Address,
        field: ScoreField,
        value: u32,
    ) -> Result<EncryptedInput, SyncError> {
        self.set_stage(SubmissionStage::Encrypting(field));
        if field != ScoreField::Score {
            sleep(self.encrypt_pause).await;
        }

        let label = format!("encrypt {}", field.as_str());
        self.retry
            .run(&label, || self.gateway.encrypt(self.contract, player, value))
            .await
    }
}
