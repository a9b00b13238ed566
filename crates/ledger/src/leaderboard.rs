//! Leaderboard aggregation: fetch every score record, decrypt, rank.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::DEFAULT_LEADERBOARD_SIZE;
use crate::error::SyncError;
use crate::store::SessionStore;
use crate::traits::{EncryptionGateway, LedgerClient};
use crate::types::{Address, LeaderboardEntry};

pub const SIGNATURE_REQUIRED_NOTICE: &str =
    "EIP-712 signature required to decrypt leaderboard. Please sign first.";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeaderboardRefresh {
    /// Top entries, highest score first.
    pub entries: Vec<LeaderboardEntry>,
    /// Records that failed to load or decrypt.
    pub skipped: usize,
    /// Set when the refresh did not run.
    pub notice: Option<String>,
}

impl LeaderboardRefresh {
    pub fn status_line(&self) -> String {
        match &self.notice {
            Some(notice) => notice.clone(),
            None => format!("Loaded {} top scores", self.entries.len()),
        }
    }
}

pub struct LeaderboardAggregator {
    ledger: Arc<dyn LedgerClient>,
    gateway: Arc<dyn EncryptionGateway>,
    store: Arc<dyn SessionStore>,
    limit: usize,
}

impl LeaderboardAggregator {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        gateway: Arc<dyn EncryptionGateway>,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            ledger,
            gateway,
            store,
            limit: DEFAULT_LEADERBOARD_SIZE,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Rebuild the leaderboard on behalf of `player`.
    ///
    /// Without a session signature nothing is fetched and the result carries a
    /// notice. A record that fails to load or decrypt is skipped; only a failure
    /// to read the record count fails the whole refresh.
    pub async fn refresh(&self, player: Address) -> Result<LeaderboardRefresh, SyncError> {
        if self.store.session_signature(&player).is_none() {
            debug!(%player, "leaderboard refresh without session signature");
            return Ok(LeaderboardRefresh {
                notice: Some(SIGNATURE_REQUIRED_NOTICE.to_string()),
                ..LeaderboardRefresh::default()
            });
        }

        let total = self.ledger.total_scores().await?;
        let mut entries = Vec::new();
        let mut skipped = 0;

        for index in 0..total {
            match self.load(index).await {
                Ok(Some(entry)) => entries.push(entry),
                Ok(None) => {}
                Err(e) => {
                    warn!(index, error = %e, "failed to load score record");
                    skipped += 1;
                }
            }
        }

        entries.sort_by(|a, b| b.score.cmp(&a.score));
        entries.truncate(self.limit);
        info!(total, shown = entries.len(), skipped, "leaderboard refreshed");

        Ok(LeaderboardRefresh {
            entries,
            skipped,
            notice: None,
        })
    }

    async fn load(&self, index: u64) -> Result<Option<LeaderboardEntry>, SyncError> {
        let info = self.ledger.score_info(index).await?;
        if !info.exists {
            return Ok(None);
        }

        let handles = self.ledger.encrypted_score(index).await?;
        let (score, lines, level) = tokio::try_join!(
            self.gateway.public_decrypt(handles.score),
            self.gateway.public_decrypt(handles.lines),
            self.gateway.public_decrypt(handles.level),
        )?;

        Ok(Some(LeaderboardEntry {
            display_name: info.player.display_name(),
            score,
            lines,
            level,
            timestamp: info.timestamp,
            address: info.player,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::Fixture;
    use crate::store::MemorySessionStore;
    use crate::types::{SessionSignature, Signature};

    fn aggregator(fx: &Fixture, signed: bool) -> LeaderboardAggregator {
        let store = Arc::new(MemorySessionStore::new());
        if signed {
            store
                .set_session_signature(SessionSignature {
                    player: fx.player,
                    signature: Signature(vec![1; 52]),
                    timestamp: 0,
                    chain_id: 31337,
                })
                .unwrap();
        }
        LeaderboardAggregator::new(fx.ledger.clone(), fx.gateway.clone(), store)
    }

    #[tokio::test]
    async fn unsigned_refresh_fetches_nothing() {
        let fx = Fixture::new();
        fx.seed_score(fx.player, 100, 1, 1).await;

        let board = aggregator(&fx, false).refresh(fx.player).await.unwrap();
        assert!(board.entries.is_empty());
        assert_eq!(board.notice.as_deref(), Some(SIGNATURE_REQUIRED_NOTICE));
        assert!(fx.ledger.calls().is_empty());
    }

    #[tokio::test]
    async fn failed_records_are_skipped_and_rest_ranked() {
        let fx = Fixture::new();
        let mut failing = Vec::new();
        for i in 0..14u32 {
            let account = Address([i as u8 + 1; 20]);
            let handles = fx.seed_score(account, (i + 1) * 100, i, 1).await;
            if i % 5 == 0 {
                failing.push(handles[i as usize % 3]);
            }
        }
        for handle in &failing {
            fx.gateway.fail_decrypt(*handle);
        }

        let board = aggregator(&fx, true).refresh(fx.player).await.unwrap();
        assert_eq!(board.skipped, failing.len());
        assert_eq!(board.entries.len(), 10);
        assert!(board
            .entries
            .windows(2)
            .all(|pair| pair[0].score >= pair[1].score));
        assert_eq!(board.entries[0].score, 1400);
        assert!(!board
            .entries
            .iter()
            .any(|e| [100, 600, 1100].contains(&e.score)));
    }

    #[tokio::test]
    async fn fewer_records_than_limit() {
        let fx = Fixture::new();
        fx.seed_score(Address([1; 20]), 300, 3, 1).await;
        fx.seed_score(Address([2; 20]), 900, 9, 2).await;
        let failing = fx.seed_score(Address([3; 20]), 600, 6, 2).await;
        fx.gateway.fail_decrypt(failing[1]);

        let board = aggregator(&fx, true).refresh(fx.player).await.unwrap();
        let scores: Vec<u32> = board.entries.iter().map(|e| e.score).collect();
        assert_eq!(scores, vec![900, 300]);
        assert_eq!(board.skipped, 1);
        assert_eq!(board.entries[0].display_name, Address([2; 20]).display_name());
        assert_eq!(board.entries[0].lines, 9);
    }

    #[tokio::test]
    async fn count_failure_fails_refresh() {
        let fx = Fixture::new();
        fx.ledger
            .fail_once("total_scores", SyncError::Transient("Failed to fetch".into()));

        assert!(aggregator(&fx, true).refresh(fx.player).await.is_err());
    }
}
