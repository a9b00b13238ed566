//! Session signature manager.
//!
//! Decrypting the leaderboard and claiming the first-connect bonus both require a
//! `DecryptionPermission` typed signature from the player. It is requested at
//! most once per session and cached in the [`SessionStore`] until the session ends.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::SyncError;
use crate::store::SessionStore;
use crate::traits::WalletSigner;
use crate::types::{Address, Clock, SessionSignature, TypedDomain, TypedMessage};

pub struct SessionAuthManager {
    signer: Arc<dyn WalletSigner>,
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    domain: TypedDomain,
}

impl SessionAuthManager {
    pub fn new(
        signer: Arc<dyn WalletSigner>,
        store: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
        domain: TypedDomain,
    ) -> Self {
        Self {
            signer,
            store,
            clock,
            domain,
        }
    }

    pub fn domain(&self) -> &TypedDomain {
        &self.domain
    }

    /// Signature cached for `player` in this session, if any.
    pub fn cached(&self, player: &Address) -> Option<SessionSignature> {
        self.store.session_signature(player)
    }

    /// Return the session signature for `player`, asking the wallet if needed.
    ///
    /// A signature that does not recover to `player` is rejected and not cached.
    /// A declined request surfaces as [`SyncError::UserDeclined`].
    pub async fn get_or_request_signature(
        &self,
        player: Address,
    ) -> Result<SessionSignature, SyncError> {
        if let Some(cached) = self.store.session_signature(&player) {
            debug!(%player, "using cached session signature");
            return Ok(cached);
        }

        let timestamp = self.clock.now_secs();
        let message = TypedMessage::DecryptionPermission {
            user: player,
            timestamp,
            chain_id: self.domain.chain_id,
        };

        let signature = self.signer.sign_typed_data(&self.domain, &message).await?;
        let recovered = self
            .signer
            .verify_typed_data(&self.domain, &message, &signature)
            .await?;
        if recovered != player {
            warn!(%player, %recovered, "session signature recovered to another address");
            return Err(SyncError::SignatureMismatch);
        }

        let session = SessionSignature {
            player,
            signature,
            timestamp,
            chain_id: self.domain.chain_id,
        };
        self.store.set_session_signature(session.clone())?;
        info!(%player, "session signature cached");
        Ok(session)
    }

    /// Forget session-scoped authorization.
    pub fn end_session(&self) {
        self.store.end_session();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::LocalSigner;
    use crate::mock::{Fixture, ScriptedSigner};
    use crate::store::MemorySessionStore;

    fn manager(fx: &Fixture, store: Arc<MemorySessionStore>) -> SessionAuthManager {
        SessionAuthManager::new(fx.signer.clone(), store, fx.clock.clone(), fx.domain.clone())
    }

    #[tokio::test]
    async fn signature_requested_once_per_session() {
        let fx = Fixture::new();
        let store = Arc::new(MemorySessionStore::new());
        let auth = manager(&fx, store.clone());

        let first = auth.get_or_request_signature(fx.player).await.unwrap();
        let second = auth.get_or_request_signature(fx.player).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(fx.signer.signs(), 1);

        auth.end_session();
        assert!(auth.cached(&fx.player).is_none());
        auth.get_or_request_signature(fx.player).await.unwrap();
        assert_eq!(fx.signer.signs(), 2);
    }

    #[tokio::test]
    async fn declined_request_is_user_declined() {
        let mut signer = ScriptedSigner::new(LocalSigner::from_seed("shy"));
        signer.decline = true;
        let fx = Fixture::with_signer(signer);
        let auth = manager(&fx, Arc::new(MemorySessionStore::new()));

        assert_eq!(
            auth.get_or_request_signature(fx.player).await,
            Err(SyncError::UserDeclined)
        );
        assert!(auth.cached(&fx.player).is_none());
    }

    #[tokio::test]
    async fn mismatched_recovery_is_not_cached() {
        let mut signer = ScriptedSigner::new(LocalSigner::from_seed("victim"));
        signer.recover_as = Some(Address([0xee; 20]));
        let fx = Fixture::with_signer(signer);
        let auth = manager(&fx, Arc::new(MemorySessionStore::new()));

        assert_eq!(
            auth.get_or_request_signature(fx.player).await,
            Err(SyncError::SignatureMismatch)
        );
        assert!(auth.cached(&fx.player).is_none());
    }

    #[tokio::test]
    async fn signature_for_foreign_player_fails_verification() {
        let fx = Fixture::new();
        let auth = manager(&fx, Arc::new(MemorySessionStore::new()));

        assert_eq!(
            auth.get_or_request_signature(Address([0x01; 20])).await,
            Err(SyncError::SignatureMismatch)
        );
    }
}
