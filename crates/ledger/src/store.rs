//! Local state kept between ledger calls.
//!
//! Two lifetimes live here:
//! - session signatures, valid until [`SessionStore::end_session`]
//! - first-connect markers and check-in audit records, which never expire
//!
//! [`MemorySessionStore`] keeps everything in-process. [`FileSessionStore`] keeps
//! signatures in memory and persists the long-lived half as JSON.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SyncError;
use crate::types::{Address, CheckInRecord, SessionSignature};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("store file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

impl From<StoreError> for SyncError {
    fn from(err: StoreError) -> Self {
        SyncError::Storage(err.to_string())
    }
}

pub trait SessionStore: Send + Sync {
    /// Cached signature for `player` in the current session.
    fn session_signature(&self, player: &Address) -> Option<SessionSignature>;

    fn set_session_signature(&self, signature: SessionSignature) -> Result<(), StoreError>;

    /// Drop every session-scoped value. Long-lived markers survive.
    fn end_session(&self);

    fn first_connect_attempted(&self, player: &Address) -> bool;

    fn mark_first_connect(&self, player: &Address) -> Result<(), StoreError>;

    fn record_check_in(&self, record: CheckInRecord) -> Result<(), StoreError>;

    /// Audit records for `player`, oldest first.
    fn check_in_records(&self, player: &Address) -> Vec<CheckInRecord>;
}

/// Long-lived part of the store.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Persistent {
    first_connect: BTreeSet<Address>,
    check_ins: Vec<CheckInRecord>,
}

impl Persistent {
    fn records_for(&self, player: &Address) -> Vec<CheckInRecord> {
        self.check_ins
            .iter()
            .filter(|r| r.address == *player)
            .cloned()
            .collect()
    }
}

// ============================================================================
// In-memory store
// ============================================================================

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    signatures: Mutex<HashMap<Address, SessionSignature>>,
    persistent: Mutex<Persistent>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn session_signature(&self, player: &Address) -> Option<SessionSignature> {
        let signatures = self.signatures.lock().unwrap_or_else(PoisonError::into_inner);
        signatures.get(player).cloned()
    }

    fn set_session_signature(&self, signature: SessionSignature) -> Result<(), StoreError> {
        let mut signatures = self.signatures.lock().unwrap_or_else(PoisonError::into_inner);
        signatures.insert(signature.player, signature);
        Ok(())
    }

    fn end_session(&self) {
        self.signatures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn first_connect_attempted(&self, player: &Address) -> bool {
        let persistent = self.persistent.lock().unwrap_or_else(PoisonError::into_inner);
        persistent.first_connect.contains(player)
    }

    fn mark_first_connect(&self, player: &Address) -> Result<(), StoreError> {
        let mut persistent = self.persistent.lock().unwrap_or_else(PoisonError::into_inner);
        persistent.first_connect.insert(*player);
        Ok(())
    }

    fn record_check_in(&self, record: CheckInRecord) -> Result<(), StoreError> {
        let mut persistent = self.persistent.lock().unwrap_or_else(PoisonError::into_inner);
        persistent.check_ins.push(record);
        Ok(())
    }

    fn check_in_records(&self, player: &Address) -> Vec<CheckInRecord> {
        let persistent = self.persistent.lock().unwrap_or_else(PoisonError::into_inner);
        persistent.records_for(player)
    }
}

// ============================================================================
// File-backed store
// ============================================================================

#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    signatures: Mutex<HashMap<Address, SessionSignature>>,
    persistent: Mutex<Persistent>,
}

impl FileSessionStore {
    /// Open (or lazily create) the store at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let persistent = if path.exists() {
            let bytes = fs::read(&path)?;
            serde_json::from_slice(&bytes)?
        } else {
            Persistent::default()
        };
        debug!(path = %path.display(), "opened session store");

        Ok(Self {
            path,
            signatures: Mutex::new(HashMap::new()),
            persistent: Mutex::new(persistent),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self, persistent: &Persistent) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(persistent)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl SessionStore for FileSessionStore {
    fn session_signature(&self, player: &Address) -> Option<SessionSignature> {
        let signatures = self.signatures.lock().unwrap_or_else(PoisonError::into_inner);
        signatures.get(player).cloned()
    }

    fn set_session_signature(&self, signature: SessionSignature) -> Result<(), StoreError> {
        let mut signatures = self.signatures.lock().unwrap_or_else(PoisonError::into_inner);
        signatures.insert(signature.player, signature);
        Ok(())
    }

    fn end_session(&self) {
        self.signatures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn first_connect_attempted(&self, player: &Address) -> bool {
        let persistent = self.persistent.lock().unwrap_or_else(PoisonError::into_inner);
        persistent.first_connect.contains(player)
    }

    fn mark_first_connect(&self, player: &Address) -> Result<(), StoreError> {
        let mut persistent = self.persistent.lock().unwrap_or_else(PoisonError::into_inner);
        if persistent.first_connect.insert(*player) {
            self.save(&persistent)?;
        }
        Ok(())
    }

    fn record_check_in(&self, record: CheckInRecord) -> Result<(), StoreError> {
        let mut persistent = self.persistent.lock().unwrap_or_else(PoisonError::into_inner);
        persistent.check_ins.push(record);
        self.save(&persistent)
    }

    fn check_in_records(&self, player: &Address) -> Vec<CheckInRecord> {
        let persistent = self.persistent.lock().unwrap_or_else(PoisonError::into_inner);
        persistent.records_for(player)
    }
}
