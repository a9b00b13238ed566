//! Ledger-side data types.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Name of the typed-data domain
pub const DOMAIN_NAME: &str = "TetrisFHE";
/// Version of the typed-data domain
pub const DOMAIN_VERSION: &str = "1";
/// Action label carried by decryption permissions
pub const DECRYPTION_ACTION: &str = "decryption_permission";
/// Minimum time between two check-ins
pub const CHECK_IN_COOLDOWN_SECS: u64 = 24 * 60 * 60;

// ============================================================================
// Byte newtypes
// ============================================================================

/// 20-byte account address, shown as lowercase `0x` hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(pub [u8; 20]);

impl Address {
    pub const ZERO: Address = Address([0; 20]);

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Leaderboard name: `Player` + the first four hex digits after `0x`.
    pub fn display_name(&self) -> String {
        format!("Player{}", &hex::encode(&self.0[..2]))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Address {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let mut out = [0u8; 20];
        hex::decode_to_slice(digits, &mut out).map_err(|e| format!("invalid address {s:?}: {e}"))?;
        Ok(Address(out))
    }
}

impl TryFrom<String> for Address {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.to_hex()
    }
}

/// Opaque 32-byte ciphertext handle issued by the encryption gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(pub [u8; 32]);

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Transaction identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TxHash(pub [u8; 32]);

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl TryFrom<String> for TxHash {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let digits = value.strip_prefix("0x").unwrap_or(&value);
        let mut out = [0u8; 32];
        hex::decode_to_slice(digits, &mut out)
            .map_err(|e| format!("invalid tx hash {value:?}: {e}"))?;
        Ok(TxHash(out))
    }
}

impl From<TxHash> for String {
    fn from(value: TxHash) -> Self {
        value.to_string()
    }
}

/// Wallet signature bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Signature(pub Vec<u8>);

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0))
    }
}

impl TryFrom<String> for Signature {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let digits = value.strip_prefix("0x").unwrap_or(&value);
        hex::decode(digits)
            .map(Signature)
            .map_err(|e| format!("invalid signature: {e}"))
    }
}

impl From<Signature> for String {
    fn from(value: Signature) -> Self {
        value.to_string()
    }
}

/// Validity proof accompanying a ciphertext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputProof(pub Vec<u8>);

/// Ciphertext handle plus its input proof.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedInput {
    pub handle: Handle,
    pub proof: InputProof,
}

// ============================================================================
// Typed data
// ============================================================================

/// Domain separating this application's typed messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedDomain {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    pub verifying_contract: Address,
}

impl TypedDomain {
    /// The game's domain on `chain_id` for `contract`.
    pub fn tetris(chain_id: u64, contract: Address) -> Self {
        Self {
            name: DOMAIN_NAME.to_string(),
            version: DOMAIN_VERSION.to_string(),
            chain_id,
            verifying_contract: contract,
        }
    }

    fn separator(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(b"EIP712Domain");
        hasher.update(self.name.as_bytes());
        hasher.update(self.version.as_bytes());
        hasher.update(self.chain_id.to_be_bytes());
        hasher.update(self.verifying_contract.0);
        hasher.finalize().into()
    }
}

/// Structured messages the wallet is asked to sign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypedMessage {
    /// `DecryptionPermission { user, timestamp, chainId, action }`
    DecryptionPermission {
        user: Address,
        timestamp: u64,
        chain_id: u64,
    },
    /// `CheckIn { user, timestamp, chainId }`
    CheckIn {
        user: Address,
        timestamp: u64,
        chain_id: u64,
    },
}

impl TypedMessage {
    pub fn primary_type(&self) -> &'static str {
        match self {
            TypedMessage::DecryptionPermission { .. } => "DecryptionPermission",
            TypedMessage::CheckIn { .. } => "CheckIn",
        }
    }

    pub fn user(&self) -> Address {
        match self {
            TypedMessage::DecryptionPermission { user, .. } | TypedMessage::CheckIn { user, .. } => {
                *user
            }
        }
    }

    pub fn timestamp(&self) -> u64 {
        match self {
            TypedMessage::DecryptionPermission { timestamp, .. }
            | TypedMessage::CheckIn { timestamp, .. } => *timestamp,
        }
    }

    fn struct_hash(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.primary_type().as_bytes());
        match self {
            TypedMessage::DecryptionPermission {
                user,
                timestamp,
                chain_id,
            } => {
                hasher.update(user.0);
                hasher.update(timestamp.to_be_bytes());
                hasher.update(chain_id.to_be_bytes());
                hasher.update(DECRYPTION_ACTION.as_bytes());
            }
            TypedMessage::CheckIn {
                user,
                timestamp,
                chain_id,
            } => {
                hasher.update(user.0);
                hasher.update(timestamp.to_be_bytes());
                hasher.update(chain_id.to_be_bytes());
            }
        }
        hasher.finalize().into()
    }

    /// Digest a signer commits to: `H(0x1901 || domain || message)`.
    pub fn digest(&self, domain: &TypedDomain) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update([0x19, 0x01]);
        hasher.update(domain.separator());
        hasher.update(self.struct_hash());
        hasher.finalize().into()
    }
}

// ============================================================================
// Ledger records
// ============================================================================

/// Handle for a submitted but unconfirmed transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTx {
    pub hash: TxHash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxReceipt {
    pub hash: TxHash,
    pub block: u64,
}

/// Public metadata of a score record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreInfo {
    pub player: Address,
    pub timestamp: u64,
    pub exists: bool,
}

/// Ciphertext handles of a score record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncryptedScore {
    pub score: Handle,
    pub lines: Handle,
    pub level: Handle,
}

/// Three encrypted fields submitted in one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreSubmission {
    pub score: EncryptedInput,
    pub lines: EncryptedInput,
    pub level: EncryptedInput,
}

/// Remote check-in state for one player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckInStatus {
    /// Unix seconds of the last check-in (0 = never)
    pub last_check_in: u64,
    pub cooldown_secs: u64,
}

impl CheckInStatus {
    pub fn never() -> Self {
        Self {
            last_check_in: 0,
            cooldown_secs: CHECK_IN_COOLDOWN_SECS,
        }
    }

    /// `now - last >= cooldown`; a player who never checked in always can.
    pub fn can_check_in(&self, now: u64) -> bool {
        self.last_check_in == 0 || now.saturating_sub(self.last_check_in) >= self.cooldown_secs
    }

    /// Seconds until the next check-in is allowed (0 when allowed now)
    pub fn remaining_secs(&self, now: u64) -> u64 {
        if self.can_check_in(now) {
            return 0;
        }
        (self.last_check_in + self.cooldown_secs).saturating_sub(now)
    }
}

/// Decrypted, display-ready leaderboard row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    pub display_name: String,
    pub score: u32,
    pub lines: u32,
    pub level: u32,
    pub timestamp: u64,
    pub address: Address,
}

/// Session-scoped decryption authorization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSignature {
    pub player: Address,
    pub signature: Signature,
    pub timestamp: u64,
    pub chain_id: u64,
}

/// Audit record of a confirmed check-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInRecord {
    pub address: Address,
    pub timestamp: u64,
    pub signature: Signature,
    pub tx_hash: TxHash,
}

// ============================================================================
// Clock
// ============================================================================

/// Source of unix-seconds timestamps.
pub trait Clock: Send + Sync {
    fn now_secs(&self) -> u64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// Settable clock for the offline ledger and tests.
#[derive(Debug, Default)]
pub struct ManualClock(AtomicU64);

impl ManualClock {
    pub fn new(now: u64) -> Self {
        Self(AtomicU64::new(now))
    }

    pub fn set(&self, now: u64) {
        self.0.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, secs: u64) {
        self.0.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_secs(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}
