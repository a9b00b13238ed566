//! Failure taxonomy for ledger synchronisation.
//!
//! Every collaborator failure is classified into a [`SyncError`] before it reaches
//! the retry policy or the status line. The retry policy only looks at
//! [`SyncError::kind`].

/// Longest unknown-failure message shown to the player
pub const MAX_DISPLAY_CHARS: usize = 150;

/// Coarse failure class, the only thing the retry policy inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The wallet holder declined a signature or transaction
    UserDeclined,
    /// Gateway or relayer unavailable; worth retrying
    TransientInfra,
    /// The deployed contract lacks the requested function
    CapabilityAbsent,
    /// A protocol rule was violated (locally or by the ledger)
    InvariantViolation,
    /// Anything else
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    #[error("request rejected by user")]
    UserDeclined,

    #[error("relayer unavailable: {0}")]
    Transient(String),

    #[error("capability not available on this deployment: {0}")]
    CapabilityAbsent(String),

    #[error("signature does not recover to the requesting player")]
    SignatureMismatch,

    #[error("check-in cooldown active ({remaining_secs}s remaining)")]
    CooldownActive { remaining_secs: u64 },

    #[error("score must be greater than zero")]
    ZeroScore,

    #[error("no plays remaining")]
    NoPlays { can_check_in: bool },

    #[error("session signature required")]
    SignatureRequired,

    #[error("ledger rejected the request: {0}")]
    Rejected(String),

    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },

    #[error("local storage failure: {0}")]
    Storage(String),

    #[error("{0}")]
    Unknown(String),
}

impl SyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::UserDeclined => ErrorKind::UserDeclined,
            SyncError::Transient(_) | SyncError::RetriesExhausted { .. } => {
                ErrorKind::TransientInfra
            }
            SyncError::CapabilityAbsent(_) => ErrorKind::CapabilityAbsent,
            SyncError::SignatureMismatch
            | SyncError::CooldownActive { .. }
            | SyncError::ZeroScore
            | SyncError::NoPlays { .. }
            | SyncError::SignatureRequired
            | SyncError::Rejected(_) => ErrorKind::InvariantViolation,
            SyncError::Storage(_) | SyncError::Unknown(_) => ErrorKind::Unknown,
        }
    }

    /// Only transient failures are retried; exhaustion is final.
    pub fn is_transient(&self) -> bool {
        matches!(self, SyncError::Transient(_))
    }

    /// Whether the player can reasonably try the same action again later.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SyncError::UserDeclined
                | SyncError::Transient(_)
                | SyncError::RetriesExhausted { .. }
                | SyncError::CooldownActive { .. }
                | SyncError::NoPlays { .. }
                | SyncError::SignatureRequired
        )
    }

    /// Player-facing status line.
    pub fn user_message(&self) -> String {
        match self {
            SyncError::UserDeclined => "Request rejected by user".to_string(),
            SyncError::Transient(_) => {
                "Relayer service is temporarily unavailable. Please try again in a few moments."
                    .to_string()
            }
            SyncError::RetriesExhausted { .. } => {
                "Relayer did not respond after several attempts. Please try again later."
                    .to_string()
            }
            SyncError::CapabilityAbsent(_) => {
                "Contract needs to be updated. Feature not available.".to_string()
            }
            SyncError::SignatureMismatch => {
                "Failed to verify signature. Please try again.".to_string()
            }
            SyncError::CooldownActive { remaining_secs } if *remaining_secs > 0 => format!(
                "Check-in cooldown: {} remaining",
                format_remaining(*remaining_secs)
            ),
            SyncError::CooldownActive { .. } => {
                "Check-in cooldown not expired. Please wait.".to_string()
            }
            SyncError::ZeroScore => "Nothing to publish: score is zero".to_string(),
            SyncError::NoPlays { can_check_in: true } => {
                "Please check-in first to get plays".to_string()
            }
            SyncError::NoPlays { can_check_in: false } => {
                "No plays available. Please check-in when available (24h cooldown)".to_string()
            }
            SyncError::SignatureRequired => {
                "Signature required for decryption. Please sign to continue.".to_string()
            }
            SyncError::Rejected(reason) => truncate_message(reason),
            SyncError::Storage(msg) | SyncError::Unknown(msg) => truncate_message(msg),
        }
    }
}

/// `Xh Ym` rendering of a duration in seconds.
pub fn format_remaining(secs: u64) -> String {
    format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
}

/// Cut a message to [`MAX_DISPLAY_CHARS`] characters, marking the cut with `...`.
pub fn truncate_message(msg: &str) -> String {
    match msg.char_indices().nth(MAX_DISPLAY_CHARS) {
        Some((cut, _)) => format!("{}...", &msg[..cut]),
        None => msg.to_string(),
    }
}
