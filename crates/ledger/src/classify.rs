//! Classification of raw collaborator failures.
//!
//! Adapters that only get an error code and a message string (JSON-RPC wallets,
//! HTTP relayers) pass them through [`classify_failure`] once, at the adapter
//! boundary. Nothing downstream looks at message text again.

use crate::error::SyncError;

/// Wallet code for a declined request (EIP-1193).
const USER_REJECTED_CODE: &str = "4001";
const ACTION_REJECTED_CODE: &str = "ACTION_REJECTED";
/// ethers-style code for a reverted or missing contract call.
const CALL_EXCEPTION_CODE: &str = "CALL_EXCEPTION";

const DECLINED_PATTERNS: &[&str] = &["user rejected", "denied"];

const TRANSIENT_PATTERNS: &[&str] = &[
    "relayer",
    "Relayer",
    "backend connection",
    "Bad Request",
    "NetworkError",
    "Failed to fetch",
];

/// Relayer rejects overloaded requests with a plain 400.
const BAD_REQUEST_STATUS: &str = "400";

const COOLDOWN_PATTERN: &str = "cooldown not expired";

/// Map an error code and message into the failure taxonomy.
///
/// Order matters: user rejection wins over everything, then explicit revert
/// reasons, then transient infrastructure, then a bare revert (a function the
/// deployed contract does not have).
pub fn classify_failure(code: Option<&str>, message: &str) -> SyncError {
    let lower = message.to_lowercase();

    if matches!(code, Some(USER_REJECTED_CODE) | Some(ACTION_REJECTED_CODE))
        || DECLINED_PATTERNS.iter().any(|p| lower.contains(p))
    {
        return SyncError::UserDeclined;
    }

    if lower.contains(COOLDOWN_PATTERN) {
        return SyncError::CooldownActive { remaining_secs: 0 };
    }

    if let Some(reason) = revert_reason(message) {
        return SyncError::Rejected(reason.to_string());
    }

    if code == Some(BAD_REQUEST_STATUS)
        || has_token(message, BAD_REQUEST_STATUS)
        || TRANSIENT_PATTERNS.iter().any(|p| message.contains(p))
    {
        return SyncError::Transient(message.to_string());
    }

    if code == Some(CALL_EXCEPTION_CODE) || message.contains("execution reverted") {
        return SyncError::CapabilityAbsent(message.to_string());
    }

    SyncError::Unknown(message.to_string())
}

/// Whether `token` appears as a whole number in `message`, not inside a longer one.
fn has_token(message: &str, token: &str) -> bool {
    message
        .split(|c: char| !c.is_ascii_alphanumeric())
        .any(|word| word == token)
}

/// Reason string of a revert, if the message carries one.
fn revert_reason(message: &str) -> Option<&str> {
    const MARKERS: &[&str] = &["execution reverted:", "reverted with reason string"];

    MARKERS.iter().find_map(|marker| {
        let start = message.find(marker)? + marker.len();
        let reason = message[start..]
            .trim()
            .trim_matches(|c| c == '\'' || c == '"')
            .trim();
        (!reason.is_empty()).then_some(reason)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_rejection_by_code_or_text() {
        assert_eq!(classify_failure(Some("4001"), "whatever"), SyncError::UserDeclined);
        assert_eq!(
            classify_failure(None, "MetaMask Tx Signature: User rejected the request."),
            SyncError::UserDeclined
        );
        assert_eq!(
            classify_failure(None, "Permission denied"),
            SyncError::UserDeclined
        );
    }

    #[test]
    fn relayer_failures_are_transient() {
        for msg in [
            "Relayer didn't respond",
            "relayer timeout",
            "backend connection task has stopped",
            "HTTP 400",
            "Bad Request",
        ] {
            assert!(classify_failure(None, msg).is_transient(), "{msg}");
        }
    }

    #[test]
    fn bad_request_status_needs_a_standalone_code() {
        assert!(classify_failure(Some("400"), "request failed").is_transient());
        assert!(classify_failure(None, "status: 400, body: {}").is_transient());
        assert!(!classify_failure(None, "out of gas: used 14000").is_transient());
        assert!(!classify_failure(None, "nonce 4000 too high").is_transient());
    }

    #[test]
    fn bare_revert_is_capability_absent() {
        assert!(matches!(
            classify_failure(Some("CALL_EXCEPTION"), "missing revert data"),
            SyncError::CapabilityAbsent(_)
        ));
        assert!(matches!(
            classify_failure(None, "execution reverted"),
            SyncError::CapabilityAbsent(_)
        ));
    }

    #[test]
    fn revert_with_reason_is_rejected() {
        assert_eq!(
            classify_failure(None, "execution reverted: No plays remaining"),
            SyncError::Rejected("No plays remaining".into())
        );
        assert_eq!(
            classify_failure(
                None,
                "VM Exception: reverted with reason string 'Score must be greater than 0'"
            ),
            SyncError::Rejected("Score must be greater than 0".into())
        );
    }

    #[test]
    fn cooldown_revert_is_cooldown() {
        assert_eq!(
            classify_failure(None, "execution reverted: Check-in cooldown not expired"),
            SyncError::CooldownActive { remaining_secs: 0 }
        );
    }

    #[test]
    fn transaction_rejected_is_not_retried() {
        let err = classify_failure(None, "Transaction rejected: nonce too low");
        assert!(!err.is_transient());
        assert!(matches!(err, SyncError::Unknown(_)));
    }
}
