//! Error and warning types shared by the withdrawal protocols
//!
//! Every failure a caller can see is a distinct variant so the front-end can
//! decide between failing the action, waiting, or letting the user retry.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::note::{LEGACY_NOTE_PREFIX, NOTE_PREFIX};

/// A note string that cannot be parsed into a structurally complete note
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("Invalid note format - must start with '{}'", NOTE_PREFIX)]
    MissingPrefix,

    #[error("Legacy '{}' notes (no pool id) are not supported by this client", LEGACY_NOTE_PREFIX)]
    LegacyNote,

    #[error("Invalid note format - payload is not base64: {0}")]
    Base64(String),

    #[error("Invalid note format - payload is not UTF-8")]
    Utf8,

    #[error("Invalid note format - {0}")]
    Payload(String),

    #[error("Invalid note format - field `{0}` is empty")]
    EmptyField(&'static str),
}

/// Failure reported by the external pool ledger or its transport
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Contract call failed: {0}")]
    Contract(String),

    #[error("Transaction {0} was dropped before confirmation")]
    Dropped(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}

/// Failure of a withdrawal operation (status check, request or claim)
#[derive(Debug, Error)]
pub enum WithdrawError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("Invalid note - commitment doesn't match nullifier and secret")]
    InvalidNote,

    #[error("Invalid recipient address: {0}")]
    InvalidRecipient(&'static str),

    #[error("A withdrawal for this note is already pending")]
    NotePending,

    #[error("Note doesn't exist - no deposit with this commitment")]
    NoteNotFound,

    #[error("Note already spent - nullifier has been used")]
    AlreadySpent,

    #[error("Ledger query failed: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Transaction failed: {0}")]
    SubmissionFailed(String),

    #[error("Timed out after {}s waiting for confirmation{}", .waited.as_secs(), hash_suffix(.tx_hash))]
    ConfirmationTimeout {
        tx_hash: Option<String>,
        waited: Duration,
    },

    #[error("Withdrawal request #{0} was already fulfilled")]
    AlreadyFulfilled(u64),

    #[error("Withdrawal delay not elapsed - {}s remaining", .remaining.as_secs())]
    DelayNotElapsed { remaining: Duration },
}

fn hash_suffix(tx_hash: &Option<String>) -> String {
    tx_hash.as_deref().map(|h| format!(" of {h}")).unwrap_or_default()
}

/// What the caller should do with a failed operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Abort the whole action; retrying the same input cannot succeed
    Fail,
    /// Block until time passes, then try again
    Wait,
    /// The user may resubmit explicitly
    Retry,
}

/// Display-ready description of an error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advice {
    pub title: &'static str,
    pub message: String,
    pub can_retry: bool,
}

impl WithdrawError {
    pub fn disposition(&self) -> Disposition {
        match self {
            WithdrawError::Format(_)
            | WithdrawError::InvalidNote
            | WithdrawError::InvalidRecipient(_)
            | WithdrawError::NotePending
            | WithdrawError::NoteNotFound
            | WithdrawError::AlreadySpent
            | WithdrawError::AlreadyFulfilled(_) => Disposition::Fail,
            // A timed-out transaction may still land, so resubmitting is unsafe
            WithdrawError::DelayNotElapsed { .. } | WithdrawError::ConfirmationTimeout { .. } => {
                Disposition::Wait
            }
            WithdrawError::Ledger(_) | WithdrawError::SubmissionFailed(_) => Disposition::Retry,
        }
    }

    pub fn advice(&self) -> Advice {
        let (title, message) = match self {
            WithdrawError::Format(_) | WithdrawError::InvalidNote => {
                ("Invalid Note", self.to_string())
            }
            WithdrawError::InvalidRecipient(_) => ("Invalid Recipient", self.to_string()),
            WithdrawError::NotePending => (
                "Already Requested",
                "This note already has a pending withdrawal. Claim it once the delay expires".to_string(),
            ),
            WithdrawError::NoteNotFound => (
                "Unknown Note",
                "No deposit matches this note on the current pool".to_string(),
            ),
            WithdrawError::AlreadySpent => (
                "Note Already Used",
                "This note has already been spent. Each note can only be used once".to_string(),
            ),
            WithdrawError::AlreadyFulfilled(_) => ("Already Claimed", self.to_string()),
            WithdrawError::DelayNotElapsed { remaining } => (
                "Still Waiting",
                format!(
                    "The withdrawal delay hasn't expired yet. Try again in {}",
                    crate::display::format_time_remaining(remaining.as_secs())
                ),
            ),
            WithdrawError::ConfirmationTimeout { .. } => (
                "Confirmation Pending",
                format!("{self}. The transaction may still be mined; check the explorer before resubmitting"),
            ),
            WithdrawError::Ledger(_) => ("Network Error", self.to_string()),
            WithdrawError::SubmissionFailed(reason) => {
                if reason.contains("user rejected") || reason.contains("User rejected") {
                    ("Transaction Cancelled", "The transaction was rejected by the signer".to_string())
                } else if reason.contains("insufficient funds") {
                    ("Insufficient Funds", "The signer cannot pay for gas".to_string())
                } else {
                    ("Transaction Failed", self.to_string())
                }
            }
        };

        let can_retry = match self {
            WithdrawError::SubmissionFailed(reason) => !reason.contains("insufficient funds"),
            other => other.disposition() != Disposition::Fail,
        };

        Advice {
            title,
            message,
            can_retry,
        }
    }
}

/// Non-fatal conditions surfaced alongside a successful operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Warning {
    /// The note was created for a different network than the active one
    ChainMismatch { note_chain: u64, active_chain: u64 },
    /// The request landed but no request id could be read from its logs
    RequestIdUnknown,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::ChainMismatch {
                note_chain,
                active_chain,
            } => write!(
                f,
                "Note is for chain {note_chain}, but the pool is on chain {active_chain}"
            ),
            Warning::RequestIdUnknown => write!(
                f,
                "Request id could not be read from the transaction logs; recorded as 0"
            ),
        }
    }
}
