//! Step 1/2 of a withdrawal: reveal the nullifier and register a request
//!
//! Every check that can fail without spending gas runs first. Once the
//! transaction is broadcast it is never retried here; the user resubmits
//! explicitly if it fails.

use tracing::{debug, info, warn};

use crate::display::validate_address;
use crate::error::{Warning, WithdrawError};
use crate::ledger::{submit_and_confirm, ConfirmationPolicy, LogEntry, PoolLedger, RequestCall, TxHash};
use crate::note::{keccak256, Bytes32, Note};
use crate::status::status_for_note;

/// Event the pool emits for every accepted request:
/// `WithdrawalRequested(uint256 indexed requestId, bytes32 indexed nullifier, address indexed recipient)`
pub const WITHDRAWAL_REQUESTED_EVENT: &str = "WithdrawalRequested(uint256,bytes32,address)";

/// Result of a successful request
#[derive(Debug)]
pub struct RequestOutcome {
    /// Ledger-assigned id, `0` when it could not be read from the logs
    pub request_id: u64,
    pub tx_hash: TxHash,
    pub note: Note,
    pub warnings: Vec<Warning>,
}

/// Request a withdrawal of `note_string` to `recipient`
///
/// On success the caller should start tracking the request locally; the
/// claim becomes possible once the pool's delay has passed.
pub async fn request_withdrawal<L>(
    ledger: &L,
    policy: &ConfirmationPolicy,
    note_string: &str,
    recipient: &str,
) -> Result<RequestOutcome, WithdrawError>
where
    L: PoolLedger + ?Sized,
{
    validate_address(recipient).map_err(WithdrawError::InvalidRecipient)?;

    let note = Note::decode(note_string)?;
    if !note.validate() {
        return Err(WithdrawError::InvalidNote);
    }

    let mut warnings = Vec::new();

    let active_chain = ledger.chain_id().await?;
    if note.chain_id != active_chain {
        let warning = Warning::ChainMismatch {
            note_chain: note.chain_id,
            active_chain,
        };
        warn!("{warning}");
        warnings.push(warning);
    }

    // Re-checked here even if the caller just displayed it
    let status = status_for_note(ledger, &note).await?;
    if !status.exists {
        return Err(WithdrawError::NoteNotFound);
    }
    if status.nullifier_used {
        return Err(WithdrawError::AlreadySpent);
    }

    let call = RequestCall::for_note(&note, recipient);
    debug!(pool_id = note.pool_id, commitment = %note.short_commitment(), "submitting withdrawal request");

    let receipt = submit_and_confirm(ledger, policy, ledger.submit_request(&call)).await?;

    let request_id = match extract_request_id(&receipt.logs) {
        Some(id) => id,
        None => {
            warn!(tx_hash = %receipt.tx_hash, "{}", Warning::RequestIdUnknown);
            warnings.push(Warning::RequestIdUnknown);
            0
        }
    };

    info!(request_id, tx_hash = %receipt.tx_hash, "withdrawal requested");

    Ok(RequestOutcome {
        request_id,
        tx_hash: receipt.tx_hash,
        note,
        warnings,
    })
}

/// Topic 0 of the `WithdrawalRequested` event
pub fn withdrawal_requested_topic() -> Bytes32 {
    keccak256(WITHDRAWAL_REQUESTED_EVENT.as_bytes())
}

/// Read the request id out of the pool's receipt logs
///
/// A `WithdrawalRequested` log is decoded by signature first. Otherwise the
/// logs are walked in order and the first one that yields a value wins: its
/// first indexed topic when it has one, else its first data word.
pub fn extract_request_id(logs: &[LogEntry]) -> Option<u64> {
    let event_topic = withdrawal_requested_topic();

    let typed = logs
        .iter()
        .filter(|log| log.topics.first() == Some(&event_topic))
        .find_map(|log| log.topics.get(1).and_then(|t| word_to_u64(&t.0)));
    if typed.is_some() {
        return typed;
    }

    logs.iter().find_map(|log| {
        if log.topics.len() > 1 {
            word_to_u64(&log.topics[1].0)
        } else if log.data.len() >= 32 {
            word_to_u64(&log.data[..32])
        } else {
            None
        }
    })
}

/// Big-endian uint256 word to u64, `None` if it does not fit
fn word_to_u64(word: &[u8]) -> Option<u64> {
    if word.len() != 32 || word[..24].iter().any(|&b| b != 0) {
        return None;
    }
    let mut low = [0u8; 8];
    low.copy_from_slice(&word[24..]);
    Some(u64::from_be_bytes(low))
}
