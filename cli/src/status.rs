//! Note status as seen by the pool

use serde::Serialize;
use tracing::debug;

use crate::error::WithdrawError;
use crate::ledger::PoolLedger;
use crate::note::Note;

/// Whether a note can still be withdrawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteStatus {
    /// The commitment was deposited into the pool
    pub exists: bool,
    /// The nullifier was already revealed by a withdrawal request
    pub nullifier_used: bool,
    pub can_withdraw: bool,
}

impl NoteStatus {
    pub fn from_predicates(exists: bool, nullifier_used: bool) -> Self {
        Self {
            exists,
            nullifier_used,
            can_withdraw: exists && !nullifier_used,
        }
    }
}

/// Decode, validate and look up a note string
pub async fn check_note_status<L>(ledger: &L, note_string: &str) -> Result<NoteStatus, WithdrawError>
where
    L: PoolLedger + ?Sized,
{
    let note = Note::decode(note_string)?;
    if !note.validate() {
        return Err(WithdrawError::InvalidNote);
    }
    status_for_note(ledger, &note).await
}

/// Look up an already validated note
///
/// Both predicates are queried concurrently. The answer can go stale as
/// soon as it is returned, so callers about to submit must ask again.
pub async fn status_for_note<L>(ledger: &L, note: &Note) -> Result<NoteStatus, WithdrawError>
where
    L: PoolLedger + ?Sized,
{
    let (exists, nullifier_used) = tokio::try_join!(
        ledger.commitment_exists(&note.commitment),
        ledger.is_nullifier_used(&note.nullifier),
    )?;

    debug!(
        commitment = %note.short_commitment(),
        exists,
        nullifier_used,
        "note status"
    );

    Ok(NoteStatus::from_predicates(exists, nullifier_used))
}
