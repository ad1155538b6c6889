//! Local tracking of in-flight withdrawals
//!
//! A request goes `Pending` (delay running) → `Ready` (delay elapsed, waiting
//! for the user to claim) → removed once the claim succeeds. There is no
//! resting "fulfilled" state.
//!
//! The store is a JSON file written with owner-only permissions. Every
//! mutation takes the same lock, applies the change to a copy, persists it
//! and only then publishes it, so concurrent `add`s cannot both pass the
//! duplicate check and a failed write leaves memory and disk in agreement.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::write_private;
use crate::display::token_symbol;
use crate::request::RequestOutcome;

/// Namespace of the store; also its file stem
pub const STORE_NAMESPACE: &str = "silentpool_pending_withdrawals";

/// Records older than this are considered abandoned
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(48 * 60 * 60);

/// Pending records closer than this to expiry are flagged as "soon"
pub const SOON_THRESHOLD_SECS: u64 = 60;

const LOCAL_ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

#[derive(Debug, Error)]
pub enum PendingError {
    #[error("Failed to access pending withdrawals at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Pending withdrawals file {} is corrupt: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize pending withdrawals: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A withdrawal request tracked on this machine
///
/// Display fields are copied in so listings work offline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingWithdrawal {
    /// Local id, assigned on insert
    pub id: String,
    /// Ledger-assigned id; `0` when unknown
    pub request_id: u64,
    pub note_string: String,
    pub recipient: String,
    /// Unix seconds
    pub request_timestamp: u64,
    pub chain_id: u64,
    pub token_symbol: String,
    pub amount: String,
    pub pool_id: u64,
    /// Unix seconds after which the claim should be accepted
    pub expires_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
}

impl PendingWithdrawal {
    pub fn is_ready(&self, now: u64) -> bool {
        self.expires_at <= now
    }

    pub fn remaining_secs(&self, now: u64) -> u64 {
        self.expires_at.saturating_sub(now)
    }

    /// Still pending, but less than a minute to go
    pub fn is_soon(&self, now: u64) -> bool {
        !self.is_ready(now) && self.remaining_secs(now) < SOON_THRESHOLD_SECS
    }

    /// Matches a local id or a known decimal request id
    pub fn matches(&self, key: &str) -> bool {
        self.id == key || (self.request_id != 0 && self.request_id.to_string() == key)
    }

    /// Same tracked request; an unknown request id (`0`) never collides
    fn duplicates(&self, other: &PendingWithdrawal) -> bool {
        self.id == other.id || (self.request_id != 0 && self.request_id == other.request_id)
    }
}

/// A record before it has been given a local id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWithdrawal {
    pub request_id: u64,
    pub note_string: String,
    pub recipient: String,
    pub request_timestamp: u64,
    pub chain_id: u64,
    pub token_symbol: String,
    pub amount: String,
    pub pool_id: u64,
    pub expires_at: u64,
    pub tx_hash: Option<String>,
}

impl NewWithdrawal {
    /// Describe a request that was just accepted at `now`
    ///
    /// `delay` is only the local estimate of the pool's delay; the pool
    /// remains the authority on when the claim is allowed.
    pub fn from_outcome(
        outcome: &RequestOutcome,
        note_string: &str,
        recipient: &str,
        now: u64,
        delay: Duration,
    ) -> Self {
        Self {
            request_id: outcome.request_id,
            note_string: note_string.trim().to_string(),
            recipient: recipient.to_string(),
            request_timestamp: now,
            chain_id: outcome.note.chain_id,
            token_symbol: token_symbol(&outcome.note.token),
            amount: outcome.note.amount.clone(),
            pool_id: outcome.note.pool_id,
            expires_at: now.saturating_add(delay.as_secs()),
            tx_hash: Some(outcome.tx_hash.to_hex()),
        }
    }

    fn with_id(self, id: String) -> PendingWithdrawal {
        PendingWithdrawal {
            id,
            request_id: self.request_id,
            note_string: self.note_string,
            recipient: self.recipient,
            request_timestamp: self.request_timestamp,
            chain_id: self.chain_id,
            token_symbol: self.token_symbol,
            amount: self.amount,
            pool_id: self.pool_id,
            expires_at: self.expires_at,
            tx_hash: self.tx_hash,
        }
    }
}

/// Ready and pending records at one instant
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WithdrawalBuckets {
    pub ready: Vec<PendingWithdrawal>,
    pub pending: Vec<PendingWithdrawal>,
}

/// Split `records` by expiry at `now`
///
/// Callers that refresh a display on a timer call this on every tick; the
/// ledger itself keeps no clock.
pub fn partition(records: &[PendingWithdrawal], now: u64) -> WithdrawalBuckets {
    let (ready, pending): (Vec<_>, Vec<_>) =
        records.iter().cloned().partition(|r| r.is_ready(now));
    WithdrawalBuckets { ready, pending }
}

/// Durable store of pending withdrawals
pub struct PendingLedger {
    path: Option<PathBuf>,
    records: Mutex<Vec<PendingWithdrawal>>,
}

impl PendingLedger {
    /// Store that lives only as long as this value
    pub fn in_memory() -> Self {
        Self {
            path: None,
            records: Mutex::new(Vec::new()),
        }
    }

    /// Location of the store inside `data_dir`
    pub fn default_path(data_dir: &Path) -> PathBuf {
        data_dir.join(format!("{STORE_NAMESPACE}.json"))
    }

    /// Open (or start) the store at `path`
    pub fn open(path: PathBuf) -> Result<Self, PendingError> {
        let records = if path.exists() {
            let json = fs::read_to_string(&path).map_err(|source| PendingError::Io {
                path: path.clone(),
                source,
            })?;
            serde_json::from_str(&json).map_err(|source| PendingError::Corrupt {
                path: path.clone(),
                source,
            })?
        } else {
            Vec::new()
        };

        debug!(path = %path.display(), count = records.len(), "opened pending withdrawals");

        Ok(Self {
            path: Some(path),
            records: Mutex::new(records),
        })
    }

    /// Start tracking a request
    ///
    /// Returns the new local id, or `None` if the request is already
    /// tracked.
    pub fn add(&self, new: NewWithdrawal) -> Result<Option<String>, PendingError> {
        let record = new.with_id(new_local_id());
        let id = record.id.clone();
        Ok(self.insert(record)?.then_some(id))
    }

    /// Insert a complete record, ignoring it if it shares an id or request
    /// id with a tracked one
    pub fn insert(&self, record: PendingWithdrawal) -> Result<bool, PendingError> {
        let mut records = self.lock();

        if records.iter().any(|existing| existing.duplicates(&record)) {
            debug!(request_id = record.request_id, "withdrawal already tracked, skipping");
            return Ok(false);
        }

        let mut next = records.clone();
        info!(id = %record.id, request_id = record.request_id, "tracking withdrawal");
        next.push(record);
        self.persist(&next)?;
        *records = next;
        Ok(true)
    }

    /// Stop tracking by local id or request id. Returns whether anything was
    /// removed.
    pub fn remove(&self, key: &str) -> Result<bool, PendingError> {
        let mut records = self.lock();

        let next: Vec<_> = records.iter().filter(|r| !r.matches(key)).cloned().collect();
        if next.len() == records.len() {
            return Ok(false);
        }

        self.persist(&next)?;
        debug!(key, before = records.len(), after = next.len(), "removed withdrawal");
        *records = next;
        Ok(true)
    }

    /// Drop records requested more than `max_age` before `now`
    pub fn prune_stale(&self, now: u64, max_age: Duration) -> Result<usize, PendingError> {
        let mut records = self.lock();
        let cutoff = now.saturating_sub(max_age.as_secs());

        let next: Vec<_> = records
            .iter()
            .filter(|r| r.request_timestamp >= cutoff)
            .cloned()
            .collect();
        let pruned = records.len() - next.len();
        if pruned == 0 {
            return Ok(0);
        }

        self.persist(&next)?;
        info!(pruned, "pruned stale withdrawals");
        *records = next;
        Ok(pruned)
    }

    pub fn all(&self) -> Vec<PendingWithdrawal> {
        self.lock().clone()
    }

    pub fn for_chain(&self, chain_id: u64) -> Vec<PendingWithdrawal> {
        self.lock()
            .iter()
            .filter(|r| r.chain_id == chain_id)
            .cloned()
            .collect()
    }

    pub fn find(&self, key: &str) -> Option<PendingWithdrawal> {
        self.lock().iter().find(|r| r.matches(key)).cloned()
    }

    /// Records whose delay has elapsed at `now`
    pub fn list_ready(&self, now: u64) -> Vec<PendingWithdrawal> {
        self.lock().iter().filter(|r| r.is_ready(now)).cloned().collect()
    }

    /// Records still inside their delay at `now`
    pub fn list_pending(&self, now: u64) -> Vec<PendingWithdrawal> {
        self.lock().iter().filter(|r| !r.is_ready(now)).cloned().collect()
    }

    /// Whether a request for this exact note string is already tracked
    pub fn is_note_pending(&self, note_string: &str) -> bool {
        let note_string = note_string.trim();
        self.lock().iter().any(|r| r.note_string == note_string)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // Mutations publish only after a successful write, so a poisoned lock
    // still guards a consistent list.
    fn lock(&self) -> MutexGuard<'_, Vec<PendingWithdrawal>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, records: &[PendingWithdrawal]) -> Result<(), PendingError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let json = serde_json::to_string_pretty(records)?;
        write_private(path, &json).map_err(|source| PendingError::Io {
            path: path.clone(),
            source,
        })
    }
}

/// `<unix-millis>-<9 base36 chars>`
fn new_local_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..9)
        .map(|_| LOCAL_ID_ALPHABET[rng.gen_range(0..LOCAL_ID_ALPHABET.len())] as char)
        .collect();
    format!("{}-{}", chrono::Utc::now().timestamp_millis(), suffix)
}

/// Current wall-clock time in unix seconds
pub fn unix_now() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn new_withdrawal(request_id: u64, expires_at: u64) -> NewWithdrawal {
        NewWithdrawal {
            request_id,
            note_string: format!("silentpool-note-{request_id}"),
            recipient: "0x000000000000000000000000000000000000dEaD".to_string(),
            request_timestamp: expires_at.saturating_sub(390),
            chain_id: 11155111,
            token_symbol: "USDC".to_string(),
            amount: "100".to_string(),
            pool_id: 3,
            expires_at,
            tx_hash: None,
        }
    }

    #[test]
    fn test_local_id_format() {
        let id = new_local_id();
        let (millis, suffix) = id.split_once('-').unwrap();
        assert!(millis.parse::<i64>().is_ok());
        assert_eq!(suffix.len(), 9);
        assert!(suffix.bytes().all(|b| LOCAL_ID_ALPHABET.contains(&b)));
    }

    #[test]
    fn test_add_assigns_unique_ids() {
        let ledger = PendingLedger::in_memory();
        let a = ledger.add(new_withdrawal(1, 1000)).unwrap().unwrap();
        let b = ledger.add(new_withdrawal(2, 1000)).unwrap().unwrap();
        assert_ne!(a, b);
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_duplicate_request_id_ignored() {
        let ledger = PendingLedger::in_memory();
        assert!(ledger.add(new_withdrawal(7, 1000)).unwrap().is_some());
        assert!(ledger.add(new_withdrawal(7, 2000)).unwrap().is_none());
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.all()[0].expires_at, 1000);
    }

    #[test]
    fn test_duplicate_local_id_ignored() {
        let ledger = PendingLedger::in_memory();
        let record = new_withdrawal(1, 1000).with_id("fixed".to_string());
        let clash = new_withdrawal(2, 1000).with_id("fixed".to_string());
        assert!(ledger.insert(record).unwrap());
        assert!(!ledger.insert(clash).unwrap());
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_unknown_request_ids_do_not_collide() {
        let ledger = PendingLedger::in_memory();
        assert!(ledger.add(new_withdrawal(0, 1000)).unwrap().is_some());
        assert!(ledger.add(new_withdrawal(0, 1000)).unwrap().is_some());
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_remove_by_id_or_request_id() {
        let ledger = PendingLedger::in_memory();
        let id = ledger.add(new_withdrawal(11, 1000)).unwrap().unwrap();
        ledger.add(new_withdrawal(12, 1000)).unwrap();

        assert!(ledger.remove(&id).unwrap());
        assert!(ledger.remove("12").unwrap());
        assert!(!ledger.remove("12").unwrap());
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_unknown_request_id_is_not_a_key() {
        let ledger = PendingLedger::in_memory();
        let first = ledger.add(new_withdrawal(0, 1000)).unwrap().unwrap();
        ledger.add(new_withdrawal(0, 1000)).unwrap();

        assert!(ledger.find("0").is_none());
        assert!(!ledger.remove("0").unwrap());
        assert_eq!(ledger.len(), 2);

        assert!(ledger.remove(&first).unwrap());
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_concurrent_adds_track_once() {
        let ledger = PendingLedger::in_memory();

        let added: Vec<bool> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..16)
                .map(|_| scope.spawn(|| ledger.add(new_withdrawal(42, 1000)).unwrap().is_some()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(added.iter().filter(|&&a| a).count(), 1);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_expiry_saturates() {
        let outcome = RequestOutcome {
            request_id: 1,
            tx_hash: crate::note::Bytes32([9; 32]),
            note: crate::note::Note::generate("0x00", 0, "1", 1),
            warnings: Vec::new(),
        };

        let new = NewWithdrawal::from_outcome(
            &outcome,
            "silentpool-x",
            "0x000000000000000000000000000000000000dEaD",
            u64::MAX - 10,
            Duration::from_secs(390),
        );
        assert_eq!(new.expires_at, u64::MAX);
    }

    #[test]
    fn test_ready_and_pending_split() {
        let ledger = PendingLedger::in_memory();
        ledger.add(new_withdrawal(1, 100)).unwrap();
        ledger.add(new_withdrawal(2, 200)).unwrap();

        assert_eq!(ledger.list_ready(100).len(), 1);
        assert_eq!(ledger.list_pending(100).len(), 1);
        assert_eq!(ledger.list_ready(200).len(), 2);
        assert!(ledger.list_pending(200).is_empty());
    }

    #[test]
    fn test_is_soon() {
        let record = new_withdrawal(1, 1000).with_id("a".to_string());
        assert!(record.is_soon(950));
        assert!(!record.is_soon(900));
        assert!(!record.is_soon(1000));
    }

    #[test]
    fn test_prune_stale() {
        let ledger = PendingLedger::in_memory();
        let mut old = new_withdrawal(1, 0);
        old.request_timestamp = 0;
        ledger.add(old).unwrap();
        ledger.add(new_withdrawal(2, 200_000)).unwrap();

        let pruned = ledger.prune_stale(200_000, DEFAULT_MAX_AGE).unwrap();
        assert_eq!(pruned, 1);
        assert_eq!(ledger.all()[0].request_id, 2);
    }

    #[test]
    fn test_for_chain() {
        let ledger = PendingLedger::in_memory();
        ledger.add(new_withdrawal(1, 100)).unwrap();
        let mut other = new_withdrawal(2, 100);
        other.chain_id = 1;
        ledger.add(other).unwrap();

        assert_eq!(ledger.for_chain(11155111).len(), 1);
        assert_eq!(ledger.for_chain(1)[0].request_id, 2);
    }

    #[test]
    fn test_survives_reload() {
        let dir = tempdir().unwrap();
        let path = PendingLedger::default_path(dir.path());

        let ledger = PendingLedger::open(path.clone()).unwrap();
        let id = ledger.add(new_withdrawal(5, 100)).unwrap().unwrap();
        drop(ledger);

        let reopened = PendingLedger::open(path).unwrap();
        assert_eq!(reopened.find("5").unwrap().id, id);
        assert!(reopened.is_note_pending("silentpool-note-5"));
    }

    #[test]
    fn test_corrupt_store_is_reported() {
        let dir = tempdir().unwrap();
        let path = PendingLedger::default_path(dir.path());
        fs::write(&path, "{not json").unwrap();

        assert!(matches!(
            PendingLedger::open(path),
            Err(PendingError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_persisted_json_uses_camel_case() {
        let dir = tempdir().unwrap();
        let path = PendingLedger::default_path(dir.path());
        let ledger = PendingLedger::open(path.clone()).unwrap();
        ledger.add(new_withdrawal(5, 100)).unwrap();

        let json = fs::read_to_string(path).unwrap();
        assert!(json.contains("\"requestId\": 5"));
        assert!(json.contains("\"expiresAt\": 100"));
        assert!(!json.contains("txHash"));
    }
}
