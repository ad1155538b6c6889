//! In-memory pool ledger for tests

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::LedgerError;
use crate::ledger::{LogEntry, PoolLedger, RequestCall, TxHash, TxReceipt, WithdrawalRequest};
use crate::note::{keccak256, Bytes32, Note};
use crate::request::withdrawal_requested_topic;

pub const TEST_CHAIN_ID: u64 = 11155111;
pub const TEST_RECIPIENT: &str = "0x000000000000000000000000000000000000dEaD";

/// How the mock pool reports request ids in its receipts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogShape {
    /// `WithdrawalRequested` with the id as topic 1
    Typed,
    /// Some other event carrying the id in its first data word
    DataOnly,
    /// No logs at all
    Silent,
}

#[derive(Default)]
struct State {
    commitments: HashSet<Bytes32>,
    nullifiers: HashSet<Bytes32>,
    requests: HashMap<u64, WithdrawalRequest>,
    receipts: HashMap<TxHash, TxReceipt>,
    next_request_id: u64,
    tx_count: u64,
    request_submissions: usize,
    fulfill_submissions: usize,
}

/// A pool that settles every transaction instantly
///
/// New requests start with `delay_secs` left; tests move time with
/// [`MockLedger::elapse`].
pub struct MockLedger {
    chain_id: u64,
    delay_secs: u64,
    log_shape: LogShape,
    submit_error: Option<String>,
    revert: bool,
    stall_receipts: bool,
    state: Mutex<State>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self {
            chain_id: TEST_CHAIN_ID,
            delay_secs: 390,
            log_shape: LogShape::Typed,
            submit_error: None,
            revert: false,
            stall_receipts: false,
            state: Mutex::new(State {
                next_request_id: 1,
                ..State::default()
            }),
        }
    }

    pub fn on_chain(mut self, chain_id: u64) -> Self {
        self.chain_id = chain_id;
        self
    }

    pub fn with_log_shape(mut self, shape: LogShape) -> Self {
        self.log_shape = shape;
        self
    }

    /// Every submission fails with `message`
    pub fn failing_with(mut self, message: &str) -> Self {
        self.submit_error = Some(message.to_string());
        self
    }

    /// Every transaction is mined but reverts
    pub fn reverting(mut self) -> Self {
        self.revert = true;
        self
    }

    /// Receipts never arrive
    pub fn stalled(mut self) -> Self {
        self.stall_receipts = true;
        self
    }

    pub fn deposit(&self, note: &Note) {
        self.state.lock().unwrap().commitments.insert(note.commitment);
    }

    pub fn spend(&self, note: &Note) {
        self.state.lock().unwrap().nullifiers.insert(note.nullifier);
    }

    /// Move every open request `secs` closer to claimable
    pub fn elapse(&self, secs: u64) {
        let mut state = self.state.lock().unwrap();
        for request in state.requests.values_mut() {
            request.time_until_withdrawal = request.time_until_withdrawal.saturating_sub(secs);
        }
    }

    pub fn set_time_until(&self, request_id: u64, secs: u64) {
        if let Some(request) = self.state.lock().unwrap().requests.get_mut(&request_id) {
            request.time_until_withdrawal = secs;
        }
    }

    pub fn insert_request(&self, request_id: u64, request: WithdrawalRequest) {
        self.state.lock().unwrap().requests.insert(request_id, request);
    }

    pub fn request(&self, request_id: u64) -> Option<WithdrawalRequest> {
        self.state.lock().unwrap().requests.get(&request_id).cloned()
    }

    pub fn request_submissions(&self) -> usize {
        self.state.lock().unwrap().request_submissions
    }

    pub fn fulfill_submissions(&self) -> usize {
        self.state.lock().unwrap().fulfill_submissions
    }

    fn next_tx_hash(state: &mut State) -> TxHash {
        state.tx_count += 1;
        keccak256(&state.tx_count.to_be_bytes())
    }

    fn record_receipt(&self, state: &mut State, logs: Vec<LogEntry>) -> TxHash {
        let tx_hash = Self::next_tx_hash(state);
        state.receipts.insert(
            tx_hash,
            TxReceipt {
                tx_hash,
                success: !self.revert,
                block_number: Some(state.tx_count),
                logs: if self.revert { Vec::new() } else { logs },
            },
        );
        tx_hash
    }
}

pub fn word(value: u64) -> Bytes32 {
    let mut bytes = [0u8; 32];
    bytes[24..].copy_from_slice(&value.to_be_bytes());
    Bytes32(bytes)
}

#[async_trait]
impl PoolLedger for MockLedger {
    async fn chain_id(&self) -> Result<u64, LedgerError> {
        Ok(self.chain_id)
    }

    async fn commitment_exists(&self, commitment: &Bytes32) -> Result<bool, LedgerError> {
        Ok(self.state.lock().unwrap().commitments.contains(commitment))
    }

    async fn is_nullifier_used(&self, nullifier: &Bytes32) -> Result<bool, LedgerError> {
        Ok(self.state.lock().unwrap().nullifiers.contains(nullifier))
    }

    async fn get_withdrawal_request(&self, request_id: u64) -> Result<WithdrawalRequest, LedgerError> {
        self.state
            .lock()
            .unwrap()
            .requests
            .get(&request_id)
            .cloned()
            .ok_or_else(|| LedgerError::Contract(format!("unknown request {request_id}")))
    }

    async fn submit_request(&self, call: &RequestCall) -> Result<TxHash, LedgerError> {
        let mut state = self.state.lock().unwrap();
        state.request_submissions += 1;

        if let Some(message) = &self.submit_error {
            return Err(LedgerError::Rpc(message.clone()));
        }

        let request_id = state.next_request_id;
        let logs = if !self.revert {
            state.next_request_id += 1;
            state.nullifiers.insert(call.nullifier);
            state.requests.insert(
                request_id,
                WithdrawalRequest {
                    commitment: call.commitment,
                    recipient: call.recipient.clone(),
                    request_timestamp: 1_700_000_000,
                    fulfilled: false,
                    time_until_withdrawal: self.delay_secs,
                },
            );
            match self.log_shape {
                LogShape::Typed => vec![LogEntry {
                    topics: vec![withdrawal_requested_topic(), word(request_id), call.nullifier],
                    data: Vec::new(),
                }],
                LogShape::DataOnly => vec![LogEntry {
                    topics: vec![Bytes32([0xee; 32])],
                    data: word(request_id).0.to_vec(),
                }],
                LogShape::Silent => Vec::new(),
            }
        } else {
            Vec::new()
        };

        Ok(self.record_receipt(&mut state, logs))
    }

    async fn submit_fulfill(&self, request_id: u64) -> Result<TxHash, LedgerError> {
        let mut state = self.state.lock().unwrap();
        state.fulfill_submissions += 1;

        if let Some(message) = &self.submit_error {
            return Err(LedgerError::Rpc(message.clone()));
        }

        if !self.revert {
            if let Some(request) = state.requests.get_mut(&request_id) {
                request.fulfilled = true;
            }
        }

        Ok(self.record_receipt(&mut state, Vec::new()))
    }

    async fn wait_for_receipt(
        &self,
        tx_hash: &TxHash,
        _confirmations: usize,
    ) -> Result<TxReceipt, LedgerError> {
        if self.stall_receipts {
            std::future::pending::<()>().await;
        }

        self.state
            .lock()
            .unwrap()
            .receipts
            .get(tx_hash)
            .cloned()
            .ok_or_else(|| LedgerError::Dropped(tx_hash.to_hex()))
    }
}
