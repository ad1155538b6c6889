//! Interface to the on-chain SilentPool contract
//!
//! The withdrawal protocols only talk to the pool through [`PoolLedger`], so
//! they run unchanged against the EVM adapter in [`evm`] or an in-memory
//! ledger in tests.

pub mod evm;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use zeroize::Zeroize;

use crate::error::{LedgerError, WithdrawError};
use crate::note::{Bytes32, Note};

/// Transaction hash
pub type TxHash = Bytes32;

/// Confirmations to wait for before trusting logs from a receipt
pub const DEFAULT_CONFIRMATIONS: usize = 2;

/// Upper bound on a single submission or confirmation wait
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(120);

/// On-chain view of a withdrawal request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawalRequest {
    pub commitment: Bytes32,
    pub recipient: String,
    /// Unix seconds at which the contract accepted the request
    pub request_timestamp: u64,
    pub fulfilled: bool,
    /// Seconds left before the claim is allowed, as computed by the contract
    pub time_until_withdrawal: u64,
}

/// Arguments of `requestWithdrawal`
///
/// Submitting this reveals the nullifier publicly.
#[derive(Clone)]
pub struct RequestCall {
    pub token: String,
    pub pool_id: u64,
    pub commitment: Bytes32,
    pub nullifier: Bytes32,
    pub secret: Bytes32,
    pub recipient: String,
    pub merkle_proof: Vec<Bytes32>,
}

impl RequestCall {
    /// Build the call for `note`. The Merkle proof is left empty; the pool
    /// does not check it yet.
    pub fn for_note(note: &Note, recipient: &str) -> Self {
        Self {
            token: note.token.clone(),
            pool_id: note.pool_id,
            commitment: note.commitment,
            nullifier: note.nullifier,
            secret: note.secret,
            recipient: recipient.to_string(),
            merkle_proof: Vec::new(),
        }
    }
}

impl Drop for RequestCall {
    fn drop(&mut self) {
        self.secret.zeroize();
    }
}

/// A log emitted by the pool contract
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LogEntry {
    pub topics: Vec<Bytes32>,
    pub data: Vec<u8>,
}

/// Receipt of a mined transaction, restricted to logs from the pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: TxHash,
    pub success: bool,
    pub block_number: Option<u64>,
    pub logs: Vec<LogEntry>,
}

/// The external pool ledger
///
/// State-mutating calls return as soon as the transaction is broadcast;
/// [`PoolLedger::wait_for_receipt`] does the waiting.
#[async_trait]
pub trait PoolLedger: Send + Sync {
    /// Chain id of the network the pool lives on
    async fn chain_id(&self) -> Result<u64, LedgerError>;

    async fn commitment_exists(&self, commitment: &Bytes32) -> Result<bool, LedgerError>;

    async fn is_nullifier_used(&self, nullifier: &Bytes32) -> Result<bool, LedgerError>;

    async fn get_withdrawal_request(&self, request_id: u64) -> Result<WithdrawalRequest, LedgerError>;

    async fn submit_request(&self, call: &RequestCall) -> Result<TxHash, LedgerError>;

    async fn submit_fulfill(&self, request_id: u64) -> Result<TxHash, LedgerError>;

    async fn wait_for_receipt(
        &self,
        tx_hash: &TxHash,
        confirmations: usize,
    ) -> Result<TxReceipt, LedgerError>;
}

/// How long and how deep to wait for a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationPolicy {
    pub confirmations: usize,
    pub timeout: Duration,
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self {
            confirmations: DEFAULT_CONFIRMATIONS,
            timeout: DEFAULT_CONFIRMATION_TIMEOUT,
        }
    }
}

/// Broadcast a transaction and wait for it to be mined, both bounded by
/// `policy.timeout`
///
/// Never retries. A timeout is reported separately from a failure because
/// the transaction may still land.
pub(crate) async fn submit_and_confirm<L, F>(
    ledger: &L,
    policy: &ConfirmationPolicy,
    submit: F,
) -> Result<TxReceipt, WithdrawError>
where
    L: PoolLedger + ?Sized,
    F: Future<Output = Result<TxHash, LedgerError>>,
{
    let tx_hash = match tokio::time::timeout(policy.timeout, submit).await {
        Err(_) => {
            return Err(WithdrawError::ConfirmationTimeout {
                tx_hash: None,
                waited: policy.timeout,
            })
        }
        Ok(Err(e)) => return Err(WithdrawError::SubmissionFailed(e.to_string())),
        Ok(Ok(hash)) => hash,
    };

    debug!(%tx_hash, confirmations = policy.confirmations, "waiting for receipt");

    let receipt = match tokio::time::timeout(
        policy.timeout,
        ledger.wait_for_receipt(&tx_hash, policy.confirmations),
    )
    .await
    {
        Err(_) => {
            return Err(WithdrawError::ConfirmationTimeout {
                tx_hash: Some(tx_hash.to_hex()),
                waited: policy.timeout,
            })
        }
        Ok(Err(e)) => return Err(WithdrawError::SubmissionFailed(e.to_string())),
        Ok(Ok(receipt)) => receipt,
    };

    if !receipt.success {
        return Err(WithdrawError::SubmissionFailed(format!(
            "transaction {tx_hash} reverted"
        )));
    }

    Ok(receipt)
}
