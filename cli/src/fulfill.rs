//! Step 2/2 of a withdrawal: claim the funds once the delay has passed

use std::time::Duration;

use tracing::{debug, info};

use crate::error::WithdrawError;
use crate::ledger::{submit_and_confirm, ConfirmationPolicy, PoolLedger, TxHash, WithdrawalRequest};

/// Result of a successful claim
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FulfillOutcome {
    pub request_id: u64,
    pub tx_hash: TxHash,
    pub recipient: String,
}

/// Claim withdrawal request `request_id`
///
/// The request is read back from the pool on every call, so a retry after
/// a failure sees the current state. The pool enforces the delay itself;
/// checking it here only avoids paying for a transaction that would revert.
pub async fn fulfill_withdrawal<L>(
    ledger: &L,
    policy: &ConfirmationPolicy,
    request_id: u64,
) -> Result<FulfillOutcome, WithdrawError>
where
    L: PoolLedger + ?Sized,
{
    let request = ledger.get_withdrawal_request(request_id).await?;
    debug!(
        request_id,
        fulfilled = request.fulfilled,
        time_until_withdrawal = request.time_until_withdrawal,
        "withdrawal request state"
    );

    ensure_claimable(request_id, &request)?;

    let receipt = submit_and_confirm(ledger, policy, ledger.submit_fulfill(request_id)).await?;

    info!(request_id, tx_hash = %receipt.tx_hash, "withdrawal fulfilled");

    Ok(FulfillOutcome {
        request_id,
        tx_hash: receipt.tx_hash,
        recipient: request.recipient,
    })
}

/// Reject requests that are already claimed or still inside the delay
pub fn ensure_claimable(request_id: u64, request: &WithdrawalRequest) -> Result<(), WithdrawError> {
    if request.fulfilled {
        return Err(WithdrawError::AlreadyFulfilled(request_id));
    }
    if request.time_until_withdrawal > 0 {
        return Err(WithdrawError::DelayNotElapsed {
            remaining: Duration::from_secs(request.time_until_withdrawal),
        });
    }
    Ok(())
}
