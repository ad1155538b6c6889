//! Claim a withdrawal: step 2 of 2

use anyhow::{bail, Result};
use colored::Colorize;
use tracing::warn;

use super::{explain, Session};
use crate::display::explorer_tx_url;
use crate::fulfill::fulfill_withdrawal;
use crate::ledger::PoolLedger;
use crate::pending::PendingLedger;

pub async fn run(session: &Session, key: &str) -> Result<()> {
    let pending = session.open_pending()?;
    let record = pending.find(key);

    let request_id = match (&record, key.parse::<u64>()) {
        (Some(record), _) => record.request_id,
        (None, Ok(id)) => id,
        (None, Err(_)) => bail!("No pending withdrawal matches '{}'", key),
    };
    if request_id == 0 {
        bail!(
            "The request id of this withdrawal is unknown. Look it up from the request \
             transaction on the explorer and run 'silentpool fulfill <REQUEST_ID>'."
        );
    }

    let ledger = session.connect_signing().await?;
    println!("{}", format!("Claiming withdrawal #{}...", request_id).cyan());

    let policy = session.settings.confirmation_policy();
    let outcome = fulfill_withdrawal(&ledger, &policy, request_id)
        .await
        .map_err(explain)?;

    let chain_id = match &record {
        Some(record) => record.chain_id,
        None => ledger.chain_id().await.unwrap_or_default(),
    };

    let tx_hash = outcome.tx_hash.to_hex();
    println!("{}", "Withdrawal complete!".green().bold());
    println!();
    println!("  Recipient:   {}", outcome.recipient);
    println!("  Transaction: {}", tx_hash);
    println!("  Explorer:    {}", explorer_tx_url(chain_id, &tx_hash));

    let key = match &record {
        Some(record) => record.id.clone(),
        None => request_id.to_string(),
    };
    if forget_claimed(&pending, &key) {
        println!("  {}", "Removed from pending withdrawals".dimmed());
    }

    Ok(())
}

/// Drop the claimed withdrawal from the pending list
///
/// The claim has already landed, so a failed write is only reported.
fn forget_claimed(pending: &PendingLedger, key: &str) -> bool {
    match pending.remove(key) {
        Ok(removed) => removed,
        Err(e) => {
            warn!(key, "failed to forget claimed withdrawal: {}", e);
            println!(
                "{} {}. The claimed withdrawal still shows in 'silentpool pending'.",
                "Warning:".yellow().bold(),
                e
            );
            false
        }
    }
}
