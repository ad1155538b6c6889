//! Request a withdrawal: step 1 of 2

use anyhow::{Context, Result};
use colored::Colorize;

use super::{explain, Session};
use crate::display::{explorer_tx_url, format_time_remaining};
use crate::error::WithdrawError;
use crate::pending::{unix_now, NewWithdrawal};
use crate::request::request_withdrawal;

pub async fn run(session: &Session, note_string: &str, recipient: &str) -> Result<()> {
    let pending = session.open_pending()?;
    if pending.is_note_pending(note_string) {
        return Err(explain(WithdrawError::NotePending));
    }

    let ledger = session.connect_signing().await?;
    println!("{}", "Requesting withdrawal...".cyan());
    println!("  From:      {}", ledger.signer_address());
    println!("  Recipient: {}", recipient);
    println!();

    let policy = session.settings.confirmation_policy();
    let outcome = request_withdrawal(&ledger, &policy, note_string, recipient)
        .await
        .map_err(explain)?;

    for warning in &outcome.warnings {
        println!("{} {}", "Warning:".yellow().bold(), warning);
    }

    let delay = session.settings.withdrawal_delay();
    let record = NewWithdrawal::from_outcome(&outcome, note_string, recipient, unix_now(), delay);
    let local_id = pending
        .add(record)
        .context("Withdrawal was requested but could not be saved locally")?;

    let tx_hash = outcome.tx_hash.to_hex();
    println!("{}", "Withdrawal requested!".green().bold());
    println!();
    println!("  Request ID:  {}", outcome.request_id);
    if let Some(id) = &local_id {
        println!("  Local ID:    {}", id);
    }
    println!("  Transaction: {}", tx_hash);
    println!("  Explorer:    {}", explorer_tx_url(outcome.note.chain_id, &tx_hash));
    println!();
    println!(
        "Claim in about {} with:",
        format_time_remaining(delay.as_secs())
    );
    let claim_key = match (outcome.request_id, &local_id) {
        (0, Some(id)) => id.clone(),
        (request_id, _) => request_id.to_string(),
    };
    println!("  silentpool fulfill {}", claim_key);

    Ok(())
}
