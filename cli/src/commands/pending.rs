//! List tracked withdrawals

use anyhow::Result;
use colored::Colorize;

use super::Session;
use crate::display::{format_time_remaining, format_tx_hash};
use crate::ledger::PoolLedger;
use crate::pending::{partition, unix_now, PendingWithdrawal};

pub async fn run(session: &Session, all: bool) -> Result<()> {
    let ledger = session.open_pending()?;

    let records = if all {
        ledger.all()
    } else {
        let chain_id = session.connect_read_only().await?.chain_id().await?;
        ledger.for_chain(chain_id)
    };

    if records.is_empty() {
        println!("{}", "No pending withdrawals".dimmed());
        return Ok(());
    }

    let now = unix_now();
    let buckets = partition(&records, now);

    if !buckets.ready.is_empty() {
        println!("{}", format!("Ready to claim ({})", buckets.ready.len()).green().bold());
        for record in &buckets.ready {
            print_record(record, now);
        }
        println!();
    }

    if !buckets.pending.is_empty() {
        println!("{}", format!("Waiting ({})", buckets.pending.len()).yellow().bold());
        for record in &buckets.pending {
            print_record(record, now);
        }
        println!();
    }

    if !buckets.ready.is_empty() {
        println!("{}", "Claim with 'silentpool fulfill <ID>'".dimmed());
    }

    Ok(())
}

fn print_record(record: &PendingWithdrawal, now: u64) {
    let remaining = record.remaining_secs(now);
    let timing = if record.is_ready(now) {
        "ready".green().to_string()
    } else if record.is_soon(now) {
        format!("{} (soon)", format_time_remaining(remaining)).cyan().to_string()
    } else {
        format_time_remaining(remaining)
    };

    println!(
        "  #{:<6} {} {} (pool #{}) -> {}  {}",
        record.request_id,
        record.amount,
        record.token_symbol,
        record.pool_id,
        format_tx_hash(&record.recipient, 8),
        timing
    );
    println!("          {}", format!("id {}", record.id).dimmed());
}
