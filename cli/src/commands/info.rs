//! Show configuration and local state

use anyhow::Result;
use colored::Colorize;

use super::Session;
use crate::config::{save_settings, settings_file, PRIVATE_KEY_ENV};
use crate::display::{explorer_address_url, network_name};
use crate::ledger::PoolLedger;
use crate::pending::{partition, unix_now, PendingLedger};

/// Print the overview; with `save`, persist the effective settings first
pub async fn run(session: &Session, save: bool) -> Result<()> {
    let settings = &session.settings;

    if save {
        save_settings(&session.data_dir, settings)?;
        println!(
            "{} {}",
            "Saved settings to".green(),
            settings_file(&session.data_dir).display()
        );
    }

    println!();
    println!("{}", "SilentPool Configuration".yellow().bold());
    println!();

    println!("{}:", "Data Directory".cyan());
    println!("  {}", session.data_dir.display());
    println!();

    println!("{}:", "Network".cyan());
    println!("  RPC:  {}", settings.rpc_url);
    println!("  Pool: {}", settings.pool_address);
    match session.connect_read_only().await {
        Ok(ledger) => {
            let chain_id = ledger.chain_id().await?;
            println!(
                "  Chain: {} ({})",
                network_name(chain_id).unwrap_or("unknown"),
                chain_id
            );
            println!(
                "  {}",
                explorer_address_url(chain_id, &settings.pool_address).dimmed()
            );
        }
        Err(e) => println!("  {} {:#}", "UNREACHABLE".red(), e),
    }
    println!();

    println!("{}:", "Signer".cyan());
    if let Some(keystore) = &session.keystore {
        println!("  Keystore: {}", keystore.display());
    } else if std::env::var_os(PRIVATE_KEY_ENV).is_some() {
        println!("  From {}", PRIVATE_KEY_ENV);
    } else {
        println!("  {}", "NOT CONFIGURED".red());
        println!("  Pass --keystore <FILE> or set {} to submit transactions", PRIVATE_KEY_ENV);
    }
    println!();

    println!("{}:", "Withdrawals".cyan());
    println!("  Delay:         {}s (estimate)", settings.withdrawal_delay_secs);
    println!(
        "  Confirmations: {} (timeout {}s)",
        settings.confirmations, settings.confirmation_timeout_secs
    );
    let pending = session.open_pending()?;
    let buckets = partition(&pending.all(), unix_now());
    println!(
        "  Tracked:       {} ready, {} waiting",
        buckets.ready.len(),
        buckets.pending.len()
    );
    println!();

    println!("{}:", "File Locations".cyan());
    println!("  Settings: {}", settings_file(&session.data_dir).display());
    println!(
        "  Pending:  {}",
        PendingLedger::default_path(&session.data_dir).display()
    );

    Ok(())
}
