//! Ask the pool whether a note can be withdrawn

use anyhow::Result;
use colored::Colorize;

use super::{explain, Session};
use crate::status::check_note_status;

pub async fn run(session: &Session, note_string: &str) -> Result<()> {
    println!("{}", "Checking note status...".cyan());

    let ledger = session.connect_read_only().await?;
    let status = check_note_status(&ledger, note_string)
        .await
        .map_err(explain)?;

    println!();
    println!("  Deposited:      {}", yes_no(status.exists));
    println!("  Nullifier used: {}", yes_no(status.nullifier_used));
    println!();

    if status.can_withdraw {
        println!("{}", "Note can be withdrawn".green().bold());
    } else if !status.exists {
        println!("{}", "No deposit matches this note".red().bold());
    } else {
        println!("{}", "Note has already been spent".red().bold());
    }

    Ok(())
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}
