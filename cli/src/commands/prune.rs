//! Forget withdrawals that were abandoned long ago

use anyhow::Result;
use colored::Colorize;

use super::Session;
use crate::config::hours;
use crate::pending::unix_now;

pub fn run(session: &Session, max_age_hours: Option<u64>) -> Result<()> {
    let max_age = max_age_hours
        .map(hours)
        .unwrap_or_else(|| session.settings.max_pending_age());

    let ledger = session.open_pending()?;
    let pruned = ledger.prune_stale(unix_now(), max_age)?;

    if pruned == 0 {
        println!("{}", "Nothing to prune".dimmed());
    } else {
        println!(
            "{}",
            format!("Removed {} withdrawal(s) older than {}h", pruned, max_age.as_secs() / 3600)
                .green()
        );
    }

    Ok(())
}
