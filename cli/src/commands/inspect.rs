//! Decode and check a note without touching the network

use anyhow::Result;
use colored::Colorize;

use super::{explain, Session};
use crate::display::{network_name, token_symbol};
use crate::error::WithdrawError;
use crate::note::Note;

pub fn run(session: &Session, note_string: &str) -> Result<()> {
    let note = Note::decode(note_string).map_err(|e| explain(e.into()))?;

    println!("{}", "=== Note ===".cyan().bold());
    println!();
    println!("  Token:      {} ({})", token_symbol(&note.token), note.token);
    println!("  Pool:       #{}", note.pool_id);
    println!("  Amount:     {}", note.amount);
    println!(
        "  Network:    {} ({})",
        network_name(note.chain_id).unwrap_or("unknown"),
        note.chain_id
    );
    println!("  Commitment: {}", note.commitment);
    println!();

    if !note.validate() {
        return Err(explain(WithdrawError::InvalidNote));
    }
    println!("{}", "Commitment matches nullifier and secret".green());

    let pending = session.open_pending()?;
    if pending.is_note_pending(note_string) {
        println!(
            "{}",
            "A withdrawal for this note is already pending. See 'silentpool pending'.".yellow()
        );
    }

    Ok(())
}
