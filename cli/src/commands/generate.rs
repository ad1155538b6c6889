//! Generate a deposit note

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use colored::Colorize;

use crate::config::write_private;
use crate::display::{network_name, token_symbol, validate_address};
use crate::note::Note;

/// Options for note generation
pub struct GenerateOptions {
    pub token: String,
    pub pool_id: u64,
    pub amount: String,
    pub chain_id: u64,
    /// File, or directory to place a timestamped file in
    pub output: Option<PathBuf>,
}

pub fn run(options: GenerateOptions) -> Result<()> {
    validate_address(&options.token)
        .map_err(|reason| anyhow::anyhow!("Invalid token address: {reason}"))?;
    if options.amount.trim().is_empty() {
        bail!("Amount is required");
    }
    if options.chain_id == 0 {
        bail!("Chain id must be non-zero");
    }

    let note = Note::generate(
        options.token.as_str(),
        options.pool_id,
        options.amount.trim(),
        options.chain_id,
    );
    let encoded = note.encode();

    println!("{}", "=== SilentPool Deposit Note ===".cyan().bold());
    println!();
    println!("  Token:      {} ({})", token_symbol(&note.token), note.token);
    println!("  Pool:       #{}", note.pool_id);
    println!("  Amount:     {}", note.amount);
    println!(
        "  Network:    {}",
        network_name(note.chain_id)
            .map(str::to_string)
            .unwrap_or_else(|| format!("chain {}", note.chain_id))
    );
    println!("  Commitment: {}", note.commitment);
    println!();
    println!("{}", "Note (keep this secret):".yellow().bold());
    println!("{}", encoded);
    println!();

    if let Some(output) = options.output.as_deref() {
        let path = export_path(output);
        write_private(&path, &encoded)
            .with_context(|| format!("Failed to write note to {}", path.display()))?;
        println!("{} {}", "Saved to".green(), path.display());
        println!();
    }

    println!(
        "{}",
        "Anyone holding this note can withdraw the deposit. It cannot be recovered if lost."
            .yellow()
    );
    println!(
        "{}",
        format!(
            "Deposit this commitment into pool #{}, then keep the note until you withdraw.",
            note.pool_id
        )
        .dimmed()
    );

    Ok(())
}

fn export_path(output: &Path) -> PathBuf {
    if output.is_dir() {
        output.join(format!(
            "silentpool-note-{}.txt",
            chrono::Utc::now().timestamp_millis()
        ))
    } else {
        output.to_path_buf()
    }
}
