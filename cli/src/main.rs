//! SilentPool CLI - Command line client for the SilentPool privacy pool

#![allow(dead_code)] // Public API items may not be used internally

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod display;
mod error;
mod fulfill;
mod ledger;
mod note;
mod pending;
mod request;
mod status;

#[cfg(test)]
mod testing;


#[cfg(test)]
mod test_vectors;



use commands::Session;

#[derive(Parser)]
#[command(name = "silentpool")]
#[command(author = "SilentPool Team")]
#[command(version = "0.1.0")]
#[command(about = "Private deposits and delayed withdrawals for the SilentPool contract")]
#[command(long_about = r#"
SilentPool breaks the link between a deposit and its withdrawal.

A deposit is made with a secret note. Withdrawing reveals only the note's
nullifier, to a recipient of your choice, after a fixed delay.

Quick Start:
  1. silentpool generate ...            Create a note, then deposit its commitment
  2. silentpool status <NOTE>           Check the deposit landed
  3. silentpool request <NOTE> -r ADDR  Request the withdrawal
  4. silentpool fulfill <ID>            Claim it once the delay has passed
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Ethereum JSON-RPC URL (overrides config.json)
    #[arg(long, global = true)]
    rpc_url: Option<String>,

    /// SilentPool contract address (overrides config.json)
    #[arg(long, global = true)]
    pool: Option<String>,

    /// Directory for settings and pending withdrawals [default: ~/.silentpool]
    #[arg(long, global = true, env = "SILENTPOOL_HOME")]
    data_dir: Option<PathBuf>,

    /// Encrypted JSON keystore used to sign transactions
    #[arg(long, global = true)]
    keystore: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new deposit note
    Generate {
        /// Token contract address (0x000...000 for ETH)
        #[arg(short, long)]
        token: String,

        /// Pool id within the token's pools
        #[arg(short, long)]
        pool_id: u64,

        /// Deposit amount, as shown by the pool
        #[arg(short, long)]
        amount: String,

        /// Chain id of the network the deposit is made on
        #[arg(short, long, default_value = "11155111")]
        chain_id: u64,

        /// Also write the note to this file (or a timestamped file in this directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Decode a note and check its commitment, offline
    Inspect {
        /// Note string (silentpool-...)
        note: String,
    },

    /// Check whether a note is deposited and unspent
    Status {
        /// Note string (silentpool-...)
        note: String,
    },

    /// Request a withdrawal (step 1 of 2)
    Request {
        /// Note string (silentpool-...)
        note: String,

        /// Address that will receive the funds
        #[arg(short, long)]
        recipient: String,
    },

    /// Claim a withdrawal once its delay has passed (step 2 of 2)
    Fulfill {
        /// Request id, or the local id shown by 'pending'
        id: String,
    },

    /// List tracked withdrawals
    Pending {
        /// Include withdrawals on every chain, without contacting the network
        #[arg(short, long)]
        all: bool,
    },

    /// Forget old withdrawals that were never claimed
    Prune {
        /// Age limit in hours [default: from config.json, 48]
        #[arg(long)]
        max_age_hours: Option<u64>,
    },

    /// Show configuration and local state
    Info {
        /// Write the effective settings to config.json
        #[arg(long)]
        save: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let session = Session::load(
        cli.data_dir.as_deref(),
        cli.rpc_url,
        cli.pool,
        cli.keystore,
    )?;

    match cli.command {
        Commands::Generate { token, pool_id, amount, chain_id, output } => {
            commands::generate::run(commands::generate::GenerateOptions {
                token,
                pool_id,
                amount,
                chain_id,
                output,
            })?;
        }
        Commands::Inspect { note } => {
            commands::inspect::run(&session, &note)?;
        }
        Commands::Status { note } => {
            commands::status::run(&session, &note).await?;
        }
        Commands::Request { note, recipient } => {
            commands::request::run(&session, &note, &recipient).await?;
        }
        Commands::Fulfill { id } => {
            commands::fulfill::run(&session, &id).await?;
        }
        Commands::Pending { all } => {
            commands::pending::run(&session, all).await?;
        }
        Commands::Prune { max_age_hours } => {
            commands::prune::run(&session, max_age_hours)?;
        }
        Commands::Info { save } => {
            commands::info::run(&session, save).await?;
        }
    }

    Ok(())
}
