//! CLI subcommands

pub mod fulfill;
pub mod generate;
pub mod info;
pub mod inspect;
pub mod pending;
pub mod prune;
pub mod request;
pub mod status;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;

use crate::config::{self, load_signer, Settings};
use crate::error::{Disposition, WithdrawError};
use crate::ledger::evm::EvmLedger;
use crate::pending::PendingLedger;

/// Resolved data directory, settings and signer location for one invocation
pub struct Session {
    pub data_dir: PathBuf,
    pub settings: Settings,
    pub keystore: Option<PathBuf>,
}

impl Session {
    /// Load settings from `data_dir`, then apply command-line overrides
    pub fn load(
        data_dir: Option<&Path>,
        rpc_url: Option<String>,
        pool: Option<String>,
        keystore: Option<PathBuf>,
    ) -> Result<Self> {
        let data_dir = config::resolve_data_dir(data_dir)?;
        let mut settings = config::load_settings(&data_dir)?;

        if let Some(url) = rpc_url {
            settings.rpc_url = url;
        }
        if let Some(pool) = pool {
            settings.pool_address = pool;
        }

        Ok(Self {
            data_dir,
            settings,
            keystore,
        })
    }

    pub fn open_pending(&self) -> Result<PendingLedger> {
        let path = PendingLedger::default_path(&self.data_dir);
        PendingLedger::open(path).context("Failed to open pending withdrawals")
    }

    /// Connect without a signing key, for queries only
    pub async fn connect_read_only(&self) -> Result<EvmLedger> {
        EvmLedger::connect(&self.settings.rpc_url, &self.settings.pool_address, None)
            .await
            .with_context(|| format!("Failed to connect to {}", self.settings.rpc_url))
    }

    /// Connect with the configured signer, for submitting transactions
    pub async fn connect_signing(&self) -> Result<EvmLedger> {
        let wallet = load_signer(self.keystore.as_deref())?;
        EvmLedger::connect(&self.settings.rpc_url, &self.settings.pool_address, Some(wallet))
            .await
            .with_context(|| format!("Failed to connect to {}", self.settings.rpc_url))
    }
}

/// Print the user-facing explanation of a withdrawal failure and hand the
/// error back for the exit status
pub fn explain(error: WithdrawError) -> anyhow::Error {
    let advice = error.advice();

    println!();
    match error.disposition() {
        Disposition::Wait => println!("{}", advice.title.yellow().bold()),
        Disposition::Retry | Disposition::Fail => println!("{}", advice.title.red().bold()),
    }
    println!("  {}", advice.message);
    if advice.can_retry {
        println!("  {}", "You can try again.".dimmed());
    }
    println!();

    anyhow::Error::new(error)
}
