//! Settings, data directory and signing key for the SilentPool CLI

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use ethers::signers::LocalWallet;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::ledger::{ConfirmationPolicy, DEFAULT_CONFIRMATIONS};

/// Default directory for settings and pending withdrawals
const DATA_DIR: &str = ".silentpool";
const SETTINGS_FILE: &str = "config.json";

/// Environment variable holding a hex private key, used when no keystore is given
pub const PRIVATE_KEY_ENV: &str = "SILENTPOOL_PRIVATE_KEY";

pub const DEFAULT_RPC_URL: &str = "https://ethereum-sepolia-rpc.publicnode.com";

/// SilentPool deployment on Sepolia
pub const DEFAULT_POOL_ADDRESS: &str = "0x39bA257b79B5Bd11A8Ac96B98789dBEe615c513D";

/// Client-side estimate of the pool's withdrawal delay
pub const DEFAULT_WITHDRAWAL_DELAY_SECS: u64 = 390;

/// Persisted CLI settings
///
/// Missing keys fall back to their defaults, so an empty `{}` is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub rpc_url: String,
    pub pool_address: String,
    pub withdrawal_delay_secs: u64,
    pub confirmations: usize,
    pub confirmation_timeout_secs: u64,
    pub max_pending_age_hours: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            pool_address: DEFAULT_POOL_ADDRESS.to_string(),
            withdrawal_delay_secs: DEFAULT_WITHDRAWAL_DELAY_SECS,
            confirmations: DEFAULT_CONFIRMATIONS,
            confirmation_timeout_secs: 120,
            max_pending_age_hours: 48,
        }
    }
}

impl Settings {
    pub fn confirmation_policy(&self) -> ConfirmationPolicy {
        ConfirmationPolicy {
            confirmations: self.confirmations,
            timeout: Duration::from_secs(self.confirmation_timeout_secs),
        }
    }

    pub fn withdrawal_delay(&self) -> Duration {
        Duration::from_secs(self.withdrawal_delay_secs)
    }

    pub fn max_pending_age(&self) -> Duration {
        hours(self.max_pending_age_hours)
    }
}

/// `hours` as a duration, saturating instead of overflowing
pub fn hours(hours: u64) -> Duration {
    Duration::from_secs(hours.saturating_mul(60 * 60))
}

/// Data directory: explicit override, else `~/.silentpool`
pub fn resolve_data_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        return Ok(dir.to_path_buf());
    }
    let home = dirs::home_dir().context("Could not find home directory; pass --data-dir")?;
    Ok(home.join(DATA_DIR))
}

pub fn settings_file(data_dir: &Path) -> PathBuf {
    data_dir.join(SETTINGS_FILE)
}

/// Load settings, or defaults when no file exists yet
pub fn load_settings(data_dir: &Path) -> Result<Settings> {
    let path = settings_file(data_dir);
    if !path.exists() {
        return Ok(Settings::default());
    }

    let json = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read settings file {}", path.display()))?;
    let settings = serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse settings file {}", path.display()))?;

    Ok(settings)
}

pub fn save_settings(data_dir: &Path, settings: &Settings) -> Result<()> {
    let json = serde_json::to_string_pretty(settings)?;
    let path = settings_file(data_dir);
    write_private(&path, &json)
        .with_context(|| format!("Failed to write settings file {}", path.display()))
}

/// Write `contents` to `path`, creating parent directories, readable by the
/// owner only on Unix
pub fn write_private(path: &Path, contents: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::write(path, contents)?;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }

    #[cfg(not(unix))]
    {
        fs::write(path, contents)?;
    }

    Ok(())
}

/// Load the transaction signer
///
/// A keystore file takes precedence and its password is prompted for;
/// otherwise the key is read from [`PRIVATE_KEY_ENV`].
pub fn load_signer(keystore: Option<&Path>) -> Result<LocalWallet> {
    if let Some(path) = keystore {
        if !path.exists() {
            bail!("Keystore not found at {}", path.display());
        }

        let mut password = rpassword::prompt_password("Keystore password: ")
            .context("Failed to read keystore password")?;
        let wallet = LocalWallet::decrypt_keystore(path, &password)
            .with_context(|| format!("Failed to decrypt keystore {}", path.display()));
        password.zeroize();
        return wallet;
    }

    let mut key = match std::env::var(PRIVATE_KEY_ENV) {
        Ok(key) => key,
        Err(_) => bail!(
            "No signing key. Pass --keystore <FILE> or set {} to submit transactions.",
            PRIVATE_KEY_ENV
        ),
    };

    let wallet = key
        .trim()
        .trim_start_matches("0x")
        .parse::<LocalWallet>()
        .with_context(|| format!("{} is not a valid private key", PRIVATE_KEY_ENV));
    key.zeroize();
    wallet
}
