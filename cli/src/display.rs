//! Formatting and input checks for the command line

/// Tokens with a known symbol, keyed by lowercase address
const KNOWN_TOKENS: &[(&str, &str)] = &[
    ("0x0000000000000000000000000000000000000000", "ETH"),
    ("0xe12f41ad58856673247cbb785ea5c8fd7cce466d", "USDC"),
];

/// Check that `address` looks like an EVM address (`0x` + 40 hex digits),
/// for recipients and token contracts alike
pub fn validate_address(address: &str) -> Result<(), &'static str> {
    if address.is_empty() {
        return Err("Address is required");
    }
    if !address.starts_with("0x") {
        return Err("Address must start with 0x");
    }
    if address.len() != 42 {
        return Err("Address must be 42 characters");
    }
    if !address[2..].chars().all(|c| c.is_ascii_hexdigit()) {
        return Err("Address contains invalid characters");
    }
    Ok(())
}

/// Human-readable symbol for a token address
pub fn token_symbol(token: &str) -> String {
    let lower = token.to_ascii_lowercase();
    KNOWN_TOKENS
        .iter()
        .find(|(address, _)| *address == lower)
        .map(|(_, symbol)| symbol.to_string())
        .unwrap_or_else(|| format!("{}...", token.chars().take(6).collect::<String>()))
}

/// `1h 2m 3s`, `4m 5s`, `6s`, or `Ready now!`
pub fn format_time_remaining(seconds: u64) -> String {
    if seconds == 0 {
        return "Ready now!".to_string();
    }

    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{hours}h {minutes}m {secs}s")
    } else if minutes > 0 {
        format!("{minutes}m {secs}s")
    } else {
        format!("{secs}s")
    }
}

/// Shorten a hash to `0x12345678...90abcdef`
pub fn format_tx_hash(hash: &str, length: usize) -> String {
    if hash.len() < length * 2 {
        return hash.to_string();
    }
    format!("{}...{}", &hash[..length], &hash[hash.len() - length..])
}

pub fn network_name(chain_id: u64) -> Option<&'static str> {
    match chain_id {
        1 => Some("Ethereum"),
        5 => Some("Goerli"),
        11155111 => Some("Sepolia"),
        137 => Some("Polygon"),
        _ => None,
    }
}

fn explorer_base(chain_id: u64) -> &'static str {
    match chain_id {
        5 => "https://goerli.etherscan.io",
        11155111 => "https://sepolia.etherscan.io",
        137 => "https://polygonscan.com",
        _ => "https://etherscan.io",
    }
}

/// Block explorer link for a transaction
pub fn explorer_tx_url(chain_id: u64, tx_hash: &str) -> String {
    format!("{}/tx/{}", explorer_base(chain_id), tx_hash)
}

/// Block explorer link for an address
pub fn explorer_address_url(chain_id: u64, address: &str) -> String {
    format!("{}/address/{}", explorer_base(chain_id), address)
}
