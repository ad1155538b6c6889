//! Deposit notes for the SilentPool contract
//!
//! A note is the bearer secret a depositor keeps offline. The contract only
//! ever sees the commitment at deposit time:
//!
//! ```text
//! commitment = keccak256(abi.encode(bytes32 nullifier, bytes32 secret))
//! ```
//!
//! which for two fixed-size words is the Keccak-256 of their 64-byte
//! concatenation. Notes travel as `silentpool-<base64(json)>` strings that
//! other front-ends of the protocol produce byte for byte.

use std::fmt;
use std::str::FromStr;

use base64::{
    alphabet,
    engine::{general_purpose::STANDARD, DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine,
};
use rand::{rngs::OsRng, RngCore};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::error::FormatError;

/// Tag every portable note string starts with
pub const NOTE_PREFIX: &str = "silentpool-";

/// Tag used by the first front-end, whose notes carry no pool id
pub const LEGACY_NOTE_PREFIX: &str = "silence-";

/// Accepts payloads with or without `=` padding
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

// ============================================================================
// 32-byte words
// ============================================================================

/// A 32-byte word, rendered as `0x`-prefixed lowercase hex
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Zeroize)]
pub struct Bytes32(pub [u8; 32]);

impl Bytes32 {
    /// Draw 32 bytes from the operating system CSPRNG
    pub fn random() -> Self {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Parse `0x`-prefixed (or bare) hex of exactly 32 bytes, any case
    pub fn from_hex(input: &str) -> Result<Self, String> {
        let digits = input
            .strip_prefix("0x")
            .or_else(|| input.strip_prefix("0X"))
            .unwrap_or(input);
        let bytes = hex::decode(digits).map_err(|e| format!("invalid hex `{input}`: {e}"))?;
        let word: [u8; 32] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| format!("expected 32 bytes, got {}", b.len()))?;
        Ok(Self(word))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Bytes32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Bytes32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bytes32({})", self.to_hex())
    }
}

impl Serialize for Bytes32 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Bytes32 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Bytes32::from_hex(&text).map_err(de::Error::custom)
    }
}

/// Keccak-256, the digest the pool contract uses on-chain
pub fn keccak256(data: &[u8]) -> Bytes32 {
    let mut hasher = Keccak256::new();
    hasher.update(data);

    let mut digest = [0u8; 32];
    digest.copy_from_slice(&hasher.finalize());
    Bytes32(digest)
}

/// Compute the deposit commitment for a nullifier/secret pair
///
/// Must match the contract exactly: `keccak256(abi.encode(nullifier, secret))`.
pub fn compute_commitment(nullifier: &Bytes32, secret: &Bytes32) -> Bytes32 {
    let mut preimage = [0u8; 64];
    preimage[..32].copy_from_slice(&nullifier.0);
    preimage[32..].copy_from_slice(&secret.0);
    let commitment = keccak256(&preimage);
    preimage.zeroize();
    commitment
}

// ============================================================================
// Note
// ============================================================================

/// Everything a depositor needs to withdraw later
///
/// Field order is the wire order of the JSON payload; do not reorder.
/// The nullifier and secret are zeroized on drop.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub nullifier: Bytes32,
    pub secret: Bytes32,
    pub commitment: Bytes32,
    pub token: String,
    pub pool_id: u64,
    pub amount: String,
    pub chain_id: u64,
}

impl Drop for Note {
    fn drop(&mut self) {
        self.nullifier.zeroize();
        self.secret.zeroize();
    }
}

impl fmt::Debug for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Note")
            .field("commitment", &self.commitment)
            .field("token", &self.token)
            .field("pool_id", &self.pool_id)
            .field("amount", &self.amount)
            .field("chain_id", &self.chain_id)
            .finish_non_exhaustive()
    }
}

impl Note {
    /// Generate a fresh note for a deposit into `(token, pool_id)`
    ///
    /// Uses OS entropy; an entropy failure aborts rather than returning a
    /// weak note.
    pub fn generate(
        token: impl Into<String>,
        pool_id: u64,
        amount: impl Into<String>,
        chain_id: u64,
    ) -> Self {
        Self::from_secrets(
            Bytes32::random(),
            Bytes32::random(),
            token,
            pool_id,
            amount,
            chain_id,
        )
    }

    /// Build a note from known secrets, deriving the commitment
    pub fn from_secrets(
        nullifier: Bytes32,
        secret: Bytes32,
        token: impl Into<String>,
        pool_id: u64,
        amount: impl Into<String>,
        chain_id: u64,
    ) -> Self {
        let commitment = compute_commitment(&nullifier, &secret);
        Self {
            nullifier,
            secret,
            commitment,
            token: token.into(),
            pool_id,
            amount: amount.into(),
            chain_id,
        }
    }

    /// Serialize to the portable `silentpool-` string
    pub fn encode(&self) -> String {
        let json = serde_json::to_string(self).expect("note fields are plain strings and integers");
        format!("{}{}", NOTE_PREFIX, STANDARD.encode(json))
    }

    /// Parse a portable note string, failing closed on anything incomplete
    pub fn decode(input: &str) -> Result<Self, FormatError> {
        let input = input.trim();
        let payload = match input.strip_prefix(NOTE_PREFIX) {
            Some(payload) => payload,
            None if input.starts_with(LEGACY_NOTE_PREFIX) => return Err(FormatError::LegacyNote),
            None => return Err(FormatError::MissingPrefix),
        };

        let raw = LENIENT_BASE64
            .decode(payload)
            .map_err(|e| FormatError::Base64(e.to_string()))?;
        let json = String::from_utf8(raw).map_err(|_| FormatError::Utf8)?;
        let note: Note =
            serde_json::from_str(&json).map_err(|e| FormatError::Payload(e.to_string()))?;

        if note.token.is_empty() {
            return Err(FormatError::EmptyField("token"));
        }
        if note.amount.is_empty() {
            return Err(FormatError::EmptyField("amount"));
        }
        if note.chain_id == 0 {
            return Err(FormatError::EmptyField("chainId"));
        }

        Ok(note)
    }

    /// Whether the stored commitment matches the nullifier and secret
    ///
    /// Compared in constant time. A `false` here means the note is
    /// well-formed but corrupt or tampered with.
    pub fn validate(&self) -> bool {
        let computed = compute_commitment(&self.nullifier, &self.secret);
        computed.0.ct_eq(&self.commitment.0).into()
    }

    /// Abbreviated commitment for display, e.g. `0x5251f0ec…fe9650`
    pub fn short_commitment(&self) -> String {
        let hex = self.commitment.to_hex();
        format!("{}…{}", &hex[..10], &hex[hex.len() - 6..])
    }
}

impl FromStr for Note {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Note::decode(s)
    }
}
