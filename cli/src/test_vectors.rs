//! Known-answer tests
//!
//! Digests are Ethereum's Keccak-256 (not NIST SHA3-256) and must match what
//! the pool contract computes on-chain. The sample note was produced by the
//! SilentPool web front-end.

#[cfg(test)]
mod known_answers {
    use crate::note::{compute_commitment, keccak256, Bytes32, Note};
    use crate::request::withdrawal_requested_topic;

    const SAMPLE_NOTE: &str = "silentpool-eyJudWxsaWZpZXIiOiIweGE5OTk1YzVhNDU3NTI0YjAwM2YyM2EyMTQ2OWQxMmUzYjA1ZjcwODkyZGFjZDE5MWU3M2ZhOTBlOGRjNGFkZDUiLCJzZWNyZXQiOiIweDljNjI5NTg0Y2FhNTgzYTBiZGNkMjljNTllYTc5NTgzYTUzNDkyZTZlNWQ5NGJhOTgyNzA2OTNkYTQyNjEwN2MiLCJjb21taXRtZW50IjoiMHg1MjUxZjBlY2IzZDMwNWE0M2UxMzJiODgzYWFmNGViNzQ0YWFlMDkzYjFjN2YyZThkNmU2Njk3NzY0ZmU5NjUwIiwidG9rZW4iOiIweEUxMkY0MWFkNTg4NTY2NzMyNDdDYmI3ODVFQTVjOGZEN2NjZTQ2NmQiLCJwb29sSWQiOjMsImFtb3VudCI6IjEwMCIsImNoYWluSWQiOjExMTU1MTExfQ==";

    #[test]
    fn test_keccak_empty() {
        assert_eq!(
            keccak256(&[]).to_hex(),
            "0xc5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_commitment_of_zero_secrets() {
        let zero = Bytes32::default();
        assert_eq!(
            compute_commitment(&zero, &zero).to_hex(),
            "0xad3228b676f7d3cd4284a5443f17f1962b36e491b30a40b2405849e597ba5fb5"
        );
    }

    #[test]
    fn test_commitment_of_fixed_secrets() {
        let commitment = compute_commitment(&Bytes32([0x11; 32]), &Bytes32([0x22; 32]));
        assert_eq!(
            commitment.to_hex(),
            "0x3e92e0db88d6afea9edc4eedf62fffa4d92bcdfc310dccbe943747fe8302e871"
        );
    }

    #[test]
    fn test_commitment_is_order_sensitive() {
        let a = Bytes32([0x11; 32]);
        let b = Bytes32([0x22; 32]);
        assert_ne!(compute_commitment(&a, &b), compute_commitment(&b, &a));
    }

    #[test]
    fn test_sample_note_decodes() {
        let note = Note::decode(SAMPLE_NOTE).unwrap();

        assert_eq!(
            note.nullifier.to_hex(),
            "0xa9995c5a457524b003f23a21469d12e3b05f70892dacd191e73fa90e8dc4add5"
        );
        assert_eq!(
            note.secret.to_hex(),
            "0x9c629584caa583a0bdcd29c59ea79583a53492e6e5d94ba98270693da426107c"
        );
        assert_eq!(
            note.commitment.to_hex(),
            "0x5251f0ecb3d305a43e132b883aaf4eb744aae093b1c7f2e8d6e6697764fe9650"
        );
        assert_eq!(note.token, "0xE12F41ad58856673247Cbb785EA5c8fD7cce466d");
        assert_eq!(note.pool_id, 3);
        assert_eq!(note.amount, "100");
        assert_eq!(note.chain_id, 11155111);
    }

    #[test]
    fn test_sample_note_validates() {
        assert!(Note::decode(SAMPLE_NOTE).unwrap().validate());
    }

    #[test]
    fn test_sample_note_reencodes_identically() {
        assert_eq!(Note::decode(SAMPLE_NOTE).unwrap().encode(), SAMPLE_NOTE);
    }

    #[test]
    fn test_sample_note_without_padding() {
        let unpadded = SAMPLE_NOTE.trim_end_matches('=');
        let note = Note::decode(unpadded).unwrap();
        assert_eq!(note.encode(), SAMPLE_NOTE);
    }

    #[test]
    fn test_sample_short_commitment() {
        let note = Note::decode(SAMPLE_NOTE).unwrap();
        assert_eq!(note.short_commitment(), "0x5251f0ec…fe9650");
    }

    #[test]
    fn test_withdrawal_requested_topic() {
        assert_eq!(
            withdrawal_requested_topic().to_hex(),
            "0x4c612f586b93d83f2243f75836ad5cf66ca1aca55f6d1bfb7bfd6b3515aa2202"
        );
    }

    #[test]
    fn test_withdrawal_fulfilled_topic() {
        assert_eq!(
            keccak256(b"WithdrawalFulfilled(uint256,address,uint128)").to_hex(),
            "0xbceec22f8353164933189f4500533e2cd158cab41d3295625e9a6588098ce9ae"
        );
    }
}
