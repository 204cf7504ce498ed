//! Address syntax checks.

use alloy::primitives::Address;

/// Parses a `0x`-prefixed, 40-digit hex address.
///
/// Single-case bodies are accepted as-is. A mixed-case body is treated as
/// an EIP-55 checksum and must verify.
pub fn parse_address(text: &str) -> Option<Address> {
    let body = text.strip_prefix("0x")?;
    if body.len() != 40 || !body.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }

    let has_lower = body.bytes().any(|b| b.is_ascii_lowercase());
    let has_upper = body.bytes().any(|b| b.is_ascii_uppercase());
    if has_lower && has_upper {
        return Address::parse_checksummed(text, None).ok();
    }

    text.parse().ok()
}

/// Returns true when `text` is a usable address.
pub fn is_valid_address(text: &str) -> bool {
    parse_address(text).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHECKSUMMED: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

    #[test]
    fn test_accepts_single_case_and_checksummed() {
        assert!(is_valid_address("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed"));
        assert!(is_valid_address("0x5AAEB6053F3E94C9B9A09F33669435E7EF1BEAED"));
        assert!(is_valid_address(CHECKSUMMED));
    }

    #[test]
    fn test_equality_ignores_case() {
        let lower = parse_address(&CHECKSUMMED.to_lowercase()).unwrap();
        let mixed = parse_address(CHECKSUMMED).unwrap();
        assert_eq!(lower, mixed);
    }

    #[test]
    fn test_rejects_malformed() {
        for bad in [
            "",
            "0x",
            "5aaeb6053f3e94c9b9a09f33669435e7ef1beaed",
            "0x5aaeb6053f3e94c9b9a09f33669435e7ef1bea",
            "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed00",
            "0xZaaeb6053f3e94c9b9a09f33669435e7ef1beaed",
            " 0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed",
            "0xabc",
        ] {
            assert!(!is_valid_address(bad), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_rejects_bad_checksum() {
        assert!(!is_valid_address("0x5aaeb6053F3E94C9b9A09f33669435E7Ef1BeAed"));
    }
}
