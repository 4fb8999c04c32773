//! Shared encoding utilities.

use crate::oid;

/// Format bytes as colon-separated uppercase hex (e.g., "AB:CD:EF").
pub fn hex_colon_upper(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(":")
}

/// Whether the input looks like PEM (starts with `-----BEGIN` after whitespace).
pub fn is_pem(input: &[u8]) -> bool {
    let start = input
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(input.len());
    input
        .get(start..)
        .is_some_and(|rest| rest.starts_with(b"-----BEGIN"))
}

/// Map a DN attribute OID to its conventional short name.
pub fn oid_short_name(oid_str: &str) -> String {
    match oid_str {
        oid::COMMON_NAME => "CN".into(),
        oid::COUNTRY => "C".into(),
        oid::LOCALITY => "L".into(),
        oid::STATE_OR_PROVINCE => "ST".into(),
        oid::ORGANIZATION => "O".into(),
        oid::ORGANIZATIONAL_UNIT => "OU".into(),
        oid::USER_ID => "UID".into(),
        oid::EMAIL_ADDRESS => "emailAddress".into(),
        other => other.to_string(),
    }
}

/// Decode a big-endian unsigned integer, ignoring leading zero bytes.
///
/// Returns `None` if the significant bytes do not fit in a `u64`.
pub fn be_bytes_to_u64(bytes: &[u8]) -> Option<u64> {
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    let significant = bytes.get(start..)?;
    if significant.len() > 8 {
        return None;
    }
    Some(
        significant
            .iter()
            .fold(0u64, |acc, &b| (acc << 8) | u64::from(b)),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn detects_pem_after_whitespace() {
        assert!(is_pem(b"\n  -----BEGIN CERTIFICATE-----\n"));
        assert!(!is_pem(&[0x30, 0x82, 0x01]));
        assert!(!is_pem(b""));
    }

    #[test]
    fn decodes_exponents_of_any_width() {
        assert_eq!(be_bytes_to_u64(&[0x01, 0x00, 0x01]), Some(65537));
        assert_eq!(be_bytes_to_u64(&[0x03]), Some(3));
        assert_eq!(be_bytes_to_u64(&[0x00, 0x01, 0x00, 0x00, 0x00, 0x01]), Some(4294967297));
        assert_eq!(be_bytes_to_u64(&[0x01; 9]), None);
        assert_eq!(be_bytes_to_u64(&[]), Some(0));
    }

    #[test]
    fn colon_hex() {
        assert_eq!(hex_colon_upper(&[0xab, 0x01]), "AB:01");
    }
}
