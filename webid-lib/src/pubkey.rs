//! RSA public keys as compared by the WebID protocol.
//!
//! A [`PublicKey`] is a value: two keys are the same key iff their normalized
//! moduli and exponents are equal. Keys found in identity documents first
//! arrive as [`ClaimedKey`]s, which keep the raw literal text so that a
//! malformed modulus or exponent fails its own check instead of being dropped.

use serde::Serialize;
use std::fmt;

/// Normalize a hex modulus for comparison.
///
/// Strips whitespace and quote characters, lowercases, and removes redundant
/// leading zero digits (DER-style dumps often carry a `00` sign byte).
/// Idempotent.
pub fn normalize_modulus(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '"' && *c != '\'')
        .map(|c| c.to_ascii_lowercase())
        .collect();
    let trimmed = cleaned.trim_start_matches('0');
    if trimmed.is_empty() && !cleaned.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// An RSA public key `(modulus, exponent)` with value semantics.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PublicKey {
    modulus: String,
    exponent: u64,
}

impl PublicKey {
    /// Build a key, normalizing the modulus.
    pub fn new(modulus: &str, exponent: u64) -> Self {
        Self {
            modulus: normalize_modulus(modulus),
            exponent,
        }
    }

    /// Normalized lowercase hex modulus.
    pub fn modulus(&self) -> &str {
        &self.modulus
    }

    pub fn exponent(&self) -> u64 {
        self.exponent
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RSA(exp={}, mod={})", self.exponent, abbreviate(&self.modulus))
    }
}

/// One component (modulus or exponent) of a key found in a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct KeyComponent {
    /// Text of the graph term (normalized for moduli, trimmed for exponents).
    pub text: String,
    /// Whether the term was a literal rather than a resource.
    pub literal: bool,
}

/// A key asserted in an identity document, before validation of its parts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ClaimedKey {
    pub modulus: KeyComponent,
    pub exponent: KeyComponent,
}

impl ClaimedKey {
    /// Build from raw term text; the modulus is normalized here.
    pub fn new(modulus: &str, modulus_literal: bool, exponent: &str, exponent_literal: bool) -> Self {
        Self {
            modulus: KeyComponent {
                text: normalize_modulus(modulus),
                literal: modulus_literal,
            },
            exponent: KeyComponent {
                text: exponent.trim().to_string(),
                literal: exponent_literal,
            },
        }
    }

    /// The modulus, if it is a non-empty hex string.
    pub fn modulus_hex(&self) -> Option<&str> {
        let text = self.modulus.text.as_str();
        if !text.is_empty() && text.chars().all(|c| c.is_ascii_hexdigit()) {
            Some(text)
        } else {
            None
        }
    }

    /// The exponent, if it is a base-10 unsigned integer.
    pub fn exponent_value(&self) -> Option<u64> {
        self.exponent.text.parse().ok()
    }

    /// The key as a comparable [`PublicKey`], when both parts are well formed.
    pub fn public_key(&self) -> Option<PublicKey> {
        Some(PublicKey::new(self.modulus_hex()?, self.exponent_value()?))
    }
}

impl fmt::Display for ClaimedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RSA(exp={}, mod={})",
            self.exponent.text,
            abbreviate(&self.modulus.text)
        )
    }
}

fn abbreviate(modulus: &str) -> String {
    const SHOWN: usize = 16;
    if modulus.len() <= SHOWN {
        modulus.to_string()
    } else {
        let head: String = modulus.chars().take(SHOWN).collect();
        format!("{}...({} hex digits)", head, modulus.len())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn normalization_strips_noise_and_lowercases() {
        assert_eq!(normalize_modulus(" \"AB\t01\n\" "), "ab01");
        assert_eq!(normalize_modulus("00:ab"), ":ab");
        assert_eq!(normalize_modulus("00AB01"), "ab01");
        assert_eq!(normalize_modulus("000"), "0");
        assert_eq!(normalize_modulus(""), "");
    }

    #[test]
    fn normalization_is_idempotent() {
        for raw in ["AB01", " 00ff\n", "'dead beef'", "zz", "0", "", "0x1F"] {
            let once = normalize_modulus(raw);
            assert_eq!(normalize_modulus(&once), once, "input {:?}", raw);
        }
    }

    #[test]
    fn keys_compare_by_value() {
        assert_eq!(PublicKey::new("AB01", 65537), PublicKey::new("ab01", 65537));
        assert_ne!(PublicKey::new("ab01", 3), PublicKey::new("ab01", 65537));
        let set: std::collections::BTreeSet<_> =
            [PublicKey::new("ab01", 3), PublicKey::new("AB01", 3)].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn claimed_key_parts_fail_independently() {
        let bad_exp = ClaimedKey::new("ab01", true, "sixty", true);
        assert_eq!(bad_exp.modulus_hex(), Some("ab01"));
        assert_eq!(bad_exp.exponent_value(), None);
        assert_eq!(bad_exp.public_key(), None);

        let bad_mod = ClaimedKey::new("xyz", true, " 65537 ", true);
        assert_eq!(bad_mod.modulus_hex(), None);
        assert_eq!(bad_mod.exponent_value(), Some(65537));

        let good = ClaimedKey::new("00AB01", true, "65537", true);
        assert_eq!(good.public_key(), Some(PublicKey::new("ab01", 65537)));
    }

    #[test]
    fn display_abbreviates_long_moduli() {
        let key = PublicKey::new(&"a".repeat(64), 65537);
        assert_eq!(key.to_string(), "RSA(exp=65537, mod=aaaaaaaaaaaaaaaa...(64 hex digits))");
    }
}
