//! Certificate data types and field extraction.

use serde::Serialize;

/// Digest algorithm for fingerprint computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    Sha256,
    Sha384,
    Sha512,
    Sha1,
}

/// A parsed client certificate with the fields WebID verification uses.
#[derive(Debug, Clone, Serialize)]
pub struct Certificate {
    /// Certificate version (1, 2, or 3).
    pub version: u32,
    /// Serial number as a colon-separated hex string.
    pub serial: String,
    /// Issuer distinguished name.
    pub issuer: DistinguishedName,
    /// Subject distinguished name.
    pub subject: DistinguishedName,
    /// Validity start date.
    pub not_before: DateTime,
    /// Validity end date.
    pub not_after: DateTime,
    /// Public key information.
    pub public_key: PublicKeyInfo,
    /// X.509v3 extensions, in certificate order.
    pub extensions: Vec<Extension>,

    /// Raw DER bytes of the entire certificate (for fingerprint computation).
    #[serde(skip)]
    pub raw_der: Vec<u8>,
}

/// Distinguished name with ordered components.
#[derive(Debug, Clone, Serialize)]
pub struct DistinguishedName {
    /// Ordered list of (attribute_type, value) pairs.
    /// Attribute types use short names where known (e.g., "CN", "O", "UID").
    pub components: Vec<(String, String)>,
}

impl DistinguishedName {
    /// Format as a comma-separated one-line string ("O = Org, CN = Alice").
    ///
    /// Values containing commas, equals signs, or backslashes are escaped
    /// to prevent ambiguous output.
    pub fn to_oneline(&self) -> String {
        let mut result = String::new();
        for (i, (k, v)) in self.components.iter().enumerate() {
            if i > 0 {
                result.push_str(", ");
            }
            result.push_str(k);
            result.push_str(" = ");
            for ch in v.chars() {
                match ch {
                    '\\' => result.push_str("\\\\"),
                    ',' => result.push_str("\\,"),
                    '=' => result.push_str("\\="),
                    _ => result.push(ch),
                }
            }
        }
        result
    }
}

impl std::fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_oneline())
    }
}

/// Subject public key information.
#[derive(Debug, Clone, Serialize)]
pub struct PublicKeyInfo {
    /// Algorithm name: "RSA", "EC", "Ed25519", or the raw OID.
    pub algorithm: String,
    /// Key size in bits, when known.
    pub key_size: Option<u32>,
    /// RSA modulus as lowercase hex without a leading zero byte (RSA only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modulus: Option<String>,
    /// RSA public exponent (RSA only, typically 65537).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exponent: Option<u64>,
}

/// A certificate extension.
#[derive(Debug, Clone, Serialize)]
pub struct Extension {
    /// OID as a dotted-decimal string.
    pub oid: String,
    /// Human-readable name (or OID string if unknown).
    pub name: String,
    /// Whether this extension is marked critical.
    pub critical: bool,
    /// Parsed extension value.
    pub value: ExtensionValue,
}

/// Strongly-typed extension values.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "value")]
pub enum ExtensionValue {
    BasicConstraints {
        ca: bool,
        path_len: Option<u32>,
    },
    ExtendedKeyUsage(Vec<String>),
    SubjectAltName(Vec<SanEntry>),
    /// Fallback for extensions we don't parse into a specific variant.
    Raw(String),
}

/// Subject Alternative Name entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value")]
pub enum SanEntry {
    Dns(String),
    Email(String),
    Ip(String),
    Uri(String),
    Other(String),
}

impl std::fmt::Display for SanEntry {
    /// OpenSSL-style rendering: `URI:https://...`, `DNS:...`.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SanEntry::Dns(v) => write!(f, "DNS:{}", v),
            SanEntry::Email(v) => write!(f, "email:{}", v),
            SanEntry::Ip(v) => write!(f, "IP Address:{}", v),
            SanEntry::Uri(v) => write!(f, "URI:{}", v),
            SanEntry::Other(v) => write!(f, "othername:{}", v),
        }
    }
}

/// Date-time representation.
#[derive(Debug, Clone, Serialize)]
pub struct DateTime {
    /// ISO 8601 formatted string.
    pub iso8601: String,
    /// Unix timestamp.
    pub timestamp: i64,
}

impl DateTime {
    /// Build from a Unix timestamp, rendering the ISO 8601 form in UTC.
    pub fn from_timestamp(ts: i64) -> Self {
        let iso = match ::time::OffsetDateTime::from_unix_timestamp(ts) {
            Ok(dt) => format!(
                "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
                dt.year(),
                u8::from(dt.month()),
                dt.day(),
                dt.hour(),
                dt.minute(),
                dt.second()
            ),
            Err(_) => format!("{}", ts),
        };
        DateTime {
            iso8601: iso,
            timestamp: ts,
        }
    }
}

impl std::fmt::Display for DateTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.iso8601)
    }
}

impl Certificate {
    /// Return the subject as a one-line string.
    pub fn subject_string(&self) -> String {
        self.subject.to_oneline()
    }

    /// Return the issuer as a one-line string.
    pub fn issuer_string(&self) -> String {
        self.issuer.to_oneline()
    }

    /// Compute the fingerprint of the certificate using the given digest algorithm.
    pub fn fingerprint(&self, algorithm: DigestAlgorithm) -> String {
        crate::fingerprint::compute_fingerprint(&self.raw_der, algorithm)
    }

    /// Return the RSA modulus as a hex string, if this is an RSA certificate.
    pub fn modulus_hex(&self) -> Option<&str> {
        self.public_key.modulus.as_deref()
    }

    /// The Subject Alternative Name extension's entries, if the extension is present.
    pub fn subject_alt_name(&self) -> Option<&[SanEntry]> {
        self.extensions.iter().find_map(|ext| match &ext.value {
            ExtensionValue::SubjectAltName(entries) => Some(entries.as_slice()),
            _ => None,
        })
    }

    /// The SAN rendered the way OpenSSL prints it ("URI:a, DNS:b").
    pub fn subject_alt_name_string(&self) -> Option<String> {
        self.subject_alt_name().map(|entries| {
            entries
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        })
    }

    /// Extensions marked critical.
    pub fn critical_extensions(&self) -> impl Iterator<Item = &Extension> {
        self.extensions.iter().filter(|ext| ext.critical)
    }
}
