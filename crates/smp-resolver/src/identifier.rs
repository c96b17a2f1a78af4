// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Participant identifier parsing, validation and canonical hashing.

use sha2::{Digest, Sha256};

/// Category prefix Peppol uses when a participant identifier appears in its
/// full form (e.g. inside SMP request URLs).
pub const ISO6523_ACTORID_UPIS: &str = "iso6523-actorid-upis";

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum IdentifierError {
    #[error("missing ':' separator in participant identifier {0:?}")]
    MissingSeparator(String),
    #[error("empty scheme in participant identifier {0:?}")]
    EmptyScheme(String),
    #[error("empty value in participant identifier {0:?}")]
    EmptyValue(String),
    #[error("scheme {0:?} is not alphanumeric")]
    InvalidScheme(String),
    #[error("value {0:?} is not a valid DNS label")]
    InvalidValue(String),
}

/// A parsed and validated `(scheme, value)` participant identifier.
///
/// Hashing is case-sensitive on both fields; this type never case-folds its
/// input (see spec's VAT-scheme note — callers must supply the
/// Peppol-canonical form themselves).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParticipantIdentifier {
    scheme: String,
    value: String,
}

impl ParticipantIdentifier {
    /// Parse `scheme:value`. The value may itself contain `:` — only the
    /// first separator is significant.
    pub fn parse(input: &str) -> Result<Self, IdentifierError> {
        let (scheme, value) = input
            .split_once(':')
            .ok_or_else(|| IdentifierError::MissingSeparator(input.to_string()))?;

        if scheme.is_empty() {
            return Err(IdentifierError::EmptyScheme(input.to_string()));
        }
        if value.is_empty() {
            return Err(IdentifierError::EmptyValue(input.to_string()));
        }

        let id = Self {
            scheme: scheme.to_string(),
            value: value.to_string(),
        };
        id.validate()?;
        Ok(id)
    }

    fn validate(&self) -> Result<(), IdentifierError> {
        if !self.scheme.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(IdentifierError::InvalidScheme(self.scheme.clone()));
        }
        if !is_dns_label(&self.value) {
            return Err(IdentifierError::InvalidValue(self.value.clone()));
        }
        Ok(())
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// `scheme:value`
    pub fn as_short_string(&self) -> String {
        format!("{}:{}", self.scheme, self.value)
    }

    /// `iso6523-actorid-upis::scheme:value` — the form used in SMP URLs.
    pub fn as_peppol_string(&self) -> String {
        format!("{ISO6523_ACTORID_UPIS}::{}:{}", self.scheme, self.value)
    }

    /// The leftmost label of the SML DNS query name: a lowercase,
    /// unpadded base32 (RFC 4648) encoding of the SHA-256 digest of
    /// `scheme:value`.
    pub fn hash(&self) -> ParticipantHash {
        let digest = Sha256::digest(self.as_short_string().as_bytes());
        let encoded =
            base32::encode(base32::Alphabet::Rfc4648 { padding: false }, &digest).to_lowercase();
        ParticipantHash(encoded)
    }
}

impl std::fmt::Display for ParticipantIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_short_string())
    }
}

/// 32-byte SHA-256 digest of `scheme:value`, base32-encoded and lowercased
/// with padding stripped. Length-stable: 52 characters for a 256-bit digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParticipantHash(String);

impl ParticipantHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ParticipantHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn is_dns_label(value: &str) -> bool {
    let bytes = value.as_bytes();
    if bytes.is_empty() {
        return false;
    }
    let is_alnum = |b: u8| b.is_ascii_alphanumeric();
    if !is_alnum(bytes[0]) || !is_alnum(*bytes.last().unwrap()) {
        return false;
    }
    bytes[1..bytes.len().saturating_sub(1)]
        .iter()
        .all(|&b| is_alnum(b) || b == b'-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scheme_and_value() {
        let id = ParticipantIdentifier::parse("0208:0843766574").unwrap();
        assert_eq!(id.scheme(), "0208");
        assert_eq!(id.value(), "0843766574");
    }

    #[test]
    fn value_may_contain_colons() {
        let id = ParticipantIdentifier::parse("9925:be0843766574").unwrap();
        assert_eq!(id.value(), "be0843766574");

        // DNS-label values can't actually contain ':', but the split
        // contract must still only consume the first separator.
        let err = ParticipantIdentifier::parse("0208:").unwrap_err();
        assert_eq!(err, IdentifierError::EmptyValue("0208:".to_string()));
    }

    #[test]
    fn rejects_missing_separator() {
        assert_eq!(
            ParticipantIdentifier::parse("invalid-format").unwrap_err(),
            IdentifierError::MissingSeparator("invalid-format".to_string())
        );
    }

    #[test]
    fn rejects_non_alphanumeric_scheme() {
        assert!(matches!(
            ParticipantIdentifier::parse("02-08:0843766574"),
            Err(IdentifierError::InvalidScheme(_))
        ));
    }

    #[test]
    fn rejects_invalid_dns_label_value() {
        assert!(matches!(
            ParticipantIdentifier::parse("0208:-leading-hyphen"),
            Err(IdentifierError::InvalidValue(_))
        ));
        assert!(matches!(
            ParticipantIdentifier::parse("0208:trailing-hyphen-"),
            Err(IdentifierError::InvalidValue(_))
        ));
    }

    #[test]
    fn known_hash_vector() {
        let id = ParticipantIdentifier::parse("0208:0843766574").unwrap();
        assert_eq!(
            id.hash().as_str(),
            "cmorzb6cpx7e4wldnu4zxrmczeqaiacq4qds2x7zi5ki4nsxxfma"
        );
    }

    #[test]
    fn hash_is_case_sensitive_and_deterministic() {
        let a = ParticipantIdentifier::parse("0208:0843766574").unwrap();
        let b = ParticipantIdentifier::parse("0208:0843766574").unwrap();
        assert_eq!(a.hash(), b.hash());
        assert_eq!(a.hash().as_str().len(), 52);
    }

    #[test]
    fn peppol_string_form() {
        let id = ParticipantIdentifier::parse("0208:0843766574").unwrap();
        assert_eq!(
            id.as_peppol_string(),
            "iso6523-actorid-upis::0208:0843766574"
        );
    }
}
