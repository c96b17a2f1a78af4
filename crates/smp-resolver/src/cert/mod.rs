// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! X.509 access-point certificate parsing, keyed and memoized by SHA-256
//! fingerprint. Grounded in the same PEM-stripping and `x509-parser`
//! pattern used by this codebase's DDS-Security authentication path, minus
//! chain validation and revocation checking — out of scope here.

use base64::Engine as _;
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use x509_parser::prelude::*;

#[cfg(test)]
mod tests;

#[derive(Debug, thiserror::Error)]
pub enum CertError {
    #[error("certificate base64 payload is empty")]
    Empty,
    #[error("base64 decode failed: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("X.509 parse failed: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateInfo {
    /// Uppercase hex SHA-256 of the DER encoding; the cache key.
    pub fingerprint: String,
    pub subject: String,
    pub issuer: String,
    pub serial: String,
    pub not_before: chrono::DateTime<chrono::Utc>,
    pub not_after: chrono::DateTime<chrono::Utc>,
    pub is_expired: bool,
    pub seat_id: Option<String>,
    /// The original base64 (or PEM) string as supplied by the caller.
    pub original_base64: String,
}

/// Parses and memoizes certificates by fingerprint. Unbounded for the life
/// of the process; `clear()` is invoked at resolver shutdown.
#[derive(Default)]
pub struct CertificateParser {
    cache: DashMap<String, CertificateInfo>,
}

impl CertificateParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(&self, base64_or_pem: &str) -> Result<CertificateInfo, CertError> {
        let der = normalize_to_der(base64_or_pem)?;
        let fingerprint = fingerprint_hex(&der);

        if let Some(cached) = self.cache.get(&fingerprint) {
            return Ok(cached.clone());
        }

        let info = parse_der(&der, fingerprint.clone(), base64_or_pem.to_string())?;
        self.cache.insert(fingerprint, info.clone());
        Ok(info)
    }

    pub fn clear(&self) {
        self.cache.clear();
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }
}

/// Strip PEM armor and whitespace, then base64-decode to DER. Accepts both
/// raw base64 and PEM-wrapped input; both representations of the same
/// certificate produce the same fingerprint.
fn normalize_to_der(input: &str) -> Result<Vec<u8>, CertError> {
    let mut stripped = String::with_capacity(input.len());
    for line in input.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("-----") {
            continue;
        }
        stripped.push_str(trimmed);
    }
    let stripped: String = stripped.chars().filter(|c| !c.is_whitespace()).collect();

    if stripped.is_empty() {
        return Err(CertError::Empty);
    }

    Ok(base64::engine::general_purpose::STANDARD.decode(stripped)?)
}

fn fingerprint_hex(der: &[u8]) -> String {
    let digest = Sha256::digest(der);
    digest.iter().map(|b| format!("{b:02X}")).collect()
}

fn parse_der(
    der: &[u8],
    fingerprint: String,
    original_base64: String,
) -> Result<CertificateInfo, CertError> {
    let (_, cert) =
        X509Certificate::from_der(der).map_err(|e| CertError::Parse(e.to_string()))?;

    let validity = cert.validity();
    let not_before = asn1_time_to_chrono(validity.not_before);
    let not_after = asn1_time_to_chrono(validity.not_after);
    let is_expired = chrono::Utc::now() > not_after;

    Ok(CertificateInfo {
        fingerprint,
        subject: cert.subject().to_string(),
        issuer: cert.issuer().to_string(),
        serial: cert.raw_serial_as_string(),
        not_before,
        not_after,
        is_expired,
        seat_id: extract_seat_id(&cert),
        original_base64,
    })
}

fn asn1_time_to_chrono(time: x509_parser::time::ASN1Time) -> chrono::DateTime<chrono::Utc> {
    chrono::DateTime::from_timestamp(time.timestamp(), 0).unwrap_or_else(chrono::Utc::now)
}

/// Subject CN -> SeatID per spec:
/// `^POP\d{3,}` -> uppercased CN; else `^[A-Z0-9]{4,20}$` (case-insensitive,
/// full string) -> uppercased CN; else none.
fn extract_seat_id(cert: &X509Certificate) -> Option<String> {
    let cn = cert.subject().iter_common_name().next()?.as_str().ok()?;
    let upper = cn.to_ascii_uppercase();

    if is_pop_seat_id(&upper) {
        return Some(upper);
    }
    if is_bare_seat_id(&upper) {
        return Some(upper);
    }
    None
}

fn is_pop_seat_id(upper: &str) -> bool {
    let Some(rest) = upper.strip_prefix("POP") else {
        return false;
    };
    let digit_count = rest.chars().take_while(|c| c.is_ascii_digit()).count();
    digit_count >= 3
}

fn is_bare_seat_id(upper: &str) -> bool {
    (4..=20).contains(&upper.len())
        && upper.chars().all(|c| c.is_ascii_alphanumeric())
}
