// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::*;

fn self_signed_with_cn(cn: &str) -> (String, String) {
    self_signed(cn, None)
}

/// As [`self_signed_with_cn`], optionally pinning the validity window so a
/// test can assert against literal `notBefore`/`notAfter` values.
fn self_signed(cn: &str, validity: Option<(::time::OffsetDateTime, ::time::OffsetDateTime)>) -> (String, String) {
    use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair};

    let mut params = CertificateParams::new(Vec::<String>::new()).unwrap();
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, cn);
    params.distinguished_name = dn;
    if let Some((not_before, not_after)) = validity {
        params.not_before = not_before;
        params.not_after = not_after;
    }

    let key_pair = KeyPair::generate().unwrap();
    let cert = params.self_signed(&key_pair).unwrap();
    (
        base64::engine::general_purpose::STANDARD.encode(cert.der()),
        cert.pem(),
    )
}

#[test]
fn parse_is_idempotent_and_caches_by_fingerprint() {
    let (b64, _) = self_signed_with_cn("POP000999");
    let parser = CertificateParser::new();

    let first = parser.parse(&b64).unwrap();
    let second = parser.parse(&b64).unwrap();

    assert_eq!(first, second);
    assert_eq!(parser.cached_len(), 1);
}

#[test]
fn pem_and_raw_base64_produce_identical_fingerprint() {
    let (b64, pem) = self_signed_with_cn("POP000123");
    let parser = CertificateParser::new();

    let from_b64 = parser.parse(&b64).unwrap();
    let from_pem = parser.parse(&pem).unwrap();

    assert_eq!(from_b64.fingerprint, from_pem.fingerprint);
}

#[test]
fn seat_id_matches_pop_pattern() {
    let (b64, _) = self_signed_with_cn("POP000028");
    let parser = CertificateParser::new();
    let info = parser.parse(&b64).unwrap();
    assert_eq!(info.seat_id.as_deref(), Some("POP000028"));
}

#[test]
fn seat_id_matches_bare_alphanumeric_pattern() {
    let (b64, _) = self_signed_with_cn("ABCD1234");
    let parser = CertificateParser::new();
    let info = parser.parse(&b64).unwrap();
    assert_eq!(info.seat_id.as_deref(), Some("ABCD1234"));
}

#[test]
fn seat_id_absent_when_cn_matches_neither_pattern() {
    let (b64, _) = self_signed_with_cn("Not A Seat Id At All");
    let parser = CertificateParser::new();
    let info = parser.parse(&b64).unwrap();
    assert_eq!(info.seat_id, None);
}

#[test]
fn clear_empties_the_cache() {
    let (b64, _) = self_signed_with_cn("POP000001");
    let parser = CertificateParser::new();
    parser.parse(&b64).unwrap();
    assert_eq!(parser.cached_len(), 1);
    parser.clear();
    assert_eq!(parser.cached_len(), 0);
}

#[test]
fn empty_payload_is_rejected() {
    let parser = CertificateParser::new();
    assert!(matches!(parser.parse(""), Err(CertError::Empty)));
}

/// Sample Peppol AP certificate vector (Ixor, CN=PBE000028): seatId and
/// validity window per spec. The real certificate bytes (and therefore its
/// literal SHA-256 fingerprint `07985302AA9900C686A401A1148DBA07C3B29E01356D340EE73FE5BBDE5F2D9B`)
/// aren't available to this crate, so this pins the window rcgen can
/// reproduce — CN-derived seatId and exact `notBefore`/`notAfter` — rather
/// than the fingerprint itself.
#[test]
fn known_ap_certificate_vector_seat_id_and_validity() {
    let not_before = ::time::macros::datetime!(2024-02-26 00:00:00 UTC);
    let not_after = ::time::macros::datetime!(2026-02-15 23:59:59 UTC);
    let (b64, _) = self_signed("PBE000028", Some((not_before, not_after)));

    let parser = CertificateParser::new();
    let info = parser.parse(&b64).unwrap();

    assert_eq!(info.seat_id.as_deref(), Some("PBE000028"));
    assert_eq!(info.not_before.to_rfc3339(), "2024-02-26T00:00:00+00:00");
    assert_eq!(info.not_after.to_rfc3339(), "2026-02-15T23:59:59+00:00");
}

#[test]
fn fingerprint_is_uppercase_hex_sha256() {
    let (b64, _) = self_signed_with_cn("POP000028");
    let parser = CertificateParser::new();
    let info = parser.parse(&b64).unwrap();
    assert_eq!(info.fingerprint.len(), 64);
    assert!(info.fingerprint.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
}
