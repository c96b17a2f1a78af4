// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Business-card probe: tries five URL shapes, HTTPS-then-HTTP, with
//! fast-fail on transport-level failure (spec §4.5, REDESIGN FLAGS §9).
//!
//! Modeled as the small state machine the spec's design notes recommend:
//! `TryHttps[pattern]` advances through patterns on a 4xx/5xx/unparsable
//! response, jumps straight to `TryHttp[0]` on an HTTPS transport failure,
//! and ends the whole probe on an HTTP transport failure.

use std::time::Duration;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::http::{HttpError, HttpFetcher};
use crate::identifier::ParticipantIdentifier;
use crate::xml::{self, BusinessEntity};


const PATH_SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

const PATTERN_COUNT: usize = 5;

fn pattern_path(index: usize, pid_raw: &str, pid_encoded: &str) -> String {
    match index {
        0 => format!("/businesscard/{pid_raw}"),
        1 => format!("/{pid_encoded}/businesscard"),
        2 => format!("/smp/businesscard/{pid_encoded}"),
        3 => format!("/api/businesscard/{pid_encoded}"),
        4 => format!("/rest/businesscard/{pid_encoded}"),
        _ => unreachable!("only {PATTERN_COUNT} business-card URL patterns are defined"),
    }
}

/// Probe `host` (and optional port) for a business card. Never fails the
/// outer resolution: returns `None` on any combination of absence,
/// unreachability, or malformed responses.
pub async fn probe(
    http: &HttpFetcher,
    host_and_port: &str,
    participant: &ParticipantIdentifier,
    timeout: Duration,
) -> Option<BusinessEntity> {
    let pid_raw = participant.as_peppol_string();
    let pid_encoded = utf8_percent_encode(&pid_raw, PATH_SAFE).to_string();

    for scheme in ["https", "http"] {
        for index in 0..PATTERN_COUNT {
            let url = format!(
                "{scheme}://{host_and_port}{}",
                pattern_path(index, &pid_raw, &pid_encoded)
            );
            log::debug!("business-card probe: {url}");

            match http.get(&url, timeout).await {
                Ok(response) if response.status.is_success() && response.body.trim_start().starts_with('<') => {
                    if let Ok(Some(entity)) = xml::parse_business_card(&response.body) {
                        return Some(entity);
                    }
                    // Parse failure or a non-card XML document: keep trying.
                }
                Ok(_) => {
                    // Any HTTP status response, including 4xx/5xx, proves
                    // the server is reachable — try the next pattern.
                }
                Err(HttpError::Timeout { .. }) | Err(HttpError::Transport { .. }) => {
                    log::debug!("business-card probe: {scheme} unreachable, abandoning {scheme}");
                    break;
                }
                Err(_) => {
                    // Redirect-shape errors don't indicate the scheme is
                    // unreachable; keep trying the remaining patterns.
                }
            }
        }
    }

    None
}
