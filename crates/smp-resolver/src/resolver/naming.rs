// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Friendly document-type name derivation (spec §4.5).
//!
//! The excluded code-list data file is an external collaborator; callers
//! that have it wire it in through [`DocumentTypeNamer`]. Everything else
//! here is the fallback ladder this crate owns.

/// Injectable code-list lookup. The real Peppol document-type code list is
/// a static data file deliberately kept out of this crate's scope.
pub trait DocumentTypeNamer: Send + Sync {
    /// Look up a friendly name for the full document-identifier value
    /// string. `None` falls through to the pattern-based tiers.
    fn lookup(&self, full_value: &str) -> Option<String>;
}

/// Default namer used when no code list is supplied: always falls through
/// to the pattern-based tiers.
pub struct NoCodeList;

impl DocumentTypeNamer for NoCodeList {
    fn lookup(&self, _full_value: &str) -> Option<String> {
        None
    }
}

/// Derive a friendly display name for a document-type identifier value,
/// trying, in order: the injected code list, the UBL pattern
/// `xsd:NAME-N::DOC##CUSTOMIZATION`, the CII pattern `standard:NAME:N::`,
/// then the substring after the last `::`.
pub fn friendly_name(raw: &str, namer: &dyn DocumentTypeNamer) -> String {
    if let Some(name) = namer.lookup(raw) {
        return name;
    }
    if let Some(name) = match_ubl(raw) {
        return name;
    }
    if let Some(name) = match_cii(raw) {
        return name;
    }
    fallback_suffix(raw)
}

fn match_ubl(raw: &str) -> Option<String> {
    let after_xsd = raw.split_once("xsd:")?.1;
    let after_name = after_xsd.split_once("::")?.1;
    let doc = after_name.split("##").next().unwrap_or(after_name);
    (!doc.is_empty()).then(|| doc.to_string())
}

fn match_cii(raw: &str) -> Option<String> {
    let after_standard = raw.split_once("standard:")?.1;
    let (name_and_version, _) = after_standard.split_once("::")?;
    let name = name_and_version
        .rsplit_once(':')
        .map(|(name, _version)| name)
        .unwrap_or(name_and_version);
    (!name.is_empty()).then(|| name.to_string())
}

fn fallback_suffix(raw: &str) -> String {
    raw.rsplit("::").next().unwrap_or(raw).to_string()
}
