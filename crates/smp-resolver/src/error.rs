// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Crate-wide error type.
//!
//! Every stage-local error (`identifier::IdentifierError`, `dns::DnsError`,
//! `http::HttpError`, `xml::XmlError`, `cert::CertError`) is absorbed by the
//! orchestrator into a `ResolutionResult` field rather than propagated here.
//! The only error this crate ever hands back to a caller of
//! [`crate::resolver::Resolver::resolve`] is cancellation.

/// Top-level result alias used at the public API boundary.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The caller-supplied cancellation signal fired before the resolution
    /// completed. Partial pipeline state is discarded.
    #[error("resolution cancelled")]
    Cancelled,
}
