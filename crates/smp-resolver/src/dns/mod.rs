// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SML NAPTR lookup: translates a participant hash into an SMP base URL.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hickory_resolver::config::{NameServerConfig, ResolverConfig as HickoryConfig};
use hickory_resolver::proto::rr::{rdata::NAPTR, RecordType};
use hickory_resolver::proto::xfer::Protocol;
use hickory_resolver::{Resolver as HickoryResolver, TokioResolver};

use crate::identifier::ParticipantHash;

#[cfg(test)]
mod tests;

#[derive(Debug, thiserror::Error)]
pub enum DnsError {
    #[error("DNS lookup for {name} failed: {source}")]
    Lookup {
        name: String,
        #[source]
        source: hickory_resolver::ResolveError,
    },
}

/// A single `Meta:SMP` NAPTR record, already filtered to the service this
/// crate cares about.
#[derive(Debug, Clone)]
pub struct SmpNaptrRecord {
    pub order: u16,
    pub preference: u16,
    pub regexp: String,
}

/// A validated, trailing-slash-stripped SMP base URL.
///
/// `url::Url` always normalizes an `http(s)` path to at least `/`, so
/// stripping the trailing slash via `set_path` is a no-op for the common
/// case of a bare-origin SMP base URL — it would silently come back as `/`
/// and every downstream path concatenation would produce a `//`. The
/// stripped form is instead tracked as a plain string derived from the
/// serialized URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmpBaseUrl {
    url: url::Url,
    base: String,
}

impl SmpBaseUrl {
    /// Validate a candidate URL per the Peppol profile: `http`/`https`
    /// scheme, no userinfo, no query, no fragment. Any trailing `/` is
    /// stripped.
    pub fn validate(raw: &str) -> Option<Self> {
        let parsed = url::Url::parse(raw).ok()?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return None;
        }
        if !parsed.username().is_empty() || parsed.password().is_some() {
            return None;
        }
        if parsed.query().is_some() || parsed.fragment().is_some() {
            return None;
        }
        let serialized = parsed.as_str();
        let base = serialized
            .strip_suffix('/')
            .unwrap_or(serialized)
            .to_string();
        Some(Self { url: parsed, base })
    }

    pub fn as_url(&self) -> &url::Url {
        &self.url
    }

    pub fn host(&self) -> Option<&str> {
        self.url.host_str()
    }
}

impl std::fmt::Display for SmpBaseUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.base)
    }
}

/// Seam the orchestrator drives NAPTR lookups through. The production
/// implementation is [`DnsResolver`]; tests inject a fake so the resolution
/// pipeline can be exercised end-to-end without a real DNS round trip (the
/// same constructor-injected-collaborator shape the HTTP fetcher and
/// certificate cache already use).
#[async_trait::async_trait]
pub trait SmpLocator: Send + Sync {
    async fn lookup_smp(
        &self,
        hash: &ParticipantHash,
        sml_domain: &str,
    ) -> Result<Option<SmpBaseUrl>, DnsError>;
}

/// Resolves participant hashes to SMP base URLs via SML NAPTR lookup.
#[derive(Clone)]
pub struct DnsResolver {
    resolver: Arc<TokioResolver>,
}

impl DnsResolver {
    pub fn new(dns_servers: &[SocketAddr], timeout: Duration) -> Self {
        let mut builder = if dns_servers.is_empty() {
            TokioResolver::builder_tokio()
                .unwrap_or_else(|_| HickoryResolver::builder_with_config(
                    HickoryConfig::default(),
                    hickory_resolver::name_server::TokioConnectionProvider::default(),
                ))
        } else {
            let mut config = HickoryConfig::new();
            for addr in dns_servers {
                config.add_name_server(NameServerConfig::new(*addr, Protocol::Udp));
            }
            HickoryResolver::builder_with_config(
                config,
                hickory_resolver::name_server::TokioConnectionProvider::default(),
            )
        };
        builder.options_mut().timeout = timeout;
        Self {
            resolver: Arc::new(builder.build()),
        }
    }

    /// `{hash}.iso6523-actorid-upis.{sml_domain}`
    pub fn query_name(hash: &ParticipantHash, sml_domain: &str) -> String {
        format!(
            "{}.{}.{}",
            hash,
            crate::identifier::ISO6523_ACTORID_UPIS,
            sml_domain
        )
    }

    /// Resolve a participant hash to its SMP base URL.
    ///
    /// `Ok(None)` covers every form of "this participant is not registered"
    /// (NXDOMAIN, empty answer, no `Meta:SMP` record, or a record whose
    /// regexp payload doesn't validate as an SMP URL). `Err` is reserved for
    /// resolver-level failures (timeout, SERVFAIL, malformed response).
    pub async fn lookup_smp(
        &self,
        hash: &ParticipantHash,
        sml_domain: &str,
    ) -> Result<Option<SmpBaseUrl>, DnsError> {
        let name = Self::query_name(hash, sml_domain);
        log::debug!("NAPTR query: {name}");

        let lookup = match self.resolver.lookup(name.clone(), RecordType::NAPTR).await {
            Ok(lookup) => lookup,
            Err(err) if is_non_registration(&err) => {
                log::debug!("NAPTR lookup for {name} returned no records: {err}");
                return Ok(None);
            }
            Err(err) => return Err(DnsError::Lookup { name, source: err }),
        };

        let mut records: Vec<SmpNaptrRecord> = lookup
            .record_iter()
            .filter_map(|record| record.data().as_naptr())
            .filter(|naptr| {
                String::from_utf8_lossy(naptr.services()).eq_ignore_ascii_case("Meta:SMP")
            })
            .map(naptr_to_record)
            .collect();

        records.sort_by_key(|r| (r.order, r.preference));

        let selected = match records.into_iter().next() {
            Some(record) => record,
            None => return Ok(None),
        };

        Ok(extract_smp_url(&selected.regexp).and_then(|url| SmpBaseUrl::validate(&url)))
    }
}

#[async_trait::async_trait]
impl SmpLocator for DnsResolver {
    async fn lookup_smp(
        &self,
        hash: &ParticipantHash,
        sml_domain: &str,
    ) -> Result<Option<SmpBaseUrl>, DnsError> {
        DnsResolver::lookup_smp(self, hash, sml_domain).await
    }
}

fn naptr_to_record(naptr: &NAPTR) -> SmpNaptrRecord {
    SmpNaptrRecord {
        order: naptr.order(),
        preference: naptr.preference(),
        regexp: String::from_utf8_lossy(naptr.regexp()).to_string(),
    }
}

fn is_non_registration(err: &hickory_resolver::ResolveError) -> bool {
    use hickory_resolver::proto::ProtoErrorKind;
    use hickory_resolver::ResolveErrorKind;
    match err.kind() {
        ResolveErrorKind::Proto(proto) => matches!(
            proto.kind(),
            ProtoErrorKind::NoRecordsFound { .. }
        ),
        _ => false,
    }
}

/// Parse the NAPTR `regexp` field's delimiter-bounded form `!PATTERN!REPLACEMENT!`
/// and return the replacement, which IS the SMP base URL for Peppol (the
/// pattern is always `^.*$` and is not evaluated).
fn extract_smp_url(regexp: &str) -> Option<String> {
    let mut parts = regexp.splitn(4, '!');
    let _leading = parts.next()?; // text before the first '!', always empty
    let _pattern = parts.next()?;
    let replacement = parts.next()?;
    Some(replacement.to_string())
}
