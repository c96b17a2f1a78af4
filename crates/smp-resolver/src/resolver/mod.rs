// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The resolution pipeline: canonicalize -> NAPTR lookup -> fetch
//! ServiceGroup -> fetch ServiceMetadata -> select endpoint -> optional
//! certificate parse -> optional business-card probe.

use std::sync::Arc;

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};

use crate::cert::{CertificateInfo, CertificateParser};
use crate::config::{ResolveOptions, ResolverConfig, DEFAULT_BUSINESSCARD_TIMEOUT};
use crate::dns::{DnsResolver, SmpLocator};
use crate::error::{Error, Result};
use crate::http::HttpFetcher;
use crate::identifier::ParticipantIdentifier;
use crate::xml::{self, BusinessEntity, DocumentIdentifier, Endpoint, ServiceGroup, ServiceMetadata};

mod businesscard;
mod naming;

pub use naming::{DocumentTypeNamer, NoCodeList};

#[cfg(test)]
mod tests;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationStatus {
    Unregistered,
    Parked,
    Active,
}

/// One entry per non-fatal failure encountered on an auxiliary fetch.
/// `status_code == 0` means a transport-level failure rather than an HTTP
/// response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub url: String,
    pub status_code: u16,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedEndpoint {
    pub transport_profile: String,
    pub url: String,
    pub certificate_base64: Option<String>,
    pub require_business_level_signature: bool,
}

impl From<&Endpoint> for SelectedEndpoint {
    fn from(endpoint: &Endpoint) -> Self {
        Self {
            transport_profile: endpoint.transport_profile.clone(),
            url: endpoint.endpoint_url.clone(),
            certificate_base64: endpoint.certificate.clone(),
            require_business_level_signature: endpoint.require_business_level_signature,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionResult {
    pub participant: String,
    pub is_registered: bool,
    pub status: RegistrationStatus,
    pub has_active_endpoints: bool,
    pub smp_hostname: Option<String>,
    pub document_types: Option<Vec<String>>,
    pub endpoint: Option<SelectedEndpoint>,
    pub certificate: Option<CertificateInfo>,
    pub business_entity: Option<BusinessEntity>,
    pub diagnostics: Vec<Diagnostic>,
    pub error: Option<String>,
}

impl ResolutionResult {
    fn terminal_unregistered(participant: String, error: impl Into<String>) -> Self {
        Self {
            participant,
            is_registered: false,
            status: RegistrationStatus::Unregistered,
            has_active_endpoints: false,
            smp_hostname: None,
            document_types: None,
            endpoint: None,
            certificate: None,
            business_entity: None,
            diagnostics: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// Resolves Peppol participant identifiers. Cheap to clone (every field is
/// `Arc`-backed or a pooled client) and safe to share across concurrently
/// running resolutions with no additional locking.
#[derive(Clone)]
pub struct Resolver {
    config: Arc<ResolverConfig>,
    dns: Arc<dyn SmpLocator>,
    http: HttpFetcher,
    certs: Arc<CertificateParser>,
    namer: Arc<dyn DocumentTypeNamer>,
}

impl Resolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self::with_namer(config, Arc::new(NoCodeList))
    }

    pub fn with_namer(config: ResolverConfig, namer: Arc<dyn DocumentTypeNamer>) -> Self {
        let dns = DnsResolver::new(config.dns_servers(), crate::config::DEFAULT_DNS_TIMEOUT);
        Self::with_collaborators(config, Arc::new(dns), namer)
    }

    /// Construct a resolver over an injected [`SmpLocator`], bypassing real
    /// DNS. Used by tests to drive the pipeline end-to-end against a fake
    /// NAPTR answer and a mock SMP.
    pub fn with_collaborators(
        config: ResolverConfig,
        dns: Arc<dyn SmpLocator>,
        namer: Arc<dyn DocumentTypeNamer>,
    ) -> Self {
        let http = HttpFetcher::new(config.user_agent(), config.http_timeout());
        log::info!("resolver constructed: sml_domain={}", config.sml_domain());
        Self {
            config: Arc::new(config),
            dns,
            http,
            certs: Arc::new(CertificateParser::new()),
            namer,
        }
    }

    /// Resolve a single `scheme:value` participant identifier.
    ///
    /// Returns `Err(Error::Cancelled)` only when `opts.timeout` elapses
    /// before the pipeline finishes; every other outcome — invalid input,
    /// unregistered participant, unreachable SMP, malformed metadata — is a
    /// well-formed `Ok(ResolutionResult)`.
    pub async fn resolve(&self, input: &str, opts: &ResolveOptions) -> Result<ResolutionResult> {
        self.resolve_cancellable(input, opts, std::future::pending())
            .await
    }

    /// As [`Self::resolve`], but also races the pipeline against an
    /// ambient, caller-supplied cancellation signal (spec's "Cancellation"
    /// contract in §5): whichever of `opts.timeout` or `cancel` fires
    /// first abandons the in-flight network operation and discards partial
    /// pipeline state. The certificate cache is unaffected either way.
    pub async fn resolve_cancellable<C>(
        &self,
        input: &str,
        opts: &ResolveOptions,
        cancel: C,
    ) -> Result<ResolutionResult>
    where
        C: std::future::Future<Output = ()> + Send,
    {
        let pipeline = self.resolve_inner(input, opts);
        tokio::pin!(pipeline);
        tokio::pin!(cancel);

        match opts.timeout {
            Some(budget) => {
                let sleep = tokio::time::sleep(budget);
                tokio::pin!(sleep);
                tokio::select! {
                    result = &mut pipeline => Ok(result),
                    _ = &mut sleep => Err(Error::Cancelled),
                    _ = &mut cancel => Err(Error::Cancelled),
                }
            }
            None => {
                tokio::select! {
                    result = &mut pipeline => Ok(result),
                    _ = &mut cancel => Err(Error::Cancelled),
                }
            }
        }
    }

    async fn resolve_inner(&self, input: &str, opts: &ResolveOptions) -> ResolutionResult {
        let participant = match ParticipantIdentifier::parse(input) {
            Ok(id) => id,
            Err(err) => {
                log::debug!("invalid participant identifier {input:?}: {err}");
                return ResolutionResult::terminal_unregistered(
                    input.to_string(),
                    "Invalid participant ID format",
                );
            }
        };

        let hash = participant.hash();
        let smp_base = match self.dns.lookup_smp(&hash, self.config.sml_domain()).await {
            Ok(Some(base)) => base,
            Ok(None) => {
                return ResolutionResult::terminal_unregistered(
                    participant.as_short_string(),
                    "No SMP found via DNS lookup",
                );
            }
            Err(err) => {
                log::warn!("DNS lookup failed for {participant}: {err}");
                return ResolutionResult::terminal_unregistered(
                    participant.as_short_string(),
                    format!("No SMP found via DNS lookup: {err}"),
                );
            }
        };

        let smp_hostname = smp_base.host().map(str::to_string);
        let service_group_url = format!("{smp_base}/{}", participant.as_peppol_string());

        let service_group = match self
            .http
            .get(&service_group_url, self.config.http_timeout())
            .await
        {
            Ok(response) if response.status.as_u16() == 404 => {
                log::warn!("ServiceGroup 404 for {participant}: parked");
                ServiceGroup {
                    participant: DocumentIdentifier {
                        scheme: participant.scheme().to_string(),
                        value: participant.value().to_string(),
                    },
                    references: Vec::new(),
                }
            }
            Ok(response) if response.status.is_success() => {
                match xml::parse_service_group(&response.body) {
                    Ok(group) => group,
                    Err(err) => {
                        return ResolutionResult::terminal_unregistered(
                            participant.as_short_string(),
                            format!("Failed to parse ServiceGroup: {err}"),
                        );
                    }
                }
            }
            Ok(response) => {
                return ResolutionResult::terminal_unregistered(
                    participant.as_short_string(),
                    format!(
                        "ServiceGroup fetch returned HTTP {}",
                        response.status.as_u16()
                    ),
                );
            }
            Err(err) => {
                return ResolutionResult::terminal_unregistered(
                    participant.as_short_string(),
                    format!("ServiceGroup fetch failed: {err}"),
                );
            }
        };

        let mut diagnostics = Vec::new();
        let document_type_ids: Vec<DocumentIdentifier> = service_group
            .references
            .iter()
            .filter_map(|href| document_type_from_href(href))
            .collect();

        let mut status = if document_type_ids.is_empty() {
            RegistrationStatus::Parked
        } else {
            RegistrationStatus::Active
        };

        let mut endpoint = None;
        let mut certificate = None;

        if let (RegistrationStatus::Active, Some(first)) =
            (status, document_type_ids.first().cloned())
        {
            let metadata_url = format!(
                "{smp_base}/{}/services/{}",
                participant.as_peppol_string(),
                percent_encode_doc_id(&first),
            );

            match self.fetch_metadata(&metadata_url).await {
                Ok(ServiceMetadata::ServiceInformation { processes, .. }) => {
                    match select_endpoint(&processes) {
                        Some(selected) => {
                            if opts.parse_certificate {
                                certificate = selected
                                    .certificate
                                    .as_deref()
                                    .and_then(|b64| self.certs.parse(b64).ok());
                            }
                            endpoint = Some(SelectedEndpoint::from(selected));
                        }
                        None => {
                            status = RegistrationStatus::Parked;
                            diagnostics.push(Diagnostic {
                                url: metadata_url,
                                status_code: 200,
                                message: "ServiceMetadata carried no endpoints".to_string(),
                            });
                        }
                    }
                }
                Ok(ServiceMetadata::Redirect { href }) => {
                    status = RegistrationStatus::Parked;
                    diagnostics.push(Diagnostic {
                        url: metadata_url,
                        status_code: 200,
                        message: format!("ServiceMetadata redirected to {href}, not followed"),
                    });
                }
                Err(diagnostic) => {
                    status = RegistrationStatus::Parked;
                    diagnostics.push(diagnostic);
                }
            }
        }

        let document_types = opts.fetch_document_types.then(|| {
            document_type_ids
                .iter()
                .map(|id| naming::friendly_name(&id.value, self.namer.as_ref()))
                .collect()
        });

        let business_entity = if opts.include_business_card {
            if let Some(host) = smp_base.as_url().host_str() {
                let authority = match smp_base.as_url().port() {
                    Some(port) => format!("{host}:{port}"),
                    None => host.to_string(),
                };
                businesscard::probe(
                    &self.http,
                    &authority,
                    &participant,
                    DEFAULT_BUSINESSCARD_TIMEOUT,
                )
                .await
            } else {
                None
            }
        } else {
            None
        };

        let has_active_endpoints =
            status == RegistrationStatus::Active && endpoint.is_some();

        ResolutionResult {
            participant: participant.as_short_string(),
            is_registered: status != RegistrationStatus::Unregistered,
            status,
            has_active_endpoints,
            smp_hostname,
            document_types,
            endpoint,
            certificate,
            business_entity,
            diagnostics,
            error: None,
        }
    }

    async fn fetch_metadata(&self, url: &str) -> std::result::Result<ServiceMetadata, Diagnostic> {
        let response = self
            .http
            .get(url, self.config.http_timeout())
            .await
            .map_err(|err| Diagnostic {
                url: url.to_string(),
                status_code: err.status_code(),
                message: err.to_string(),
            })?;

        if !response.status.is_success() {
            return Err(Diagnostic {
                url: url.to_string(),
                status_code: response.status.as_u16(),
                message: format!("ServiceMetadata fetch returned HTTP {}", response.status),
            });
        }

        xml::parse_service_metadata(&response.body).map_err(|err| Diagnostic {
            url: url.to_string(),
            status_code: response.status.as_u16(),
            message: format!("failed to parse ServiceMetadata: {err}"),
        })
    }

    /// Drain the HTTP pool and clear the certificate cache. Further use of
    /// this `Resolver` (or any clone) after `close` is unsupported.
    pub async fn close(&self) {
        log::info!("resolver shutting down, clearing certificate cache");
        self.certs.clear();
    }
}

impl Drop for Resolver {
    /// Best-effort cleanup logging for handles that are dropped without
    /// calling [`Self::close`]. Not a substitute for it: the certificate
    /// cache is only cleared by the explicit async call, since other
    /// clones of this `Resolver` may still be live.
    fn drop(&mut self) {
        if Arc::strong_count(&self.certs) == 1 {
            log::debug!(
                "last resolver handle dropped without calling close(); {} cached certificate(s) leaked until process exit",
                self.certs.cached_len()
            );
        }
    }
}

/// First endpoint of the first process, in document order — per spec, the
/// literal first process is the selection regardless of whether it has any
/// endpoints; an empty first process yields no endpoint (and the caller
/// downgrades the result to parked), not a later process's endpoint.
fn select_endpoint(processes: &[xml::Process]) -> Option<&Endpoint> {
    processes.first()?.endpoints.first()
}

/// Extract `(docScheme, docValue)` from a `ServiceMetadataReference/@href`.
/// The SMP encodes the document type as the percent-encoded last path
/// segment, `{docScheme}::{docValue}`.
fn document_type_from_href(href: &str) -> Option<DocumentIdentifier> {
    let last_segment = href.rsplit('/').next()?;
    let decoded = percent_encoding::percent_decode_str(last_segment)
        .decode_utf8()
        .ok()?;
    let (scheme, value) = decoded.split_once("::")?;
    Some(DocumentIdentifier {
        scheme: scheme.to_string(),
        value: value.to_string(),
    })
}

fn percent_encode_doc_id(id: &DocumentIdentifier) -> String {
    let raw = format!("{}::{}", id.scheme, id.value);
    utf8_percent_encode(&raw, NON_ALPHANUMERIC).to_string()
}
