// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use std::sync::Arc;

use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;
use crate::dns::{DnsError, SmpBaseUrl, SmpLocator};

/// A fake [`SmpLocator`] that always resolves to a fixed base URL, or to
/// "not registered" when `url` is `None`.
struct FixedLocator {
    url: Option<String>,
}

#[async_trait::async_trait]
impl SmpLocator for FixedLocator {
    async fn lookup_smp(
        &self,
        _hash: &crate::identifier::ParticipantHash,
        _sml_domain: &str,
    ) -> std::result::Result<Option<SmpBaseUrl>, DnsError> {
        Ok(self.url.as_deref().and_then(SmpBaseUrl::validate))
    }
}

/// A [`SmpLocator`] whose lookup never resolves, so a pipeline built on it
/// only ever finishes via cancellation.
struct HangingLocator;

#[async_trait::async_trait]
impl SmpLocator for HangingLocator {
    async fn lookup_smp(
        &self,
        _hash: &crate::identifier::ParticipantHash,
        _sml_domain: &str,
    ) -> std::result::Result<Option<SmpBaseUrl>, DnsError> {
        std::future::pending().await
    }
}

fn resolver_against(server: &MockServer) -> Resolver {
    let config = ResolverConfig::builder().build();
    let locator = Arc::new(FixedLocator {
        url: Some(server.uri()),
    });
    Resolver::with_collaborators(config, locator, Arc::new(NoCodeList))
}

fn unregistered_resolver() -> Resolver {
    let config = ResolverConfig::builder().build();
    Resolver::with_collaborators(config, Arc::new(FixedLocator { url: None }), Arc::new(NoCodeList))
}

const SERVICE_GROUP: &str = r#"
<ServiceGroup xmlns="http://busdox.org/serviceMetadata/publishing/1.0/">
  <ParticipantIdentifier scheme="iso6523-actorid-upis">0208:0843766574</ParticipantIdentifier>
  <ServiceMetadataReferenceCollection>
    <ServiceMetadataReference href="http://smp.example.com/services/busdox-docid-qns::Invoice"/>
  </ServiceMetadataReferenceCollection>
</ServiceGroup>
"#;

const SERVICE_GROUP_EMPTY: &str = r#"
<ServiceGroup xmlns="http://busdox.org/serviceMetadata/publishing/1.0/">
  <ParticipantIdentifier scheme="iso6523-actorid-upis">0208:0843766574</ParticipantIdentifier>
  <ServiceMetadataReferenceCollection/>
</ServiceGroup>
"#;

const SERVICE_METADATA: &str = r#"
<ServiceMetadata xmlns="http://busdox.org/serviceMetadata/publishing/1.0/">
  <ServiceInformation>
    <DocumentIdentifier scheme="busdox-docid-qns">Invoice</DocumentIdentifier>
    <ProcessList>
      <Process>
        <ProcessIdentifier scheme="cenbii-procid-ubl">billing</ProcessIdentifier>
        <ServiceEndpointList>
          <Endpoint transportProfile="peppol-transport-as4-v2_0">
            <EndpointURI>https://as4.example.com/as4</EndpointURI>
          </Endpoint>
        </ServiceEndpointList>
      </Process>
    </ProcessList>
  </ServiceInformation>
</ServiceMetadata>
"#;

#[tokio::test]
async fn happy_path_yields_active_status_and_selected_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/iso6523-actorid-upis::0208:0843766574$"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SERVICE_GROUP))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/iso6523-actorid-upis::0208:0843766574/services/.*"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SERVICE_METADATA))
        .mount(&server)
        .await;

    let resolver = resolver_against(&server);
    let result = resolver
        .resolve("0208:0843766574", &ResolveOptions::all())
        .await
        .unwrap();

    assert_eq!(result.status, RegistrationStatus::Active);
    assert!(result.is_registered);
    assert!(result.has_active_endpoints);
    let endpoint = result.endpoint.expect("endpoint should be selected");
    assert_eq!(endpoint.url, "https://as4.example.com/as4");
    assert_eq!(endpoint.transport_profile, "peppol-transport-as4-v2_0");
    assert_eq!(
        result.smp_hostname.as_deref(),
        server.uri().trim_start_matches("http://").split(':').next()
    );
}

#[tokio::test]
async fn dns_absent_is_unregistered_with_no_http_calls() {
    let resolver = unregistered_resolver();
    let result = resolver
        .resolve("0208:9999999999", &ResolveOptions::all())
        .await
        .unwrap();

    assert!(!result.is_registered);
    assert_eq!(result.status, RegistrationStatus::Unregistered);
    assert!(result.error.as_deref().unwrap().contains("No SMP found"));
}

#[tokio::test]
async fn malformed_identifier_never_touches_dns_or_http() {
    let resolver = unregistered_resolver();
    let result = resolver
        .resolve("invalid-format", &ResolveOptions::all())
        .await
        .unwrap();

    assert!(!result.is_registered);
    assert_eq!(result.status, RegistrationStatus::Unregistered);
    assert!(result
        .error
        .as_deref()
        .unwrap()
        .contains("Invalid participant ID format"));
}

#[tokio::test]
async fn service_group_404_downgrades_to_parked_not_unregistered() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let resolver = resolver_against(&server);
    let result = resolver
        .resolve("0208:0843766574", &ResolveOptions::all())
        .await
        .unwrap();

    assert!(result.is_registered);
    assert_eq!(result.status, RegistrationStatus::Parked);
    assert!(!result.has_active_endpoints);
    assert!(result.error.is_none());
}

#[tokio::test]
async fn empty_reference_collection_is_parked() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/iso6523-actorid-upis::.*"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SERVICE_GROUP_EMPTY))
        .mount(&server)
        .await;

    let resolver = resolver_against(&server);
    let result = resolver
        .resolve("0208:0843766574", &ResolveOptions::all())
        .await
        .unwrap();

    assert_eq!(result.status, RegistrationStatus::Parked);
    assert!(!result.has_active_endpoints);
}

#[tokio::test]
async fn service_metadata_fetch_failure_downgrades_to_parked_with_diagnostic() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/iso6523-actorid-upis::0208:0843766574$"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SERVICE_GROUP))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/iso6523-actorid-upis::0208:0843766574/services/.*"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let resolver = resolver_against(&server);
    let result = resolver
        .resolve("0208:0843766574", &ResolveOptions::all())
        .await
        .unwrap();

    assert_eq!(result.status, RegistrationStatus::Parked);
    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(result.diagnostics[0].status_code, 500);
}

#[test]
fn select_endpoint_ignores_later_processes_when_the_first_has_no_endpoints() {
    let empty_process = xml::Process {
        process_identifier: DocumentIdentifier {
            scheme: "s".into(),
            value: "v".into(),
        },
        endpoints: Vec::new(),
    };
    let populated = xml::Process {
        process_identifier: DocumentIdentifier {
            scheme: "s".into(),
            value: "v2".into(),
        },
        endpoints: vec![Endpoint {
            transport_profile: "as4".into(),
            endpoint_url: "https://ap.example.com".into(),
            ..Default::default()
        }],
    };

    let processes = [empty_process, populated];
    assert!(select_endpoint(&processes).is_none());
}

#[test]
fn select_endpoint_takes_the_first_endpoint_of_the_first_process() {
    let first = xml::Process {
        process_identifier: DocumentIdentifier {
            scheme: "s".into(),
            value: "v".into(),
        },
        endpoints: vec![
            Endpoint {
                transport_profile: "as4".into(),
                endpoint_url: "https://ap.example.com".into(),
                ..Default::default()
            },
            Endpoint {
                transport_profile: "as4".into(),
                endpoint_url: "https://ap2.example.com".into(),
                ..Default::default()
            },
        ],
    };
    let second = xml::Process {
        process_identifier: DocumentIdentifier {
            scheme: "s".into(),
            value: "v2".into(),
        },
        endpoints: vec![Endpoint {
            transport_profile: "as4".into(),
            endpoint_url: "https://unreachable.example.com".into(),
            ..Default::default()
        }],
    };

    let processes = [first, second];
    let selected = select_endpoint(&processes).unwrap();
    assert_eq!(selected.endpoint_url, "https://ap.example.com");
}

#[test]
fn document_type_from_href_extracts_scheme_and_value() {
    let id = document_type_from_href(
        "http://smp.example.com/services/busdox-docid-qns%3A%3AInvoice%3A%3A1.0",
    )
    .unwrap();
    assert_eq!(id.scheme, "busdox-docid-qns");
    assert_eq!(id.value, "Invoice::1.0");
}

#[tokio::test]
async fn ambient_cancellation_signal_abandons_the_pipeline() {
    let config = ResolverConfig::builder().build();
    let resolver =
        Resolver::with_collaborators(config, Arc::new(HangingLocator), Arc::new(NoCodeList));
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    tx.send(()).unwrap();

    let err = resolver
        .resolve_cancellable("0208:0843766574", &ResolveOptions::default(), async {
            let _ = rx.await;
        })
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Cancelled));
}

#[tokio::test(start_paused = true)]
async fn timeout_option_cancels_a_slow_pipeline() {
    let config = ResolverConfig::builder().build();
    let resolver =
        Resolver::with_collaborators(config, Arc::new(HangingLocator), Arc::new(NoCodeList));
    let opts = ResolveOptions {
        timeout: Some(std::time::Duration::from_millis(1)),
        ..Default::default()
    };

    let err = resolver
        .resolve("0208:0843766574", &opts)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Cancelled));
}

#[test]
fn document_type_from_href_rejects_malformed_segment() {
    assert!(document_type_from_href("http://smp.example.com/services/no-separator-here").is_none());
}
