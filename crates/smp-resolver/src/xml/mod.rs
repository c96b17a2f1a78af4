// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Namespace-insensitive decoding of the SMP document families.
//!
//! All element lookups match on local name only (`roxmltree`'s
//! `tag_name().name()` already strips the namespace prefix, so `ns2:Endpoint`
//! and `Endpoint` compare equal with no extra bookkeeping — the same pattern
//! this codebase's FastDDS QoS profile loader uses).

use roxmltree::{Document, Node};


#[derive(Debug, thiserror::Error)]
pub enum XmlError {
    #[error("malformed XML: {0}")]
    Malformed(#[from] roxmltree::Error),
    #[error("missing root element {0:?}")]
    MissingRoot(&'static str),
    #[error("missing mandatory element {element:?} in {document}")]
    MissingElement {
        document: &'static str,
        element: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentIdentifier {
    pub scheme: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceGroup {
    pub participant: DocumentIdentifier,
    /// `ServiceMetadataReference/@href`, in document order. Empty is legal
    /// and signals *parked*.
    pub references: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Endpoint {
    pub transport_profile: String,
    pub endpoint_url: String,
    pub certificate: Option<String>,
    pub service_activation_date: Option<chrono::DateTime<chrono::Utc>>,
    pub service_expiration_date: Option<chrono::DateTime<chrono::Utc>>,
    pub service_description: Option<String>,
    pub technical_contact_url: Option<String>,
    pub technical_information_url: Option<String>,
    pub require_business_level_signature: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Process {
    pub process_identifier: DocumentIdentifier,
    pub endpoints: Vec<Endpoint>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceMetadata {
    Redirect { href: String },
    ServiceInformation {
        document_identifier: DocumentIdentifier,
        processes: Vec<Process>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub type_code: Option<String>,
    pub name: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BusinessEntity {
    pub name: Option<String>,
    pub country_code: Option<String>,
    pub identifiers: Vec<DocumentIdentifier>,
    pub geographical_information: Option<String>,
    pub websites: Vec<String>,
    pub contacts: Vec<Contact>,
}

pub fn parse_service_group(xml: &str) -> Result<ServiceGroup, XmlError> {
    let doc = Document::parse(xml)?;
    let root = find_by_name(doc.root(), "ServiceGroup")
        .ok_or(XmlError::MissingRoot("ServiceGroup"))?;

    let participant_node = find_by_name(root, "ParticipantIdentifier").ok_or(
        XmlError::MissingElement {
            document: "ServiceGroup",
            element: "ParticipantIdentifier",
        },
    )?;
    let scheme = participant_node
        .attribute("scheme")
        .filter(|s| !s.is_empty())
        .ok_or(XmlError::MissingElement {
            document: "ServiceGroup",
            element: "ParticipantIdentifier/@scheme",
        })?;
    let value = participant_node.text().unwrap_or("").trim();
    if value.is_empty() {
        return Err(XmlError::MissingElement {
            document: "ServiceGroup",
            element: "ParticipantIdentifier",
        });
    }

    let references = root
        .descendants()
        .filter(|n| n.has_tag_name_local("ServiceMetadataReference"))
        .filter_map(|n| n.attribute("href"))
        .map(str::to_string)
        .collect();

    Ok(ServiceGroup {
        participant: DocumentIdentifier {
            scheme: scheme.to_string(),
            value: value.to_string(),
        },
        references,
    })
}

pub fn parse_service_metadata(xml: &str) -> Result<ServiceMetadata, XmlError> {
    let doc = Document::parse(xml)?;
    let root = find_by_name(doc.root(), "ServiceMetadata")
        .or_else(|| find_by_name(doc.root(), "SignedServiceMetadata"))
        .ok_or(XmlError::MissingRoot("ServiceMetadata"))?;

    if let Some(href) = root
        .descendants()
        .find(|n| n.has_tag_name_local("Redirect"))
        .and_then(|n| n.attribute("href"))
    {
        return Ok(ServiceMetadata::Redirect {
            href: href.to_string(),
        });
    }

    let service_information =
        find_by_name(root, "ServiceInformation").ok_or(XmlError::MissingElement {
            document: "ServiceMetadata",
            element: "ServiceInformation",
        })?;

    let document_identifier = read_identifier(service_information, "DocumentIdentifier").ok_or(
        XmlError::MissingElement {
            document: "ServiceMetadata",
            element: "DocumentIdentifier",
        },
    )?;

    let processes = service_information
        .descendants()
        .filter(|n| n.has_tag_name_local("Process"))
        .filter_map(parse_process)
        .collect();

    Ok(ServiceMetadata::ServiceInformation {
        document_identifier,
        processes,
    })
}

fn parse_process(process: Node) -> Option<Process> {
    let process_identifier = read_identifier(process, "ProcessIdentifier")?;
    let endpoints = process
        .descendants()
        .filter(|n| n.has_tag_name_local("Endpoint"))
        .filter_map(parse_endpoint)
        .collect();
    Some(Process {
        process_identifier,
        endpoints,
    })
}

fn parse_endpoint(endpoint: Node) -> Option<Endpoint> {
    let transport_profile = endpoint.attribute("transportProfile")?.to_string();
    let endpoint_url = child_text(endpoint, "EndpointURI")
        .or_else(|| child_text(endpoint, "Address"))?;

    Some(Endpoint {
        transport_profile,
        endpoint_url,
        certificate: child_text(endpoint, "Certificate"),
        service_activation_date: child_text(endpoint, "ServiceActivationDate")
            .and_then(|s| parse_iso8601(&s)),
        service_expiration_date: child_text(endpoint, "ServiceExpirationDate")
            .and_then(|s| parse_iso8601(&s)),
        service_description: child_text(endpoint, "ServiceDescription"),
        technical_contact_url: child_text(endpoint, "TechnicalContactUrl"),
        technical_information_url: child_text(endpoint, "TechnicalInformationUrl"),
        require_business_level_signature: child_text(endpoint, "RequireBusinessLevelSignature")
            .map(|s| s.eq_ignore_ascii_case("true"))
            .unwrap_or(false),
    })
}

pub fn parse_business_card(xml: &str) -> Result<Option<BusinessEntity>, XmlError> {
    let doc = Document::parse(xml)?;
    let Some(card) = find_by_name(doc.root(), "BusinessCard") else {
        return Ok(None);
    };
    let Some(entity) = find_by_name(card, "BusinessEntity") else {
        return Ok(None);
    };

    let identifiers = entity
        .descendants()
        .filter(|n| n.has_tag_name_local("Identifier"))
        .filter_map(|n| {
            let scheme = n.attribute("scheme")?.to_string();
            let value = n.text()?.trim().to_string();
            Some(DocumentIdentifier { scheme, value })
        })
        .collect();

    let websites = entity
        .descendants()
        .filter(|n| n.has_tag_name_local("WebsiteURI"))
        .filter_map(|n| n.text().map(str::trim).map(str::to_string))
        .collect();

    let contacts = entity
        .descendants()
        .filter(|n| n.has_tag_name_local("Contact"))
        .map(|n| Contact {
            type_code: child_text(n, "TypeCode"),
            name: child_text(n, "Name"),
            phone_number: child_text(n, "PhoneNumber"),
            email: child_text(n, "Email"),
        })
        .collect();

    Ok(Some(BusinessEntity {
        name: child_text(entity, "Name"),
        country_code: child_text(entity, "CountryCode"),
        identifiers,
        geographical_information: child_text(entity, "GeographicalInformation"),
        websites,
        contacts,
    }))
}

fn read_identifier(scope: Node, element: &str) -> Option<DocumentIdentifier> {
    let node = find_by_name(scope, element)?;
    let scheme = node.attribute("scheme")?.to_string();
    let value = node.text()?.trim().to_string();
    if scheme.is_empty() || value.is_empty() {
        return None;
    }
    Some(DocumentIdentifier { scheme, value })
}

fn child_text(scope: Node, element: &str) -> Option<String> {
    find_by_name(scope, element)
        .and_then(|n| n.text())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn find_by_name<'a, 'input>(scope: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    scope
        .descendants()
        .chain(std::iter::once(scope))
        .find(|n| n.has_tag_name_local(name))
}

fn parse_iso8601(s: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&chrono::Utc))
}

trait NodeExt {
    fn has_tag_name_local(&self, name: &str) -> bool;
}

impl NodeExt for Node<'_, '_> {
    fn has_tag_name_local(&self, name: &str) -> bool {
        self.is_element() && self.tag_name().name() == name
    }
}
