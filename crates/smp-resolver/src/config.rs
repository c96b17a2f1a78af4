// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Resolver configuration.
//!
//! Mirrors the static-constants/runtime-config split used elsewhere in this
//! codebase family: a handful of compile-time defaults, and an immutable,
//! builder-constructed `ResolverConfig` that can't be mutated after a
//! `Resolver` is built from it.

use std::time::Duration;

/// Default SML zone used by the production Peppol network test environment.
pub const DEFAULT_SML_DOMAIN: &str = "edelivery.tech.ec.europa.eu";

pub const DEFAULT_USER_AGENT: &str = concat!("smp-resolver-ng/", env!("CARGO_PKG_VERSION"));

pub const DEFAULT_DNS_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_BUSINESSCARD_TIMEOUT: Duration = Duration::from_secs(5);

/// At most one redirect is followed anywhere in this crate (the Peppol
/// transport profile only ever expects a single hop).
pub const MAX_REDIRECTS: u8 = 1;

/// Recommended per-origin connection cap for the pooled HTTP client.
pub const POOL_MAX_IDLE_PER_HOST: usize = 10;

/// Immutable resolver configuration, constructed once via [`ResolverConfig::builder`]
/// and shared by every resolution a `Resolver` instance drives.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    sml_domain: String,
    dns_servers: Vec<std::net::SocketAddr>,
    http_timeout: Duration,
    /// Reserved for future use; does not affect any documented in-memory cache.
    cache_ttl: Option<Duration>,
    user_agent: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            sml_domain: DEFAULT_SML_DOMAIN.to_string(),
            dns_servers: Vec::new(),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            cache_ttl: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ResolverConfig {
    pub fn builder() -> ResolverConfigBuilder {
        ResolverConfigBuilder::default()
    }

    pub fn sml_domain(&self) -> &str {
        &self.sml_domain
    }

    pub fn dns_servers(&self) -> &[std::net::SocketAddr] {
        &self.dns_servers
    }

    pub fn http_timeout(&self) -> Duration {
        self.http_timeout
    }

    pub fn cache_ttl(&self) -> Option<Duration> {
        self.cache_ttl
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }
}

#[derive(Debug, Default)]
pub struct ResolverConfigBuilder {
    inner: ResolverConfigOverrides,
}

#[derive(Debug, Default)]
struct ResolverConfigOverrides {
    sml_domain: Option<String>,
    dns_servers: Vec<std::net::SocketAddr>,
    http_timeout: Option<Duration>,
    cache_ttl: Option<Duration>,
    user_agent: Option<String>,
}

impl ResolverConfigBuilder {
    pub fn sml_domain(mut self, domain: impl Into<String>) -> Self {
        self.inner.sml_domain = Some(domain.into());
        self
    }

    pub fn dns_servers(mut self, servers: Vec<std::net::SocketAddr>) -> Self {
        self.inner.dns_servers = servers;
        self
    }

    pub fn http_timeout(mut self, timeout: Duration) -> Self {
        self.inner.http_timeout = Some(timeout);
        self
    }

    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.inner.cache_ttl = Some(ttl);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.inner.user_agent = Some(user_agent.into());
        self
    }

    pub fn build(self) -> ResolverConfig {
        let defaults = ResolverConfig::default();
        ResolverConfig {
            sml_domain: self.inner.sml_domain.unwrap_or(defaults.sml_domain),
            dns_servers: self.inner.dns_servers,
            http_timeout: self.inner.http_timeout.unwrap_or(defaults.http_timeout),
            cache_ttl: self.inner.cache_ttl,
            user_agent: self.inner.user_agent.unwrap_or(defaults.user_agent),
        }
    }
}

/// Per-resolution options (spec's Design Notes: a small value type in place
/// of dynamic kwargs).
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Include friendly document-type names and the selected endpoint in
    /// the result.
    pub fetch_document_types: bool,
    /// Probe for and include a business-card profile.
    pub include_business_card: bool,
    /// Decode the endpoint's X.509 certificate.
    pub parse_certificate: bool,
    /// Upper bound on this resolution's total wall time, enforced via
    /// cancellation rather than per-stage timeouts.
    pub timeout: Option<Duration>,
}

impl ResolveOptions {
    pub fn all() -> Self {
        Self {
            fetch_document_types: true,
            include_business_card: true,
            parse_certificate: true,
            timeout: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let config = ResolverConfig::default();
        assert_eq!(config.sml_domain(), DEFAULT_SML_DOMAIN);
        assert!(config.dns_servers().is_empty());
        assert_eq!(config.http_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn builder_overrides_apply() {
        let config = ResolverConfig::builder()
            .sml_domain("acc.edelivery.tech.ec.europa.eu")
            .http_timeout(Duration::from_secs(10))
            .user_agent("custom-ua/1.0")
            .build();
        assert_eq!(config.sml_domain(), "acc.edelivery.tech.ec.europa.eu");
        assert_eq!(config.http_timeout(), Duration::from_secs(10));
        assert_eq!(config.user_agent(), "custom-ua/1.0");
    }
}
