// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Pooled HTTP(S) GET fetcher with bounded redirect following.
//!
//! Connection pooling and keep-alive are delegated to `reqwest`'s own
//! per-origin pool (bounded via `pool_max_idle_per_host`); this module only
//! adds the Peppol-profile redirect discipline (at most one hop, followed
//! manually so a second 3xx is reported as an error instead of silently
//! chased).

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, LOCATION};
use reqwest::{Client, StatusCode};

use crate::config::{MAX_REDIRECTS, POOL_MAX_IDLE_PER_HOST};


#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request to {url} timed out")]
    Timeout { url: String },
    #[error("{url} returned {status} without a Location header")]
    RedirectWithoutLocation { url: String, status: StatusCode },
    #[error("{url} redirected to {location:?}, which is not a valid URL")]
    InvalidRedirectLocation { url: String, location: String },
    #[error("{url} exceeded the maximum of {max} redirect(s)")]
    TooManyRedirects { url: String, max: u8 },
}

impl HttpError {
    /// The spec's diagnostic entries use `statusCode=0` for transport-level
    /// failures (as opposed to an HTTP response).
    pub fn status_code(&self) -> u16 {
        match self {
            HttpError::RedirectWithoutLocation { status, .. } => status.as_u16(),
            _ => 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: StatusCode,
    pub body: String,
    pub final_url: String,
    pub redirect_count: u8,
}

/// A pooled HTTP(S) GET client.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, default_timeout: Duration) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/xml, text/xml"),
        );

        let client = Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
            .timeout(default_timeout)
            // Redirects are followed manually so the Peppol one-hop limit
            // is enforced exactly rather than approximated.
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("static HTTP client configuration is always valid");

        Self { client }
    }

    /// GET `url`, following at most [`MAX_REDIRECTS`] redirects, with a
    /// per-request timeout override.
    pub async fn get(&self, url: &str, timeout: Duration) -> Result<FetchResponse, HttpError> {
        let mut current = url.to_string();
        let mut redirects = 0u8;

        loop {
            let response = self
                .client
                .get(&current)
                .timeout(timeout)
                .send()
                .await
                .map_err(|source| classify_transport_error(&current, source))?;

            let status = response.status();

            if status.is_redirection() {
                if redirects >= MAX_REDIRECTS {
                    return Err(HttpError::TooManyRedirects {
                        url: current,
                        max: MAX_REDIRECTS,
                    });
                }
                let location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .ok_or_else(|| HttpError::RedirectWithoutLocation {
                        url: current.clone(),
                        status,
                    })?;

                let next = resolve_redirect(&current, location).ok_or_else(|| {
                    HttpError::InvalidRedirectLocation {
                        url: current.clone(),
                        location: location.to_string(),
                    }
                })?;

                redirects += 1;
                current = next;
                continue;
            }

            let body = response
                .text()
                .await
                .map_err(|source| classify_transport_error(&current, source))?;

            return Ok(FetchResponse {
                status,
                body,
                final_url: current,
                redirect_count: redirects,
            });
        }
    }
}

fn classify_transport_error(url: &str, source: reqwest::Error) -> HttpError {
    if source.is_timeout() {
        HttpError::Timeout {
            url: url.to_string(),
        }
    } else {
        HttpError::Transport {
            url: url.to_string(),
            source,
        }
    }
}

fn resolve_redirect(base: &str, location: &str) -> Option<String> {
    let base = url::Url::parse(base).ok()?;
    let resolved = base.join(location).ok()?;
    Some(resolved.to_string())
}
