// src/utils/http.rs

//! HTTP client construction.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Proxy};

use crate::error::{AppError, Result};
use crate::models::{CrawlerConfig, Header, Identity};

/// Build a client for one egress identity, or a direct client when `identity`
/// is `None`.
///
/// Applies the configured user agent, default headers and timeouts; when an
/// identity is given every request is routed through its SOCKS5 proxy.
pub fn build_client(
    crawler: &CrawlerConfig,
    headers: &[Header],
    identity: Option<&Identity>,
) -> Result<Client> {
    let mut default_headers = HeaderMap::new();
    for header in headers {
        let name = HeaderName::from_bytes(header.name.as_bytes())
            .map_err(|e| AppError::config(format!("invalid header name '{}': {e}", header.name)))?;
        let value = HeaderValue::from_str(&header.value)
            .map_err(|e| AppError::config(format!("invalid header value for '{}': {e}", header.name)))?;
        default_headers.insert(name, value);
    }

    let mut builder = Client::builder()
        .user_agent(&crawler.user_agent)
        .default_headers(default_headers)
        .timeout(Duration::from_secs(crawler.timeout_secs))
        .connect_timeout(Duration::from_secs(10));

    if crawler.accept_invalid_certs {
        builder = builder.danger_accept_invalid_certs(true);
    }

    if let Some(identity) = identity {
        builder = builder.proxy(Proxy::all(identity.proxy_url())?);
    }

    Ok(builder.build()?)
}
