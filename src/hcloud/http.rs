// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Low level HTTP plumbing for the Hetzner Cloud API.
//!
//! Requests are sent exactly once. Retrying is left to the firewall loop's
//! next resync pass.

use super::types::ErrorResponse;
use crate::errors::HcloudError;
use reqwest::{Client as HttpClient, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, warn};
use url::Url;

/// Append path segments to the API base URL.
///
/// `https://api.hetzner.cloud/v1` + `["servers", "42"]` becomes
/// `https://api.hetzner.cloud/v1/servers/42`.
pub(crate) fn build_api_url(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}

/// Send a request to the Hetzner Cloud API and decode the JSON response.
///
/// # Arguments
/// * `client` - HTTP client
/// * `token` - API token sent as a bearer token
/// * `method` - HTTP method
/// * `url` - Full URL including any query string
/// * `body` - Optional JSON body for POST requests
///
/// # Errors
///
/// Returns [`HcloudError::Transport`] if no response was received,
/// [`HcloudError::Api`] for any non-2xx status, and [`HcloudError::Decode`] if
/// the body does not match `T`.
pub(crate) async fn hcloud_request<T, B>(
    client: &HttpClient,
    token: &str,
    method: Method,
    url: Url,
    body: Option<&B>,
) -> Result<T, HcloudError>
where
    T: DeserializeOwned,
    B: Serialize + std::fmt::Debug + ?Sized,
{
    debug!(
        method = %method,
        url = %url,
        body = ?body,
        "HTTP API request to Hetzner Cloud"
    );

    let start = Instant::now();
    let mut request = client.request(method.clone(), url.clone()).bearer_auth(token);
    if let Some(body) = body {
        request = request.json(body);
    }

    let response = request.send().await?;
    let status = response.status();
    let text = response.text().await?;

    debug!(
        method = %method,
        url = %url,
        status = status.as_u16(),
        elapsed = ?start.elapsed(),
        "HTTP API response from Hetzner Cloud"
    );

    if !status.is_success() {
        let (code, message) = match serde_json::from_str::<ErrorResponse>(&text) {
            Ok(parsed) => (parsed.error.code, parsed.error.message),
            Err(_) => ("unknown".to_string(), text),
        };
        warn!(
            method = %method,
            url = %url,
            status = status.as_u16(),
            code = %code,
            "Hetzner Cloud API returned an error"
        );
        return Err(HcloudError::Api {
            status: status.as_u16(),
            code,
            message,
        });
    }

    serde_json::from_str(&text).map_err(|e| HcloudError::Decode(format!("{url}: {e}")))
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod http_tests;
