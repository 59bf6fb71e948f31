use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::blocking::{Client as HttpClient, Response as HttpResponse};
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;

const BODY_EXCERPT_CHARS: usize = 512;

pub(crate) fn build_client(timeout: Duration) -> Result<HttpClient> {
    let builder = HttpClient::builder()
        .timeout(timeout)
        .user_agent(concat!("artmint/", env!("CARGO_PKG_VERSION")));
    // Tests talk to servers on loopback.
    #[cfg(test)]
    let builder = builder.no_proxy();
    builder.build().context("failed to build HTTP client")
}

/// Turn a non-2xx response into an error carrying the status and a body excerpt.
pub(crate) fn ensure_success(service: &str, response: HttpResponse) -> Result<HttpResponse> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(anyhow!(
        "{service} request failed ({}): {}",
        status.as_u16(),
        excerpt(&body, BODY_EXCERPT_CHARS)
    ))
}

pub(crate) fn read_json(service: &str, response: HttpResponse) -> Result<Value> {
    let body = ensure_success(service, response)?
        .text()
        .with_context(|| format!("{service} response body read failed"))?;
    serde_json::from_str(&body).with_context(|| {
        format!(
            "{service} returned invalid JSON: {}",
            excerpt(&body, BODY_EXCERPT_CHARS)
        )
    })
}

/// Lowercased `Content-Type`, empty when absent.
pub(crate) fn content_type(response: &HttpResponse) -> String {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default()
}

/// One-line summary of an error and its causes, consecutive repeats dropped.
pub(crate) fn error_summary(err: &anyhow::Error, max_chars: usize) -> String {
    let mut causes: Vec<String> = err
        .chain()
        .map(|cause| cause.to_string().trim().to_string())
        .filter(|cause| !cause.is_empty())
        .collect();
    causes.dedup();
    excerpt(&causes.join(": "), max_chars)
}

pub(crate) fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}…", &text[..cut]),
        None => text.to_string(),
    }
}
