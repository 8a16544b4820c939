use std::thread;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::debug;

use crate::error::IngestError;

/// Timeout and retry budget shared by every remote client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpPolicy {
    pub timeout: Duration,
    pub max_retries: usize,
    pub base_delay: Duration,
}

impl Default for HttpPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 3,
            base_delay: Duration::from_millis(200),
        }
    }
}

pub fn build_client<E>(policy: &HttpPolicy, map_err: E) -> Result<Client, IngestError>
where
    E: Fn(String) -> IngestError,
{
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(&format!("mutant-ingest/{}", env!("CARGO_PKG_VERSION")))
            .map_err(|err| map_err(err.to_string()))?,
    );
    Client::builder()
        .default_headers(headers)
        .timeout(policy.timeout)
        .build()
        .map_err(|err| map_err(err.to_string()))
}

/// Sends the request built by `make_req`, retrying transient failures with a
/// linear backoff. Non-retryable statuses are returned to the caller as-is.
pub fn send_with_retries<F, E>(
    policy: &HttpPolicy,
    mut make_req: F,
    map_err: E,
) -> Result<Response, IngestError>
where
    F: FnMut() -> RequestBuilder,
    E: Fn(String) -> IngestError,
{
    let mut attempt = 0usize;
    loop {
        let response = make_req().send();
        match response {
            Ok(resp) => {
                let status = resp.status().as_u16();
                if attempt < policy.max_retries && is_retryable_status(status) {
                    debug!(status, attempt, "retrying after transient status");
                    thread::sleep(policy.base_delay * (attempt as u32 + 1));
                    attempt += 1;
                    continue;
                }
                return Ok(resp);
            }
            Err(err) => {
                if attempt < policy.max_retries && is_retryable_error(&err) {
                    debug!(error = %err, attempt, "retrying after transport error");
                    thread::sleep(policy.base_delay * (attempt as u32 + 1));
                    attempt += 1;
                    continue;
                }
                return Err(map_err(err.to_string()));
            }
        }
    }
}

pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

pub fn encode_url_component(value: &str) -> String {
    let mut out = String::new();
    for byte in value.as_bytes() {
        let ch = *byte as char;
        if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || ch == '.' || ch == '~' {
            out.push(ch);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}
