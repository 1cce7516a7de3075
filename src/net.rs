//! Shared HTTP plumbing for network-backed providers.
//!
//! Every provider doing I/O funnels through these helpers so request
//! timeouts are always bounded by both the provider's own budget and the
//! engine-imposed invocation deadline.

use reqwest::blocking::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::provider::{FailureKind, FailureReason, ProviderContext};

/// User agent sent to every remote service.
pub const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Build the blocking client a provider keeps for its lifetime.
pub fn build_client(timeout: Duration) -> Result<Client, FailureReason> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| FailureReason::network(format!("failed to create HTTP client: {e}")))
}

/// Outcome of one JSON request against a remote service.
#[derive(Debug)]
pub enum FetchResult<T> {
    Ok(T),
    /// 404: the service does not know this entity.
    NotFound,
    Failed(FailureReason),
    TimedOut,
}

/// GET a JSON document.
pub fn get_json<T: DeserializeOwned>(client: &Client, url: &str, ctx: &ProviderContext) -> FetchResult<T> {
    send_json(client.get(url), url, ctx)
}

/// GET a JSON document with a bearer token.
pub fn get_json_with_auth<T: DeserializeOwned>(
    client: &Client,
    url: &str,
    token: &str,
    ctx: &ProviderContext,
) -> FetchResult<T> {
    send_json(client.get(url).bearer_auth(token), url, ctx)
}

fn send_json<T: DeserializeOwned>(request: RequestBuilder, url: &str, ctx: &ProviderContext) -> FetchResult<T> {
    let remaining = ctx.remaining();
    if remaining.is_zero() {
        return FetchResult::TimedOut;
    }

    let response = match request.timeout(remaining).send() {
        Ok(response) => response,
        Err(e) if e.is_timeout() => return FetchResult::TimedOut,
        Err(e) => return FetchResult::Failed(FailureReason::network(e.to_string())),
    };

    let status = response.status();
    match status.as_u16() {
        404 => return FetchResult::NotFound,
        401 | 403 => {
            return FetchResult::Failed(FailureReason::new(
                FailureKind::Auth,
                format!("HTTP {status} from {url}"),
            ))
        }
        429 => {
            return FetchResult::Failed(FailureReason::new(
                FailureKind::RateLimited,
                format!("429 from {url}"),
            ))
        }
        _ if !status.is_success() => {
            return FetchResult::Failed(FailureReason::api(format!("HTTP {status} from {url}")))
        }
        _ => {}
    }

    match response.json::<T>() {
        Ok(body) => FetchResult::Ok(body),
        Err(e) => FetchResult::Failed(FailureReason::new(
            FailureKind::InvalidResponse,
            e.to_string(),
        )),
    }
}
