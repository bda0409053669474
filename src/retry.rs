// Shared HTTP send path with exponential backoff for the upstream AI APIs
use backoff::{future::retry, ExponentialBackoff};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::error::ClientError;

/// Retry policy used by the API clients
pub fn default_policy() -> ExponentialBackoff {
    ExponentialBackoff {
        initial_interval: Duration::from_secs(1),
        max_interval: Duration::from_secs(30),
        multiplier: 2.0,
        max_elapsed_time: Some(Duration::from_secs(120)),
        ..Default::default()
    }
}

/// Fail on the first error. Used where the caller already has its own fallback.
pub fn no_retry() -> ExponentialBackoff {
    ExponentialBackoff {
        initial_interval: Duration::from_millis(10),
        max_elapsed_time: Some(Duration::ZERO),
        ..Default::default()
    }
}

/// 429 and the 5xx gateway family are worth another attempt
pub fn is_retryable_status(status: StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 502 | 503 | 504)
}

/// Send the request built by `build`, retrying transient failures, and decode the JSON body.
///
/// `build` is called once per attempt since a `RequestBuilder` is consumed by `send`.
pub async fn send_json<T, F>(policy: ExponentialBackoff, service: &str, build: F) -> Result<T, ClientError>
where
    T: DeserializeOwned,
    F: Fn() -> RequestBuilder,
{
    let build = &build;
    let operation = move || async move {
        let response = build().send().await.map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                tracing::warn!("{} connection error (retrying): {}", service, e);
                backoff::Error::transient(ClientError::Http(e))
            } else {
                tracing::error!("{} request error: {}", service, e);
                backoff::Error::permanent(ClientError::Http(e))
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| backoff::Error::permanent(ClientError::Http(e)))?;

        if is_retryable_status(status) {
            tracing::warn!("{} returned {} (retrying): {}", service, status, truncate(&body, 300));
            return Err(backoff::Error::transient(ClientError::Api {
                status: status.as_u16(),
                body,
            }));
        }

        if !status.is_success() {
            tracing::error!("{} permanent error ({}): {}", service, status, truncate(&body, 300));
            return Err(backoff::Error::permanent(ClientError::Api {
                status: status.as_u16(),
                body,
            }));
        }

        tracing::debug!("{} response ({}): {}", service, status, truncate(&body, 500));
        serde_json::from_str::<T>(&body).map_err(|e| backoff::Error::permanent(ClientError::Decode(e)))
    };

    retry(policy, operation).await
}

/// Cut `text` to at most `max` bytes on a char boundary, for log lines
pub fn truncate(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
