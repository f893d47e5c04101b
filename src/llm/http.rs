//! Shared HTTP plumbing for the REST-based providers.

use std::time::Duration;

use reqwest::{Response, StatusCode};

use crate::error::LlmError;

/// Build a client with a bounded per-request timeout.
pub(crate) fn build_client(provider: &str, timeout: Duration) -> Result<reqwest::Client, LlmError> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .timeout(timeout)
        .build()
        .map_err(|e| LlmError::ClientSetup {
            provider: provider.to_string(),
            reason: e.to_string(),
        })
}

/// Map a transport-level failure.
pub(crate) fn transport_error(provider: &str, e: reqwest::Error) -> LlmError {
    if e.is_timeout() {
        LlmError::Timeout {
            provider: provider.to_string(),
        }
    } else {
        LlmError::RequestFailed {
            provider: provider.to_string(),
            reason: e.to_string(),
        }
    }
}

/// Turn a non-success response into the matching error. Success passes through.
pub(crate) async fn check_status(provider: &str, response: Response) -> Result<Response, LlmError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(LlmError::AuthFailed {
            provider: provider.to_string(),
        }),
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            Err(LlmError::RateLimited {
                provider: provider.to_string(),
                retry_after,
            })
        }
        _ => {
            let body = response.text().await.unwrap_or_default();
            Err(LlmError::RequestFailed {
                provider: provider.to_string(),
                reason: format!("{status} - {body}"),
            })
        }
    }
}
