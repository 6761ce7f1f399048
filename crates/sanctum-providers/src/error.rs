//! HTTP status and transport error mapping for the provider clients.

pub use sanctum_core::error::{ProviderError, StoreError};

/// Default `retry-after` when a 429 carries no usable header.
const DEFAULT_RETRY_AFTER_SECS: u64 = 5;

/// Classify a transport-level failure from the generation API.
pub(crate) fn provider_transport_error(err: reqwest::Error, timeout_secs: u64) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout(timeout_secs)
    } else {
        ProviderError::NetworkError(err.to_string())
    }
}

/// Pass a successful response through, or turn an error status into a
/// `ProviderError`.
pub(crate) async fn check_provider_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status().as_u16();
    if status < 400 {
        return Ok(response);
    }
    if status == 429 {
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
            * 1000;
        return Err(ProviderError::RateLimited {
            retry_after_ms: retry_after,
        });
    }

    let body = response.text().await.unwrap_or_default();
    if status == 401 || status == 403 {
        return Err(ProviderError::AuthenticationFailed(body));
    }
    Err(ProviderError::ApiError {
        status,
        message: body,
    })
}

/// Classify a transport-level failure from the vector index.
pub(crate) fn store_transport_error(err: reqwest::Error) -> StoreError {
    if err.is_timeout() {
        StoreError::Unavailable(format!("request timed out: {err}"))
    } else {
        StoreError::Unavailable(err.to_string())
    }
}

/// Pass a successful response through, or turn an error status into a
/// `StoreError`. Client errors in the request are `Invalid`; everything else
/// means the index cannot serve us right now.
pub(crate) async fn check_store_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, StoreError> {
    let status = response.status().as_u16();
    if status < 400 {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    match status {
        400 | 422 => Err(StoreError::Invalid(format!("HTTP {status}: {body}"))),
        401 | 403 => Err(StoreError::Unavailable(format!(
            "authentication failed (HTTP {status}): {body}"
        ))),
        _ => Err(StoreError::Unavailable(format!("HTTP {status}: {body}"))),
    }
}
