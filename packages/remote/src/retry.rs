//! HTTP retry helper for transient WFS errors.
//!
//! Retries connection failures, timeouts, HTTP 429 and HTTP 5xx with
//! exponential backoff. Other 4xx responses are permanent. The caller's
//! per-source timeout bounds the total time spent here, so backoff is
//! kept short.

use std::time::Duration;

use crate::RemoteError;

/// Delay before the first retry; doubles on every further attempt.
pub const BASE_RETRY_DELAY: Duration = Duration::from_millis(250);

/// Maximum length of the response body preview included in error logs.
const BODY_PREVIEW_LEN: usize = 500;

/// Sends an HTTP request and returns the response body as a `String`.
///
/// The `build_request` closure is called on each attempt to construct a
/// fresh [`reqwest::RequestBuilder`] (builders are consumed by `.send()`).
///
/// # Errors
///
/// Returns [`RemoteError`] if the request still fails after
/// `max_retries` retries or the server returns a non-retryable status.
pub async fn send_text<F>(build_request: F, max_retries: u32) -> Result<String, RemoteError>
where
    F: Fn() -> reqwest::RequestBuilder + Send + Sync,
{
    let mut attempt = 0;

    loop {
        if attempt > 0 {
            let delay = BASE_RETRY_DELAY * 2u32.pow(attempt - 1);
            log::debug!("  retry {attempt}/{max_retries} in {delay:?}...");
            tokio::time::sleep(delay).await;
        }

        let (retryable, err) = match build_request().send().await {
            Err(e) => (is_transient(&e), RemoteError::Http(e)),
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return Ok(response.text().await?);
                }

                let url = response.url().to_string();
                let body = response.text().await.unwrap_or_default();
                log::debug!("  HTTP {status} from {url}: {}", preview(&body));

                let retryable =
                    status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
                (
                    retryable,
                    RemoteError::Status {
                        status: status.as_u16(),
                    },
                )
            }
        };

        if retryable && attempt < max_retries {
            log::warn!("  transient error: {err}");
            attempt += 1;
            continue;
        }
        return Err(err);
    }
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_request()
}

/// Truncates a body for logging, appending "..." if it was cut.
fn preview(body: &str) -> String {
    if body.len() <= BODY_PREVIEW_LEN {
        body.to_string()
    } else {
        let mut end = BODY_PREVIEW_LEN;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    }
}
