//! Retry on gateway timeouts.

use log::{debug, warn};
use std::future::Future;

use crate::http::RequestError;
use crate::timing::log_external_request;

use super::SERVICE_NAME;

/// Runs `operation` up to `1 + retries` times.
///
/// Only an HTTP 504 consumes an attempt and retries; any other error is
/// returned straight away. When every attempt times out, the last 504 is
/// returned. Each attempt is timed under the Mailchimp service tag.
pub async fn with_timeout_retry<F, Fut, T>(retries: usize, operation: F) -> Result<T, RequestError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, RequestError>>,
{
    let attempts = retries.saturating_add(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match log_external_request(SERVICE_NAME, operation()).await {
            Ok(result) => return Ok(result),
            Err(e) if e.is_gateway_timeout() && attempt < attempts => {
                warn!(
                    "{}: attempt {}/{} timed out at the gateway ({}), retrying...",
                    SERVICE_NAME, attempt, attempts, e
                );
            }
            Err(e) => {
                debug!(
                    "{}: giving up after attempt {}/{}: {}",
                    SERVICE_NAME, attempt, attempts, e
                );
                return Err(e);
            }
        }
    }
}
