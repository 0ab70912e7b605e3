//! Duration logging for calls to external services.

use std::future::Future;
use std::time::Instant;

use log::info;
use tracing::Instrument;

/// Runs `request` inside an `external_request` span tagged with `service`
/// and logs how long it took. The output is returned untouched, whether it
/// is a success or an error.
pub async fn log_external_request<F>(service: &str, request: F) -> F::Output
where
    F: Future,
{
    let span = tracing::info_span!("external_request", service = service);
    let start = Instant::now();

    let output = request.instrument(span).await;

    info!(
        "{} request finished in {:.6}",
        service,
        start.elapsed().as_secs_f64()
    );
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test(tokio::test)]
    async fn test_returns_success_value() {
        let result = log_external_request("Mailchimp", async { Ok::<_, String>(42) }).await;
        assert_eq!(result, Ok(42));
    }

    #[test_log::test(tokio::test)]
    async fn test_returns_error_value() {
        let result =
            log_external_request("Mailchimp", async { Err::<i32, _>("boom".to_string()) }).await;
        assert_eq!(result, Err("boom".to_string()));
    }

    #[tokio::test]
    async fn test_nested_scopes() {
        let result = log_external_request("Outer", async {
            log_external_request("Inner", async { "done" }).await
        })
        .await;
        assert_eq!(result, "done");
    }
}
