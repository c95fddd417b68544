use std::time::Duration;

use reqwest::StatusCode;
use serde::Serialize;
use tokio::time::sleep;

const BACKOFF_CAP_MS: u64 = 30_000;

#[derive(Debug, Clone, Copy)]
pub(crate) struct BackoffPolicy {
    pub timeout_secs: Option<u64>,
    pub retries: u32,
    pub base_delay_ms: u64,
}

#[derive(Debug)]
pub(crate) enum CallFailure {
    Transport(reqwest::Error),
    Api { status: StatusCode, body: String },
}

/// POSTs an authenticated JSON payload, retrying transient failures
/// (429/5xx statuses, timeout/connect errors) with exponential backoff.
pub(crate) async fn post_with_retry<T: Serialize + ?Sized>(
    client: &reqwest::Client,
    url: &str,
    api_key: &str,
    payload: &T,
    policy: BackoffPolicy,
) -> Result<reqwest::Response, CallFailure> {
    let mut attempt = 0;

    loop {
        let mut request = client.post(url).bearer_auth(api_key).json(payload);
        if let Some(timeout_secs) = policy.timeout_secs {
            request = request.timeout(Duration::from_secs(timeout_secs));
        }

        let failure = match request.send().await {
            Ok(response) if response.status().is_success() => return Ok(response),
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                CallFailure::Api { status, body }
            }
            Err(source) => CallFailure::Transport(source),
        };

        if attempt < policy.retries && is_transient(&failure) {
            sleep(backoff_delay(attempt, policy.base_delay_ms)).await;
            attempt += 1;
            continue;
        }

        return Err(failure);
    }
}

fn is_transient(failure: &CallFailure) -> bool {
    match failure {
        CallFailure::Api { status, .. } => {
            *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
        }
        CallFailure::Transport(source) => {
            source.is_timeout() || source.is_connect() || source.is_request()
        }
    }
}

fn backoff_delay(attempt: u32, base_ms: u64) -> Duration {
    let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
    Duration::from_millis(base_ms.saturating_mul(factor).min(BACKOFF_CAP_MS))
}

#[cfg(test)]
mod tests {
    use super::{CallFailure, backoff_delay, is_transient};
    use reqwest::StatusCode;
    use std::time::Duration;

    fn api_failure(status: StatusCode) -> CallFailure {
        CallFailure::Api {
            status,
            body: String::new(),
        }
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        assert_eq!(backoff_delay(0, 200), Duration::from_millis(200));
        assert_eq!(backoff_delay(1, 200), Duration::from_millis(400));
        assert_eq!(backoff_delay(2, 200), Duration::from_millis(800));
    }

    #[test]
    fn backoff_caps_at_thirty_seconds() {
        assert_eq!(backoff_delay(10, 500), Duration::from_millis(30_000));
        assert_eq!(backoff_delay(30, 5_000), Duration::from_millis(30_000));
    }

    #[test]
    fn only_throttling_and_server_errors_retry() {
        assert!(is_transient(&api_failure(StatusCode::TOO_MANY_REQUESTS)));
        assert!(is_transient(&api_failure(StatusCode::INTERNAL_SERVER_ERROR)));
        assert!(is_transient(&api_failure(StatusCode::BAD_GATEWAY)));

        assert!(!is_transient(&api_failure(StatusCode::BAD_REQUEST)));
        assert!(!is_transient(&api_failure(StatusCode::UNAUTHORIZED)));
        assert!(!is_transient(&api_failure(StatusCode::NOT_FOUND)));
    }
}
