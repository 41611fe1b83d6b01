//! Request sender: one HTTP send with blocked/not-blocked classification
//! and retry of transient transport failures.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::Client;

use crate::config::{REQUEST_TIMEOUT, SEND_ATTEMPTS};

/// Block page text returned by WAFs that answer 200 with a custom denial
/// page instead of a 403. Matched byte-for-byte; do not generalize.
const REJECTION_MARKER: &str =
    "The requested URL was rejected. Please consult with your administrator.";

/// Normalized outcome of one payload send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendOutcome {
    /// HTTP status code, or `0` when no response was obtained after all
    /// attempts.
    pub status_code: u16,
    pub blocked: bool,
}

impl SendOutcome {
    /// Sentinel for "no response obtained": retries exhausted.
    pub fn no_response() -> Self {
        Self {
            status_code: 0,
            blocked: false,
        }
    }
}

/// Classify a response: a request counts as blocked when the WAF answers
/// 403 or serves its rejection page with any status.
pub fn classify_response(status_code: u16, body: &str) -> bool {
    status_code == 403 || body.contains(REJECTION_MARKER)
}

/// Sends individual requests to WAF endpoints. Cheap to clone; the inner
/// reqwest client is reference counted and reused across all batches.
#[derive(Debug, Clone)]
pub struct RequestSender {
    client: Client,
    attempts: u32,
}

impl RequestSender {
    pub fn new() -> Self {
        Self::with_timeout(REQUEST_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        // A builder with only a timeout cannot fail to construct.
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            attempts: SEND_ATTEMPTS,
        }
    }

    /// Send one request and classify the response.
    ///
    /// Transport failures (refused connection, timeout, DNS) are retried
    /// with a linearly increasing backoff of `0.1s * attempt` between
    /// attempts; once all attempts are exhausted the result degrades to
    /// the `(0, false)` sentinel instead of an error.
    pub async fn send(
        &self,
        method: &str,
        url: &str,
        headers: Option<&BTreeMap<String, String>>,
        body: Option<&str>,
    ) -> SendOutcome {
        let Ok(method) = method.parse::<reqwest::Method>() else {
            tracing::warn!(method, url, "Invalid HTTP method in payload");
            return SendOutcome::no_response();
        };

        for attempt in 1..=self.attempts {
            let mut request = self.client.request(method.clone(), url);

            if let Some(headers) = headers {
                // Drop any Host header so the transport derives it from
                // the destination URL.
                for (name, value) in headers.iter().filter(|(n, _)| !n.eq_ignore_ascii_case("host"))
                {
                    request = request.header(name.as_str(), value.as_str());
                }
            }
            if let Some(body) = body {
                request = request.body(body.to_string());
            }

            match request.send().await {
                Ok(response) => {
                    let status_code = response.status().as_u16();
                    let body = response.text().await.unwrap_or_default();
                    return SendOutcome {
                        status_code,
                        blocked: classify_response(status_code, &body),
                    };
                }
                Err(e) => {
                    tracing::trace!(url, attempt, error = %e, "Request attempt failed");
                    if attempt < self.attempts {
                        tokio::time::sleep(Duration::from_millis(100 * u64::from(attempt))).await;
                    }
                }
            }
        }

        SendOutcome::no_response()
    }
}

impl Default for RequestSender {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn status_403_is_blocked() {
        assert!(classify_response(403, ""));
    }

    #[test]
    fn rejection_page_with_200_is_blocked() {
        let body = format!("<html><body>{REJECTION_MARKER}</body></html>");
        assert!(classify_response(200, &body));
    }

    #[test]
    fn plain_200_is_not_blocked() {
        assert!(!classify_response(200, "<html>welcome</html>"));
    }

    #[test]
    fn marker_match_is_case_sensitive() {
        let body = "the requested url was rejected. please consult with your administrator.";
        assert!(!classify_response(200, body));
    }

    #[tokio::test]
    async fn unreachable_target_degrades_to_sentinel_after_retries() {
        // Bind then drop a listener so the port is known to refuse.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let sender = RequestSender::new();
        let start = Instant::now();
        let outcome = sender
            .send("GET", &format!("http://127.0.0.1:{port}/"), None, None)
            .await;

        assert_eq!(outcome, SendOutcome::no_response());
        // Two backoff sleeps between three attempts: 0.1s + 0.2s.
        assert!(start.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test]
    async fn invalid_method_degrades_to_sentinel() {
        let sender = RequestSender::new();
        let outcome = sender.send("NOT A METHOD", "http://127.0.0.1:1/", None, None).await;
        assert_eq!(outcome, SendOutcome::no_response());
    }
}
