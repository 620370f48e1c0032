//! The retry/backoff client shared by every collector.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use super::policy::RetryPolicy;
use super::transport::{HttpResponse, Sleeper, ThreadSleeper, Transport, TransportError};
use crate::domain::ParseError;

/// Decides whether a response means "slow down and try again".
pub type RateLimitCheck = fn(&HttpResponse) -> bool;

/// Errors surfaced by [`RateLimitedClient`].
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FetchError {
    #[error("transport error for {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: TransportError,
    },

    #[error("rate limit still exceeded for {url} after {attempts} attempts")]
    RateLimitExceeded { url: String, attempts: u32 },

    #[error("unparseable response: {0}")]
    Parse(#[from] ParseError),
}

impl FetchError {
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, FetchError::RateLimitExceeded { .. })
    }
}

/// HTTP 429, or a CoinGecko-style `{"status": {"error_code": 429}}` body.
pub fn is_rate_limited(resp: &HttpResponse) -> bool {
    resp.status == 429 || embedded_rate_limit(&resp.body)
}

fn embedded_rate_limit(body: &str) -> bool {
    #[derive(Deserialize)]
    struct Envelope {
        status: Option<StatusBlock>,
    }

    #[derive(Deserialize)]
    struct StatusBlock {
        error_code: Option<u16>,
    }

    if !body.contains("error_code") {
        return false;
    }
    serde_json::from_str::<Envelope>(body)
        .ok()
        .and_then(|e| e.status)
        .and_then(|s| s.error_code)
        == Some(429)
}

/// Wraps a [`Transport`] with bounded retries on rate limiting.
#[derive(Clone)]
pub struct RateLimitedClient {
    transport: Arc<dyn Transport>,
    sleeper: Arc<dyn Sleeper>,
    policy: RetryPolicy,
    rate_limit_check: RateLimitCheck,
}

impl RateLimitedClient {
    pub fn new(transport: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        Self {
            transport,
            sleeper: Arc::new(ThreadSleeper),
            policy,
            rate_limit_check: is_rate_limited,
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_rate_limit_check(mut self, check: RateLimitCheck) -> Self {
        self.rate_limit_check = check;
        self
    }

    /// Same transport and sleeper, different policy.
    pub fn with_policy(&self, policy: RetryPolicy) -> Self {
        Self {
            policy,
            ..self.clone()
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// GET `url` with query `params`.
    ///
    /// Rate-limited responses are retried until `max_attempts` calls have been
    /// made; the backoff wait only happens when another attempt follows. Any
    /// other non-2xx status, and any network failure, is returned at once.
    pub fn fetch(&self, url: &str, params: &[(&str, String)]) -> Result<HttpResponse, FetchError> {
        let params: Vec<(String, String)> = params
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect();
        let max_attempts = self.policy.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            let resp = self
                .transport
                .get(url, &params)
                .map_err(|source| FetchError::Transport {
                    url: url.to_string(),
                    source,
                })?;

            if (self.rate_limit_check)(&resp) {
                if attempt == max_attempts {
                    break;
                }
                let hinted = resp
                    .retry_after
                    .map(|ra| self.policy.cap(ra))
                    .unwrap_or_default();
                let wait = self.policy.backoff_for(attempt).max(hinted);
                warn!(
                    url,
                    attempt,
                    max_attempts,
                    wait_secs = wait.as_secs_f64(),
                    "rate limited, backing off"
                );
                self.sleeper.sleep(wait);
                continue;
            }

            if !resp.is_success() {
                return Err(FetchError::Transport {
                    url: url.to_string(),
                    source: TransportError::Http {
                        status: resp.status,
                    },
                });
            }

            debug!(url, attempt, status = resp.status, bytes = resp.body.len(), "fetched");
            return Ok(resp);
        }

        warn!(url, attempts = max_attempts, "giving up after repeated rate limiting");
        Err(FetchError::RateLimitExceeded {
            url: url.to_string(),
            attempts: max_attempts,
        })
    }

    /// [`fetch`](Self::fetch) and deserialize the body as JSON.
    pub fn fetch_json<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<T, FetchError> {
        let resp = self.fetch(url, params)?;
        Ok(resp.json()?)
    }

    /// Block for the inter-call delay. Called between loop items whether the
    /// previous item succeeded or not.
    pub fn pace(&self) {
        let delay = self.policy.inter_call_delay();
        if !delay.is_zero() {
            debug!(delay_secs = delay.as_secs_f64(), "pacing before next call");
            self.sleeper.sleep(delay);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_429_is_rate_limited() {
        assert!(is_rate_limited(&HttpResponse::new(429, "Too Many Requests")));
        assert!(!is_rate_limited(&HttpResponse::new(200, "[]")));
        assert!(!is_rate_limited(&HttpResponse::new(500, "oops")));
    }

    #[test]
    fn embedded_coingecko_error_is_rate_limited() {
        let body = r#"{"status":{"error_code":429,"error_message":"You've exceeded the Rate Limit."}}"#;
        assert!(is_rate_limited(&HttpResponse::new(200, body)));

        let other = r#"{"status":{"error_code":10002,"error_message":"API key missing"}}"#;
        assert!(!is_rate_limited(&HttpResponse::new(200, other)));

        // Arrays and unrelated objects never match.
        assert!(!is_rate_limited(&HttpResponse::new(200, r#"[{"error_code":429}]"#)));
        assert!(!is_rate_limited(&HttpResponse::new(200, r#"{"prices":[]}"#)));
    }

    #[test]
    fn fetch_error_rate_limit_flag() {
        let e = FetchError::RateLimitExceeded {
            url: "u".into(),
            attempts: 3,
        };
        assert!(e.is_rate_limit());
        let t = FetchError::Transport {
            url: "u".into(),
            source: TransportError::Http { status: 500 },
        };
        assert!(!t.is_rate_limit());
    }
}
