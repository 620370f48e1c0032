//! Retry/backoff contract of the rate-limited client.
//!
//! A scripted transport replays canned responses and a recording sleeper
//! captures every requested wait, so nothing here touches the network or
//! actually sleeps.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use marketlake_core::fetch::{
    FetchError, HttpResponse, RateLimitedClient, RetryPolicy, Sleeper, Transport, TransportError,
};
use proptest::prelude::*;

struct ScriptedTransport {
    script: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    calls: AtomicU32,
}

impl ScriptedTransport {
    fn new(script: Vec<Result<HttpResponse, TransportError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            calls: AtomicU32::new(0),
        })
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Transport for ScriptedTransport {
    fn get(&self, _url: &str, _params: &[(String, String)]) -> Result<HttpResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Network("script exhausted".into())))
    }
}

#[derive(Default)]
struct RecordingSleeper {
    waits: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    fn waits(&self) -> Vec<Duration> {
        self.waits.lock().unwrap().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.waits.lock().unwrap().push(duration);
    }
}

fn policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        backoff_secs: 2.0,
        backoff_multiplier: 1.5,
        max_backoff_secs: 10.0,
        inter_call_delay_secs: 0.5,
    }
}

fn client(
    transport: &Arc<ScriptedTransport>,
    policy: RetryPolicy,
) -> (RateLimitedClient, Arc<RecordingSleeper>) {
    let sleeper = Arc::new(RecordingSleeper::default());
    let client = RateLimitedClient::new(transport.clone(), policy).with_sleeper(sleeper.clone());
    (client, sleeper)
}

fn rate_limited() -> Result<HttpResponse, TransportError> {
    Ok(HttpResponse::new(429, "Too Many Requests"))
}

fn ok_payload() -> Result<HttpResponse, TransportError> {
    Ok(HttpResponse::new(200, r#"{"ok":true}"#))
}

proptest! {
    #[test]
    fn fewer_rate_limits_than_attempts_succeeds(
        (max_attempts, limited) in (1u32..7).prop_flat_map(|m| (Just(m), 0..m))
    ) {
        let mut script: Vec<_> = (0..limited).map(|_| rate_limited()).collect();
        script.push(ok_payload());
        let transport = ScriptedTransport::new(script);
        let policy = policy(max_attempts);
        let (client, sleeper) = client(&transport, policy);

        let resp = client.fetch("https://example.test/data", &[]).unwrap();
        prop_assert_eq!(resp.body.as_str(), r#"{"ok":true}"#);
        prop_assert_eq!(transport.calls(), limited + 1);

        let waits = sleeper.waits();
        prop_assert_eq!(waits.len() as u32, limited);
        for (i, wait) in waits.iter().enumerate() {
            prop_assert_eq!(*wait, policy.backoff_for(i as u32 + 1));
        }
    }

    #[test]
    fn rate_limits_up_to_attempts_fail_after_exactly_max_calls(
        max_attempts in 1u32..7,
        extra in 0u32..3,
    ) {
        let script: Vec<_> = (0..max_attempts + extra).map(|_| rate_limited()).collect();
        let transport = ScriptedTransport::new(script);
        let (client, sleeper) = client(&transport, policy(max_attempts));

        let err = client.fetch("https://example.test/data", &[]).unwrap_err();
        prop_assert_eq!(
            err,
            FetchError::RateLimitExceeded {
                url: "https://example.test/data".into(),
                attempts: max_attempts,
            }
        );
        prop_assert_eq!(transport.calls(), max_attempts);
        // No wait after the final attempt.
        prop_assert_eq!(sleeper.waits().len() as u32, max_attempts - 1);
    }
}

#[test]
fn server_errors_are_not_retried() {
    let transport = ScriptedTransport::new(vec![Ok(HttpResponse::new(503, "down")), ok_payload()]);
    let (client, sleeper) = client(&transport, policy(3));

    let err = client.fetch("https://example.test/x", &[]).unwrap_err();
    assert_eq!(
        err,
        FetchError::Transport {
            url: "https://example.test/x".into(),
            source: TransportError::Http { status: 503 },
        }
    );
    assert_eq!(transport.calls(), 1);
    assert!(sleeper.waits().is_empty());
}

#[test]
fn client_errors_other_than_429_are_not_retried() {
    let transport = ScriptedTransport::new(vec![Ok(HttpResponse::new(404, "missing"))]);
    let (client, _) = client(&transport, policy(3));
    assert!(matches!(
        client.fetch("https://example.test/x", &[]),
        Err(FetchError::Transport {
            source: TransportError::Http { status: 404 },
            ..
        })
    ));
    assert_eq!(transport.calls(), 1);
}

#[test]
fn network_failures_are_not_retried() {
    let transport = ScriptedTransport::new(vec![
        Err(TransportError::Timeout("read timed out".into())),
        ok_payload(),
    ]);
    let (client, sleeper) = client(&transport, policy(3));
    assert!(matches!(
        client.fetch("https://example.test/x", &[]),
        Err(FetchError::Transport {
            source: TransportError::Timeout(_),
            ..
        })
    ));
    assert_eq!(transport.calls(), 1);
    assert!(sleeper.waits().is_empty());
}

#[test]
fn embedded_rate_limit_payload_is_retried() {
    let body = r#"{"status":{"error_code":429,"error_message":"You've exceeded the Rate Limit."}}"#;
    let transport = ScriptedTransport::new(vec![Ok(HttpResponse::new(200, body)), ok_payload()]);
    let (client, sleeper) = client(&transport, policy(3));

    assert!(client.fetch("https://example.test/x", &[]).is_ok());
    assert_eq!(transport.calls(), 2);
    assert_eq!(sleeper.waits(), vec![Duration::from_secs(2)]);
}

#[test]
fn retry_after_hint_wins_when_longer_but_is_capped() {
    let transport = ScriptedTransport::new(vec![
        Ok(HttpResponse::new(429, "").with_retry_after(Duration::from_secs(7))),
        Ok(HttpResponse::new(429, "").with_retry_after(Duration::from_secs(600))),
        Ok(HttpResponse::new(429, "").with_retry_after(Duration::from_secs(1))),
        ok_payload(),
    ]);
    let (client, sleeper) = client(&transport, policy(4));

    assert!(client.fetch("https://example.test/x", &[]).is_ok());
    assert_eq!(
        sleeper.waits(),
        vec![
            Duration::from_secs(7),
            Duration::from_secs(10),
            Duration::from_secs_f64(4.5),
        ]
    );
}

#[test]
fn custom_rate_limit_check_is_honoured() {
    fn teapot(resp: &HttpResponse) -> bool {
        resp.status == 418
    }
    let transport = ScriptedTransport::new(vec![Ok(HttpResponse::new(418, "")), ok_payload()]);
    let (client, _) = client(&transport, policy(2));
    let client = client.with_rate_limit_check(teapot);
    assert!(client.fetch("https://example.test/x", &[]).is_ok());
    assert_eq!(transport.calls(), 2);
}

#[test]
fn fetch_json_reports_malformed_payloads() {
    let transport = ScriptedTransport::new(vec![Ok(HttpResponse::new(200, "<html>"))]);
    let (client, _) = client(&transport, policy(1));
    let parsed: Result<serde_json::Value, _> = client.fetch_json("https://example.test/x", &[]);
    assert!(matches!(parsed, Err(FetchError::Parse(_))));
}

#[test]
fn pace_sleeps_exactly_the_inter_call_delay() {
    let transport = ScriptedTransport::new(vec![]);
    let (client, sleeper) = client(&transport, policy(3));
    client.pace();
    client.pace();
    assert_eq!(
        sleeper.waits(),
        vec![Duration::from_millis(500), Duration::from_millis(500)]
    );
    assert_eq!(transport.calls(), 0);

    let quiet = client.with_policy(RetryPolicy::immediate(3));
    quiet.pace();
    assert_eq!(sleeper.waits().len(), 2);
}
