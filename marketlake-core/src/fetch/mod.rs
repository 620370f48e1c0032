//! Rate-limited fetching from remote market data APIs.
//!
//! The [`RateLimitedClient`] owns the retry contract: bounded attempts, a
//! backoff wait after each rate-limited response, and a fixed pacing delay
//! between items of a loop. Network I/O sits behind the [`Transport`] trait and
//! waiting sits behind [`Sleeper`], so the contract is testable with a scripted
//! transport and no real sleeps.

pub mod client;
pub mod policy;
pub mod transport;

pub use client::{is_rate_limited, FetchError, RateLimitCheck, RateLimitedClient};
pub use policy::RetryPolicy;
pub use transport::{HttpResponse, HttpTransport, Sleeper, ThreadSleeper, Transport, TransportError};
