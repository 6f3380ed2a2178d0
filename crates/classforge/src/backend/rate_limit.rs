use std::num::NonZeroU32;
use std::sync::Arc;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

type GovernorRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Client-side request pacing for one backend instance.
///
/// Configured through the `requests_per_second` backend setting; providers
/// wait on it before every outgoing request.
#[derive(Clone)]
pub struct ApiRateLimiter {
    inner: Arc<GovernorRateLimiter>,
    requests_per_second: NonZeroU32,
}

impl ApiRateLimiter {
    /// Create a limiter allowing `requests_per_second` (0 is treated as 1).
    pub fn new(requests_per_second: u32) -> Self {
        let rps = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        Self {
            inner: Arc::new(RateLimiter::direct(Quota::per_second(rps))),
            requests_per_second: rps,
        }
    }

    /// Wait until the next request is allowed.
    pub async fn wait(&self) {
        self.inner.until_ready().await;
    }

    #[must_use]
    pub fn requests_per_second(&self) -> u32 {
        self.requests_per_second.get()
    }
}

impl std::fmt::Debug for ApiRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiRateLimiter")
            .field("requests_per_second", &self.requests_per_second)
            .finish()
    }
}
