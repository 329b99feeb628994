use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub time_window: Duration,
    pub burst_allowance: u32,
}

impl RateLimitConfig {
    pub fn reddit_oauth() -> Self {
        Self {
            max_requests: 100, // Reddit allows 100 requests per minute for OAuth2
            time_window: Duration::from_secs(60),
            burst_allowance: 10,
        }
    }
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

#[derive(Debug)]
pub struct TokenBucket {
    state: Mutex<BucketState>,
    capacity: f64,
    refill_rate: f64, // tokens per second
}

impl TokenBucket {
    pub fn new(config: &RateLimitConfig) -> Self {
        let capacity = config.burst_allowance as f64;
        let refill_rate = config.max_requests as f64 / config.time_window.as_secs_f64();

        Self {
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
            capacity,
            refill_rate,
        }
    }

    pub async fn acquire(&self, tokens_needed: f64) -> Result<(), Duration> {
        let mut state = self.state.lock().await;
        self.refill(&mut state);

        if state.tokens >= tokens_needed {
            state.tokens -= tokens_needed;
            Ok(())
        } else {
            let missing = tokens_needed - state.tokens;
            Err(Duration::from_secs_f64(missing / self.refill_rate))
        }
    }

    pub async fn available_tokens(&self) -> f64 {
        let mut state = self.state.lock().await;
        self.refill(&mut state);
        state.tokens
    }

    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill);
        state.tokens = (state.tokens + elapsed.as_secs_f64() * self.refill_rate).min(self.capacity);
        state.last_refill = now;
    }
}

/// Quota advertised by Reddit through the `X-Ratelimit-*` response headers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServerQuota {
    pub remaining: f64,
    pub resets_at: Instant,
}

impl ServerQuota {
    pub fn from_headers(headers: &reqwest::header::HeaderMap) -> Option<Self> {
        let read = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse::<f64>().ok())
                .filter(|value| value.is_finite())
        };

        let remaining = read("x-ratelimit-remaining")?;
        let reset_seconds = read("x-ratelimit-reset")?;

        Some(Self {
            remaining,
            resets_at: Instant::now()
                .checked_add(Duration::try_from_secs_f64(reset_seconds.max(0.0)).ok()?)?,
        })
    }

    /// Time to hold off before the next request, if the quota is spent.
    pub fn wait_time(&self, now: Instant) -> Option<Duration> {
        if self.remaining >= 1.0 {
            return None;
        }
        let wait = self.resets_at.saturating_duration_since(now);
        (!wait.is_zero()).then_some(wait)
    }
}

/// Client-side token bucket combined with the server's own quota headers.
#[derive(Debug)]
pub struct RateLimiter {
    token_bucket: TokenBucket,
    server_quota: Mutex<Option<ServerQuota>>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            token_bucket: TokenBucket::new(&config),
            server_quota: Mutex::new(None),
            config,
        }
    }

    /// Wait until a request may be sent. Returns the time spent waiting.
    pub async fn acquire_permit(&self) -> Duration {
        let start_time = Instant::now();

        let quota = *self.server_quota.lock().await;
        let quota_wait = quota.and_then(|quota| quota.wait_time(Instant::now()));
        if let Some(wait_time) = quota_wait {
            warn!("Reddit request quota used up, waiting {:?} for reset", wait_time);
            sleep(wait_time).await;
        }

        loop {
            match self.token_bucket.acquire(1.0).await {
                Ok(()) => break,
                Err(wait_time) => {
                    debug!("Rate limit reached, waiting {:?}", wait_time);
                    sleep(wait_time).await;
                }
            }
        }

        start_time.elapsed()
    }

    pub async fn observe_quota(&self, quota: ServerQuota) {
        debug!(
            "Reddit quota: {} requests remaining in window",
            quota.remaining
        );
        *self.server_quota.lock().await = Some(quota);
    }

    pub async fn available_tokens(&self) -> u32 {
        self.token_bucket.available_tokens().await as u32
    }

    pub fn max_tokens(&self) -> u32 {
        self.config.burst_allowance
    }
}
