use scraper_core::{CoreError, ErrorExt};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info};

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,
    /// Base delay for exponential backoff (in milliseconds)
    pub base_delay_ms: u64,
    /// Maximum delay between retries (in milliseconds)
    pub max_delay_ms: u64,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Maximum jitter factor (0.0 to 1.0)
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30000,
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

impl RetryConfig {
    /// Create retry config tuned for the Reddit API
    pub fn reddit() -> Self {
        Self {
            max_attempts: 4,
            base_delay_ms: 2000,
            max_delay_ms: 60000,
            backoff_multiplier: 2.0,
            jitter_factor: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RetryStrategy {
    /// Retry with exponential backoff
    Retry,
    /// Retry after the delay the server asked for
    RetryWithDelay(Duration),
    /// Don't retry (for permanent failures)
    NoRetry,
}

pub fn get_retry_strategy(error: &CoreError) -> RetryStrategy {
    match error.retry_after() {
        Some(delay) => RetryStrategy::RetryWithDelay(delay),
        None if error.is_retryable() => RetryStrategy::Retry,
        None => RetryStrategy::NoRetry,
    }
}

/// Calculate delay with exponential backoff and jitter
pub fn calculate_delay(attempt: u32, config: &RetryConfig) -> Duration {
    let max_delay = Duration::from_millis(config.max_delay_ms);

    let multiplier = config.backoff_multiplier.powi(attempt as i32);
    let delay_ms = (config.base_delay_ms as f64 * multiplier) as u64;
    let exponential_delay = Duration::from_millis(delay_ms.min(config.max_delay_ms));

    let jitter_range = (exponential_delay.as_millis() as f64 * config.jitter_factor) as u64;
    let jitter = fastrand::u64(0..=jitter_range);

    (exponential_delay + Duration::from_millis(jitter)).min(max_delay)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetryStats {
    pub total_retries: u64,
    pub successful_retries: u64,
    pub exhausted: u64,
}

/// Wraps a fallible async operation with bounded retries.
#[derive(Debug)]
pub struct RetryExecutor {
    config: RetryConfig,
    total_retries: AtomicU64,
    successful_retries: AtomicU64,
    exhausted: AtomicU64,
}

impl RetryExecutor {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            total_retries: AtomicU64::new(0),
            successful_retries: AtomicU64::new(0),
            exhausted: AtomicU64::new(0),
        }
    }

    /// Run `operation` until it succeeds, fails permanently, or runs out of
    /// attempts. The last error is returned unchanged.
    pub async fn execute<F, Fut, T>(&self, operation_name: &str, operation: F) -> Result<T, CoreError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        let mut attempt = 0u32;
        let mut total_delay = Duration::ZERO;

        loop {
            if attempt > 0 {
                debug!("Retry attempt {} for {}", attempt, operation_name);
            }

            let error = match operation().await {
                Ok(result) => {
                    if attempt > 0 {
                        self.successful_retries.fetch_add(1, Ordering::Relaxed);
                        info!(
                            "{} succeeded after {} retries (total delay: {:?})",
                            operation_name, attempt, total_delay
                        );
                    }
                    return Ok(result);
                }
                Err(error) => error,
            };

            let has_attempts_left = attempt + 1 < self.config.max_attempts;
            let delay = match get_retry_strategy(&error) {
                RetryStrategy::NoRetry => {
                    debug!("Not retrying {}: {}", operation_name, error);
                    return Err(error);
                }
                _ if !has_attempts_left => {
                    self.exhausted.fetch_add(1, Ordering::Relaxed);
                    error!(
                        "{} failed after {} attempts (total delay {:?}): {}",
                        operation_name,
                        attempt + 1,
                        total_delay,
                        error
                    );
                    return Err(error);
                }
                RetryStrategy::Retry => calculate_delay(attempt, &self.config),
                RetryStrategy::RetryWithDelay(delay) => delay,
            };

            info!("Retrying {} in {:?} due to: {}", operation_name, delay, error);
            self.total_retries.fetch_add(1, Ordering::Relaxed);
            total_delay += delay;
            sleep(delay).await;
            attempt += 1;
        }
    }

    pub fn stats(&self) -> RetryStats {
        RetryStats {
            total_retries: self.total_retries.load(Ordering::Relaxed),
            successful_retries: self.successful_retries.load(Ordering::Relaxed),
            exhausted: self.exhausted.load(Ordering::Relaxed),
        }
    }
}
