// Retrying executor for the generic extraction calls.
//
// Every yt-dlp invocation goes through here; the gallery tool uses a single
// bounded-timeout attempt instead. Retry progress is an explicit state
// machine (Attempting -> BackingOff -> ... -> Succeeded | Exhausted) driven
// by a pure delay function, so the backoff ordering is directly assertable.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::config::DownloaderConfig;
use crate::errors::DownloadError;

/// Fixed pool of browser user agents, re-rolled on every attempt.
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.3 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:123.0) Gecko/20100101 Firefox/123.0",
];

pub fn random_user_agent() -> &'static str {
    let idx = rand::thread_rng().gen_range(0..USER_AGENTS.len());
    USER_AGENTS[idx]
}

/// One attempt handed to the operation closure.
#[derive(Debug, Clone, Copy)]
pub struct RetryAttempt {
    /// 1-based attempt number
    pub number: u32,
    pub user_agent: &'static str,
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    /// Extra fixed delay inserted when the failure is a rate-limit signal
    pub rate_limit_delay: Duration,
    /// Upper bound of the random jitter added to every delay
    pub max_jitter: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &DownloaderConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: config.base_delay,
            rate_limit_delay: config.rate_limit_delay,
            max_jitter: config.max_jitter,
        }
    }

    /// Delay before the next attempt after `failed_attempts` failures.
    ///
    /// `jitter` is the random draw in [0, 1]. Rate-limited failures get the
    /// extra fixed delay plus a second jitter slice on top of the ordinary
    /// backoff, so they always wait strictly longer.
    pub fn backoff_delay(
        &self,
        failed_attempts: u32,
        error: &DownloadError,
        jitter: f64,
    ) -> Duration {
        let jitter = jitter.clamp(0.0, 1.0);
        let ordinary = self.base_delay * failed_attempts + self.max_jitter.mul_f64(jitter);
        if error.is_rate_limited() {
            ordinary + self.rate_limit_delay + self.max_jitter.mul_f64(jitter)
        } else {
            ordinary
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&DownloaderConfig::default())
    }
}

/// Retry progress
#[derive(Debug)]
pub enum RetryState {
    Attempting { attempt: u32 },
    BackingOff { next_attempt: u32, delay: Duration },
    Succeeded { attempts: u32 },
    Exhausted { last_error: DownloadError },
}

impl RetryState {
    pub fn start() -> Self {
        Self::Attempting { attempt: 1 }
    }

    /// Transition after a successful attempt.
    pub fn on_success(self) -> Self {
        match self {
            Self::Attempting { attempt } => Self::Succeeded { attempts: attempt },
            other => other,
        }
    }

    /// Transition after a failed attempt: either schedule a backoff or give
    /// up carrying the last error unchanged.
    pub fn on_failure(self, policy: &RetryPolicy, error: DownloadError, jitter: f64) -> Self {
        match self {
            Self::Attempting { attempt } => {
                if attempt >= policy.max_attempts {
                    Self::Exhausted { last_error: error }
                } else {
                    Self::BackingOff {
                        next_attempt: attempt + 1,
                        delay: policy.backoff_delay(attempt, &error, jitter),
                    }
                }
            }
            other => other,
        }
    }

    /// Transition out of a backoff once the delay elapsed.
    pub fn resume(self) -> Self {
        match self {
            Self::BackingOff { next_attempt, .. } => Self::Attempting {
                attempt: next_attempt,
            },
            other => other,
        }
    }
}

pub struct RetryingExecutor {
    policy: RetryPolicy,
}

impl RetryingExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Run `operation` until it succeeds or the policy is exhausted. The
    /// closure receives a fresh user agent on every attempt.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T, DownloadError>
    where
        F: FnMut(RetryAttempt) -> Fut,
        Fut: Future<Output = Result<T, DownloadError>>,
    {
        let mut state = RetryState::start();

        loop {
            state = match state {
                RetryState::Attempting { attempt } => {
                    let request = RetryAttempt {
                        number: attempt,
                        user_agent: random_user_agent(),
                    };
                    match operation(request).await {
                        Ok(value) => return Ok(value),
                        Err(error) => {
                            log::warn!(
                                "attempt {}/{} failed: {}",
                                attempt,
                                self.policy.max_attempts,
                                error
                            );
                            let jitter = rand::thread_rng().gen_range(0.0..1.0);
                            RetryState::Attempting { attempt }.on_failure(
                                &self.policy,
                                error,
                                jitter,
                            )
                        }
                    }
                }
                RetryState::BackingOff {
                    next_attempt,
                    delay,
                } => {
                    log::debug!(
                        "backing off {:?} before attempt {}",
                        delay,
                        next_attempt
                    );
                    tokio::time::sleep(delay).await;
                    RetryState::BackingOff {
                        next_attempt,
                        delay,
                    }
                    .resume()
                }
                RetryState::Exhausted { last_error } => return Err(last_error),
                RetryState::Succeeded { .. } => {
                    // The driver returns on Ok before reaching this state
                    return Err(DownloadError::Unknown("retry driver left in terminal state".to_string()));
                }
            };
        }
    }
}
