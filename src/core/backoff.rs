//! Backoff timer driving the wait between request attempts

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::{sleep_until, Instant};

/// Longest wait any setting may describe: one day
pub const MAX_INTERVAL_SECS: f64 = 86_400.0;

/// Convert seconds to a `Duration`, saturating at [`MAX_INTERVAL_SECS`].
///
/// NaN and negative values become zero.
pub fn duration_from_secs(secs: f64) -> Duration {
    if secs.is_nan() {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(secs.clamp(0.0, MAX_INTERVAL_SECS))
}

/// Shape of the backoff curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BackoffSettings {
    /// First interval, in seconds
    pub initial_secs: f64,
    /// Growth factor applied after every retry
    pub multiplier: f64,
    /// Ceiling for any interval, in seconds
    pub max_secs: f64,
    /// Relative jitter; 0.23 spreads an interval over [0.77, 1.23] of its base
    pub jitter: f64,
}

impl Default for BackoffSettings {
    fn default() -> Self {
        Self {
            initial_secs: 1.0,
            multiplier: 1.6,
            max_secs: 120.0,
            jitter: 0.23,
        }
    }
}

impl BackoffSettings {
    /// Settings without randomness, mostly for tests
    pub fn fixed(initial_secs: f64, multiplier: f64, max_secs: f64) -> Self {
        Self {
            initial_secs,
            multiplier,
            max_secs,
            jitter: 0.0,
        }
    }

    fn cap(&self) -> Duration {
        duration_from_secs(self.max_secs)
    }
}

/// Retry state of one in-flight request.
///
/// Owned by a single call and dropped when that call returns. Intervals
/// never shrink from one retry to the next and never exceed the cap.
#[derive(Debug)]
pub struct BackoffTimer {
    settings: BackoffSettings,
    num_retries: u32,
    base: f64,
    interval: Duration,
    deadline: Instant,
}

impl BackoffTimer {
    /// Start a timer whose first deadline is one (jittered) initial interval away
    pub fn new(settings: BackoffSettings) -> Self {
        let base = settings.initial_secs.clamp(0.0, MAX_INTERVAL_SECS);
        let interval = jittered(&settings, base).min(settings.cap());
        Self {
            settings,
            num_retries: 0,
            base,
            interval,
            deadline: Instant::now() + interval,
        }
    }

    /// Time left until the current deadline, zero once it has passed
    pub fn time_until_deadline(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Sleeps completed so far
    pub fn num_retries(&self) -> u32 {
        self.num_retries
    }

    /// Interval that produced the current deadline
    pub fn current_interval(&self) -> Duration {
        self.interval
    }

    /// Suspend until the deadline, then arm the next, longer interval
    pub async fn sleep_until_deadline(&mut self) {
        sleep_until(self.deadline).await;

        self.base = (self.base * self.settings.multiplier)
            .min(self.settings.max_secs)
            .min(MAX_INTERVAL_SECS);
        let next = jittered(&self.settings, self.base);
        self.interval = next.clamp(self.interval, self.settings.cap().max(self.interval));
        self.deadline = Instant::now() + self.interval;
        self.num_retries += 1;
    }
}

fn jittered(settings: &BackoffSettings, base: f64) -> Duration {
    let factor = if settings.jitter > 0.0 {
        1.0 + settings.jitter * rand::thread_rng().gen_range(-1.0..=1.0)
    } else {
        1.0
    };
    duration_from_secs(base * factor)
}
