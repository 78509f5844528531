/// Exponential backoff between conflicting write attempts
use rand::Rng;
use std::time::Duration;

/// Configuration for a backoff sequence
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffConfig {
    pub initial: Duration,
    pub factor: f64,
    pub max: Duration,
    /// Fraction of each delay added as random jitter (0.0 disables it)
    pub jitter: f64,
}

impl BackoffConfig {
    /// Create a new backoff configuration without jitter
    pub fn new(initial: Duration, factor: f64, max: Duration) -> Self {
        Self {
            initial,
            factor,
            max,
            jitter: 0.0,
        }
    }

    /// Add proportional jitter to every delay
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    /// Start a fresh delay sequence
    pub fn start(&self) -> Backoff {
        Backoff {
            config: self.clone(),
            next: self.initial.min(self.max),
        }
    }
}

/// A running backoff sequence
///
/// Each call to [`Backoff::next_delay`] returns the current delay and grows
/// the next one by `factor`, never beyond `max`.
pub struct Backoff {
    config: BackoffConfig,
    next: Duration,
}

impl Backoff {
    /// Delay before the next attempt, without jitter
    pub fn next_base_delay(&mut self) -> Duration {
        let current = self.next;
        let grown = scale(current, self.config.factor.max(1.0));
        self.next = grown.min(self.config.max);
        current
    }

    /// Delay before the next attempt, with jitter applied
    pub fn next_delay(&mut self) -> Duration {
        let base = self.next_base_delay();
        if self.config.jitter <= 0.0 || base.is_zero() {
            return base;
        }
        let extra = rand::thread_rng().gen_range(0.0..=self.config.jitter);
        base + scale(base, extra)
    }

    /// Sleep for the next delay
    pub async fn wait(&mut self) {
        let delay = self.next_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Multiply a duration at nanosecond precision, saturating on overflow
fn scale(duration: Duration, factor: f64) -> Duration {
    Duration::from_nanos((duration.as_nanos() as f64 * factor) as u64)
}
