/// Optimistic read-modify-write against a versioned object store
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::MutateError;
use crate::k8s::store::ObjectStore;
use crate::utils::BackoffConfig;

/// Bounds on the conflict-retry loop
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: BackoffConfig,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: BackoffConfig) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Retry immediately; used where waiting buys nothing
    #[cfg(test)]
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(
            max_attempts,
            BackoffConfig::new(Duration::ZERO, 1.0, Duration::ZERO),
        )
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            5,
            BackoffConfig::new(Duration::from_millis(10), 2.0, Duration::from_secs(1))
                .with_jitter(0.1),
        )
    }
}

/// Applies a transform to the latest version of an object until a write sticks
#[derive(Debug, Clone, Default)]
pub struct OptimisticMutator {
    policy: RetryPolicy,
}

impl OptimisticMutator {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Read `name`, transform it and write it back
    ///
    /// Returns the stored object along with the output of the transform run
    /// that produced it. Only [`MutateError::VersionConflict`] from the write is retried, with a
    /// fresh read each time. Read failures and transform failures abort at
    /// once. After `max_attempts` conflicting writes the last conflict is
    /// returned inside [`MutateError::ExhaustedRetries`].
    pub async fn mutate<S, F, T>(
        &self,
        store: &S,
        name: &str,
        mut transform: F,
    ) -> Result<(S::Object, T), MutateError>
    where
        S: ObjectStore,
        F: FnMut(&mut S::Object) -> Result<T, MutateError>,
    {
        let mut backoff = self.policy.backoff.start();
        let mut attempt = 0;

        loop {
            attempt += 1;

            let mut object = store.get(name).await?;
            let output = transform(&mut object)?;

            match store.replace(name, &object).await {
                Ok(updated) => {
                    debug!(
                        "{} {} written on attempt {}",
                        store.kind(),
                        name,
                        attempt
                    );
                    return Ok((updated, output));
                }
                Err(err) if err.is_conflict() => {
                    if attempt >= self.policy.max_attempts {
                        return Err(MutateError::ExhaustedRetries {
                            kind: store.kind().to_string(),
                            name: name.to_string(),
                            attempts: attempt,
                            last: Box::new(err),
                        });
                    }
                    warn!(
                        "Conflict updating {} {} (attempt {}/{}), retrying",
                        store.kind(),
                        name,
                        attempt,
                        self.policy.max_attempts
                    );
                    backoff.wait().await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
