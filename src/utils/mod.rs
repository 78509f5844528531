/// Shared helpers
pub mod backoff;

pub use backoff::BackoffConfig;
