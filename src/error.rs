//! Error types for scheduler operations

use thiserror::Error;

/// Errors reported synchronously by [`TimerScheduler`](crate::TimerScheduler)
/// operations. No timer is constructed or registered when one of these is
/// returned.
#[derive(Debug, Error, PartialEq)]
pub enum TimerError {
    /// Random timer bounds must both be positive, with `min < max`.
    #[error("invalid random timer range [{min}, {max}): bounds must be positive and min < max")]
    InvalidArgument { min: f32, max: f32 },
}
