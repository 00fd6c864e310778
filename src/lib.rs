//! Cooperative countdown timer scheduler.
//!
//! A [`TimerScheduler`] tracks named countdown timers and advances all of
//! them whenever an external driver calls [`TimerScheduler::tick`] with the
//! seconds elapsed since the previous call. Each timer fires its completion
//! callback exactly once, exposes live progress through its [`TimerHandle`],
//! and can be cancelled individually or in bulk through the scheduler that
//! created it.
//!
//! Any tick source works: a render loop passing frame delta time, a fixed
//! interval thread, or a test harness. For hosts without their own loop,
//! [`TimerScheduler::spawn`] starts a background driver thread and
//! [`global_scheduler`] exposes a shared process-wide instance.
//!
//! ```
//! use tick_timer::TimerScheduler;
//!
//! let scheduler = TimerScheduler::new();
//! let handle = scheduler.start_timer(2.0, || println!("done"));
//!
//! scheduler.tick(1.0);
//! assert_eq!(handle.completed_fraction(), 0.5);
//! assert!(!handle.is_completed());
//!
//! scheduler.tick(1.0);
//! assert!(handle.is_completed());
//! ```

mod error;

/// Scheduler and handle implementation driven by an external tick source
pub mod scheduler;

pub use error::TimerError;
pub use scheduler::{global_scheduler, TimerHandle, TimerScheduler};
