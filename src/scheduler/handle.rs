use std::fmt;
use std::sync::{Arc, Mutex};

/// Completion callback, invoked at most once when a timer's duration elapses.
pub(crate) type TimerCallback = Box<dyn FnOnce() + Send + 'static>;

/// Progress state of one countdown, shared between the scheduler's registry
/// entry and every clone of the public handle.
struct TimerState {
    duration: f32,
    elapsed: f32,
    remaining: f32,
    completed_fraction: f32,
    completed: bool,
    active: bool,
    callback: Option<TimerCallback>,
}

impl TimerState {
    fn new(duration: f32, callback: TimerCallback) -> Self {
        Self {
            // Negative input is sign-flipped, never stored negative
            duration: duration.abs(),
            elapsed: 0.0,
            remaining: 0.0,
            completed_fraction: 0.0,
            completed: false,
            active: true,
            callback: Some(callback),
        }
    }

    /// Deactivate and drop the callback without invoking it. Idempotent, safe
    /// after completion.
    fn cancel(&mut self) {
        self.active = false;
        self.callback = None;
    }

    /// Accumulate `dt` seconds of progress and recompute the derived fields.
    ///
    /// Returns whether the timer just finished, plus the callback to invoke
    /// once the state lock has been released.
    fn step(&mut self, dt: f32) -> (bool, Option<TimerCallback>) {
        if !self.active || self.completed {
            // Stale handle: a cancelled or finished timer never makes
            // further progress.
            self.cancel();
            return (true, None);
        }

        self.elapsed += dt;
        self.remaining = (self.duration - self.elapsed).clamp(0.0, self.duration);

        // Completion is checked only after accumulating the full delta, so a
        // timer fires late by up to one tick, never early.
        if self.elapsed >= self.duration {
            self.completed = true;
            self.completed_fraction = 1.0;
            let callback = self.callback.take();
            self.active = false;
            (true, callback)
        } else {
            self.completed_fraction = self.elapsed / self.duration;
            (false, None)
        }
    }
}

/// Read-only view over one running or finished countdown timer.
///
/// Handles are created by [`TimerScheduler::start_timer`] and stay valid
/// after the timer finishes or is stopped; the accessors keep reporting the
/// final state. A handle cannot be cancelled directly, only through the
/// scheduler that created it.
///
/// [`TimerScheduler::start_timer`]: crate::TimerScheduler::start_timer
#[derive(Clone)]
pub struct TimerHandle {
    id: u64,
    state: Arc<Mutex<TimerState>>,
}

impl TimerHandle {
    pub(crate) fn new(id: u64, duration: f32, callback: TimerCallback) -> Self {
        Self {
            id,
            state: Arc::new(Mutex::new(TimerState::new(duration, callback))),
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// Identity check: true only for clones viewing the same timer state.
    pub(crate) fn shares_state_with(&self, other: &TimerHandle) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }

    /// Advance this timer by `dt` seconds, firing the completion callback if
    /// the duration is reached. Returns whether the timer is finished and
    /// should be dropped from the registry.
    ///
    /// The callback runs synchronously here, after the state lock is
    /// released, so it may re-enter the scheduler.
    pub(crate) fn advance(&self, dt: f32) -> bool {
        let (finished, callback) = self.state.lock().unwrap().step(dt);
        if let Some(callback) = callback {
            callback();
        }
        finished
    }

    pub(crate) fn cancel(&self) {
        self.state.lock().unwrap().cancel();
    }

    /// Total duration in seconds, fixed at creation.
    pub fn duration(&self) -> f32 {
        self.state.lock().unwrap().duration
    }

    /// Seconds accumulated so far. Monotonically non-decreasing.
    pub fn elapsed(&self) -> f32 {
        self.state.lock().unwrap().elapsed
    }

    /// Seconds left until completion, always within `[0, duration]`.
    pub fn remaining(&self) -> f32 {
        self.state.lock().unwrap().remaining
    }

    /// Completion fraction in `[0, 1]`; exactly `1.0` once completed.
    pub fn completed_fraction(&self) -> f32 {
        self.state.lock().unwrap().completed_fraction
    }

    /// True once the timer has reached its duration. Never reverts.
    pub fn is_completed(&self) -> bool {
        self.state.lock().unwrap().completed
    }

    /// True from creation until completion or cancellation.
    pub fn is_active(&self) -> bool {
        self.state.lock().unwrap().active
    }
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock().unwrap();
        f.debug_struct("TimerHandle")
            .field("id", &self.id)
            .field("duration", &state.duration)
            .field("elapsed", &state.elapsed)
            .field("completed", &state.completed)
            .field("active", &state.active)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    fn counting_handle(duration: f32) -> (TimerHandle, Arc<AtomicUsize>) {
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_in_callback = fired.clone();
        let handle = TimerHandle::new(
            1,
            duration,
            Box::new(move || {
                fired_in_callback.fetch_add(1, Ordering::SeqCst);
            }),
        );
        (handle, fired)
    }

    #[test]
    fn fresh_handle_state() {
        let (handle, fired) = counting_handle(2.0);

        assert_eq!(handle.duration(), 2.0);
        assert_eq!(handle.elapsed(), 0.0);
        assert_eq!(handle.completed_fraction(), 0.0);
        assert!(handle.is_active());
        assert!(!handle.is_completed());
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn negative_duration_is_normalized() {
        let (handle, _fired) = counting_handle(-3.0);
        assert_eq!(handle.duration(), 3.0);
    }

    #[test]
    fn partial_advance_updates_progress() {
        let (handle, fired) = counting_handle(2.0);

        assert!(!handle.advance(0.5));
        assert_eq!(handle.elapsed(), 0.5);
        assert_eq!(handle.remaining(), 1.5);
        assert_eq!(handle.completed_fraction(), 0.25);
        assert!(handle.is_active());
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn completes_when_elapsed_reaches_duration() {
        let (handle, fired) = counting_handle(2.0);

        assert!(!handle.advance(1.0));
        assert!(handle.advance(1.0));

        assert!(handle.is_completed());
        assert!(!handle.is_active());
        assert_eq!(handle.completed_fraction(), 1.0);
        assert_eq!(handle.remaining(), 0.0);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn zero_duration_completes_on_first_advance() {
        let (handle, fired) = counting_handle(0.0);

        assert!(handle.advance(0.0));
        assert!(handle.is_completed());
        assert_eq!(handle.completed_fraction(), 1.0);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn overshoot_is_clamped() {
        let (handle, fired) = counting_handle(1.0);

        assert!(handle.advance(5.0));
        assert_eq!(handle.remaining(), 0.0);
        assert_eq!(handle.completed_fraction(), 1.0);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cancel_prevents_callback() {
        let (handle, fired) = counting_handle(1.0);

        handle.cancel();
        assert!(!handle.is_active());

        // Erroneous advance after cancellation must not fire the callback.
        assert!(handle.advance(10.0));
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn cancel_is_idempotent() {
        let (handle, fired) = counting_handle(1.0);

        handle.cancel();
        handle.cancel();
        assert!(!handle.is_active());

        let (completed, fired_completed) = counting_handle(0.5);
        assert!(completed.advance(0.5));
        completed.cancel();
        assert!(completed.is_completed());
        assert_eq!(fired_completed.load(Ordering::SeqCst), 1);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn advancing_finished_handle_is_noop() {
        let (handle, fired) = counting_handle(1.0);

        assert!(handle.advance(1.0));
        assert!(handle.advance(1.0));

        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(handle.completed_fraction(), 1.0);
        assert_eq!(handle.remaining(), 0.0);
    }

    #[test]
    fn progress_stays_in_bounds() {
        let (handle, _fired) = counting_handle(1.0);

        for _ in 0..10 {
            handle.advance(0.3);
            let remaining = handle.remaining();
            let fraction = handle.completed_fraction();
            assert!((0.0..=1.0).contains(&remaining));
            assert!((0.0..=1.0).contains(&fraction));
        }
    }
}
