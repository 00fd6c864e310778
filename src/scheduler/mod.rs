use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use rand::Rng;

use crate::error::TimerError;

mod handle;
pub use handle::TimerHandle;
use handle::TimerCallback;

/// Cooperative countdown timer scheduler.
///
/// Owns a registry of live [`TimerHandle`]s and advances all of them in one
/// pass whenever [`tick`](TimerScheduler::tick) is called with the seconds
/// elapsed since the previous call. Timers whose duration is reached during
/// a tick fire their callback within that tick and are dropped from the
/// registry; the relative firing order of timers expiring in the same tick
/// is unspecified.
///
/// Cloning is cheap and every clone drives the same registry.
#[derive(Clone)]
pub struct TimerScheduler {
    inner: Arc<Mutex<SchedulerInner>>,
}

struct SchedulerInner {
    timer_id_seq: u64,
    timers: HashMap<u64, TimerHandle>,
}

impl SchedulerInner {
    fn new() -> Self {
        Self {
            timer_id_seq: 0,
            timers: HashMap::new(),
        }
    }

    fn register(&mut self, seconds: f32, callback: TimerCallback) -> TimerHandle {
        self.timer_id_seq += 1;

        let id = self.timer_id_seq;
        let handle = TimerHandle::new(id, seconds, callback);

        self.timers.insert(id, handle.clone());
        log::debug!("start timer {} ({:.3}s)", id, handle.duration());

        handle
    }

    fn cancel_all(&mut self) {
        for handle in self.timers.values() {
            handle.cancel();
        }
        self.timers.clear();
    }
}

impl Drop for SchedulerInner {
    fn drop(&mut self) {
        // Handles retained by callers must stop reporting active and release
        // their callback captures once the scheduler is gone.
        self.cancel_all();
    }
}

impl TimerScheduler {
    /// Create a scheduler driven by explicit [`tick`](TimerScheduler::tick)
    /// calls from the host's update loop or a test harness.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(SchedulerInner::new())),
        }
    }

    /// Create a scheduler driven by a background thread that measures real
    /// elapsed time and ticks the registry every `tick_interval`.
    ///
    /// The thread exits once the last scheduler clone is dropped.
    pub fn spawn(tick_interval: Duration) -> Self {
        let scheduler = Self::new();

        let inner = Arc::clone(&scheduler.inner);

        std::thread::spawn(move || {
            let mut last = Instant::now();

            // When no other strong reference is alive, stop the tick thread
            while Arc::strong_count(&inner) > 1 {
                let now = Instant::now();
                let dt = now.duration_since(last).as_secs_f32();
                last = now;

                tick_registry(&inner, dt);

                std::thread::sleep(tick_interval);
            }
        });

        scheduler
    }

    /// Start a countdown of `seconds` (sign-flipped if negative) and return
    /// its handle. The timer is live the instant this call returns and
    /// `callback` fires exactly once, inside the tick that reaches the
    /// duration.
    pub fn start_timer<F>(&self, seconds: f32, callback: F) -> TimerHandle
    where
        F: FnOnce() + Send + 'static,
    {
        self.inner
            .lock()
            .unwrap()
            .register(seconds, Box::new(callback))
    }

    /// Start a countdown with a duration drawn uniformly from
    /// `[min_seconds, max_seconds)`.
    ///
    /// Fails with [`TimerError::InvalidArgument`] if either bound is
    /// non-positive or `min_seconds >= max_seconds`; no timer is started in
    /// that case.
    pub fn start_random_timer<F>(
        &self,
        min_seconds: f32,
        max_seconds: f32,
        callback: F,
    ) -> Result<TimerHandle, TimerError>
    where
        F: FnOnce() + Send + 'static,
    {
        if min_seconds >= max_seconds || min_seconds <= 0.0 || max_seconds <= 0.0 {
            return Err(TimerError::InvalidArgument {
                min: min_seconds,
                max: max_seconds,
            });
        }

        let seconds = rand::rng().random_range(min_seconds..max_seconds);

        Ok(self.start_timer(seconds, callback))
    }

    /// Cancel the timer behind `handle` and drop it from the registry. Its
    /// callback is guaranteed not to fire afterwards.
    ///
    /// Returns `false` without side effects if the handle is not currently
    /// tracked here: already finished, already stopped, or minted by a
    /// different scheduler.
    pub fn stop_timer(&self, handle: &TimerHandle) -> bool {
        let mut inner = self.inner.lock().unwrap();

        let tracked = inner
            .timers
            .get(&handle.id())
            .is_some_and(|entry| entry.shares_state_with(handle));
        if !tracked {
            return false;
        }

        if let Some(entry) = inner.timers.remove(&handle.id()) {
            entry.cancel();
            log::debug!("stop timer {}", handle.id());
        }

        true
    }

    /// Cancel every tracked timer and clear the registry. None of their
    /// callbacks fire afterwards. No-op with zero active timers.
    pub fn stop_all_timers(&self) {
        let mut inner = self.inner.lock().unwrap();

        if !inner.timers.is_empty() {
            log::debug!("stop all timers ({})", inner.timers.len());
        }

        inner.cancel_all();
    }

    /// Advance every live timer by `dt` seconds, firing callbacks for the
    /// ones that complete and dropping finished entries from the registry.
    ///
    /// This is the sole mutation path for timer progress. Callbacks run
    /// synchronously inside this call and may start or stop timers; timers
    /// started during a tick are first advanced on the next one.
    pub fn tick(&self, dt: f32) {
        tick_registry(&self.inner, dt);
    }

    /// Number of timers currently tracked in the registry.
    pub fn timer_count(&self) -> usize {
        self.inner.lock().unwrap().timers.len()
    }
}

impl Default for TimerScheduler {
    fn default() -> Self {
        Self::new()
    }
}

fn tick_registry(inner: &Arc<Mutex<SchedulerInner>>, dt: f32) {
    // Snapshot the live handles so callbacks can re-enter the scheduler
    // without deadlocking on the registry lock.
    let live: Vec<TimerHandle> = inner.lock().unwrap().timers.values().cloned().collect();

    let mut finished = Vec::new();
    for handle in live {
        if handle.advance(dt) {
            log::debug!("timer {} finished", handle.id());
            finished.push(handle);
        }
    }

    if !finished.is_empty() {
        let mut inner = inner.lock().unwrap();
        for handle in finished {
            inner.timers.remove(&handle.id());
        }
    }
}

/// Access the process-wide scheduler instance.
///
/// Created on first use and driven by a background thread ticking every
/// 10ms. Hosts with their own update loop should prefer a dedicated
/// [`TimerScheduler::new`] ticked explicitly.
pub fn global_scheduler() -> &'static TimerScheduler {
    use once_cell::sync::OnceCell;

    static INSTANCE: OnceCell<TimerScheduler> = OnceCell::new();

    INSTANCE.get_or_init(|| TimerScheduler::spawn(Duration::from_millis(10)))
}
