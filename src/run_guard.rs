use std::sync::atomic::{AtomicBool, Ordering};

/// Idle/running token owned by the caller, used to refuse a second
/// "scrape now" request while one is still in flight. The pipeline itself
/// does not consult it.
///
/// Long-lived hosts (a bot, a scheduler) share one guard between the tasks
/// that can trigger a run:
///
/// ```
/// use std::sync::Arc;
/// use rent_scout::ScrapeGuard;
///
/// let guard = Arc::new(ScrapeGuard::new());
/// let from_command = Arc::clone(&guard);
///
/// let token = guard.try_start().expect("idle");
/// assert!(from_command.try_start().is_none());
/// drop(token);
/// assert!(from_command.try_start().is_some());
/// ```
#[derive(Debug, Default)]
pub struct ScrapeGuard {
    running: AtomicBool,
}

impl ScrapeGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the guard. Returns `None` if a run is already in progress; the
    /// returned token releases the guard when dropped.
    pub fn try_start(&self) -> Option<RunToken<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunToken { guard: self })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

#[derive(Debug)]
pub struct RunToken<'a> {
    guard: &'a ScrapeGuard,
}

impl Drop for RunToken<'_> {
    fn drop(&mut self) {
        self.guard.running.store(false, Ordering::Release);
    }
}
