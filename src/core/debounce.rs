//! Debounced filter recomputation - coalesces bursts of change notifications.
//!
//! Playhead movement fires change events far faster than the list needs to
//! refilter. Instead of recomputing per event:
//! 1. `mark_dirty()` records that a recompute is wanted and arms the window
//! 2. `tick()` in the update loop fires at most once per window
//!
//! Some triggers (first activation of the seek-bar filter) also run one
//! immediate recompute via `run_now()` to avoid a visible one-frame lag;
//! the pending flag is cleared by whichever path executes first so the
//! debounced tick never double-applies an already-satisfied request.

use std::time::{Duration, Instant};

/// Debouncer with a fixed coalescing window (default 100 ms).
#[derive(Debug, Clone)]
pub struct FilterDebouncer {
    /// Coalescing window length
    window: Duration,
    /// When the armed window expires (None = idle)
    deadline: Option<Instant>,
    /// A recompute has been requested and not yet satisfied
    dirty: bool,
}

impl Default for FilterDebouncer {
    fn default() -> Self {
        Self::new(100)
    }
}

impl FilterDebouncer {
    /// Create with custom window length
    pub fn new(window_ms: u64) -> Self {
        Self {
            window: Duration::from_millis(window_ms),
            deadline: None,
            dirty: false,
        }
    }

    /// Current window length in milliseconds
    pub fn window_ms(&self) -> u64 {
        self.window.as_millis() as u64
    }

    /// Request a recompute. Arms a new window when idle; requests arriving
    /// inside an armed window coalesce into the pending one.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
        if self.deadline.is_none() {
            self.deadline = Some(Instant::now() + self.window);
            log::trace!(
                "FilterDebouncer: window armed for {}ms",
                self.window.as_millis()
            );
        }
    }

    /// True while a request is pending.
    pub fn is_pending(&self) -> bool {
        self.dirty
    }

    /// Drop any pending request.
    pub fn cancel(&mut self) {
        if self.dirty {
            log::trace!("FilterDebouncer: cancelled pending recompute");
        }
        self.dirty = false;
        self.deadline = None;
    }

    /// Record that an immediate recompute was just executed out-of-band.
    /// Clears the pending flag so the armed window fires as a no-op.
    pub fn run_now(&mut self) {
        self.dirty = false;
    }

    /// Check whether the debounced recompute should run now.
    /// Returns true at most once per armed window, and only while dirty.
    pub fn tick(&mut self) -> bool {
        let Some(deadline) = self.deadline else {
            return false;
        };
        if Instant::now() < deadline {
            return false;
        }
        self.deadline = None;
        if self.dirty {
            self.dirty = false;
            log::trace!("FilterDebouncer: triggering recompute");
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_trigger_before_window() {
        let mut deb = FilterDebouncer::new(100);
        deb.mark_dirty();
        assert!(deb.is_pending());
        assert!(!deb.tick(), "must not fire inside the window");
    }

    #[test]
    fn test_burst_collapses_to_one() {
        let mut deb = FilterDebouncer::new(10);
        for _ in 0..50 {
            deb.mark_dirty();
        }
        std::thread::sleep(Duration::from_millis(15));
        let mut fired = 0;
        for _ in 0..10 {
            if deb.tick() {
                fired += 1;
            }
        }
        assert_eq!(fired, 1, "burst within one window fires exactly once");
    }

    #[test]
    fn test_spaced_requests_each_fire() {
        let mut deb = FilterDebouncer::new(10);
        let mut fired = 0;
        for _ in 0..3 {
            deb.mark_dirty();
            std::thread::sleep(Duration::from_millis(15));
            if deb.tick() {
                fired += 1;
            }
        }
        assert_eq!(fired, 3, "requests spaced past the window fire individually");
    }

    #[test]
    fn test_run_now_prevents_double_apply() {
        let mut deb = FilterDebouncer::new(10);
        deb.mark_dirty();
        // Immediate path satisfied the request
        deb.run_now();
        std::thread::sleep(Duration::from_millis(15));
        assert!(!deb.tick(), "satisfied request must not re-fire on tick");
    }

    #[test]
    fn test_idle_request_starts_new_window() {
        let mut deb = FilterDebouncer::new(10);
        deb.mark_dirty();
        std::thread::sleep(Duration::from_millis(15));
        assert!(deb.tick());
        // Second round after going idle
        deb.mark_dirty();
        assert!(!deb.tick(), "fresh window must not fire immediately");
        std::thread::sleep(Duration::from_millis(15));
        assert!(deb.tick());
    }
}
