//! Identity watcher for externally-owned, non-notifying resources.
//!
//! The host does not reliably emit a "source replaced" event when the user
//! switches scenes, so the engine polls and compares the identity of the
//! current raw change source against the last one it subscribed to. This
//! compare-and-swap is generic so the same mechanism works for any resource
//! whose replacement is only observable by re-querying it.

/// Result of one identity observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEvent<K> {
    /// Same identity as last time (or still nothing). No action needed.
    Unchanged,
    /// First time an identity is seen after having none.
    Acquired(K),
    /// Identity changed while one was already held.
    Replaced { old: K, new: K },
    /// The resource disappeared (e.g. project closed).
    Lost(K),
}

/// Compare-and-swap watcher over an identity key.
///
/// Holds only the key, never the resource itself. `observe()` is idempotent:
/// feeding it the same identity twice reports `Unchanged` the second time.
#[derive(Debug, Clone, Default)]
pub struct IdentityWatch<K: PartialEq + Copy> {
    current: Option<K>,
}

impl<K: PartialEq + Copy> IdentityWatch<K> {
    pub fn new() -> Self {
        Self { current: None }
    }

    /// Identity currently held, if any.
    pub fn current(&self) -> Option<K> {
        self.current
    }

    /// Compare the observed identity against the held one and swap.
    pub fn observe(&mut self, seen: Option<K>) -> WatchEvent<K> {
        match (self.current, seen) {
            (None, None) => WatchEvent::Unchanged,
            (None, Some(new)) => {
                self.current = Some(new);
                WatchEvent::Acquired(new)
            }
            (Some(old), None) => {
                self.current = None;
                WatchEvent::Lost(old)
            }
            (Some(old), Some(new)) => {
                if old == new {
                    WatchEvent::Unchanged
                } else {
                    self.current = Some(new);
                    WatchEvent::Replaced { old, new }
                }
            }
        }
    }

    /// Drop the held identity without reporting a loss.
    pub fn reset(&mut self) {
        self.current = None;
    }
}
