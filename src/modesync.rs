//! Mode/flag synchronization for radio-style option groups.
//!
//! The view layer exposes each mode as an independent boolean toggle while
//! the engine keeps one authoritative enum value. Writing the enum updates
//! every flag, and flipping a flag updates the enum, which naively echoes
//! back as more flag changes. [`RadioSync`] breaks that loop with an
//! explicit lifecycle instead of scattered ad hoc guards:
//!
//! - `Uninitialized`: persisted state is being restored; all inputs ignored
//! - `Ready`: inputs are processed, idempotently (echoes of an already
//!   applied change report `Unchanged` and stop the cascade)
//! - `Synchronizing`: the engine is pushing flag writes out; any input
//!   arriving re-entrantly is ignored

/// Lifecycle of one synchronized option group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Uninitialized,
    Ready,
    Synchronizing,
}

/// What to do when the flag of the currently active mode is switched off.
#[derive(Debug, Clone, Copy)]
pub enum OffToggle<M> {
    /// The enum stays authoritative: the flag is re-asserted and nothing
    /// changes. Used for groups where "no mode" is itself a variant.
    SnapBack,
    /// Two-variant groups where exactly one flag must stay on: switching
    /// the active one off selects the other.
    Complement(fn(M) -> M),
}

/// Result of feeding one input to a [`RadioSync`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome<M> {
    /// The mode changed; the caller must push the new flag set out.
    Applied { old: M, new: M },
    /// The active flag was switched off under [`OffToggle::SnapBack`];
    /// the caller must re-assert the flags for the unchanged mode.
    Reasserted(M),
    /// Input matched current state (typically an echo). Nothing to do.
    Unchanged,
    /// Input arrived outside `Ready` and was dropped.
    Ignored,
}

/// One enum value kept in lockstep with its per-variant boolean flags.
#[derive(Debug, Clone)]
pub struct RadioSync<M: Copy + PartialEq> {
    mode: M,
    state: SyncState,
    off_toggle: OffToggle<M>,
}

impl<M: Copy + PartialEq + std::fmt::Debug> RadioSync<M> {
    pub fn new(initial: M, off_toggle: OffToggle<M>) -> Self {
        Self {
            mode: initial,
            state: SyncState::Uninitialized,
            off_toggle,
        }
    }

    pub fn mode(&self) -> M {
        self.mode
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Install the restored mode and start processing inputs.
    pub fn initialize(&mut self, mode: M) {
        self.mode = mode;
        self.state = SyncState::Ready;
    }

    /// Enter the re-entrancy guard while flag writes are being pushed out.
    pub fn begin_apply(&mut self) {
        debug_assert_eq!(self.state, SyncState::Ready);
        self.state = SyncState::Synchronizing;
    }

    /// Leave the re-entrancy guard.
    pub fn finish_apply(&mut self) {
        if self.state == SyncState::Synchronizing {
            self.state = SyncState::Ready;
        }
    }

    /// Authoritative enum write (settings restore echo, programmatic set).
    pub fn set_mode(&mut self, new: M) -> SyncOutcome<M> {
        if self.state != SyncState::Ready {
            return SyncOutcome::Ignored;
        }
        if new == self.mode {
            return SyncOutcome::Unchanged;
        }
        let old = self.mode;
        self.mode = new;
        log::debug!("mode changed: {:?} -> {:?}", old, new);
        SyncOutcome::Applied { old, new }
    }

    /// The flag belonging to `flag_mode` was switched on.
    pub fn flag_on(&mut self, flag_mode: M) -> SyncOutcome<M> {
        self.set_mode(flag_mode)
    }

    /// The flag belonging to `flag_mode` was switched off.
    pub fn flag_off(&mut self, flag_mode: M) -> SyncOutcome<M> {
        if self.state != SyncState::Ready {
            return SyncOutcome::Ignored;
        }
        if flag_mode != self.mode {
            // Stale echo from a flag we already turned off
            return SyncOutcome::Unchanged;
        }
        match self.off_toggle {
            OffToggle::SnapBack => SyncOutcome::Reasserted(self.mode),
            OffToggle::Complement(complement) => {
                let old = self.mode;
                let new = complement(old);
                self.mode = new;
                log::debug!("mode complemented: {:?} -> {:?}", old, new);
                SyncOutcome::Applied { old, new }
            }
        }
    }
}
