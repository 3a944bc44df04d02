//! Row-lock requests attached to load operations.

/// Lock strength requested for loaded rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockMode {
    /// No row locks
    #[default]
    None,
    /// Shared lock (other readers allowed)
    Share,
    /// Exclusive lock for update
    Update,
}

/// What to do when a requested row is already locked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockWait {
    /// Block until the lock is available
    #[default]
    Wait,
    /// Fail immediately
    NoWait,
    /// Skip locked rows
    SkipLocked,
}

/// Lock configuration carried by query options and batch loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LockOptions {
    mode: LockMode,
    wait: LockWait,
}

impl LockOptions {
    /// No locking at all.
    pub const fn none() -> Self {
        Self {
            mode: LockMode::None,
            wait: LockWait::Wait,
        }
    }

    /// Start from a lock mode with the default wait policy.
    pub const fn new(mode: LockMode) -> Self {
        Self {
            mode,
            wait: LockWait::Wait,
        }
    }

    /// Set the wait policy.
    #[must_use]
    pub const fn wait(mut self, wait: LockWait) -> Self {
        self.wait = wait;
        self
    }

    /// Requested lock mode.
    pub const fn mode(&self) -> LockMode {
        self.mode
    }

    /// Wait policy for contended rows.
    pub const fn wait_policy(&self) -> LockWait {
        self.wait
    }

    /// Does this request ask for any lock?
    pub const fn is_none(&self) -> bool {
        matches!(self.mode, LockMode::None)
    }
}
