//! Simulation clock.
//!
//! The tick counter is the only notion of time the carrying subsystem has.
//! Cooldown expiry, attach ticks, agent ages and autosave scheduling are
//! all derived from it.

/// Errors that can occur during clock operations.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// Tick counter would overflow.
    #[error("tick counter overflow: cannot advance beyond u64::MAX")]
    TickOverflow,
}

/// Monotonic tick counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimClock {
    /// Current tick (0 before the first tick runs).
    tick: u64,
}

impl SimClock {
    /// Create a clock at tick 0.
    pub const fn new() -> Self {
        Self { tick: 0 }
    }

    /// Create a clock resumed at `tick` (used when restoring a save).
    pub const fn from_tick(tick: u64) -> Self {
        Self { tick }
    }

    /// Advance the clock by one tick. Returns the new tick number.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::TickOverflow`] if the tick counter would exceed
    /// `u64::MAX`.
    pub fn advance(&mut self) -> Result<u64, ClockError> {
        self.tick = self.tick.checked_add(1).ok_or(ClockError::TickOverflow)?;
        Ok(self.tick)
    }

    /// The current tick.
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Whether the current tick falls on a multiple of `interval`.
    ///
    /// An interval of 0 is never due.
    pub fn is_due(&self, interval: u64) -> bool {
        self.tick != 0 && self.tick.checked_rem(interval) == Some(0)
    }
}
