//! Response timeout counter.
//!
//! Each transaction controller owns a `Timeout`. The controller enables
//! the counter while it's waiting on the remote peer, and holds it in
//! reset otherwise. Once the counter reaches [`TIMEOUT_CYCLES`], it stays
//! there until it's reset.
//!
//! ```
//! use usbll::timeout::{Timeout, TIMEOUT_CYCLES};
//!
//! let mut timeout = Timeout::new();
//! for _ in 1..TIMEOUT_CYCLES {
//!     assert!(!timeout.tick(true, false));
//! }
//! assert!(timeout.tick(true, false));
//! assert!(!timeout.tick(true, true));
//! ```

/// Number of enabled cycles before a timeout is signaled.
pub const TIMEOUT_CYCLES: u8 = 255;

/// A saturating, 8-bit cycle counter.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Timeout {
    count: u8,
}

impl Timeout {
    /// Create a counter that's cleared.
    pub const fn new() -> Self {
        Timeout { count: 0 }
    }

    /// Returns the number of enabled cycles counted since the last reset.
    pub const fn count(&self) -> u8 {
        self.count
    }

    /// Indicates if the counter reached its bound.
    pub const fn is_elapsed(&self) -> bool {
        self.count == TIMEOUT_CYCLES
    }

    /// Clear the count.
    pub fn reset(&mut self) {
        self.count = 0;
    }

    /// Advance the counter by one cycle.
    ///
    /// `reset` overrides `enable`. The count holds at the bound; it never wraps.
    /// Returns the timeout flag after the update.
    pub fn tick(&mut self, enable: bool, reset: bool) -> bool {
        if reset {
            self.count = 0;
        } else if enable && self.count < TIMEOUT_CYCLES {
            self.count += 1;
        }
        self.is_elapsed()
    }
}
