use serde::Serialize;

use crate::error::ConfigurationError;

/// Wraps any signed index into `0..len`.
///
/// `len` must be non-zero.
pub fn wrap_index(index: i64, len: usize) -> usize {
    debug_assert!(len > 0, "cannot wrap into an empty range");
    let len = len as i64;
    (((index % len) + len) % len) as usize
}

/// Number of steps of state kept in the ping-pong ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct HistoryDepth(usize);

impl HistoryDepth {
    pub fn new(depth: usize) -> Result<Self, ConfigurationError> {
        if depth == 0 {
            return Err(ConfigurationError::HistoryTooShallow { depth, required: 1 });
        }
        Ok(Self(depth))
    }

    pub fn get(self) -> usize {
        self.0
    }

    /// Ring slot holding the state `offset` ticks before `tick`.
    pub fn slot(self, tick: i64, offset: usize) -> usize {
        // only the offset's residue matters, and it always fits in an i64
        let offset = (offset % self.0) as i64;
        wrap_index(tick.saturating_sub(offset), self.0)
    }

    /// Rejects reads that would reach past the oldest kept step, `lag` being
    /// how many of the newest slots are still being written.
    ///
    /// The error is the depth that would be needed, saturating at `usize::MAX`.
    pub fn check_offset(self, offset: usize, lag: usize) -> Result<(), usize> {
        let required = offset
            .checked_add(lag)
            .and_then(|reach| reach.checked_add(1))
            .unwrap_or(usize::MAX);
        if required > self.0 {
            Err(required)
        } else {
            Ok(())
        }
    }
}
