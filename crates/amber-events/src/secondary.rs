//! One-shot delayed event pool.

use crate::clock::CycleTime;
use crate::handler::SecondaryHandler;

/// Total secondary slot count: the dedicated slots plus the wildcard pool.
pub const EV2_MAX: usize = 12;

/// Dedicated secondary slots. Everything from [`Event2Slot::Misc`] up is the
/// wildcard pool; the rotating allocation cursor wraps back to `Misc`, never
/// into the dedicated range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event2Slot {
    Blitter,
    Disk,
    Misc,
}

impl Event2Slot {
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// First slot of the wildcard pool.
pub(crate) const EV2_POOL_START: usize = Event2Slot::Misc.index();

/// One pooled one-shot event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecondaryEvent {
    pub active: bool,
    /// Absolute cycle time the event fires at.
    pub evtime: CycleTime,
    pub handler: Option<SecondaryHandler>,
    /// Payload passed back to the handler (an interrupt mask, a register
    /// value, a drive index, ...).
    pub data: u32,
}

impl SecondaryEvent {
    pub const fn idle() -> Self {
        Self {
            active: false,
            evtime: 0,
            handler: None,
            data: 0,
        }
    }
}
