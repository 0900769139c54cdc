//! Fixed table of hardware-line events.

use crate::clock::CycleTime;
use crate::handler::PrimaryHandler;

/// Slot indices of the primary event table. The order is load bearing:
/// events due on the same cycle fire in slot order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimarySlot {
    Cia,
    Audio,
    Misc,
    Hsync,
}

impl PrimarySlot {
    pub const COUNT: usize = 4;

    pub const ALL: [PrimarySlot; PrimarySlot::COUNT] = [
        PrimarySlot::Cia,
        PrimarySlot::Audio,
        PrimarySlot::Misc,
        PrimarySlot::Hsync,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }
}

/// One hardware-line event slot.
///
/// Slots are registered once at machine start and toggled active/inactive by
/// their owning subsystem; the advance loop fires a slot exactly when its
/// due-time equals the current cycle count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimaryEvent {
    pub active: bool,
    /// Absolute cycle time the slot fires at.
    pub evtime: CycleTime,
    /// Cycle time the slot was last armed at.
    pub oldcycles: CycleTime,
    pub handler: Option<PrimaryHandler>,
}

impl PrimaryEvent {
    pub const fn idle(handler: Option<PrimaryHandler>) -> Self {
        Self {
            active: false,
            evtime: 0,
            oldcycles: 0,
            handler,
        }
    }
}
