//! Cycle-accurate event scheduling for the emulator core.
//!
//! # Design
//!
//! All emulated time is counted by a single [`CycleClock`]; every hardware
//! subsystem that needs to act at an exact cycle registers into one of two
//! event tables owned by [`EventCore`]:
//!
//! - a small fixed **primary table** of hardware-line events (horizontal
//!   sync, CIA timers, audio, the secondary-table pump), fired when the
//!   clock reaches their due-time during [`EventCore::advance`]; and
//! - a pooled **secondary table** of one-shot delayed callbacks with a
//!   32-bit payload (interrupt delivery, disk DMA, blitter completion,
//!   copper writes, ...), drained by the pump.
//!
//! The scheduler stores handler *identifiers* ([`PrimaryHandler`] /
//! [`SecondaryHandler`]) rather than callbacks; dispatch goes through the
//! [`EventSink`] trait implemented by the embedding machine. This keeps both
//! tables fully serializable for save/restore (`amber_savestate::SaveState`)
//! with handlers persisted as stable integer tags.
//!
//! CPU execution is paced by an admission budget and by the [`SyncLine`]
//! waiter, which gates cycle advancement on display beam positions or host
//! deadlines without ever blocking: an unsatisfied wait aborts the advance
//! early and the caller simply keeps invoking it.

mod clock;
mod env;
mod handler;
mod primary;
mod scheduler;
mod secondary;
mod snapshot;
mod syncline;

pub use clock::{CycleClock, CycleTime, CYCLE_UNIT};
pub use env::{
    AudioDevice, CoprocessorDevice, DisplayDevice, EventEnv, EventSink, TimeDevice, VsyncDevice,
    VsyncStatus,
};
pub use handler::{PrimaryHandler, SecondaryHandler};
pub use primary::{PrimaryEvent, PrimarySlot};
pub use scheduler::{CycleAccounting, EventCore, SchedulerConfig, BUDGET_NOJIT};
pub use secondary::{Event2Slot, SecondaryEvent, EV2_MAX};
pub use syncline::SyncLine;
