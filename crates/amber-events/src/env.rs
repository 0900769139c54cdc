//! Collaborator traits the scheduler drives.
//!
//! The scheduler core is single threaded and never blocks: the vsync producer
//! and the coprocessor are polled through these traits at defined points, and
//! "waiting" is realized by returning early from the advance loop. One
//! integration object usually implements all of them; [`EventEnv`] bundles
//! the full set for `&mut dyn` use.

use crate::handler::{PrimaryHandler, SecondaryHandler};
use crate::scheduler::EventCore;

/// Result of polling the vsync producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VsyncStatus {
    /// The frame's vsync has completed.
    Done,
    /// Still waiting for vsync.
    NotDone,
    /// No vsync thread is running; the caller must fall back to scanline
    /// polling.
    NoThread,
}

/// Dispatch surface for event handlers.
///
/// Handlers receive the scheduler core so they can re-arm slots and schedule
/// follow-up events. A fired primary slot stays active with a stale due-time
/// unless its handler re-arms or disarms it; every primary handler must do
/// one or the other before returning.
pub trait EventSink {
    fn primary(&mut self, core: &mut EventCore, handler: PrimaryHandler);

    fn secondary(&mut self, core: &mut EventCore, handler: SecondaryHandler, data: u32);

    /// Ask the CPU loop to leave its fast cycle path and re-check events.
    fn request_special_check(&mut self) {}
}

/// Vsync producer interface.
pub trait VsyncDevice {
    /// Whether the chipset is currently driving vsync at all. When it is
    /// not, every vsync-gated wait resets to idle unconditionally.
    fn chipset_vsync_active(&self) -> bool;

    fn vsync_status(&mut self) -> VsyncStatus;

    fn clear_vsync(&mut self);

    /// Notification that a vsync-related wait completed. The sync-line state
    /// has already been reset to idle when this is called.
    fn vsync_event_done(&mut self);
}

/// Display beam position query.
pub trait DisplayDevice {
    /// Current display scanline; negative means unknown.
    fn current_scanline(&self) -> i32;
}

/// Audio output interface.
pub trait AudioDevice {
    /// Drain queued samples so audio never blocks on a stalled wait.
    fn finish_pull(&mut self);
}

/// Secondary coprocessor board execution hooks.
///
/// The defaults describe a machine without a coprocessor; the scheduler only
/// invokes the step methods while a sync-line wait is unsatisfied, and only
/// when the `coprocessor` cargo feature is enabled.
pub trait CoprocessorDevice {
    fn running(&self) -> bool {
        false
    }

    /// Run a short bounded burst of coprocessor execution.
    fn execute_quick(&mut self) {}

    /// Run coprocessor execution until its next internal check point.
    fn execute_check(&mut self) {}
}

/// Host time source for deadline-based waits.
pub trait TimeDevice {
    /// Coarse processor-time tick, in the same unit as the vsync pacing
    /// deadlines.
    fn processor_time(&self) -> i32;

    /// High-resolution monotonic time in microseconds.
    fn highres_time_us(&self) -> i64;
}

/// Everything the advance loop needs from the embedding machine.
pub trait EventEnv:
    EventSink + VsyncDevice + DisplayDevice + AudioDevice + CoprocessorDevice + TimeDevice
{
}

impl<T> EventEnv for T where
    T: EventSink + VsyncDevice + DisplayDevice + AudioDevice + CoprocessorDevice + TimeDevice
{
}
