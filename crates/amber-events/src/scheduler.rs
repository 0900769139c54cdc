//! The scheduler context: cycle clock, both event tables, the sync-line
//! waiter and the cycle-admission budget.

use crate::clock::{CycleClock, CycleTime, CYCLE_UNIT};
use crate::env::{EventEnv, VsyncStatus};
use crate::handler::{PrimaryHandler, SecondaryHandler};
use crate::primary::{PrimaryEvent, PrimarySlot};
use crate::secondary::{Event2Slot, SecondaryEvent, EV2_MAX, EV2_POOL_START};
use crate::syncline::SyncLine;

/// Admission budget granted while a sync-line wait is unsatisfied and no JIT
/// is active: cycles drain in small bursts so the waiter is re-evaluated
/// often.
pub const BUDGET_NOJIT: i64 = 256 * CYCLE_UNIT as i64;

/// Budget pin used when a separate CPU thread runs the cycle loop; the fast
/// path must never absorb cycles in that mode.
const BUDGET_CPU_THREAD: i64 = 0x4000_0000;

/// Scheduler knobs owned by the embedding machine.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// CPU emulation runs on its own thread and performs its own cycle
    /// bookkeeping; disables the fast-path admission quota.
    pub cpu_thread: bool,
    /// A JIT is active, so check-ins are rare and the wait throttle can
    /// grant a larger quota.
    pub jit_active: bool,
    /// Admission budget granted by the wait throttle while the JIT is
    /// active.
    pub jit_budget: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            cpu_thread: false,
            jit_active: false,
            jit_budget: 1024 * CYCLE_UNIT as i64,
        }
    }
}

/// Cycle counters the CPU interface keeps across execution blocks. The
/// scheduler itself only stores and persists these; the CPU loop reads and
/// writes them while planning how many cycles to run before the next
/// mandatory check-in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleAccounting {
    pub event_cycles: u64,
    pub start_cycles: u64,
    pub cycles_to_next_event: i64,
    pub max_cycles_to_next_event: i64,
    pub cycles_to_hsync_event: i64,
}

/// Coprocessor stepping mode while a wait is unsatisfied.
#[derive(Clone, Copy)]
enum StepKind {
    Quick,
    Check,
}

/// Scheduler state for one emulated machine session.
///
/// All mutation happens synchronously inside [`EventCore::advance`] or the
/// handler callbacks it invokes; there is no internal locking and no
/// blocking. Constructed at machine-session start and [`reset`](Self::reset)
/// on machine reset.
pub struct EventCore {
    pub(crate) clock: CycleClock,
    pub(crate) nextevent: CycleTime,
    pub(crate) primary: [PrimaryEvent; PrimarySlot::COUNT],
    pub(crate) secondary: [SecondaryEvent; EV2_MAX],
    pub(crate) event2_count: u32,
    /// Rotating wildcard-allocation cursor, persisted so replayed sessions
    /// allocate slots in the same order.
    pub(crate) next_slot: usize,
    pub(crate) syncline: SyncLine,
    event_wait: bool,
    vsync_min_time: i32,
    vsync_time_base: i32,
    budget: i64,
    draining: bool,
    recheck: bool,
    config: SchedulerConfig,
    pub accounting: CycleAccounting,
}

impl EventCore {
    pub fn new(config: SchedulerConfig) -> Self {
        let mut core = Self {
            clock: CycleClock::new(),
            nextevent: 0,
            primary: [
                PrimaryEvent::idle(Some(PrimaryHandler::Cia)),
                PrimaryEvent::idle(Some(PrimaryHandler::Audio)),
                PrimaryEvent::idle(Some(PrimaryHandler::Misc)),
                PrimaryEvent::idle(Some(PrimaryHandler::Hsync)),
            ],
            secondary: [SecondaryEvent::idle(); EV2_MAX],
            event2_count: 0,
            next_slot: EV2_POOL_START,
            syncline: SyncLine::Idle,
            event_wait: false,
            vsync_min_time: 0,
            vsync_time_base: 0,
            budget: 0,
            draining: false,
            recheck: false,
            config,
            accounting: CycleAccounting::default(),
        };
        core.reschedule();
        core
    }

    /// Machine reset: clears the clock, both tables and the wait state while
    /// keeping the slot handler registration.
    pub fn reset(&mut self) {
        self.clock.reset();
        for slot in &mut self.primary {
            slot.active = false;
            slot.evtime = 0;
            slot.oldcycles = 0;
        }
        self.secondary = [SecondaryEvent::idle(); EV2_MAX];
        self.event2_count = 0;
        self.next_slot = EV2_POOL_START;
        self.syncline = SyncLine::Idle;
        self.event_wait = false;
        self.budget = 0;
        self.draining = false;
        self.recheck = false;
        self.accounting = CycleAccounting::default();
        self.reschedule();
    }

    #[inline]
    pub fn now(&self) -> CycleTime {
        self.clock.now()
    }

    /// Absolute cycle time of the next scheduled primary event.
    pub fn next_event(&self) -> CycleTime {
        self.nextevent
    }

    pub fn budget(&self) -> i64 {
        self.budget
    }

    pub fn set_budget(&mut self, budget: i64) {
        self.budget = budget;
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn event2_count(&self) -> u32 {
        self.event2_count
    }

    pub fn primary_slots(&self) -> &[PrimaryEvent; PrimarySlot::COUNT] {
        &self.primary
    }

    pub fn secondary_slots(&self) -> &[SecondaryEvent; EV2_MAX] {
        &self.secondary
    }

    /// Registers the handler of a primary slot. Done once at machine start;
    /// `None` leaves the slot unusable and is reported when it fires.
    pub fn register_primary(&mut self, slot: PrimarySlot, handler: Option<PrimaryHandler>) {
        self.primary[slot.index()].handler = handler;
    }

    /// Arms a primary slot to fire `delay` cycles from now.
    pub fn arm_primary(&mut self, slot: PrimarySlot, delay: CycleTime) {
        let now = self.clock.now();
        self.arm_primary_abs(slot, now.wrapping_add(delay));
    }

    /// Arms a primary slot at an absolute cycle time.
    pub fn arm_primary_abs(&mut self, slot: PrimarySlot, evtime: CycleTime) {
        let now = self.clock.now();
        let ev = &mut self.primary[slot.index()];
        ev.active = true;
        ev.evtime = evtime;
        ev.oldcycles = now;
        self.reschedule();
    }

    pub fn disarm_primary(&mut self, slot: PrimarySlot) {
        self.primary[slot.index()].active = false;
        self.reschedule();
    }

    /// Recomputes the next-due cycle across the primary table.
    ///
    /// With no active slot the minimum stays at `u64::MAX` and the published
    /// next-due time wraps to "one cycle before now", which the advance loop
    /// can never reach: it falls through to plain clock advancement.
    pub fn reschedule(&mut self) {
        let now = self.clock.now();
        let mut mintime = CycleTime::MAX;
        for slot in &self.primary {
            if slot.active {
                let eventtime = slot.evtime.wrapping_sub(now);
                if eventtime < mintime {
                    mintime = eventtime;
                }
            }
        }
        self.nextevent = now.wrapping_add(mintime);
    }

    /// Consumes emulated cycles, firing events as their due-times are
    /// crossed.
    ///
    /// The admission budget absorbs cycles first: while it lasts, the call
    /// decrements it and returns without touching the clock. Once exhausted,
    /// the overshoot is processed for real. An unsatisfied sync-line wait
    /// aborts the advance with the cycles unconsumed; the caller re-invokes
    /// until the wait clears.
    pub fn advance(&mut self, env: &mut dyn EventEnv, cycles_to_add: CycleTime) {
        let mut cycles = cycles_to_add;
        if self.config.cpu_thread {
            self.budget = BUDGET_CPU_THREAD;
        } else {
            self.budget -= cycles as i64;
            if self.budget >= 0 {
                return;
            }
            cycles = (-self.budget) as CycleTime;
            self.budget = 0;
        }

        while self.nextevent.wrapping_sub(self.clock.now()) <= cycles {
            if !self.syncline.is_idle() && self.check_syncline(env) {
                return;
            }

            let step = self.nextevent.wrapping_sub(self.clock.now());
            cycles -= step;
            self.clock.set_now(self.nextevent);
            let now = self.clock.now();

            for i in 0..PrimarySlot::COUNT {
                let slot = self.primary[i];
                if !slot.active || slot.evtime != now {
                    continue;
                }
                match slot.handler {
                    None => {
                        tracing::error!("primary event slot {i} has no handler, disabling it");
                        self.primary[i].active = false;
                    }
                    Some(PrimaryHandler::Misc) => self.pump_secondary(env),
                    Some(handler) => env.primary(self, handler),
                }
            }
            self.reschedule();
        }
        self.clock.advance(cycles);
    }

    /// Clears any outstanding sync-line wait and kicks the CPU loop so it
    /// re-checks events promptly.
    pub fn reset_syncline(&mut self, env: &mut dyn EventEnv) {
        self.syncline = SyncLine::Idle;
        env.request_special_check();
    }

    pub fn syncline(&self) -> SyncLine {
        self.syncline
    }

    /// Enables or disables the deadline-based wait modes. While disabled,
    /// those waits complete immediately.
    pub fn set_event_wait(&mut self, enabled: bool) {
        self.event_wait = enabled;
    }

    pub fn event_wait(&self) -> bool {
        self.event_wait
    }

    /// Publishes the frame-pacing bounds read by [`SyncLine::FramePace`]:
    /// the earliest processor time the next frame may start at, and the
    /// length of one frame in processor-time units.
    pub fn set_vsync_pacing(&mut self, min_time: i32, time_base: i32) {
        self.vsync_min_time = min_time;
        self.vsync_time_base = time_base;
    }

    pub fn wait_for_vblank(&mut self, top_line: i32) {
        self.syncline = SyncLine::Vblank { top_line };
    }

    pub fn wait_for_vblank_or_line(&mut self, early_line: i32) {
        self.syncline = SyncLine::VblankEarly { early_line };
    }

    pub fn wait_for_not_vblank(&mut self) {
        self.syncline = SyncLine::NotVblank;
    }

    pub fn wait_for_line(&mut self, line: i32) {
        self.syncline = SyncLine::Line { line };
    }

    pub fn wait_for_beam_before(&mut self, line: i32) {
        self.syncline = SyncLine::BeamBefore { line };
    }

    pub fn wait_until_cpu_time(&mut self, deadline: i32) {
        self.syncline = SyncLine::CpuTime { deadline };
    }

    pub fn wait_until_highres_time(&mut self, deadline_us: i64) {
        self.syncline = SyncLine::HighresTime { deadline_us };
    }

    pub fn wait_frame_pace(&mut self, deadline: i32, full_check: bool) {
        self.syncline = SyncLine::FramePace {
            deadline,
            full_check,
        };
    }

    /// Evaluates the outstanding sync-line wait. Returns `true` while the
    /// wait is unsatisfied, which aborts the advance.
    fn check_syncline(&mut self, env: &mut dyn EventEnv) -> bool {
        // Give audio a chance to drain before any wait decision so it never
        // starves behind a stalled vsync.
        env.finish_pull();

        match self.syncline {
            SyncLine::Idle => false,

            SyncLine::Vblank { top_line } => {
                if !env.chipset_vsync_active() {
                    self.reset_syncline(env);
                    return false;
                }
                let done = match env.vsync_status() {
                    VsyncStatus::Done => true,
                    VsyncStatus::NotDone => false,
                    VsyncStatus::NoThread => {
                        // No vsync thread: poll the beam. A position below
                        // the highest line seen means the frame wrapped.
                        let vp = env.current_scanline();
                        if vp < top_line {
                            true
                        } else {
                            if vp > top_line {
                                self.syncline = SyncLine::Vblank { top_line: vp };
                            }
                            false
                        }
                    }
                };
                if !done {
                    self.wait_throttle(env, StepKind::Quick);
                    return true;
                }
                env.clear_vsync();
                self.syncline = SyncLine::Idle;
                env.vsync_event_done();
                false
            }

            SyncLine::VblankEarly { early_line } => {
                if !env.chipset_vsync_active() {
                    self.reset_syncline(env);
                    return false;
                }
                let mut done = matches!(env.vsync_status(), VsyncStatus::Done);
                let vp = env.current_scanline();
                if vp < 0 || vp >= early_line {
                    done = true;
                }
                if !done {
                    self.wait_throttle(env, StepKind::Quick);
                    return true;
                }
                env.clear_vsync();
                self.syncline = SyncLine::Idle;
                env.vsync_event_done();
                false
            }

            SyncLine::NotVblank => {
                if !env.chipset_vsync_active() {
                    self.reset_syncline(env);
                    return false;
                }
                let vp = env.current_scanline();
                if vp <= 0 {
                    self.wait_throttle(env, StepKind::Quick);
                    return true;
                }
                env.clear_vsync();
                self.syncline = SyncLine::Idle;
                env.vsync_event_done();
                false
            }

            SyncLine::Line { line } => {
                if !env.chipset_vsync_active() {
                    self.reset_syncline(env);
                    return false;
                }
                let vp = env.current_scanline();
                if vp < 0 || vp < line {
                    self.wait_throttle(env, StepKind::Check);
                    return true;
                }
                self.syncline = SyncLine::Idle;
                env.vsync_event_done();
                false
            }

            SyncLine::BeamBefore { line } => {
                if !env.chipset_vsync_active() {
                    self.reset_syncline(env);
                    return false;
                }
                let vp = env.current_scanline();
                if vp < 0 || vp >= line {
                    self.wait_throttle(env, StepKind::Check);
                    return true;
                }
                self.syncline = SyncLine::Idle;
                env.vsync_event_done();
                false
            }

            SyncLine::CpuTime { deadline } => {
                if self.event_wait {
                    let v = env.processor_time().wrapping_sub(deadline);
                    if v < 0 {
                        self.wait_throttle(env, StepKind::Check);
                        return true;
                    }
                }
                self.reset_syncline(env);
                false
            }

            SyncLine::HighresTime { deadline_us } => {
                if self.event_wait {
                    let v = env.highres_time_us().wrapping_sub(deadline_us);
                    if v < 0 {
                        self.wait_throttle(env, StepKind::Check);
                        return true;
                    }
                }
                self.syncline = SyncLine::Idle;
                env.vsync_event_done();
                false
            }

            SyncLine::FramePace {
                deadline,
                full_check,
            } => {
                if self.event_wait {
                    let rpt = env.processor_time();
                    let mut v = rpt.wrapping_sub(self.vsync_min_time);
                    let v2 = rpt.wrapping_sub(deadline);
                    // A pacing target more than one frame away is stale;
                    // treat it as already met.
                    if v > self.vsync_time_base || v < -self.vsync_time_base {
                        v = 0;
                    }
                    if v < 0 && v2 < 0 {
                        let step = if full_check {
                            StepKind::Check
                        } else {
                            StepKind::Quick
                        };
                        self.wait_throttle(env, step);
                        return true;
                    }
                }
                self.reset_syncline(env);
                false
            }
        }
    }

    /// Steps the coprocessor (if any) and throttles the admission budget so
    /// the caller keeps checking in while the wait lasts.
    fn wait_throttle(&mut self, env: &mut dyn EventEnv, step: StepKind) {
        #[cfg(feature = "coprocessor")]
        if env.running() {
            match step {
                StepKind::Quick => env.execute_quick(),
                StepKind::Check => env.execute_check(),
            }
        }
        #[cfg(not(feature = "coprocessor"))]
        let _ = (env, step);

        self.budget = if self.config.jit_active {
            self.config.jit_budget
        } else {
            BUDGET_NOJIT
        };
    }

    /// Schedules a one-shot secondary event `delay` cycles from now.
    ///
    /// `slot: None` allocates from the wildcard pool: an already-pending
    /// event with the same due-time, handler and data is reused instead of
    /// duplicated; otherwise the first free slot from the rotating cursor is
    /// claimed. A full pool drops the request with a warning.
    pub fn schedule_secondary(
        &mut self,
        env: &mut dyn EventEnv,
        slot: Option<Event2Slot>,
        delay: CycleTime,
        data: u32,
        handler: SecondaryHandler,
    ) {
        let et = delay.wrapping_add(self.clock.now());
        let no = match slot {
            Some(slot) => {
                let no = slot.index();
                if !self.secondary[no].active {
                    self.event2_count += 1;
                }
                no
            }
            None => {
                let start = self.next_slot;
                let mut no = start;
                loop {
                    if !self.secondary[no].active {
                        self.event2_count += 1;
                        break;
                    }
                    let ev = &self.secondary[no];
                    if ev.evtime == et && ev.handler == Some(handler) && ev.data == data {
                        break;
                    }
                    no += 1;
                    if no == EV2_MAX {
                        no = EV2_POOL_START;
                    }
                    if no == start {
                        tracing::warn!(?handler, "out of secondary event slots, dropping event");
                        return;
                    }
                }
                self.next_slot = no;
                no
            }
        };
        self.secondary[no] = SecondaryEvent {
            active: true,
            evtime: et,
            handler: Some(handler),
            data,
        };
        self.pump_secondary(env);
    }

    /// Replaces every pending event with this handler by a single new one.
    ///
    /// `delay` is in [`CYCLE_UNIT`] units; zero or negative dispatches the
    /// handler synchronously without touching the table.
    pub fn replace_secondary(
        &mut self,
        env: &mut dyn EventEnv,
        delay: i32,
        data: u32,
        handler: SecondaryHandler,
    ) {
        for ev in &mut self.secondary {
            if ev.active && ev.handler == Some(handler) {
                ev.active = false;
                self.event2_count -= 1;
            }
        }
        if delay <= 0 {
            env.secondary(self, handler, data);
            return;
        }
        self.schedule_secondary(env, None, delay as CycleTime * CYCLE_UNIT, data, handler);
    }

    /// Drains the secondary table: fires every slot due exactly now, looping
    /// while firing re-arms same-cycle work, then re-arms the misc primary
    /// slot for the earliest remaining due-time.
    ///
    /// Handlers may schedule further events; a nested invocation from inside
    /// a handler only flags a recheck for the outer drain loop, so the drain
    /// never recurses.
    pub fn pump_secondary(&mut self, env: &mut dyn EventEnv) {
        if self.draining {
            self.recheck = true;
            return;
        }
        self.draining = true;
        self.primary[PrimarySlot::Misc.index()].active = false;

        let ct = self.clock.now();
        let mut mintime = CycleTime::MAX;
        let mut rescan = true;
        while rescan {
            rescan = false;
            mintime = CycleTime::MAX;
            for i in 0..EV2_MAX {
                if !self.secondary[i].active {
                    continue;
                }
                if self.secondary[i].evtime == ct {
                    let ev = self.secondary[i];
                    self.secondary[i].active = false;
                    self.event2_count -= 1;
                    match ev.handler {
                        Some(handler) => env.secondary(self, handler, ev.data),
                        None => {
                            tracing::warn!("secondary event slot {i} has no handler, dropping it");
                        }
                    }
                    if self.recheck || self.secondary[i].active {
                        rescan = true;
                        self.recheck = false;
                    }
                } else {
                    let eventtime = self.secondary[i].evtime.wrapping_sub(ct);
                    if eventtime < mintime {
                        mintime = eventtime;
                    }
                }
            }
        }

        if mintime != CycleTime::MAX {
            let misc = &mut self.primary[PrimarySlot::Misc.index()];
            misc.active = true;
            misc.oldcycles = ct;
            misc.evtime = ct.wrapping_add(mintime);
            self.reschedule();
        }
        self.draining = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{
        AudioDevice, CoprocessorDevice, DisplayDevice, EventSink, TimeDevice, VsyncDevice,
    };
    use pretty_assertions::assert_eq;

    struct NullEnv;

    impl EventSink for NullEnv {
        fn primary(&mut self, core: &mut EventCore, handler: PrimaryHandler) {
            let slot = match handler {
                PrimaryHandler::Cia => PrimarySlot::Cia,
                PrimaryHandler::Audio => PrimarySlot::Audio,
                PrimaryHandler::Misc => PrimarySlot::Misc,
                PrimaryHandler::Hsync => PrimarySlot::Hsync,
            };
            core.disarm_primary(slot);
        }
        fn secondary(&mut self, _core: &mut EventCore, _handler: SecondaryHandler, _data: u32) {}
    }
    impl VsyncDevice for NullEnv {
        fn chipset_vsync_active(&self) -> bool {
            false
        }
        fn vsync_status(&mut self) -> VsyncStatus {
            VsyncStatus::NoThread
        }
        fn clear_vsync(&mut self) {}
        fn vsync_event_done(&mut self) {}
    }
    impl DisplayDevice for NullEnv {
        fn current_scanline(&self) -> i32 {
            -1
        }
    }
    impl AudioDevice for NullEnv {
        fn finish_pull(&mut self) {}
    }
    impl CoprocessorDevice for NullEnv {}
    impl TimeDevice for NullEnv {
        fn processor_time(&self) -> i32 {
            0
        }
        fn highres_time_us(&self) -> i64 {
            0
        }
    }

    #[test]
    fn no_active_event_advances_straight_through() {
        let mut core = EventCore::new(SchedulerConfig::default());
        core.advance(&mut NullEnv, 10_000);
        assert_eq!(core.now(), 10_000);
    }

    #[test]
    fn reschedule_publishes_minimum_due_time() {
        let mut core = EventCore::new(SchedulerConfig::default());
        core.arm_primary(PrimarySlot::Hsync, 500);
        core.arm_primary(PrimarySlot::Cia, 200);
        assert_eq!(core.next_event(), 200);

        core.disarm_primary(PrimarySlot::Cia);
        assert_eq!(core.next_event(), 500);
    }

    #[test]
    fn budget_absorbs_cycles_before_the_clock_moves() {
        let mut core = EventCore::new(SchedulerConfig::default());
        core.set_budget(100);

        core.advance(&mut NullEnv, 60);
        assert_eq!(core.now(), 0);
        assert_eq!(core.budget(), 40);

        // The overshoot past the quota is the only part processed.
        core.advance(&mut NullEnv, 60);
        assert_eq!(core.now(), 20);
        assert_eq!(core.budget(), 0);
    }

    #[test]
    fn cpu_thread_mode_pins_the_budget() {
        let mut core = EventCore::new(SchedulerConfig {
            cpu_thread: true,
            ..Default::default()
        });
        core.advance(&mut NullEnv, 100);
        assert_eq!(core.now(), 100);
        assert_eq!(core.budget(), 0x4000_0000);
    }

    #[test]
    fn reset_clears_tables_but_keeps_registration() {
        let mut core = EventCore::new(SchedulerConfig::default());
        core.arm_primary(PrimarySlot::Hsync, 100);
        core.schedule_secondary(&mut NullEnv, None, 50, 7, SecondaryHandler::CopperWrite);
        core.advance(&mut NullEnv, 10);

        core.reset();
        assert_eq!(core.now(), 0);
        assert_eq!(core.event2_count(), 0);
        assert!(core.syncline().is_idle());
        assert!(core.primary_slots().iter().all(|ev| !ev.active));
        assert_eq!(
            core.primary_slots()[PrimarySlot::Hsync.index()].handler,
            Some(PrimaryHandler::Hsync)
        );
    }
}
