use amber_events::{
    AudioDevice, CoprocessorDevice, CycleTime, DisplayDevice, Event2Slot, EventCore, EventSink,
    PrimaryHandler, PrimarySlot, SchedulerConfig, SecondaryHandler, TimeDevice, VsyncDevice,
    VsyncStatus, CYCLE_UNIT, EV2_MAX,
};
use proptest::prelude::*;

#[derive(Default)]
struct Recorder {
    fired: Vec<(CycleTime, SecondaryHandler, u32)>,
    /// When set, the first SendIntreq dispatch schedules a same-cycle
    /// follow-up event.
    chain_once: bool,
}

impl EventSink for Recorder {
    fn primary(&mut self, core: &mut EventCore, handler: PrimaryHandler) {
        let slot = match handler {
            PrimaryHandler::Cia => PrimarySlot::Cia,
            PrimaryHandler::Audio => PrimarySlot::Audio,
            PrimaryHandler::Misc => PrimarySlot::Misc,
            PrimaryHandler::Hsync => PrimarySlot::Hsync,
        };
        core.disarm_primary(slot);
    }

    fn secondary(&mut self, core: &mut EventCore, handler: SecondaryHandler, data: u32) {
        self.fired.push((core.now(), handler, data));
        if handler == SecondaryHandler::SendIntreq && self.chain_once {
            self.chain_once = false;
            core.schedule_secondary(self, None, 0, data + 1, SecondaryHandler::CopperWrite);
        }
    }
}

impl VsyncDevice for Recorder {
    fn chipset_vsync_active(&self) -> bool {
        false
    }
    fn vsync_status(&mut self) -> VsyncStatus {
        VsyncStatus::NoThread
    }
    fn clear_vsync(&mut self) {}
    fn vsync_event_done(&mut self) {}
}

impl DisplayDevice for Recorder {
    fn current_scanline(&self) -> i32 {
        -1
    }
}

impl AudioDevice for Recorder {
    fn finish_pull(&mut self) {}
}

impl CoprocessorDevice for Recorder {}

impl TimeDevice for Recorder {
    fn processor_time(&self) -> i32 {
        0
    }
    fn highres_time_us(&self) -> i64 {
        0
    }
}

const POOL_CAPACITY: usize = EV2_MAX - Event2Slot::Misc.index();

#[test]
fn scheduled_event_fires_at_its_due_cycle() {
    let mut core = EventCore::new(SchedulerConfig::default());
    let mut env = Recorder::default();

    core.schedule_secondary(&mut env, None, 75, 7, SecondaryHandler::CopperWrite);
    assert_eq!(core.event2_count(), 1);

    core.advance(&mut env, 200);
    assert_eq!(core.now(), 200);
    assert_eq!(env.fired, vec![(75, SecondaryHandler::CopperWrite, 7)]);
    assert_eq!(core.event2_count(), 0);
}

#[test]
fn zero_delay_fires_during_the_scheduling_call() {
    let mut core = EventCore::new(SchedulerConfig::default());
    let mut env = Recorder::default();

    core.schedule_secondary(&mut env, None, 0, 3, SecondaryHandler::AudioIrq);

    assert_eq!(env.fired, vec![(0, SecondaryHandler::AudioIrq, 3)]);
    assert_eq!(core.event2_count(), 0);
}

#[test]
fn rescheduling_an_identical_event_reuses_its_slot() {
    let mut core = EventCore::new(SchedulerConfig::default());
    let mut env = Recorder::default();

    core.schedule_secondary(&mut env, None, 100, 5, SecondaryHandler::CopperWrite);
    core.schedule_secondary(&mut env, None, 100, 5, SecondaryHandler::CopperWrite);
    assert_eq!(core.event2_count(), 1);

    core.advance(&mut env, 150);
    assert_eq!(env.fired, vec![(100, SecondaryHandler::CopperWrite, 5)]);
}

#[test]
fn a_full_pool_drops_the_request_without_corrupting_slots() {
    let mut core = EventCore::new(SchedulerConfig::default());
    let mut env = Recorder::default();

    for i in 0..POOL_CAPACITY {
        core.schedule_secondary(
            &mut env,
            None,
            100 + i as CycleTime,
            i as u32,
            SecondaryHandler::SendInterrupt,
        );
    }
    assert_eq!(core.event2_count(), POOL_CAPACITY as u32);
    let before = *core.secondary_slots();

    core.schedule_secondary(&mut env, None, 999, 999, SecondaryHandler::CopperWrite);

    assert_eq!(core.event2_count(), POOL_CAPACITY as u32);
    assert_eq!(*core.secondary_slots(), before);

    // Every accepted event still fires exactly once.
    core.advance(&mut env, 2000);
    assert_eq!(env.fired.len(), POOL_CAPACITY);
}

#[test]
fn replace_deactivates_matching_events_and_schedules_one() {
    let mut core = EventCore::new(SchedulerConfig::default());
    let mut env = Recorder::default();

    core.schedule_secondary(&mut env, None, 100, 1, SecondaryHandler::MotorDelay);
    core.schedule_secondary(&mut env, None, 200, 2, SecondaryHandler::MotorDelay);
    core.schedule_secondary(&mut env, None, 300, 3, SecondaryHandler::Disk);
    assert_eq!(core.event2_count(), 3);

    core.replace_secondary(&mut env, 2, 9, SecondaryHandler::MotorDelay);
    assert_eq!(core.event2_count(), 2);

    core.advance(&mut env, 2000);
    assert_eq!(
        env.fired,
        vec![
            (300, SecondaryHandler::Disk, 3),
            (2 * CYCLE_UNIT, SecondaryHandler::MotorDelay, 9),
        ]
    );
}

#[test]
fn replace_with_zero_delay_dispatches_synchronously() {
    let mut core = EventCore::new(SchedulerConfig::default());
    let mut env = Recorder::default();

    core.schedule_secondary(&mut env, None, 100, 1, SecondaryHandler::MotorDelay);
    core.replace_secondary(&mut env, 0, 4, SecondaryHandler::MotorDelay);

    assert_eq!(env.fired, vec![(0, SecondaryHandler::MotorDelay, 4)]);
    assert_eq!(core.event2_count(), 0);
    assert!(core.secondary_slots().iter().all(|ev| !ev.active));
}

#[test]
fn handler_scheduling_same_cycle_work_drains_in_one_pass() {
    let mut core = EventCore::new(SchedulerConfig::default());
    let mut env = Recorder {
        chain_once: true,
        ..Default::default()
    };

    core.schedule_secondary(&mut env, None, 50, 10, SecondaryHandler::SendIntreq);
    core.advance(&mut env, 50);

    assert_eq!(
        env.fired,
        vec![
            (50, SecondaryHandler::SendIntreq, 10),
            (50, SecondaryHandler::CopperWrite, 11),
        ]
    );
    assert_eq!(core.event2_count(), 0);
}

#[test]
fn same_cycle_events_fire_in_slot_order() {
    let mut core = EventCore::new(SchedulerConfig::default());
    let mut env = Recorder::default();

    // Scheduling order matches pool slot order while the pool is empty, so
    // the firing order below is the slot scan order.
    core.schedule_secondary(&mut env, None, 80, 1, SecondaryHandler::SendIntena);
    core.schedule_secondary(&mut env, None, 80, 2, SecondaryHandler::SendIntreq);
    core.schedule_secondary(&mut env, None, 80, 3, SecondaryHandler::CiaaIcr);

    core.advance(&mut env, 100);
    assert_eq!(
        env.fired,
        vec![
            (80, SecondaryHandler::SendIntena, 1),
            (80, SecondaryHandler::SendIntreq, 2),
            (80, SecondaryHandler::CiaaIcr, 3),
        ]
    );
}

#[test]
fn dedicated_slots_bypass_the_wildcard_search() {
    let mut core = EventCore::new(SchedulerConfig::default());
    let mut env = Recorder::default();

    core.schedule_secondary(
        &mut env,
        Some(Event2Slot::Blitter),
        40,
        9,
        SecondaryHandler::BlitterDone,
    );
    core.schedule_secondary(
        &mut env,
        Some(Event2Slot::Disk),
        60,
        1,
        SecondaryHandler::Disk,
    );
    assert!(core.secondary_slots()[Event2Slot::Blitter.index()].active);
    assert!(core.secondary_slots()[Event2Slot::Disk.index()].active);

    core.advance(&mut env, 100);
    assert_eq!(
        env.fired,
        vec![
            (40, SecondaryHandler::BlitterDone, 9),
            (60, SecondaryHandler::Disk, 1),
        ]
    );
}

proptest! {
    #[test]
    fn distinct_events_each_fire_once_in_nondecreasing_order(
        entries in prop::collection::btree_set((1u64..400u64, any::<u32>()), 1..=POOL_CAPACITY)
    ) {
        let mut core = EventCore::new(SchedulerConfig::default());
        let mut env = Recorder::default();

        for &(delay, data) in &entries {
            core.schedule_secondary(&mut env, None, delay, data, SecondaryHandler::CopperWrite);
        }
        prop_assert_eq!(core.event2_count() as usize, entries.len());

        core.advance(&mut env, 500);

        prop_assert_eq!(env.fired.len(), entries.len());
        for window in env.fired.windows(2) {
            prop_assert!(window[0].0 <= window[1].0);
        }
        let mut seen: Vec<(u64, u32)> = env
            .fired
            .iter()
            .map(|&(at, _, data)| (at, data))
            .collect();
        seen.sort_unstable();
        let expected: Vec<(u64, u32)> = entries.iter().copied().collect();
        prop_assert_eq!(seen, expected);
    }
}
