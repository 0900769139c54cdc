//! Save-state round-trip for the scheduler core.
//!
//! Handlers persist as small integer tags from the allow-lists in
//! [`crate::handler`]; an unrecognized tag restores as "no handler" with a
//! logged warning, leaving that slot inert until its owner re-arms it.

use amber_savestate::codec::{Decoder, Encoder};
use amber_savestate::{
    ChunkReader, ChunkWriter, SaveState, SnapshotError, SnapshotResult, SnapshotVersion,
};

use crate::handler::{PrimaryHandler, SecondaryHandler};
use crate::primary::PrimarySlot;
use crate::scheduler::EventCore;
use crate::secondary::{SecondaryEvent, EV2_MAX, EV2_POOL_START};
use crate::syncline::SyncLine;

const TAG_CURRCYCLE: u16 = 1;
const TAG_NEXTEVENT: u16 = 2;
const TAG_EVENT_CYCLES: u16 = 3;
const TAG_START_CYCLES: u16 = 4;
const TAG_CYCLES_TO_NEXT_EVENT: u16 = 5;
const TAG_MAX_CYCLES_TO_NEXT_EVENT: u16 = 6;
const TAG_CYCLES_TO_HSYNC_EVENT: u16 = 7;
const TAG_NEXT_SLOT: u16 = 8;

const TAG_PRIMARY: u16 = 10;
const TAG_SECONDARY: u16 = 11;

fn primary_tag(handler: Option<PrimaryHandler>) -> u8 {
    handler.map_or(0, PrimaryHandler::tag)
}

fn primary_from_tag(tag: u8) -> Option<PrimaryHandler> {
    if tag == 0 {
        return None;
    }
    let handler = PrimaryHandler::from_tag(tag);
    if handler.is_none() {
        tracing::warn!(tag, "unrecognized primary handler tag in savestate");
    }
    handler
}

fn secondary_tag(handler: Option<SecondaryHandler>) -> u8 {
    handler.map_or(0, SecondaryHandler::tag)
}

fn secondary_from_tag(tag: u8) -> Option<SecondaryHandler> {
    if tag == 0 {
        return None;
    }
    let handler = SecondaryHandler::from_tag(tag);
    if handler.is_none() {
        tracing::warn!(tag, "unrecognized secondary handler tag in savestate");
    }
    handler
}

impl SaveState for EventCore {
    const CHUNK_ID: [u8; 4] = *b"EVNT";
    const CHUNK_VERSION: SnapshotVersion = SnapshotVersion::new(1, 0);

    fn save_state(&self) -> Vec<u8> {
        let mut w = ChunkWriter::new(Self::CHUNK_ID, Self::CHUNK_VERSION);
        w.field_u64(TAG_CURRCYCLE, self.clock.now());
        w.field_u64(TAG_NEXTEVENT, self.nextevent);
        w.field_u64(TAG_EVENT_CYCLES, self.accounting.event_cycles);
        w.field_u64(TAG_START_CYCLES, self.accounting.start_cycles);
        w.field_u64(
            TAG_CYCLES_TO_NEXT_EVENT,
            self.accounting.cycles_to_next_event as u64,
        );
        w.field_u64(
            TAG_MAX_CYCLES_TO_NEXT_EVENT,
            self.accounting.max_cycles_to_next_event as u64,
        );
        w.field_u64(
            TAG_CYCLES_TO_HSYNC_EVENT,
            self.accounting.cycles_to_hsync_event as u64,
        );
        w.field_u32(TAG_NEXT_SLOT, self.next_slot as u32);

        let mut primary = Encoder::new().u32(PrimarySlot::COUNT as u32);
        for ev in &self.primary {
            primary = primary
                .bool(ev.active)
                .u64(ev.evtime)
                .u64(ev.oldcycles)
                .u8(primary_tag(ev.handler));
        }
        w.field_bytes(TAG_PRIMARY, primary.finish());

        let mut secondary = Encoder::new().u32(EV2_MAX as u32);
        for ev in &self.secondary {
            secondary = secondary
                .bool(ev.active)
                .u64(ev.evtime)
                .u8(secondary_tag(ev.handler))
                .u32(ev.data);
        }
        w.field_bytes(TAG_SECONDARY, secondary.finish());

        w.finish()
    }

    fn load_state(&mut self, bytes: &[u8]) -> SnapshotResult<()> {
        let r = ChunkReader::parse(bytes, Self::CHUNK_ID)?;
        r.ensure_chunk_major(Self::CHUNK_VERSION.major)?;

        if let Some(v) = r.u64(TAG_CURRCYCLE)? {
            self.clock.set_now(v);
        }
        if let Some(v) = r.u64(TAG_NEXTEVENT)? {
            self.nextevent = v;
        }
        if let Some(v) = r.u64(TAG_EVENT_CYCLES)? {
            self.accounting.event_cycles = v;
        }
        if let Some(v) = r.u64(TAG_START_CYCLES)? {
            self.accounting.start_cycles = v;
        }
        if let Some(v) = r.u64(TAG_CYCLES_TO_NEXT_EVENT)? {
            self.accounting.cycles_to_next_event = v as i64;
        }
        if let Some(v) = r.u64(TAG_MAX_CYCLES_TO_NEXT_EVENT)? {
            self.accounting.max_cycles_to_next_event = v as i64;
        }
        if let Some(v) = r.u64(TAG_CYCLES_TO_HSYNC_EVENT)? {
            self.accounting.cycles_to_hsync_event = v as i64;
        }
        if let Some(v) = r.u32(TAG_NEXT_SLOT)? {
            let v = v as usize;
            if !(EV2_POOL_START..EV2_MAX).contains(&v) {
                return Err(SnapshotError::InvalidFieldEncoding(
                    "secondary allocation cursor",
                ));
            }
            self.next_slot = v;
        }

        if let Some(buf) = r.bytes(TAG_PRIMARY) {
            let mut d = Decoder::new(buf);
            let count = d.u32()? as usize;
            if count > PrimarySlot::COUNT {
                return Err(SnapshotError::InvalidFieldEncoding(
                    "primary event table size",
                ));
            }
            for ev in self.primary.iter_mut().take(count) {
                ev.active = d.bool()?;
                ev.evtime = d.u64()?;
                ev.oldcycles = d.u64()?;
                ev.handler = primary_from_tag(d.u8()?);
            }
            d.finish()?;
        }

        if let Some(buf) = r.bytes(TAG_SECONDARY) {
            let mut d = Decoder::new(buf);
            let count = d.u32()? as usize;
            if count > EV2_MAX {
                return Err(SnapshotError::InvalidFieldEncoding(
                    "secondary event table size",
                ));
            }
            for ev in self.secondary.iter_mut().take(count) {
                *ev = SecondaryEvent {
                    active: d.bool()?,
                    evtime: d.u64()?,
                    handler: secondary_from_tag(d.u8()?),
                    data: d.u32()?,
                };
            }
            for ev in self.secondary.iter_mut().skip(count) {
                *ev = SecondaryEvent::idle();
            }
            d.finish()?;
        }

        self.event2_count = self.secondary.iter().filter(|ev| ev.active).count() as u32;

        // The wait state and admission budget are transient and never
        // persisted; a restored machine resumes from a clean check-in.
        self.syncline = SyncLine::Idle;
        self.set_event_wait(false);
        self.set_budget(0);

        self.reschedule();
        Ok(())
    }
}
