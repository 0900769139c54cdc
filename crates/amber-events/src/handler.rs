//! Closed registries of event handlers.
//!
//! The scheduler never holds function pointers: each slot stores one of these
//! identifiers and dispatch goes through [`EventSink`](crate::EventSink). The
//! `tag` values are the save-state allow-list and must stay stable forever;
//! tag 0 means "no handler" and unknown tags restore as `None`.

/// Handlers for the fixed hardware-line event slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimaryHandler {
    /// CIA timer tick.
    Cia,
    /// Horizontal sync line.
    Hsync,
    /// Secondary-table pump, owned by the scheduler itself.
    Misc,
    /// Audio state machine step.
    Audio,
}

impl PrimaryHandler {
    pub const ALL: [PrimaryHandler; 4] = [
        PrimaryHandler::Cia,
        PrimaryHandler::Hsync,
        PrimaryHandler::Misc,
        PrimaryHandler::Audio,
    ];

    pub const fn tag(self) -> u8 {
        match self {
            PrimaryHandler::Cia => 1,
            PrimaryHandler::Hsync => 2,
            PrimaryHandler::Misc => 3,
            PrimaryHandler::Audio => 4,
        }
    }

    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(PrimaryHandler::Cia),
            2 => Some(PrimaryHandler::Hsync),
            3 => Some(PrimaryHandler::Misc),
            4 => Some(PrimaryHandler::Audio),
            _ => None,
        }
    }
}

/// Handlers for one-shot delayed events in the secondary table.
///
/// Each carries a 32-bit data payload chosen by the scheduling subsystem
/// (an interrupt mask, a register value, a drive index, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecondaryHandler {
    /// Action Replay cartridge CIA access delay.
    ActionReplayCiaDelay,
    /// Delayed audio interrupt request.
    AudioIrq,
    /// CIA-A interrupt control register update.
    CiaaIcr,
    /// CIA-B interrupt control register update.
    CiabIcr,
    /// CIA-B time-of-day counter increment.
    CiabTodInc,
    /// CIA-A time-of-day tick.
    CiaaTod,
    /// Delayed interrupt delivery to the CPU.
    SendInterrupt,
    /// Delayed INTENA custom register write.
    SendIntena,
    /// Delayed INTREQ custom register write.
    SendIntreq,
    /// Light pen position latch.
    LightpenTrigger,
    /// Debugger breakpoint trigger.
    Breakpoint,
    /// Blitter operation completion.
    BlitterDone,
    /// Disk DMA word transfer.
    Disk,
    /// CD subcode interrupt.
    SubcodeInterrupt,
    /// Delayed copper register write.
    CopperWrite,
    /// DMA request line slot allocation.
    Dmal,
    /// DMA request line slot allocation (alternate phase).
    Dmal2,
    /// Drive motor spin-up delay.
    MotorDelay,
}

impl SecondaryHandler {
    pub const ALL: [SecondaryHandler; 18] = [
        SecondaryHandler::ActionReplayCiaDelay,
        SecondaryHandler::AudioIrq,
        SecondaryHandler::CiaaIcr,
        SecondaryHandler::CiabIcr,
        SecondaryHandler::CiabTodInc,
        SecondaryHandler::CiaaTod,
        SecondaryHandler::SendInterrupt,
        SecondaryHandler::SendIntena,
        SecondaryHandler::SendIntreq,
        SecondaryHandler::LightpenTrigger,
        SecondaryHandler::Breakpoint,
        SecondaryHandler::BlitterDone,
        SecondaryHandler::Disk,
        SecondaryHandler::SubcodeInterrupt,
        SecondaryHandler::CopperWrite,
        SecondaryHandler::Dmal,
        SecondaryHandler::Dmal2,
        SecondaryHandler::MotorDelay,
    ];

    pub const fn tag(self) -> u8 {
        match self {
            SecondaryHandler::ActionReplayCiaDelay => 1,
            SecondaryHandler::AudioIrq => 2,
            SecondaryHandler::CiaaIcr => 3,
            SecondaryHandler::CiabIcr => 4,
            SecondaryHandler::CiabTodInc => 5,
            SecondaryHandler::CiaaTod => 6,
            SecondaryHandler::SendInterrupt => 7,
            SecondaryHandler::SendIntena => 8,
            SecondaryHandler::SendIntreq => 9,
            SecondaryHandler::LightpenTrigger => 10,
            SecondaryHandler::Breakpoint => 11,
            SecondaryHandler::BlitterDone => 12,
            SecondaryHandler::Disk => 13,
            SecondaryHandler::SubcodeInterrupt => 14,
            SecondaryHandler::CopperWrite => 15,
            SecondaryHandler::Dmal => 16,
            SecondaryHandler::Dmal2 => 17,
            SecondaryHandler::MotorDelay => 18,
        }
    }

    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(SecondaryHandler::ActionReplayCiaDelay),
            2 => Some(SecondaryHandler::AudioIrq),
            3 => Some(SecondaryHandler::CiaaIcr),
            4 => Some(SecondaryHandler::CiabIcr),
            5 => Some(SecondaryHandler::CiabTodInc),
            6 => Some(SecondaryHandler::CiaaTod),
            7 => Some(SecondaryHandler::SendInterrupt),
            8 => Some(SecondaryHandler::SendIntena),
            9 => Some(SecondaryHandler::SendIntreq),
            10 => Some(SecondaryHandler::LightpenTrigger),
            11 => Some(SecondaryHandler::Breakpoint),
            12 => Some(SecondaryHandler::BlitterDone),
            13 => Some(SecondaryHandler::Disk),
            14 => Some(SecondaryHandler::SubcodeInterrupt),
            15 => Some(SecondaryHandler::CopperWrite),
            16 => Some(SecondaryHandler::Dmal),
            17 => Some(SecondaryHandler::Dmal2),
            18 => Some(SecondaryHandler::MotorDelay),
            _ => None,
        }
    }
}
